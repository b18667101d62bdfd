// ABOUTME: User storage layer using SQLite
// ABOUTME: Handles CRUD operations for user accounts with soft deletes

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use trellis_storage::StorageError;

use crate::types::{User, UserCreateInput, UserUpdateInput};

pub struct UserStorage {
    pool: SqlitePool,
}

impl UserStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_user(&self, input: UserCreateInput) -> Result<User, StorageError> {
        let user_id = trellis_core::generate_id();
        let now = Utc::now();

        debug!("Creating user: {} ({})", user_id, input.email);

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&user_id)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(&input.name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_user(&user_id).await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, StorageError> {
        debug!("Fetching user: {}", user_id);

        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?
            .ok_or(StorageError::NotFound)?;

        row_to_user(&row)
    }

    /// Fetch a user only if the account has not been deactivated
    pub async fn get_active_user(&self, user_id: &str) -> Result<User, StorageError> {
        let user = self.get_user(user_id).await?;
        if !user.is_active {
            return Err(StorageError::NotFound);
        }
        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        debug!("Fetching user by email: {}", email);

        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.as_ref().map(row_to_user).transpose()
    }

    pub async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let rows = sqlx::query("SELECT * FROM users WHERE is_active = 1 ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_user).collect()
    }

    pub async fn update_user(
        &self,
        user_id: &str,
        input: UserUpdateInput,
    ) -> Result<User, StorageError> {
        debug!("Updating user: {}", user_id);

        // Build dynamic UPDATE query based on provided fields
        let mut query = String::from("UPDATE users SET updated_at = ?");
        let mut has_updates = false;

        if input.name.is_some() {
            query.push_str(", name = ?");
            has_updates = true;
        }
        if input.password_hash.is_some() {
            query.push_str(", password_hash = ?");
            has_updates = true;
        }

        query.push_str(" WHERE id = ?");

        if !has_updates {
            return self.get_user(user_id).await;
        }

        let now = Utc::now();
        let mut q = sqlx::query(&query).bind(now);

        if let Some(name) = &input.name {
            q = q.bind(name);
        }
        if let Some(hash) = &input.password_hash {
            q = q.bind(hash);
        }

        q = q.bind(user_id);

        q.execute(&self.pool).await.map_err(StorageError::Sqlx)?;

        self.get_user(user_id).await
    }

    pub async fn deactivate_user(&self, user_id: &str) -> Result<(), StorageError> {
        debug!("Deactivating user: {}", user_id);

        sqlx::query("UPDATE users SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(())
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, StorageError> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        password_hash: row.try_get("password_hash")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> UserStorage {
        let pool = trellis_storage::connect_in_memory().await.unwrap();
        UserStorage::new(pool)
    }

    fn input(email: &str, name: &str) -> UserCreateInput {
        UserCreateInput {
            email: email.to_string(),
            name: name.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_fetch_user() {
        let storage = setup().await;

        let user = storage.create_user(input("ana@example.com", "Ana")).await.unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert!(user.is_active);

        let fetched = storage.get_user(&user.id).await.unwrap();
        assert_eq!(fetched.name, "Ana");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_database_error() {
        let storage = setup().await;

        storage.create_user(input("ana@example.com", "Ana")).await.unwrap();
        let result = storage.create_user(input("ana@example.com", "Imposter")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let storage = setup().await;

        assert!(matches!(
            storage.get_user("nope").await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn deactivated_users_are_hidden_from_active_lookup() {
        let storage = setup().await;

        let user = storage.create_user(input("ana@example.com", "Ana")).await.unwrap();
        storage.deactivate_user(&user.id).await.unwrap();

        // Raw lookup still sees the row, active lookup does not
        assert!(storage.get_user(&user.id).await.is_ok());
        assert!(matches!(
            storage.get_active_user(&user.id).await,
            Err(StorageError::NotFound)
        ));

        let listed = storage.list_users().await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn partial_update_only_touches_given_fields() {
        let storage = setup().await;

        let user = storage.create_user(input("ana@example.com", "Ana")).await.unwrap();
        let updated = storage
            .update_user(
                &user.id,
                UserUpdateInput {
                    name: Some("Ana Lima".to_string()),
                    password_hash: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Ana Lima");
        assert_eq!(updated.password_hash, "hash");
    }
}
