// ABOUTME: Account service for Trellis users
// ABOUTME: Duplicate-email checks and self-only profile updates on top of storage

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

use trellis_storage::StorageError;

use crate::storage::UserStorage;
use crate::types::{User, UserCreateInput, UserUpdateInput};

#[derive(Error, Debug)]
pub enum UserError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("User not found")]
    NotFound,
    #[error("User with this email already exists")]
    EmailTaken,
    #[error("You can only modify your own account")]
    Forbidden,
}

pub struct UsersManager {
    storage: UserStorage,
}

impl UsersManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            storage: UserStorage::new(pool),
        }
    }

    pub async fn create(&self, input: UserCreateInput) -> Result<User, UserError> {
        if self.storage.get_user_by_email(&input.email).await?.is_some() {
            return Err(UserError::EmailTaken);
        }

        debug!("Registering user: {}", input.email);
        Ok(self.storage.create_user(input).await?)
    }

    pub async fn find_all(&self) -> Result<Vec<User>, UserError> {
        Ok(self.storage.list_users().await?)
    }

    pub async fn find_one(&self, id: &str) -> Result<User, UserError> {
        self.storage.get_active_user(id).await.map_err(|e| match e {
            StorageError::NotFound => UserError::NotFound,
            other => UserError::Storage(other),
        })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        Ok(self.storage.get_user_by_email(email).await?)
    }

    pub async fn update(
        &self,
        requester: &User,
        id: &str,
        input: UserUpdateInput,
    ) -> Result<User, UserError> {
        if requester.id != id {
            return Err(UserError::Forbidden);
        }
        self.find_one(id).await?;
        Ok(self.storage.update_user(id, input).await?)
    }

    pub async fn remove(&self, requester: &User, id: &str) -> Result<(), UserError> {
        if requester.id != id {
            return Err(UserError::Forbidden);
        }
        self.find_one(id).await?;
        Ok(self.storage.deactivate_user(id).await?)
    }
}
