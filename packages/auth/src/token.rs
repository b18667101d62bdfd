// ABOUTME: Bearer token creation and validation
// ABOUTME: HS256 JWTs carrying the user id as subject, valid for 24 hours

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// How long issued tokens stay valid
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
}

/// Sign a token for the given user
pub fn create_token(user_id: &str, email: &str, secret: &str) -> AuthResult<String> {
    let now = Utc::now();
    let expiration = now + Duration::hours(TOKEN_TTL_HOURS);

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: expiration.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Validate a token and return its claims
pub fn decode_token(token: &str, secret: &str) -> AuthResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn round_trip_preserves_claims() {
        let token = create_token("user-1", "ana@example.com", SECRET).unwrap();
        let claims = decode_token(&token, SECRET).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "ana@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token("user-1", "ana@example.com", SECRET).unwrap();
        assert!(matches!(
            decode_token(&token, "other-secret"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(
            decode_token("not-a-token", SECRET),
            Err(AuthError::InvalidToken)
        ));
    }
}
