use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
}

pub fn generate_token(
    user_id: Uuid,
    name: &str,
    email: &str,
    token_type: TokenType,
    config: &Config,
) -> Result<String, jsonwebtoken::errors::Error> {
    let lifetime = match token_type {
        TokenType::Access => config.jwt_expiration(),
        TokenType::Refresh => config.jwt_refresh_expiration(),
    };
    let iat = Utc::now().timestamp();

    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        email: email.to_string(),
        token_type,
        exp: iat + lifetime.as_secs() as i64,
        iat,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Decodes `token` and checks it was issued for `expected` use.
pub fn verify_token(token: &str, expected: TokenType, config: &Config) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("token rejected: {}", e);
        AppError::Unauthorized
    })?;

    if token_data.claims.token_type != expected {
        return Err(AppError::Unauthorized);
    }

    Ok(token_data.claims)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config::from_lookup(|name| match name {
        "DATABASE_URL" => Some("postgres://localhost/tasks".into()),
        "REDIS_URL" => Some("redis://127.0.0.1".into()),
        "JWT_SECRET" => Some("test-secret".into()),
        _ => None,
    })
    .expect("test config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_round_trips() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let token =
            generate_token(user_id, "Ada", "ada@example.com", TokenType::Access, &config).unwrap();

        let claims = verify_token(&token, TokenType::Access, &config).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let config = test_config();
        let token =
            generate_token(Uuid::new_v4(), "Ada", "a@b.io", TokenType::Refresh, &config).unwrap();

        assert!(matches!(
            verify_token(&token, TokenType::Access, &config),
            Err(AppError::Unauthorized)
        ));
        assert!(verify_token(&token, TokenType::Refresh, &config).is_ok());
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let config = test_config();
        let mut other = test_config();
        other.jwt_secret = "another-secret".into();
        let token =
            generate_token(Uuid::new_v4(), "Ada", "a@b.io", TokenType::Access, &other).unwrap();

        assert!(verify_token(&token, TokenType::Access, &config).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hashed = hash_password("correct horse").unwrap();

        assert!(verify_password("correct horse", &hashed).unwrap());
        assert!(!verify_password("battery staple", &hashed).unwrap());
    }
}
