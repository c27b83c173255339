pub mod jwt;
pub mod middleware;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::User;
use crate::{AppError, Result};
use jwt::JwtService;

/// Access token claims. `sid` ties the token to the session that issued it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub username: String,
    pub role: String, // "admin" or "member"
    pub sid: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64, // Expiration time
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

pub struct AuthService {
    jwt: JwtService,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            jwt: JwtService::new(&config.jwt_secret, Duration::minutes(config.access_token_ttl_minutes)),
            refresh_ttl: Duration::days(config.refresh_token_ttl_days),
        }
    }

    pub fn generate_token(&self, user: &User, session_id: Uuid) -> Result<String> {
        self.jwt.encode_token(user, session_id)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        self.jwt.decode_token(token)
    }

    pub fn access_ttl_seconds(&self) -> i64 {
        self.jwt.ttl_seconds()
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::InternalError(format!("Stored password hash is malformed: {}", e)))?;
        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    }

    /// Opaque refresh token: 32 random bytes, URL-safe base64
    pub fn generate_refresh_token(&self) -> String {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Only this digest of a refresh token is ever stored
    pub fn hash_token(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
