// Access token encoding and validation (HS256)
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::Claims;
use crate::models::User;
use crate::{AppError, Result};

const ISSUER: &str = "community-forum";

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Lifetime of an access token in seconds
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Issue an access token bound to session `sid`
    pub fn encode_token(&self, user: &User, sid: Uuid) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user.id,
            username: user.username.clone(),
            role: if user.is_admin { "admin" } else { "member" }.to_string(),
            sid,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to sign access token: {}", e)))
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iat", "iss"]);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::AuthError("Access token has expired".to_string())
                }
                _ => AppError::AuthError("Invalid access token".to_string()),
            })
    }
}
