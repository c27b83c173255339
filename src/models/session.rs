use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::AccountResponse;

/// Server-side record backing refresh-token validation.
/// Only the SHA-256 hash of the refresh token is ever stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: AccountResponse,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration, revoked: bool) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            refresh_token_hash: String::new(),
            expires_at: now + expires_in,
            revoked_at: revoked.then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_session_usability() {
        let now = Utc::now();
        assert!(session(Duration::hours(1), false).is_usable(now));
        assert!(!session(Duration::hours(1), true).is_usable(now));
        assert!(!session(Duration::hours(-1), false).is_usable(now));
    }
}
