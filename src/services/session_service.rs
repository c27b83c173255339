use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::AuthService;
use crate::db::repository::{SessionRepository, UserRepository};
use crate::models::session::TokenPair;
use crate::models::{Session, User};
use crate::{AppError, Result};

/// Issues, rotates and revokes refresh-token sessions
pub struct SessionService {
    session_repo: Arc<dyn SessionRepository>,
    user_repo: Arc<dyn UserRepository>,
    auth_service: Arc<AuthService>,
}

impl SessionService {
    pub fn new(
        session_repo: Arc<dyn SessionRepository>,
        user_repo: Arc<dyn UserRepository>,
        auth_service: Arc<AuthService>,
    ) -> Self {
        Self { session_repo, user_repo, auth_service }
    }

    /// Open a new session for `user` and return its first token pair
    pub async fn start_session(&self, user: &User) -> Result<TokenPair> {
        let refresh_token = self.auth_service.generate_refresh_token();
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            refresh_token_hash: self.auth_service.hash_token(&refresh_token),
            expires_at: now + self.auth_service.refresh_ttl(),
            revoked_at: None,
            created_at: now,
            updated_at: now,
        };
        let session = self.session_repo.create_session(&session).await?;

        tracing::debug!("🔑 SESSION: Started session {} for {}", session.id, user.username);
        self.token_pair(user, session.id, refresh_token)
    }

    /// Exchange a refresh token for a new pair. The presented token stops working.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, TokenPair)> {
        let invalid = || AppError::AuthError("Invalid or expired refresh token".to_string());

        let current_hash = self.auth_service.hash_token(refresh_token);
        let session = self
            .session_repo
            .get_session_by_token_hash(&current_hash)
            .await?
            .ok_or_else(invalid)?;
        if !session.is_usable(Utc::now()) {
            return Err(invalid());
        }

        let user = self
            .user_repo
            .get_user_by_id(session.user_id)
            .await?
            .ok_or_else(invalid)?;

        let next_token = self.auth_service.generate_refresh_token();
        let rotated = self
            .session_repo
            .rotate_refresh_token(
                session.id,
                &current_hash,
                &self.auth_service.hash_token(&next_token),
                Utc::now() + self.auth_service.refresh_ttl(),
            )
            .await?;
        // Another request rotated or revoked it first
        if !rotated {
            return Err(invalid());
        }

        let pair = self.token_pair(&user, session.id, next_token)?;
        Ok((user, pair))
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        let session = self
            .session_repo
            .get_session_by_token_hash(&self.auth_service.hash_token(refresh_token))
            .await?
            .ok_or_else(|| AppError::AuthError("Unknown refresh token".to_string()))?;

        if session.revoked_at.is_none() {
            self.session_repo.revoke_session(session.id).await?;
            tracing::debug!("🔑 SESSION: Revoked session {}", session.id);
        }
        Ok(())
    }

    /// Delete sessions past their expiry; returns how many were removed
    pub async fn prune_expired(&self) -> Result<u64> {
        let removed = self.session_repo.delete_expired_sessions(Utc::now()).await?;
        if removed > 0 {
            tracing::info!("🧹 SESSION: Pruned {} expired sessions", removed);
        }
        Ok(removed)
    }

    fn token_pair(&self, user: &User, session_id: Uuid, refresh_token: String) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.auth_service.generate_token(user, session_id)?,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.auth_service.access_ttl_seconds(),
        })
    }
}
