use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::db::repository::UserRepository;
use crate::models::user::{CreateUserRequest, UserProfile, UserResponse};
use crate::models::User;
use crate::utils::validation::{validate_email, validate_password, validate_username};
use crate::{AppError, Result};

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    auth_service: Arc<AuthService>,
    config: AppConfig,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, auth_service: Arc<AuthService>, config: &AppConfig) -> Self {
        Self {
            user_repo,
            auth_service,
            config: config.clone(),
        }
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        let username = validate_username(&request.username)?;
        let email = validate_email(&request.email)?;
        validate_password(&request.password)?;

        // Hash the password before storing
        let password_hash = self.auth_service.hash_password(&request.password)?;
        let is_admin = self.config.is_admin_username(&username);

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            is_admin,
            created_at: now,
            updated_at: now,
        };

        let created = self.user_repo.create_user(&user).await?;
        tracing::info!("👤 USER: Registered {} ({}){}", created.username, created.id, if is_admin { " as admin" } else { "" });
        Ok(created)
    }

    /// Check credentials. Unknown login and wrong password fail identically.
    pub async fn authenticate_user(&self, login: &str, password: &str) -> Result<User> {
        let invalid = || AppError::AuthError("Invalid username/email or password".to_string());

        let user = self.user_repo.get_user_by_login(login.trim()).await?.ok_or_else(invalid)?;
        if !self.auth_service.verify_password(password, &user.password_hash)? {
            tracing::warn!("🔒 USER: Failed login for {}", user.username);
            return Err(invalid());
        }
        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
        self.user_repo
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Public profile with karma
    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile> {
        let user = self.get_user(user_id).await?;
        let karma = self.user_repo.get_karma(user_id).await?;
        Ok(UserProfile { user: UserResponse::from(user), karma })
    }
}
