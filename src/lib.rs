// Library modules for the community forum backend
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, Result};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: db::DatabaseClient,
    pub auth_service: Arc<auth::AuthService>,
    pub user_service: Arc<services::UserService>,
    pub session_service: Arc<services::SessionService>,
    pub community_service: Arc<services::CommunityService>,
    pub post_service: Arc<services::PostService>,
    pub comment_service: Arc<services::CommentService>,
    pub vote_service: Arc<services::VoteService>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let db = db::DatabaseClient::new(&config).await?;
        Ok(Self::with_database(config, db))
    }

    /// Wire services over an already connected database
    pub fn with_database(config: AppConfig, db: db::DatabaseClient) -> Self {
        let auth_service = Arc::new(auth::AuthService::new(&config));

        let user_service = Arc::new(services::UserService::new(db.user_repo.clone(), auth_service.clone(), &config));
        let session_service = Arc::new(services::SessionService::new(
            db.session_repo.clone(),
            db.user_repo.clone(),
            auth_service.clone(),
        ));
        let community_service = Arc::new(services::CommunityService::new(db.community_repo.clone()));
        let vote_service = Arc::new(services::VoteService::new(
            db.vote_repo.clone(),
            db.post_repo.clone(),
            db.comment_repo.clone(),
        ));
        let post_service = Arc::new(services::PostService::new(
            db.post_repo.clone(),
            db.user_repo.clone(),
            community_service.clone(),
            vote_service.clone(),
        ));
        let comment_service = Arc::new(services::CommentService::new(
            db.comment_repo.clone(),
            db.post_repo.clone(),
            vote_service.clone(),
        ));

        Self {
            config,
            db,
            auth_service,
            user_service,
            session_service,
            community_service,
            post_service,
            comment_service,
            vote_service,
        }
    }
}
