pub mod memory;
pub mod postgres;
pub mod repository;

use std::sync::Arc;

// Database connection and state management
use crate::config::AppConfig;
use crate::Result;
use memory::InMemoryStore;
use postgres::{PostgresDatabase, PostgresRepository};
use repository::{
    CommentRepository, CommunityRepository, PostRepository, SessionRepository, UserRepository, VoteRepository,
};

#[derive(Clone)]
enum Backend {
    Postgres(PostgresRepository),
    Memory,
}

#[derive(Clone)]
pub struct DatabaseClient {
    backend: Backend,
    pub user_repo: Arc<dyn UserRepository>,
    pub session_repo: Arc<dyn SessionRepository>,
    pub community_repo: Arc<dyn CommunityRepository>,
    pub post_repo: Arc<dyn PostRepository>,
    pub comment_repo: Arc<dyn CommentRepository>,
    pub vote_repo: Arc<dyn VoteRepository>,
}

impl DatabaseClient {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        match &config.database_url {
            Some(url) => {
                tracing::info!("🐘 DATABASE: Using PostgreSQL backend");
                let database = PostgresDatabase::connect(config, url).await?;
                Ok(Self::postgres(database.repository()))
            }
            None => {
                tracing::warn!("⚠️ DATABASE: DATABASE_URL not set, using in-memory store (data is lost on restart)");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn postgres(repo: PostgresRepository) -> Self {
        let shared = Arc::new(repo.clone());
        Self {
            backend: Backend::Postgres(repo),
            user_repo: shared.clone(),
            session_repo: shared.clone(),
            community_repo: shared.clone(),
            post_repo: shared.clone(),
            comment_repo: shared.clone(),
            vote_repo: shared,
        }
    }

    /// All repositories backed by one shared in-memory store
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            backend: Backend::Memory,
            user_repo: store.clone(),
            session_repo: store.clone(),
            community_repo: store.clone(),
            post_repo: store.clone(),
            comment_repo: store.clone(),
            vote_repo: store,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Postgres(_) => "postgres",
            Backend::Memory => "memory",
        }
    }

    pub async fn health_check(&self) -> Result<()> {
        match &self.backend {
            Backend::Postgres(repo) => repo.ping().await,
            Backend::Memory => Ok(()),
        }
    }
}
