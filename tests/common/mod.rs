// Shared fixtures for the integration tests: an in-memory app and helpers
// that register users and build communities and posts through the services.
#![allow(dead_code)]

use community_forum::auth::Claims;
use community_forum::db::DatabaseClient;
use community_forum::models::community::CreateCommunityRequest;
use community_forum::models::post::{CreatePostRequest, PostResponse};
use community_forum::models::user::CreateUserRequest;
use community_forum::{AppConfig, AppState};

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: "integration-test-secret".to_string(),
        admin_usernames: vec!["root_admin".to_string()],
        ..AppConfig::default()
    }
}

pub fn test_state() -> AppState {
    AppState::with_database(test_config(), DatabaseClient::in_memory())
}

/// A registered user with a live session
pub struct TestUser {
    pub claims: Claims,
    pub access_token: String,
    pub refresh_token: String,
}

pub async fn register(state: &AppState, username: &str) -> TestUser {
    let user = state
        .user_service
        .create_user(CreateUserRequest {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "password123".to_string(),
        })
        .await
        .expect("register user");
    let tokens = state.session_service.start_session(&user).await.expect("start session");
    let claims = state.auth_service.verify_token(&tokens.access_token).expect("valid token");

    TestUser {
        claims,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }
}

pub async fn create_community(state: &AppState, owner: &TestUser, name: &str) {
    state
        .community_service
        .create_community(
            owner.claims.user_id,
            CreateCommunityRequest { name: name.to_string(), description: String::new() },
        )
        .await
        .expect("create community");
}

pub async fn create_post(state: &AppState, author: &TestUser, community: &str, title: &str) -> PostResponse {
    state
        .post_service
        .create_post(
            community,
            &author.claims,
            CreatePostRequest { title: title.to_string(), body: "body text".to_string() },
        )
        .await
        .expect("create post")
}
