pub mod api;
pub mod auth;
pub mod comments;
pub mod communities;
pub mod extract;
pub mod posts;
pub mod users;
pub mod vote_routes;

use axum::{middleware, Router};

use crate::auth::middleware::auth_middleware;
use crate::{AppError, AppState};

/// Full application router. Bearer tokens are checked once for every API
/// route; write routes additionally require one.
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api::routes())
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
