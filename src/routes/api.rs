use axum::{extract::State, middleware, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::auth::middleware::require_auth;
use crate::routes::{auth, comments, communities, posts, users, vote_routes};
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    let public_routes = Router::new()
        .route("/health", get(api_health))
        .merge(auth::public_routes())
        .merge(communities::public_routes())
        .merge(posts::public_routes())
        .merge(comments::public_routes())
        .merge(users::public_routes());

    let protected_routes = Router::new()
        .merge(auth::protected_routes())
        .merge(communities::protected_routes())
        .merge(posts::protected_routes())
        .merge(comments::protected_routes())
        .merge(vote_routes::protected_routes())
        .route_layer(middleware::from_fn(require_auth));

    public_routes.merge(protected_routes)
}

async fn api_health(State(state): State<AppState>) -> Result<Json<Value>> {
    state.db.health_check().await?;
    Ok(Json(json!({
        "status": "healthy",
        "service": "community_forum",
        "version": env!("CARGO_PKG_VERSION"),
        "database": state.db.backend_name(),
    })))
}
