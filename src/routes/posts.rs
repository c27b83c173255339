use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Extension, Router,
};
use uuid::Uuid;

use crate::auth::Claims;
use crate::models::post::PostResponse;
use crate::routes::extract::ApiPath;
use crate::{AppState, Result};

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/posts/:post_id", get(get_post))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/posts/:post_id", axum::routing::delete(delete_post))
}

pub async fn get_post(
    State(app_state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
    claims: Option<Extension<Claims>>,
) -> Result<Json<PostResponse>> {
    let viewer = claims.map(|Extension(claims)| claims.user_id);
    Ok(Json(app_state.post_service.get_post(post_id, viewer).await?))
}

/// Author or site admin only
pub async fn delete_post(
    State(app_state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode> {
    app_state.post_service.delete_post(post_id, &claims).await?;
    Ok(StatusCode::NO_CONTENT)
}
