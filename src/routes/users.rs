use axum::{
    extract::State,
    response::Json,
    routing::get,
    Extension, Router,
};
use uuid::Uuid;

use crate::auth::Claims;
use crate::models::post::PostResponse;
use crate::models::user::UserProfile;
use crate::pagination::{CursorPage, CursorParams};
use crate::routes::extract::{ApiPath, ApiQuery};
use crate::{AppState, Result};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:user_id", get(get_user))
        .route("/users/:user_id/posts", get(get_user_posts))
}

/// Public profile with karma
pub async fn get_user(
    State(app_state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<UserProfile>> {
    Ok(Json(app_state.user_service.get_profile(user_id).await?))
}

pub async fn get_user_posts(
    State(app_state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<CursorParams>,
    claims: Option<Extension<Claims>>,
) -> Result<Json<CursorPage<PostResponse>>> {
    let viewer = claims.map(|Extension(claims)| claims.user_id);
    let page = app_state.post_service.list_user_posts(user_id, params, viewer).await?;
    Ok(Json(page))
}
