/*!
 * Comment Routes
 *
 * Flat comment listing per post (oldest first, cursor paginated), reply
 * creation and soft deletion.
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Extension, Router,
};
use uuid::Uuid;

use crate::auth::Claims;
use crate::models::comment::{CommentResponse, CreateCommentRequest};
use crate::pagination::{CursorPage, CursorParams};
use crate::routes::extract::{ApiJson, ApiPath, ApiQuery};
use crate::{AppState, Result};

/// Public comment routes (no authentication required)
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/posts/:post_id/comments", get(get_post_comments))
}

/// Protected comment routes (authentication required)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        // Create a new comment on a post
        .route("/posts/:post_id/comments", post(create_comment))
        .route("/comments/:comment_id", delete(delete_comment))
}

/// Get comments for a specific post
///
/// GET /api/v1/posts/:post_id/comments?limit=&cursor=
pub async fn get_post_comments(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<CursorParams>,
    claims: Option<Extension<Claims>>,
) -> Result<Json<CursorPage<CommentResponse>>> {
    tracing::debug!("💬 API: Fetching comments for post {}", post_id);
    let viewer = claims.map(|Extension(claims)| claims.user_id);
    Ok(Json(state.comment_service.list_comments(post_id, params, viewer).await?))
}

/// Create a new comment on a post
///
/// POST /api/v1/posts/:post_id/comments
/// Body: {"body": "...", "parent_id": null}
pub async fn create_comment(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
    ApiJson(request): ApiJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    let comment = state.comment_service.create_comment(post_id, &claims, request).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Delete a comment (author or site admin)
///
/// DELETE /api/v1/comments/:comment_id
pub async fn delete_comment(
    State(state): State<AppState>,
    ApiPath(comment_id): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode> {
    state.comment_service.delete_comment(comment_id, &claims).await?;
    Ok(StatusCode::NO_CONTENT)
}
