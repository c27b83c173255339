use axum::{
    extract::State,
    response::Json,
    routing::put,
    Extension, Router,
};
use uuid::Uuid;

use crate::auth::Claims;
use crate::models::{CastVoteRequest, TargetKind, VoteTally};
use crate::routes::extract::{ApiJson, ApiPath};
use crate::{AppState, Result};

/// Vote routes. PUT sets the caller's vote (1, -1, or 0 to clear), DELETE clears it.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/posts/:post_id/vote", put(vote_on_post).delete(clear_post_vote))
        .route("/comments/:comment_id/vote", put(vote_on_comment).delete(clear_comment_vote))
}

async fn vote_on_post(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
    ApiJson(request): ApiJson<CastVoteRequest>,
) -> Result<Json<VoteTally>> {
    let tally = state
        .vote_service
        .cast_vote(claims.user_id, TargetKind::Post, post_id, request.value)
        .await?;
    Ok(Json(tally))
}

async fn clear_post_vote(
    State(state): State<AppState>,
    ApiPath(post_id): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<VoteTally>> {
    Ok(Json(state.vote_service.clear_vote(claims.user_id, TargetKind::Post, post_id).await?))
}

async fn vote_on_comment(
    State(state): State<AppState>,
    ApiPath(comment_id): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
    ApiJson(request): ApiJson<CastVoteRequest>,
) -> Result<Json<VoteTally>> {
    let tally = state
        .vote_service
        .cast_vote(claims.user_id, TargetKind::Comment, comment_id, request.value)
        .await?;
    Ok(Json(tally))
}

async fn clear_comment_vote(
    State(state): State<AppState>,
    ApiPath(comment_id): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<VoteTally>> {
    Ok(Json(state.vote_service.clear_vote(claims.user_id, TargetKind::Comment, comment_id).await?))
}
