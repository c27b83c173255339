/*!
 * Community Routes
 *
 * Directory, membership and the per-community post feed. Reads are open to
 * guests; creating, joining, leaving and posting need a bearer token.
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use serde::Deserialize;

use crate::auth::Claims;
use crate::models::community::{CommunityResponse, CreateCommunityRequest, MemberResponse};
use crate::models::post::{CreatePostRequest, PostResponse};
use crate::pagination::{CursorPage, CursorParams, OffsetPage, OffsetParams, PostSort};
use crate::routes::extract::{ApiJson, ApiPath, ApiQuery};
use crate::{AppState, Result};

/// Query parameters for a community's post feed
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// "new" (default) or "top"
    #[serde(default)]
    pub sort: PostSort,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/communities", get(list_communities))
        .route("/communities/:name", get(get_community))
        .route("/communities/:name/members", get(list_members))
        .route("/communities/:name/posts", get(list_posts))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/communities", post(create_community))
        .route("/communities/:name/membership", post(join_community).delete(leave_community))
        .route("/communities/:name/posts", post(create_post))
}

pub async fn list_communities(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<OffsetParams>,
) -> Result<Json<OffsetPage<CommunityResponse>>> {
    Ok(Json(state.community_service.list_communities(params).await?))
}

pub async fn create_community(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(request): ApiJson<CreateCommunityRequest>,
) -> Result<(StatusCode, Json<CommunityResponse>)> {
    let community = state.community_service.create_community(claims.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(community)))
}

/// `is_member` is included when the caller is signed in
pub async fn get_community(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
    claims: Option<Extension<Claims>>,
) -> Result<Json<CommunityResponse>> {
    let viewer = claims.map(|Extension(claims)| claims.user_id);
    Ok(Json(state.community_service.get_community(&name, viewer).await?))
}

pub async fn join_community(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CommunityResponse>> {
    Ok(Json(state.community_service.join(&name, claims.user_id).await?))
}

pub async fn leave_community(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CommunityResponse>> {
    Ok(Json(state.community_service.leave(&name, claims.user_id).await?))
}

pub async fn list_members(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
    ApiQuery(params): ApiQuery<OffsetParams>,
) -> Result<Json<OffsetPage<MemberResponse>>> {
    Ok(Json(state.community_service.list_members(&name, params).await?))
}

pub async fn list_posts(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
    ApiQuery(query): ApiQuery<FeedQuery>,
    claims: Option<Extension<Claims>>,
) -> Result<Json<CursorPage<PostResponse>>> {
    let viewer = claims.map(|Extension(claims)| claims.user_id);
    let params = CursorParams { limit: query.limit, cursor: query.cursor };
    let page = state
        .post_service
        .list_community_posts(&name, query.sort, params, viewer)
        .await?;
    Ok(Json(page))
}

pub async fn create_post(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
    Extension(claims): Extension<Claims>,
    ApiJson(request): ApiJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    let post = state.post_service.create_post(&name, &claims, request).await?;
    Ok((StatusCode::CREATED, Json(post)))
}
