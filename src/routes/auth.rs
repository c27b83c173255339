use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use serde_json::{json, Value};

use crate::auth::Claims;
use crate::models::session::{AuthResponse, RefreshRequest};
use crate::models::user::{AccountResponse, CreateUserRequest, LoginRequest};
use crate::routes::extract::ApiJson;
use crate::{AppState, Result};

/// Register, login, refresh and logout need no access token
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}

pub async fn register(
    State(app_state): State<AppState>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let user = app_state.user_service.create_user(request).await?;
    let tokens = app_state.session_service.start_session(&user).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse { user: AccountResponse::from(user), tokens }),
    ))
}

pub async fn login(
    State(app_state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = app_state
        .user_service
        .authenticate_user(&request.login, &request.password)
        .await?;
    let tokens = app_state.session_service.start_session(&user).await?;

    Ok(Json(AuthResponse { user: AccountResponse::from(user), tokens }))
}

/// Rotate a refresh token into a new access/refresh pair
pub async fn refresh(
    State(app_state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Json<AuthResponse>> {
    let (user, tokens) = app_state.session_service.refresh(&request.refresh_token).await?;
    Ok(Json(AuthResponse { user: AccountResponse::from(user), tokens }))
}

pub async fn logout(
    State(app_state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Json<Value>> {
    app_state.session_service.logout(&request.refresh_token).await?;
    Ok(Json(json!({ "message": "Logged out" })))
}

pub async fn me(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AccountResponse>> {
    let user = app_state.user_service.get_user(claims.user_id).await?;
    Ok(Json(AccountResponse::from(user)))
}
