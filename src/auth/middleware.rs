// Authentication middleware for protecting routes
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::Claims;
use crate::{AppError, AppState};

/// Pull the token out of `Authorization: Bearer <token>`.
/// Ok(None) when the header is absent; a present but malformed header is an error.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AppError::AuthError("Malformed authorization header".to_string()))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(AppError::AuthError("Authorization header must be 'Bearer <token>'".to_string())),
    }
}

/// Runs on every API route. Attaches `Claims` when a valid bearer token is
/// sent and rejects invalid ones; requests without a token pass through as guests.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = match extract_bearer_token(request.headers())? {
        Some(token) => Some(state.auth_service.verify_token(token)?),
        None => None,
    };

    if let Some(claims) = claims {
        tracing::debug!("🔐 AUTH: Request from user {} ({})", claims.username, claims.user_id);
        request.extensions_mut().insert(claims);
    }

    Ok(next.run(request).await)
}

/// Layered on write routes, after `auth_middleware` has run.
pub async fn require_auth(request: Request, next: Next) -> Result<Response, AppError> {
    if request.extensions().get::<Claims>().is_none() {
        return Err(AppError::AuthError("Authentication required".to_string()));
    }
    Ok(next.run(request).await)
}
