use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use tracing::warn;

use crate::auth::{AppState, session_token};
use crate::blocking;
use crate::error::ApiError;

/// Resolves the session to its user, re-read from the store on every
/// request, and inserts it as an `Extension<User>`.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(req.headers()).ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    let logistics = state.logistics.clone();
    let user = blocking(move || logistics.session_user(&token))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session expired"))?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Gate for the maintenance endpoints: the static test token as a bearer,
/// or an admin session. Anything else is 403.
pub async fn require_admin_or_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let (Some(expected), Some(Authorization(bearer))) = (
        state.test_api_token.as_deref(),
        req.headers().typed_get::<Authorization<Bearer>>(),
    ) {
        if bearer.token() == expected {
            return Ok(next.run(req).await);
        }
    }

    if let Some(token) = session_token(req.headers()) {
        let logistics = state.logistics.clone();
        let user = blocking(move || logistics.session_user(&token)).await?;
        if user.is_some_and(|u| u.is_admin()) {
            return Ok(next.run(req).await);
        }
    }

    warn!("Rejected maintenance request to {}", req.uri().path());
    Err(ApiError::forbidden("Access denied"))
}
