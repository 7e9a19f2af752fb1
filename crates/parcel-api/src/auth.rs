use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use serde_json::{Value, json};
use tracing::{info, warn};

use parcel_core::{Config, Logistics};
use parcel_telegram::verify_init_data;
use parcel_types::UserProfile;
use parcel_types::api::{AuthRequest, AuthResponse, AuthUser};

use crate::error::{ApiError, ApiResult};
use crate::{ApiJson, blocking};

pub const SESSION_COOKIE: &str = "parcel_session";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub logistics: Logistics,
    /// Signs WebApp `initData`. Without one every login is refused.
    pub bot_token: Option<String>,
    pub test_api_token: Option<String>,
    pub cookie_secure: bool,
}

impl AppStateInner {
    pub fn new(logistics: Logistics, config: &Config) -> Self {
        Self {
            logistics,
            bot_token: config.has_bot_token().then(|| config.bot_token.clone()),
            test_api_token: config.test_api_token.clone(),
            cookie_secure: config.session_cookie_secure,
        }
    }
}

/// Session token from `Authorization: Bearer` or the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_string());
    }
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

/// POST /auth: exchanges signed WebApp `initData` for a session.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<AuthRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let Some(bot_token) = state.bot_token.as_deref() else {
        warn!("Rejected login: no bot token is configured");
        return Err(ApiError::unauthorized("Invalid Telegram data"));
    };
    let web_user = verify_init_data(&req.init_data, bot_token).map_err(|e| {
        warn!("Rejected initData: {}", e);
        ApiError::unauthorized("Invalid Telegram data")
    })?;

    let profile = UserProfile {
        user_id: web_user.id,
        username: web_user.username,
        first_name: web_user.first_name,
        last_name: web_user.last_name,
    };
    let logistics = state.logistics.clone();
    let (user, token) = blocking(move || {
        let user = logistics.register_user(&profile)?;
        let token = logistics.open_session(user.user_id)?;
        Ok((user, token))
    })
    .await?;
    info!("User {} logged in as {}", user.user_id, user.role);

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.cookie_secure)
        .build();

    Ok((
        jar.add(cookie),
        Json(AuthResponse {
            success: true,
            token,
            user: AuthUser {
                id: user.user_id,
                name: user.first_name,
                role: user.role,
            },
        }),
    ))
}

/// POST /auth/logout: drops the current session, if any.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<Value>)> {
    if let Some(token) = session_token(&headers) {
        let logistics = state.logistics.clone();
        blocking(move || logistics.close_session(&token)).await?;
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Json(json!({ "success": true }))))
}
