use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use parcel_types::api::{ProfileUpdate, UserResponse};
use parcel_types::{NewAddress, User};

use crate::auth::AppState;
use crate::error::ApiResult;
use crate::{ApiJson, blocking};

pub async fn get_user(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// PUT /api/user: names and preferences only; the role is not editable.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<UserResponse>> {
    let logistics = state.logistics.clone();
    let updated = blocking(move || logistics.update_profile(user.user_id, &update)).await?;
    Ok(Json(UserResponse::from(updated)))
}

pub async fn list_addresses(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResult<impl IntoResponse> {
    let logistics = state.logistics.clone();
    let addresses = blocking(move || logistics.addresses(user.user_id)).await?;
    Ok(Json(json!({ "addresses": addresses })))
}

pub async fn add_address(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiJson(address): ApiJson<NewAddress>,
) -> ApiResult<impl IntoResponse> {
    let logistics = state.logistics.clone();
    let addresses = blocking(move || logistics.add_address(user.user_id, &address)).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "addresses": addresses }))))
}

pub async fn get_stats(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResult<impl IntoResponse> {
    let logistics = state.logistics.clone();
    let stats = blocking(move || logistics.stats_for(&user)).await?;
    Ok(Json(json!({ "stats": stats })))
}
