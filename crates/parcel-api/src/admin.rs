//! Maintenance endpoints behind `require_admin_or_token`.

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use tracing::info;

use parcel_core::demo;
use parcel_types::api::{DemoSummary, SetRoleRequest, SetRoleResponse};
use parcel_types::Role;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::{ApiJson, blocking};

pub async fn seed(State(state): State<AppState>) -> ApiResult<Json<DemoSummary>> {
    let logistics = state.logistics.clone();
    let summary = blocking(move || {
        demo::clear_demo_data(&logistics)?;
        demo::seed_demo_data(&logistics)
    })
    .await?;
    Ok(Json(summary))
}

pub async fn clear(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let logistics = state.logistics.clone();
    blocking(move || demo::clear_demo_data(&logistics)).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn set_role(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SetRoleRequest>,
) -> ApiResult<Json<SetRoleResponse>> {
    let role: Role = req
        .role
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Unknown role: {}", req.role)))?;

    let logistics = state.logistics.clone();
    let user = blocking(move || logistics.set_role(req.user_id, role)).await?;
    info!("Role of {} set to {} via maintenance API", user.user_id, user.role);

    Ok(Json(SetRoleResponse {
        success: true,
        user_id: user.user_id,
        role: user.role,
    }))
}
