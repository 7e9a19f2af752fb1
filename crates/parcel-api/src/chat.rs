use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use parcel_core::access::can_chat;
use parcel_types::User;
use parcel_types::api::{ChatQuery, SendChatRequest};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::{ApiJson, blocking};

async fn check_participant(state: &AppState, user: &User, order_id: i64) -> ApiResult<()> {
    let logistics = state.logistics.clone();
    let order = blocking(move || logistics.get_order(order_id)).await?;
    if !can_chat(user, &order) {
        return Err(ApiError::forbidden("Access denied"));
    }
    Ok(())
}

/// GET /api/chat/{order_id}: oldest first, `?limit=&offset=`.
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(order_id): Path<i64>,
    Query(query): Query<ChatQuery>,
) -> ApiResult<impl IntoResponse> {
    check_participant(&state, &user, order_id).await?;

    let logistics = state.logistics.clone();
    let messages =
        blocking(move || logistics.chat_messages(order_id, query.limit, query.offset)).await?;
    Ok(Json(json!({ "messages": messages })))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(order_id): Path<i64>,
    ApiJson(req): ApiJson<SendChatRequest>,
) -> ApiResult<impl IntoResponse> {
    check_participant(&state, &user, order_id).await?;

    let logistics = state.logistics.clone();
    let message = blocking(move || logistics.send_message(order_id, &user, &req.message)).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "message": message }))))
}
