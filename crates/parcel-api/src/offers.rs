use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
};

use parcel_core::OfferInput;
use parcel_types::User;
use parcel_types::api::{OfferDecisionRequest, OfferRequest, OrderResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::{ApiJson, blocking, optional_json};

const CLAIMED: &str = "Order is already handled by another manager";

/// POST /api/orders/{id}/offer: a manager prices the order and claims it.
pub async fn set_offer(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(order_id): Path<i64>,
    ApiJson(req): ApiJson<OfferRequest>,
) -> ApiResult<Json<OrderResponse>> {
    if !user.is_manager() {
        return Err(ApiError::forbidden("Only managers can send offers"));
    }

    let logistics = state.logistics.clone();
    let order = blocking(move || logistics.get_order(order_id)).await?;
    // The store re-checks this in the UPDATE itself.
    if order.manager_id.is_some_and(|id| id != user.user_id) {
        return Err(ApiError::Conflict(CLAIMED.into()));
    }

    let input = OfferInput {
        price: req.price,
        currency: req.currency,
        delivery_days: req.delivery_days,
        comment: req.comment,
    };
    let logistics = state.logistics.clone();
    let manager_id = user.user_id;
    let order = blocking(move || {
        if !logistics.set_order_offer(order_id, manager_id, &input)? {
            return Ok(None);
        }
        logistics.get_order(order_id).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::Conflict(CLAIMED.into()))?;

    Ok(Json(OrderResponse {
        success: true,
        order,
    }))
}

/// POST /api/orders/{id}/accept-offer: the owning client accepts (default)
/// or rejects the pending offer.
pub async fn respond_to_offer(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(order_id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<OrderResponse>> {
    let req: OfferDecisionRequest = optional_json(&body)?;
    if !user.is_client() {
        return Err(ApiError::forbidden("Only clients can answer offers"));
    }

    let logistics = state.logistics.clone();
    let order = blocking(move || logistics.get_order(order_id)).await?;
    if order.client_id != user.user_id {
        return Err(ApiError::forbidden("Access denied"));
    }

    let logistics = state.logistics.clone();
    let order = blocking(move || logistics.respond_to_offer(order_id, req.decision)).await?;
    Ok(Json(OrderResponse {
        success: true,
        order,
    }))
}
