use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use parcel_core::access::can_update_status;
use parcel_types::User;
use parcel_types::api::{CreatePaymentRequest, CreatePaymentResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::orders::visible_order;
use crate::{ApiJson, blocking};

pub async fn create_payment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiJson(req): ApiJson<CreatePaymentRequest>,
) -> ApiResult<Json<CreatePaymentResponse>> {
    visible_order(&state, &user, req.order_id).await?;

    let logistics = state.logistics.clone();
    let (payment_id, transaction_id) = blocking(move || {
        logistics.create_payment(req.order_id, req.amount, &req.payment_method)
    })
    .await?;

    Ok(Json(CreatePaymentResponse {
        success: true,
        payment_id,
        transaction_id,
    }))
}

/// POST /api/payments/{id}/complete: stands in for a payment gateway
/// callback; admins, or the manager assigned to the paid order.
pub async fn complete_payment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(payment_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    if user.is_client() {
        return Err(ApiError::forbidden("Access denied"));
    }

    let logistics = state.logistics.clone();
    let order = blocking(move || {
        let payment = logistics.get_payment(payment_id)?;
        logistics.get_order(payment.order_id)
    })
    .await?;
    if !can_update_status(&user, &order) {
        return Err(ApiError::forbidden("Access denied"));
    }

    let logistics = state.logistics.clone();
    let payment = blocking(move || logistics.complete_payment(payment_id)).await?;
    Ok(Json(json!({ "success": true, "payment": payment })))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(order_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    visible_order(&state, &user, order_id).await?;

    let logistics = state.logistics.clone();
    let payments = blocking(move || logistics.payments(order_id)).await?;
    Ok(Json(json!({ "payments": payments })))
}
