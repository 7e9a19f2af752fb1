use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use parcel_types::api::{OrderResponse, TicketsQuery};
use parcel_types::{TicketStatus, User};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult};

pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<TicketsQuery>,
) -> ApiResult<impl IntoResponse> {
    if !user.is_manager() {
        return Err(ApiError::forbidden("Only managers can view tickets"));
    }
    let status = query
        .status
        .map(|s| {
            s.parse::<TicketStatus>()
                .map_err(|_| ApiError::bad_request(format!("Unknown ticket status: {}", s)))
        })
        .transpose()?;

    let logistics = state.logistics.clone();
    let tickets = blocking(move || logistics.tickets(user.user_id, status)).await?;
    Ok(Json(json!({ "tickets": tickets })))
}

pub async fn accept_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(ticket_id): Path<i64>,
) -> ApiResult<Json<OrderResponse>> {
    if !user.is_manager() {
        return Err(ApiError::forbidden("Only managers can accept tickets"));
    }

    let logistics = state.logistics.clone();
    let ticket = blocking(move || logistics.get_ticket(ticket_id)).await?;
    if ticket.manager_id != user.user_id {
        return Err(ApiError::forbidden("Ticket belongs to another manager"));
    }

    let logistics = state.logistics.clone();
    let order = blocking(move || logistics.accept_ticket(ticket_id)).await?;
    Ok(Json(OrderResponse {
        success: true,
        order,
    }))
}

/// POST /api/orders/{id}/contact-logist: the client asks a manager to get
/// in touch about the order.
pub async fn contact_logist(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(order_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let logistics = state.logistics.clone();
    let order = blocking(move || logistics.get_order(order_id)).await?;
    if order.client_id != user.user_id {
        return Err(ApiError::forbidden("Access denied"));
    }

    let logistics = state.logistics.clone();
    let ticket = blocking(move || logistics.request_contact(order_id)).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "ticket": ticket }))))
}
