use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use parcel_core::OrderFilter;
use parcel_core::access::{can_update_status, can_view_order};
use parcel_types::api::{
    AssignRequest, CreateOrderRequest, OrderDetail, OrderDetailResponse, OrderListResponse,
    OrderResponse, OrdersQuery, StatusUpdateRequest,
};
use parcel_types::{NewOrder, Order, OrderStatus, Role, User};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::{ApiJson, blocking, optional_json};

/// Loads the order and checks the caller may see it.
pub(crate) async fn visible_order(state: &AppState, user: &User, order_id: i64) -> ApiResult<Order> {
    let logistics = state.logistics.clone();
    let order = blocking(move || logistics.get_order(order_id)).await?;
    if !can_view_order(user, &order) {
        return Err(ApiError::forbidden("Access denied"));
    }
    Ok(order)
}

/// GET /api/orders: managers may pass `?type=available|mine`.
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<OrdersQuery>,
) -> ApiResult<Json<OrderListResponse>> {
    let filter = match (user.role, query.kind.as_deref()) {
        (Role::Manager, Some("available")) => OrderFilter::Unassigned,
        (Role::Manager, Some("mine")) => OrderFilter::ManagerAssigned(user.user_id),
        (Role::Manager, Some(other)) => {
            return Err(ApiError::bad_request(format!("Unknown order list type: {}", other)));
        }
        (Role::Manager, None) => OrderFilter::ManagerVisible(user.user_id),
        (Role::Client, _) => OrderFilter::Client(user.user_id),
        (Role::Admin, _) => OrderFilter::All,
    };

    let logistics = state.logistics.clone();
    let orders = blocking(move || logistics.orders(filter)).await?;
    Ok(Json(OrderListResponse { orders }))
}

pub async fn create_order(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    if !user.is_client() {
        return Err(ApiError::forbidden("Only clients can create orders"));
    }

    let new = NewOrder {
        description: req.description,
        from_address: req.from_address,
        to_address: req.to_address,
        from_contact: req.from_contact,
        to_contact: req.to_contact,
        weight: req.weight,
        price: req.price,
    };
    let logistics = state.logistics.clone();
    let order = blocking(move || {
        let manager_id = logistics.intake_manager()?;
        logistics.create_order(user.user_id, &new, manager_id)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            success: true,
            order,
        }),
    ))
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(order_id): Path<i64>,
) -> ApiResult<Json<OrderDetailResponse>> {
    let order = visible_order(&state, &user, order_id).await?;

    let logistics = state.logistics.clone();
    let tracking = blocking(move || logistics.tracking(order_id)).await?;
    Ok(Json(OrderDetailResponse {
        order: OrderDetail { order, tracking },
    }))
}

pub async fn get_tracking(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(order_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    visible_order(&state, &user, order_id).await?;

    let logistics = state.logistics.clone();
    let tracking = blocking(move || logistics.tracking(order_id)).await?;
    Ok(Json(json!({ "tracking": tracking })))
}

/// POST /api/orders/{id}/assign: managers take the order themselves;
/// admins name the manager in the body.
pub async fn assign_order(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(order_id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<OrderResponse>> {
    let req: AssignRequest = optional_json(&body)?;

    let manager_id = match user.role {
        Role::Manager => {
            if req.manager_id.is_some_and(|id| id != user.user_id) {
                return Err(ApiError::forbidden("Managers can only assign orders to themselves"));
            }
            let logistics = state.logistics.clone();
            let order = blocking(move || logistics.get_order(order_id)).await?;
            if order.manager_id.is_some_and(|id| id != user.user_id) {
                return Err(ApiError::Conflict("Order is already assigned to another manager".into()));
            }
            user.user_id
        }
        Role::Admin => req
            .manager_id
            .ok_or_else(|| ApiError::bad_request("manager_id is required"))?,
        Role::Client => return Err(ApiError::forbidden("Access denied")),
    };

    let logistics = state.logistics.clone();
    let order = blocking(move || logistics.assign_order_to_manager(order_id, manager_id)).await?;
    Ok(Json(OrderResponse {
        success: true,
        order,
    }))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(order_id): Path<i64>,
    ApiJson(req): ApiJson<StatusUpdateRequest>,
) -> ApiResult<Json<OrderResponse>> {
    if user.is_client() {
        return Err(ApiError::forbidden("Access denied"));
    }
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Unknown status: {}", req.status)))?;

    let logistics = state.logistics.clone();
    let order = blocking(move || logistics.get_order(order_id)).await?;
    if !can_update_status(&user, &order) {
        return Err(ApiError::forbidden("Access denied"));
    }

    let manager_id = user.is_manager().then_some(user.user_id);
    let logistics = state.logistics.clone();
    let order = blocking(move || {
        logistics.update_order_status(order_id, status, manager_id)?;
        logistics.get_order(order_id)
    })
    .await?;

    Ok(Json(OrderResponse {
        success: true,
        order,
    }))
}
