use axum::{
    Json, Router,
    middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};

use crate::auth::{self, AppState};
use crate::middleware::{require_admin_or_token, require_session};
use crate::{admin, chat, offers, orders, payments, tickets, users};

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/user", get(users::get_user).put(users::update_user))
        .route("/api/user/addresses", get(users::list_addresses).post(users::add_address))
        .route("/api/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/assign", post(orders::assign_order))
        .route("/api/orders/{id}/status", put(orders::update_status))
        .route("/api/orders/{id}/tracking", get(orders::get_tracking))
        .route("/api/orders/{id}/offer", post(offers::set_offer))
        .route("/api/orders/{id}/accept-offer", post(offers::respond_to_offer))
        .route("/api/orders/{id}/contact-logist", post(tickets::contact_logist))
        .route("/api/orders/{id}/payments", get(payments::list_payments))
        .route("/api/chat/{id}", get(chat::list_messages).post(chat::send_message))
        .route("/api/chat/{id}/send", post(chat::send_message))
        .route("/api/tickets", get(tickets::list_tickets))
        .route("/api/tickets/{id}/accept", post(tickets::accept_ticket))
        .route("/api/payments", post(payments::create_payment))
        .route("/api/payments/{id}/complete", post(payments::complete_payment))
        .route("/api/stats", get(users::get_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    let maintenance = Router::new()
        .route("/api/admin/test/seed", post(admin::seed))
        .route("/api/admin/test/clear", post(admin::clear))
        .route("/api/admin/test/set-role", post(admin::set_role))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin_or_token));

    Router::new()
        .route("/health", get(health))
        .route("/auth", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .merge(api)
        .merge(maintenance)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
