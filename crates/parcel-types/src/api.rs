use serde::{Deserialize, Serialize};

use crate::models::{Order, Role, TrackingEvent, User};

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    #[serde(rename = "initData")]
    pub init_data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: AuthUser,
}

// -- User --

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub privacy_accepted: bool,
    pub notifications_enabled: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.user_id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            privacy_accepted: user.privacy_accepted,
            notifications_enabled: user.notifications_enabled,
        }
    }
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub privacy_accepted: Option<bool>,
    pub notifications_enabled: Option<bool>,
}

// -- Orders --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub description: String,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub from_contact: Option<String>,
    pub to_contact: Option<String>,
    pub weight: Option<f64>,
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    /// `available` (unassigned) or `mine`; only meaningful for managers.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub success: bool,
    pub order: Order,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub tracking: Vec<TrackingEvent>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderDetailResponse {
    pub order: OrderDetail,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignRequest {
    /// Admins pick the manager; managers always assign to themselves.
    pub manager_id: Option<i64>,
}

// -- Offers --

#[derive(Debug, Deserialize)]
pub struct OfferRequest {
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub delivery_days: i64,
    pub comment: Option<String>,
}

fn default_currency() -> String {
    "RUB".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferDecision {
    #[default]
    Accept,
    Reject,
}

/// Body of `accept-offer`; an empty body accepts.
#[derive(Debug, Default, Deserialize)]
pub struct OfferDecisionRequest {
    #[serde(default)]
    pub decision: OfferDecision,
}

// -- Chat --

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Deserialize)]
pub struct SendChatRequest {
    #[serde(default)]
    pub message: String,
}

// -- Tickets --

#[derive(Debug, Deserialize)]
pub struct TicketsQuery {
    pub status: Option<String>,
}

// -- Payments --

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub order_id: i64,
    pub amount: f64,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

fn default_payment_method() -> String {
    "card".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePaymentResponse {
    pub success: bool,
    pub payment_id: i64,
    pub transaction_id: String,
}

// -- Admin maintenance --

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub user_id: i64,
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetRoleResponse {
    pub success: bool,
    pub user_id: i64,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DemoSummary {
    pub admin_id: i64,
    pub manager_id: i64,
    pub client_id: i64,
    pub order_id: i64,
}
