use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A string that does not name any variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Status columns are stored as lowercase text; this keeps the SQL text,
/// the JSON text and `Display` identical.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

text_enum!(
    /// Who a user is to the system. Re-read from the store on every request.
    Role, "role" {
        Client => "client",
        Manager => "manager",
        Admin => "admin",
    }
);

text_enum!(
    OrderStatus, "order status" {
        Pending => "pending",
        Accepted => "accepted",
        InTransit => "in_transit",
        Delivered => "delivered",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

text_enum!(
    PaymentStatus, "payment status" {
        Unpaid => "unpaid",
        Pending => "pending",
        Paid => "paid",
    }
);

text_enum!(
    OfferStatus, "offer status" {
        Draft => "draft",
        Sent => "sent",
        Accepted => "accepted",
        Rejected => "rejected",
    }
);

text_enum!(
    TicketStatus, "ticket status" {
        New => "new",
        Accepted => "accepted",
    }
);

text_enum!(
    PaymentRecordStatus, "payment record status" {
        Pending => "pending",
        Completed => "completed",
    }
);

impl Default for Role {
    fn default() -> Self {
        Role::Client
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub privacy_accepted: bool,
    pub notifications_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    pub fn is_client(&self) -> bool {
        self.role == Role::Client
    }

    /// First name, falling back to `@username`, falling back to the id.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.username) {
            (Some(first), _) if !first.is_empty() => first.clone(),
            (_, Some(username)) if !username.is_empty() => format!("@{}", username),
            _ => self.user_id.to_string(),
        }
    }
}

/// Identity fields as delivered by Telegram on first contact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub client_id: i64,
    pub manager_id: Option<i64>,
    pub status: OrderStatus,
    pub description: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub from_contact: Option<String>,
    pub to_contact: Option<String>,
    pub weight: Option<f64>,
    pub price: Option<f64>,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub tracking_number: String,
    pub offer_price: Option<f64>,
    pub offer_currency: Option<String>,
    pub offer_delivery_days: Option<i64>,
    pub offer_comment: Option<String>,
    pub offer_status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a client supplies when creating an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub description: String,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub from_contact: Option<String>,
    pub to_contact: Option<String>,
    pub weight: Option<f64>,
    pub price: Option<f64>,
}

/// A manager's counter-proposal for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub price: f64,
    pub currency: String,
    pub delivery_days: i64,
    pub comment: Option<String>,
    pub status: OfferStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub order_id: i64,
    pub manager_id: i64,
    pub status: TicketStatus,
    pub assigned_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

/// Ticket joined with the order it points at, as listed to managers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketWithOrder {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: i64,
    pub order_id: i64,
    /// Free text: historical rows may carry statuses the enum no longer knows.
    pub status: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub amount: f64,
    pub payment_method: String,
    pub status: PaymentRecordStatus,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub order_id: i64,
    pub sender_id: i64,
    pub sender_role: Role,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub address_type: Option<String>,
    pub address: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAddress {
    pub address_type: Option<String>,
    pub address: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Per-role dashboard counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Stats {
    Client {
        total_orders: i64,
        pending: i64,
        in_transit: i64,
        delivered: i64,
    },
    Manager {
        total_tickets: i64,
        new_tickets: i64,
        total_orders: i64,
        in_progress: i64,
    },
    Admin {
        total_orders: i64,
        total_users: i64,
        clients: i64,
        managers: i64,
        admins: i64,
        pending_orders: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_matches_serde() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "superuser".parse::<Role>().unwrap_err();
        assert_eq!(err.kind, "role");
        assert_eq!(err.value, "superuser");
    }
}
