//! Message texts. All output is Telegram HTML, so user-supplied fields go
//! through `escape_html`.

use std::fmt::Write;

use parcel_core::format::escape_html;
use parcel_core::tracking::status_description;
use parcel_types::{Order, OrderStatus, Role, Stats, User};

const ORDER_LIST_LIMIT: usize = 10;
const USER_LIST_LIMIT: usize = 20;
const DESCRIPTION_PREVIEW: usize = 50;

pub const PRIVACY_POLICY: &str = "\
🔒 <b>Privacy policy</b>

We store your Telegram id, name and username, the orders you create and the \
messages you exchange about them. The data is used only to process your \
orders and is never passed to third parties.

Press <b>Accept</b> to continue.";

pub const RULES: &str = "\
📋 <b>Terms of use</b>

<b>1. Orders</b>
• Orders are created in the app
• Give exact pickup and delivery addresses
• Check the details before confirming

<b>2. Payment</b>
• Payment follows the accepted offer
• Refunds follow the refund policy

<b>3. Delivery</b>
• Delivery time is part of the manager's offer
• Track your parcel under \"My orders\"

<b>4. Support</b>
Use the order chat to reach your manager.";

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::Client => "👤 Client",
        Role::Manager => "👨‍💼 Manager",
        Role::Admin => "👑 Administrator",
    }
}

fn name(user: &User) -> String {
    escape_html(&user.display_name())
}

fn or_unset(value: Option<&str>) -> String {
    escape_html(value.filter(|v| !v.is_empty()).unwrap_or("not set"))
}

fn status_emoji(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "⏳",
        OrderStatus::Accepted => "📝",
        OrderStatus::InTransit => "🚚",
        OrderStatus::Delivered => "📬",
        OrderStatus::Completed => "✅",
        OrderStatus::Cancelled => "❌",
    }
}

pub fn welcome(user: &User) -> String {
    let features = match user.role {
        Role::Client => "• Create orders\n• Track deliveries\n• Review your order history",
        Role::Manager => "• Handle orders\n• Send price offers\n• Track deliveries",
        Role::Admin => "• Manage users\n• Review all orders\n• System statistics",
    };
    format!(
        "👋 Hello, {}!\n\nYou are signed in as <b>{}</b>.\n\n{}",
        name(user),
        role_label(user.role),
        features
    )
}

pub fn privacy(user: &User) -> String {
    format!("👋 Hello, {}!\n\n{}", name(user), PRIVACY_POLICY)
}

pub fn profile(user: &User, order_count: usize) -> String {
    let mut text = format!(
        "📊 <b>Your profile</b>\n\n\
         🆔 ID: {}\n\
         👤 First name: {}\n\
         📝 Last name: {}\n\
         🔖 Username: {}\n\
         Role: {}",
        user.user_id,
        or_unset(user.first_name.as_deref()),
        or_unset(user.last_name.as_deref()),
        or_unset(user.username.as_deref()),
        role_label(user.role),
    );
    if !user.is_admin() {
        let _ = write!(text, "\n📦 Orders: {}", order_count);
    }
    text
}

pub fn settings(user: &User) -> String {
    let state = if user.notifications_enabled { "on" } else { "off" };
    format!("⚙️ <b>Settings</b>\n\n🔔 Notifications: <b>{}</b>", state)
}

/// Up to ten orders under `title`, or `empty` when there are none.
pub fn order_list(title: &str, empty: &str, orders: &[Order]) -> String {
    if orders.is_empty() {
        return empty.to_string();
    }

    let mut text = format!("<b>{} ({})</b>\n\n", title, orders.len());
    for order in orders.iter().take(ORDER_LIST_LIMIT) {
        let _ = writeln!(
            text,
            "{} <b>Order #{}</b> <code>{}</code>\n   Status: {}",
            status_emoji(order.status),
            order.id,
            order.tracking_number,
            status_description(order.status.as_str()),
        );
        if let Some(description) = order.description.as_deref().filter(|d| !d.is_empty()) {
            let mut preview: String = description.chars().take(DESCRIPTION_PREVIEW).collect();
            if description.chars().count() > DESCRIPTION_PREVIEW {
                preview.push_str("...");
            }
            let _ = writeln!(text, "   {}", escape_html(&preview));
        }
        if let Some(price) = order.price {
            let _ = writeln!(text, "   Price: {:.2}", price);
        }
        text.push('\n');
    }
    text
}

pub fn user_list(title: &str, users: &[User]) -> String {
    if users.is_empty() {
        return format!("{}: nobody yet", title);
    }

    let mut text = format!("<b>{} ({})</b>\n\n", title, users.len());
    for user in users.iter().take(USER_LIST_LIMIT) {
        let username = user
            .username
            .as_deref()
            .map_or_else(|| "no username".to_string(), |u| format!("@{}", escape_html(u)));
        let _ = writeln!(text, "• {} ({})\n  ID: {}\n", name(user), username, user.user_id);
    }
    text
}

pub fn stats(stats: &Stats) -> String {
    match stats {
        Stats::Client {
            total_orders,
            pending,
            in_transit,
            delivered,
        } => format!(
            "📊 <b>Your statistics</b>\n\n📦 Orders: {}\n⏳ Pending: {}\n🚚 In transit: {}\n📬 Delivered: {}",
            total_orders, pending, in_transit, delivered
        ),
        Stats::Manager {
            total_tickets,
            new_tickets,
            total_orders,
            in_progress,
        } => format!(
            "📊 <b>Your statistics</b>\n\n🎫 Tickets: {}\n🆕 New tickets: {}\n📦 Orders: {}\n🚚 In transit: {}",
            total_tickets, new_tickets, total_orders, in_progress
        ),
        Stats::Admin {
            total_orders,
            total_users,
            clients,
            managers,
            admins,
            pending_orders,
        } => format!(
            "📊 <b>System statistics</b>\n\n\
             👥 Users: {}\n   • Clients: {}\n   • Managers: {}\n   • Admins: {}\n\n\
             📦 Orders: {}\n⏳ Pending: {}",
            total_users, clients, managers, admins, total_orders, pending_orders
        ),
    }
}

pub fn system_settings(webapp_url: Option<&str>, log_group_id: Option<i64>) -> String {
    format!(
        "⚙️ <b>System settings</b>\n\n🌐 WebApp: {}\n📝 Log group: {}",
        or_unset(webapp_url),
        log_group_id.map_or_else(|| "not set".to_string(), |id| id.to_string()),
    )
}

pub fn order_created(order: &Order) -> String {
    format!(
        "✅ <b>Order #{} created</b>\n\n\
         📦 {}\n\
         🔢 Tracking number: <code>{}</code>\n\
         📍 From: {}\n\
         📍 To: {}\n\n\
         Status: ⏳ {}",
        order.id,
        or_unset(order.description.as_deref()),
        order.tracking_number,
        or_unset(order.from_address.as_deref()),
        or_unset(order.to_address.as_deref()),
        status_description(order.status.as_str()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parcel_types::{OfferStatus, PaymentStatus};

    fn order(id: i64, description: &str) -> Order {
        Order {
            id,
            client_id: 1,
            manager_id: None,
            status: OrderStatus::Pending,
            description: Some(description.to_string()),
            from_address: None,
            to_address: None,
            from_contact: None,
            to_contact: None,
            weight: None,
            price: Some(100.0),
            payment_status: PaymentStatus::Unpaid,
            payment_method: None,
            tracking_number: format!("TRACK{:05}", id),
            offer_price: None,
            offer_currency: None,
            offer_delivery_days: None,
            offer_comment: None,
            offer_status: OfferStatus::Draft,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn order_list_truncates_and_escapes() {
        let orders: Vec<_> = (1..=12).map(|id| order(id, "<fragile> glass")).collect();
        let text = order_list("Your orders", "none", &orders);

        assert!(text.contains("(12)"));
        assert!(text.contains("Order #10"));
        assert!(!text.contains("Order #11"));
        assert!(text.contains("&lt;fragile&gt; glass"));
    }

    #[test]
    fn long_descriptions_are_shortened() {
        let long = "x".repeat(80);
        let text = order_list("Orders", "none", &[order(1, &long)]);
        assert!(text.contains(&format!("{}...", "x".repeat(50))));
        assert_eq!(order_list("Orders", "none", &[]), "none");
    }
}
