//! Telegram HTML texts for notifications.

use chrono::Utc;
use parcel_types::{Order, Ticket};

use crate::tracking::status_description;

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn opt(value: Option<&str>) -> String {
    escape_html(value.unwrap_or("n/a"))
}

fn money(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

fn now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Log-group entry for a new order.
pub fn order_created_log(order: &Order) -> String {
    format!(
        "📦 <b>New order</b>\n⏰ {}\n\n\
         🆔 <b>ID:</b> {}\n\
         🔢 <b>Tracking:</b> <code>{}</code>\n\
         👤 <b>Client:</b> {}\n\
         📍 <b>From:</b> {}\n\
         📍 <b>To:</b> {}\n\
         💰 <b>Price:</b> {}\n\
         📊 <b>Status:</b> {}",
        now(),
        order.id,
        order.tracking_number,
        order.client_id,
        opt(order.from_address.as_deref()),
        opt(order.to_address.as_deref()),
        money(order.price),
        order.status,
    )
}

/// Log-group entry for a ticket opened on an order.
pub fn ticket_created_log(ticket: &Ticket, order: &Order) -> String {
    let description: String = order
        .description
        .as_deref()
        .unwrap_or("")
        .chars()
        .take(100)
        .collect();
    format!(
        "🎫 <b>New ticket</b>\n⏰ {}\n\n\
         🆔 <b>ID:</b> {}\n\
         📦 <b>Order:</b> {}\n\
         👤 <b>Client:</b> {}\n\
         👨‍💼 <b>Manager:</b> {}\n\
         📝 <b>Description:</b> {}\n\
         📊 <b>Status:</b> {}",
        now(),
        ticket.id,
        ticket.order_id,
        order.client_id,
        ticket.manager_id,
        escape_html(&description),
        ticket.status,
    )
}

pub fn order_created_client(order: &Order) -> String {
    format!(
        "✅ <b>Order #{} created</b>\n\nTracking number: <code>{}</code>\n{}",
        order.id,
        order.tracking_number,
        status_description(order.status.as_str()),
    )
}

pub fn status_changed_client(order: &Order) -> String {
    format!(
        "📦 <b>Order #{}</b> (<code>{}</code>)\n\nNew status: <b>{}</b>",
        order.id,
        order.tracking_number,
        status_description(order.status.as_str()),
    )
}

pub fn offer_received_client(order: &Order) -> String {
    let mut text = format!(
        "💬 <b>Offer for order #{}</b>\n\n💰 {} {}\n🚚 {} day(s)",
        order.id,
        money(order.offer_price),
        escape_html(order.offer_currency.as_deref().unwrap_or("")),
        order.offer_delivery_days.unwrap_or_default(),
    );
    if let Some(comment) = order.offer_comment.as_deref().filter(|c| !c.is_empty()) {
        text.push_str(&format!("\n📝 {}", escape_html(comment)));
    }
    text
}

pub fn contact_requested_manager(order: &Order) -> String {
    format!(
        "📞 <b>Client asks for contact</b>\n\nOrder #{} (<code>{}</code>), client {}",
        order.id, order.tracking_number, order.client_id,
    )
}
