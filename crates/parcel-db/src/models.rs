//! Row mappers. Every query selects one of the column lists below and hands
//! the row to the matching `*_from_row`, so typed records are built once,
//! here, and nowhere else.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use parcel_types::{
    Address, ChatMessage, Order, Payment, Ticket, TrackingEvent, User,
};

pub const USER_COLUMNS: &str = "user_id, username, first_name, last_name, role, \
     privacy_accepted, notifications_enabled, created_at, updated_at";

pub const ORDER_COLUMNS: &str = "id, client_id, manager_id, status, description, \
     from_address, to_address, from_contact, to_contact, weight, price, payment_status, \
     payment_method, tracking_number, offer_price, offer_currency, offer_delivery_days, \
     offer_comment, offer_status, created_at, updated_at";

pub const TICKET_COLUMNS: &str = "id, order_id, manager_id, status, assigned_at, accepted_at";

pub const TRACKING_COLUMNS: &str = "id, order_id, status, location, description, created_at";

pub const PAYMENT_COLUMNS: &str =
    "id, order_id, amount, payment_method, status, transaction_id, created_at, completed_at";

pub const CHAT_COLUMNS: &str = "id, order_id, sender_id, sender_role, message, created_at";

pub const ADDRESS_COLUMNS: &str =
    "id, user_id, address_type, address, contact_name, contact_phone, is_default, created_at";

pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        role: parse_text(row, 4)?,
        privacy_accepted: row.get(5)?,
        notifications_enabled: row.get(6)?,
        created_at: timestamp(row, 7)?,
        updated_at: timestamp(row, 8)?,
    })
}

pub fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    order_from_row_at(row, 0)
}

/// Reads an order whose columns start at `base` (used after a JOIN).
pub fn order_from_row_at(row: &Row<'_>, base: usize) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(base)?,
        client_id: row.get(base + 1)?,
        manager_id: row.get(base + 2)?,
        status: parse_text(row, base + 3)?,
        description: row.get(base + 4)?,
        from_address: row.get(base + 5)?,
        to_address: row.get(base + 6)?,
        from_contact: row.get(base + 7)?,
        to_contact: row.get(base + 8)?,
        weight: row.get(base + 9)?,
        price: row.get(base + 10)?,
        payment_status: parse_text(row, base + 11)?,
        payment_method: row.get(base + 12)?,
        tracking_number: row.get(base + 13)?,
        offer_price: row.get(base + 14)?,
        offer_currency: row.get(base + 15)?,
        offer_delivery_days: row.get(base + 16)?,
        offer_comment: row.get(base + 17)?,
        offer_status: parse_text(row, base + 18)?,
        created_at: timestamp(row, base + 19)?,
        updated_at: timestamp(row, base + 20)?,
    })
}

/// Number of columns in [`ORDER_COLUMNS`].
pub const ORDER_COLUMN_COUNT: usize = 21;

pub fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        order_id: row.get(1)?,
        manager_id: row.get(2)?,
        status: parse_text(row, 3)?,
        assigned_at: timestamp(row, 4)?,
        accepted_at: optional_timestamp(row, 5)?,
    })
}

/// Number of columns in [`TICKET_COLUMNS`].
pub const TICKET_COLUMN_COUNT: usize = 6;

pub fn tracking_from_row(row: &Row<'_>) -> rusqlite::Result<TrackingEvent> {
    Ok(TrackingEvent {
        id: row.get(0)?,
        order_id: row.get(1)?,
        status: row.get(2)?,
        location: row.get(3)?,
        description: row.get(4)?,
        created_at: timestamp(row, 5)?,
    })
}

pub fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        order_id: row.get(1)?,
        amount: row.get(2)?,
        payment_method: row.get(3)?,
        status: parse_text(row, 4)?,
        transaction_id: row.get(5)?,
        created_at: timestamp(row, 6)?,
        completed_at: optional_timestamp(row, 7)?,
    })
}

pub fn chat_from_row(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        order_id: row.get(1)?,
        sender_id: row.get(2)?,
        sender_role: parse_text(row, 3)?,
        message: row.get(4)?,
        created_at: timestamp(row, 5)?,
    })
}

pub fn address_from_row(row: &Row<'_>) -> rusqlite::Result<Address> {
    Ok(Address {
        id: row.get(0)?,
        user_id: row.get(1)?,
        address_type: row.get(2)?,
        address: row.get(3)?,
        contact_name: row.get(4)?,
        contact_phone: row.get(5)?,
        is_default: row.get(6)?,
        created_at: timestamp(row, 7)?,
    })
}

fn parse_text<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert.
fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_timestamp(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        parse_timestamp(&t)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    text.parse::<DateTime<Utc>>().or_else(|_| {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_datetime() {
        let ts = parse_timestamp("2024-03-01 12:30:45").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T12:30:45+00:00");
    }

    #[test]
    fn parses_rfc3339() {
        assert!(parse_timestamp("2024-03-01T12:30:45Z").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }
}
