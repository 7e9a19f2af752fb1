//! Persistence operations, one file per table. Each public method takes the
//! connection lock once and commits one statement group.

mod addresses;
mod chat;
mod orders;
mod payments;
mod sessions;
mod stats;
mod tickets;
mod tracking;
mod users;

pub use orders::OrderFilter;
pub use tickets::TicketAcceptance;
pub use tracking::TrackingEntry;

use anyhow::Result;

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Prefixes every column in a comma-separated list with `alias.`.
pub(crate) fn qualify(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
pub(crate) mod testing {
    use parcel_types::{NewOrder, Role, UserProfile};

    use super::TrackingEntry;
    use crate::Database;

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn user(db: &Database, id: i64, role: Role) {
        let profile = UserProfile {
            user_id: id,
            username: Some(format!("user{}", id)),
            first_name: Some(format!("User {}", id)),
            last_name: None,
        };
        db.upsert_user(&profile, role).unwrap();
    }

    pub fn order(db: &Database, client_id: i64, tracking: &str) -> i64 {
        let new = NewOrder {
            description: "Box of books".to_string(),
            from_address: Some("A".to_string()),
            to_address: Some("B".to_string()),
            price: Some(1000.0),
            ..NewOrder::default()
        };
        let initial = TrackingEntry {
            status: "pending",
            location: Some("Created"),
            description: "Awaiting processing",
        };
        let (id, _) = db.create_order(client_id, &new, None, tracking, initial).unwrap();
        id
    }
}
