use anyhow::Result;
use rusqlite::{Connection, params};

use parcel_types::TrackingEvent;

use crate::Database;
use crate::models::{TRACKING_COLUMNS, tracking_from_row};

/// One row to append to an order's tracking log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingEntry<'a> {
    pub status: &'a str,
    pub location: Option<&'a str>,
    pub description: &'a str,
}

impl Database {
    pub fn add_tracking_event(&self, order_id: i64, entry: TrackingEntry<'_>) -> Result<i64> {
        self.with_conn(|conn| insert_tracking(conn, order_id, entry))
    }

    /// Oldest first. Rows written within the same second keep insert order.
    pub fn tracking_for_order(&self, order_id: i64) -> Result<Vec<TrackingEvent>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM tracking WHERE order_id = ?1 ORDER BY created_at ASC, id ASC",
                TRACKING_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([order_id], tracking_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

pub(crate) fn insert_tracking(conn: &Connection, order_id: i64, entry: TrackingEntry<'_>) -> Result<i64> {
    conn.execute(
        "INSERT INTO tracking (order_id, status, location, description) VALUES (?1, ?2, ?3, ?4)",
        params![order_id, entry.status, entry.location, entry.description],
    )?;
    Ok(conn.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testing;
    use parcel_types::{OrderStatus, Role};

    #[test]
    fn status_changes_append_in_order() {
        let db = testing::db();
        testing::user(&db, 1, Role::Client);
        let order_id = testing::order(&db, 1, "AAAAAAAAAA");

        let accepted = TrackingEntry {
            status: "accepted",
            location: None,
            description: "Accepted for work",
        };
        let delivered = TrackingEntry {
            status: "delivered",
            location: None,
            description: "Delivered",
        };
        assert!(db.update_order_status(order_id, OrderStatus::Accepted, None, accepted).unwrap());
        assert!(db.update_order_status(order_id, OrderStatus::Delivered, None, delivered).unwrap());
        assert!(!db.update_order_status(999, OrderStatus::Delivered, None, delivered).unwrap());

        let events = db.tracking_for_order(order_id).unwrap();
        let statuses: Vec<_> = events.iter().map(|e| e.status.as_str()).collect();
        assert_eq!(statuses, ["pending", "accepted", "delivered"]);
        assert_eq!(events[0].location.as_deref(), Some("Created"));
    }
}
