use anyhow::Result;
use rusqlite::params;

use parcel_types::{Ticket, TicketStatus, TicketWithOrder};

use super::orders::set_order_manager;
use super::tracking::{TrackingEntry, insert_tracking};
use super::{OptionalExt, qualify};
use crate::Database;
use crate::models::{
    ORDER_COLUMNS, TICKET_COLUMN_COUNT, TICKET_COLUMNS, order_from_row_at, ticket_from_row,
};

/// Outcome of [`Database::accept_ticket`] for a ticket that exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketAcceptance {
    /// The ticket was `new`; carries the order id.
    Accepted(i64),
    /// The ticket was already accepted or closed.
    NotPending,
}

impl Database {
    pub fn open_ticket(&self, order_id: i64, manager_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tickets (order_id, manager_id, status) VALUES (?1, ?2, 'new')",
                params![order_id, manager_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_ticket(&self, ticket_id: i64) -> Result<Option<Ticket>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM tickets WHERE id = ?1", TICKET_COLUMNS);
            conn.query_row(&sql, [ticket_id], ticket_from_row).optional()
        })
    }

    /// A manager's tickets, newest first, each with its order.
    pub fn tickets_for_manager(
        &self,
        manager_id: i64,
        status: Option<TicketStatus>,
    ) -> Result<Vec<TicketWithOrder>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, {} FROM tickets t JOIN orders o ON o.id = t.order_id
                 WHERE t.manager_id = ?1 AND (?2 IS NULL OR t.status = ?2)
                 ORDER BY t.assigned_at DESC, t.id DESC",
                qualify(TICKET_COLUMNS, "t"),
                qualify(ORDER_COLUMNS, "o")
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![manager_id, status.map(TicketStatus::as_str)], |row| {
                    Ok(TicketWithOrder {
                        ticket: ticket_from_row(row)?,
                        order: order_from_row_at(row, TICKET_COLUMN_COUNT)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Marks a `new` ticket accepted, moves its order to `accepted` under the
    /// ticket's manager and logs the tracking row. Returns `None` when the
    /// ticket does not exist; a ticket past `new` is left untouched.
    pub fn accept_ticket(
        &self,
        ticket_id: i64,
        entry: TrackingEntry<'_>,
    ) -> Result<Option<TicketAcceptance>> {
        self.with_tx(|conn| {
            let found = conn
                .query_row(
                    "SELECT order_id, manager_id FROM tickets WHERE id = ?1",
                    [ticket_id],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()?;
            let Some((order_id, manager_id)) = found else {
                return Ok(None);
            };

            let updated = conn.execute(
                "UPDATE tickets SET status = 'accepted', accepted_at = datetime('now')
                 WHERE id = ?1 AND status = 'new'",
                [ticket_id],
            )?;
            if updated == 0 {
                return Ok(Some(TicketAcceptance::NotPending));
            }
            conn.execute(
                "UPDATE orders SET status = 'accepted',
                    manager_id = COALESCE(manager_id, ?2),
                    updated_at = datetime('now')
                 WHERE id = ?1",
                params![order_id, manager_id],
            )?;
            insert_tracking(conn, order_id, entry)?;
            Ok(Some(TicketAcceptance::Accepted(order_id)))
        })
    }

    /// Points the order's ticket at `manager_id` (creating one when the order
    /// has none) and sets the order's manager. Returns false for a missing
    /// order.
    pub fn assign_order(&self, order_id: i64, manager_id: i64) -> Result<bool> {
        self.with_tx(|conn| {
            if set_order_manager(conn, order_id, manager_id)? == 0 {
                return Ok(false);
            }
            let updated = conn.execute(
                "UPDATE tickets SET manager_id = ?2, assigned_at = datetime('now')
                 WHERE order_id = ?1",
                params![order_id, manager_id],
            )?;
            if updated == 0 {
                conn.execute(
                    "INSERT INTO tickets (order_id, manager_id, status) VALUES (?1, ?2, 'new')",
                    params![order_id, manager_id],
                )?;
            }
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testing;
    use parcel_types::{OrderStatus, Role};

    const ACCEPTED: TrackingEntry<'static> = TrackingEntry {
        status: "accepted",
        location: None,
        description: "Accepted for work",
    };

    #[test]
    fn assign_creates_then_moves_the_ticket() {
        let db = testing::db();
        testing::user(&db, 1, Role::Client);
        testing::user(&db, 2, Role::Manager);
        testing::user(&db, 3, Role::Manager);
        let order_id = testing::order(&db, 1, "AAAAAAAAAA");

        assert!(db.assign_order(order_id, 2).unwrap());
        assert_eq!(db.tickets_for_manager(2, None).unwrap().len(), 1);

        assert!(db.assign_order(order_id, 3).unwrap());
        assert!(db.tickets_for_manager(2, None).unwrap().is_empty());
        let tickets = db.tickets_for_manager(3, Some(TicketStatus::New)).unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].order.id, order_id);
        assert_eq!(tickets[0].order.manager_id, Some(3));

        assert!(!db.assign_order(999, 3).unwrap());
    }

    #[test]
    fn accepting_ticket_accepts_order() {
        let db = testing::db();
        testing::user(&db, 1, Role::Client);
        testing::user(&db, 2, Role::Manager);
        let order_id = testing::order(&db, 1, "AAAAAAAAAA");
        let ticket_id = db.open_ticket(order_id, 2).unwrap();

        assert_eq!(
            db.accept_ticket(ticket_id, ACCEPTED).unwrap(),
            Some(TicketAcceptance::Accepted(order_id))
        );
        assert_eq!(db.accept_ticket(999, ACCEPTED).unwrap(), None);

        let ticket = db.get_ticket(ticket_id).unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::Accepted);
        assert!(ticket.accepted_at.is_some());

        let order = db.get_order(order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(order.manager_id, Some(2));
        assert_eq!(db.tracking_for_order(order_id).unwrap().len(), 2);
        assert!(db.tickets_for_manager(2, Some(TicketStatus::New)).unwrap().is_empty());
    }

    #[test]
    fn accepted_ticket_cannot_be_accepted_again() {
        let db = testing::db();
        testing::user(&db, 1, Role::Client);
        testing::user(&db, 2, Role::Manager);
        let order_id = testing::order(&db, 1, "AAAAAAAAAA");
        let ticket_id = db.open_ticket(order_id, 2).unwrap();
        db.accept_ticket(ticket_id, ACCEPTED).unwrap();

        let delivered = TrackingEntry {
            status: "delivered",
            location: None,
            description: "Delivered",
        };
        assert!(db.update_order_status(order_id, OrderStatus::Delivered, None, delivered).unwrap());
        let tracked = db.tracking_for_order(order_id).unwrap().len();

        assert_eq!(
            db.accept_ticket(ticket_id, ACCEPTED).unwrap(),
            Some(TicketAcceptance::NotPending)
        );
        let order = db.get_order(order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(db.tracking_for_order(order_id).unwrap().len(), tracked);
    }
}
