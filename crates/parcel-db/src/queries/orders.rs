use anyhow::Result;
use rusqlite::{Connection, params};

use parcel_types::{NewOrder, Offer, OfferStatus, Order, OrderStatus, PaymentStatus};

use super::OptionalExt;
use super::tracking::{TrackingEntry, insert_tracking};
use crate::Database;
use crate::models::{ORDER_COLUMNS, order_from_row};

/// Which orders a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderFilter {
    All,
    Client(i64),
    /// Orders assigned to the manager plus every unassigned order.
    ManagerVisible(i64),
    /// Only orders assigned to the manager.
    ManagerAssigned(i64),
    Unassigned,
}

impl Database {
    /// Inserts the order, an optional ticket for a pre-assigned manager and
    /// the initial tracking row in one transaction. Returns
    /// `(order_id, ticket_id)`.
    pub fn create_order(
        &self,
        client_id: i64,
        new: &NewOrder,
        manager_id: Option<i64>,
        tracking_number: &str,
        initial: TrackingEntry<'_>,
    ) -> Result<(i64, Option<i64>)> {
        self.with_tx(|conn| {
            conn.execute(
                "INSERT INTO orders (client_id, manager_id, description, from_address, to_address,
                                     from_contact, to_contact, weight, price, tracking_number, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'pending')",
                params![
                    client_id,
                    manager_id,
                    new.description,
                    new.from_address,
                    new.to_address,
                    new.from_contact,
                    new.to_contact,
                    new.weight,
                    new.price,
                    tracking_number
                ],
            )?;
            let order_id = conn.last_insert_rowid();

            let ticket_id = match manager_id {
                Some(manager_id) => {
                    conn.execute(
                        "INSERT INTO tickets (order_id, manager_id, status) VALUES (?1, ?2, 'new')",
                        params![order_id, manager_id],
                    )?;
                    Some(conn.last_insert_rowid())
                }
                None => None,
            };

            insert_tracking(conn, order_id, initial)?;
            Ok((order_id, ticket_id))
        })
    }

    pub fn get_order(&self, order_id: i64) -> Result<Option<Order>> {
        self.with_conn(|conn| query_order(conn, order_id))
    }

    /// Newest first.
    pub fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let (clause, id) = match filter {
            OrderFilter::All => ("?1 IS NULL", None),
            OrderFilter::Client(id) => ("client_id = ?1", Some(id)),
            OrderFilter::ManagerVisible(id) => ("manager_id = ?1 OR manager_id IS NULL", Some(id)),
            OrderFilter::ManagerAssigned(id) => ("manager_id = ?1", Some(id)),
            OrderFilter::Unassigned => ("manager_id IS NULL AND ?1 IS NULL", None),
        };

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM orders WHERE {} ORDER BY created_at DESC, id DESC",
                ORDER_COLUMNS, clause
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([id], order_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Sets the status (and the manager, when given) and appends the
    /// tracking row. Returns false when the order does not exist.
    pub fn update_order_status(
        &self,
        order_id: i64,
        status: OrderStatus,
        manager_id: Option<i64>,
        entry: TrackingEntry<'_>,
    ) -> Result<bool> {
        self.with_tx(|conn| {
            let changed = conn.execute(
                "UPDATE orders
                 SET status = ?1, manager_id = COALESCE(?2, manager_id), updated_at = datetime('now')
                 WHERE id = ?3",
                params![status.as_str(), manager_id, order_id],
            )?;
            if changed == 0 {
                return Ok(false);
            }
            insert_tracking(conn, order_id, entry)?;
            Ok(true)
        })
    }

    /// Stores the offer and claims the order for `manager_id`, but only
    /// while the order is unclaimed or already belongs to that manager.
    pub fn set_order_offer(&self, order_id: i64, manager_id: i64, offer: &Offer) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE orders SET
                    manager_id = COALESCE(manager_id, ?2),
                    offer_price = ?3,
                    offer_currency = ?4,
                    offer_delivery_days = ?5,
                    offer_comment = ?6,
                    offer_status = ?7,
                    updated_at = datetime('now')
                 WHERE id = ?1 AND (manager_id IS NULL OR manager_id = ?2)",
                params![
                    order_id,
                    manager_id,
                    offer.price,
                    offer.currency,
                    offer.delivery_days,
                    offer.comment,
                    offer.status.as_str()
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Client accepts a sent offer: the offer price becomes the order price
    /// and the order moves to `accepted`. No-op unless the offer is `sent`.
    pub fn accept_offer(&self, order_id: i64, entry: TrackingEntry<'_>) -> Result<bool> {
        self.with_tx(|conn| {
            let changed = conn.execute(
                "UPDATE orders SET
                    offer_status = ?2,
                    price = COALESCE(offer_price, price),
                    status = ?3,
                    updated_at = datetime('now')
                 WHERE id = ?1 AND offer_status = ?4",
                params![
                    order_id,
                    OfferStatus::Accepted.as_str(),
                    OrderStatus::Accepted.as_str(),
                    OfferStatus::Sent.as_str()
                ],
            )?;
            if changed == 0 {
                return Ok(false);
            }
            insert_tracking(conn, order_id, entry)?;
            Ok(true)
        })
    }

    pub fn reject_offer(&self, order_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE orders SET offer_status = ?2, updated_at = datetime('now')
                 WHERE id = ?1 AND offer_status = ?3",
                params![order_id, OfferStatus::Rejected.as_str(), OfferStatus::Sent.as_str()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Removes every order and everything hanging off one. Users stay.
    pub fn clear_order_data(&self) -> Result<()> {
        self.with_tx(|conn| {
            conn.execute_batch(
                "DELETE FROM chat_messages;
                 DELETE FROM tracking;
                 DELETE FROM tickets;
                 DELETE FROM payments;
                 DELETE FROM orders;",
            )?;
            Ok(())
        })
    }
}

pub(crate) fn query_order(conn: &Connection, order_id: i64) -> Result<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS);
    conn.query_row(&sql, [order_id], order_from_row).optional()
}

pub(crate) fn set_order_manager(conn: &Connection, order_id: i64, manager_id: i64) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE orders SET manager_id = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![manager_id, order_id],
    )?)
}

pub(crate) fn set_payment_status(
    conn: &Connection,
    order_id: i64,
    status: PaymentStatus,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE orders SET payment_status = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![status.as_str(), order_id],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testing;
    use parcel_types::Role;

    fn offer(price: f64, days: i64) -> Offer {
        Offer {
            price,
            currency: "RUB".to_string(),
            delivery_days: days,
            comment: None,
            status: OfferStatus::Sent,
        }
    }

    #[test]
    fn second_manager_cannot_overwrite_offer() {
        let db = testing::db();
        testing::user(&db, 1, Role::Client);
        testing::user(&db, 2, Role::Manager);
        testing::user(&db, 3, Role::Manager);
        let order_id = testing::order(&db, 1, "AAAAAAAAAA");

        assert!(db.set_order_offer(order_id, 2, &offer(1200.0, 3)).unwrap());
        assert!(!db.set_order_offer(order_id, 3, &offer(1300.0, 2)).unwrap());
        // The claiming manager may revise.
        assert!(db.set_order_offer(order_id, 2, &offer(1250.0, 3)).unwrap());

        let order = db.get_order(order_id).unwrap().unwrap();
        assert_eq!(order.manager_id, Some(2));
        assert_eq!(order.offer_price, Some(1250.0));
    }

    #[test]
    fn filters_split_assigned_and_unassigned() {
        let db = testing::db();
        testing::user(&db, 1, Role::Client);
        testing::user(&db, 2, Role::Manager);
        let first = testing::order(&db, 1, "AAAAAAAAAA");
        let _second = testing::order(&db, 1, "BBBBBBBBBB");
        db.with_conn(|conn| set_order_manager(conn, first, 2)).unwrap();

        assert_eq!(db.list_orders(OrderFilter::All).unwrap().len(), 2);
        assert_eq!(db.list_orders(OrderFilter::Client(1)).unwrap().len(), 2);
        assert_eq!(db.list_orders(OrderFilter::ManagerVisible(2)).unwrap().len(), 2);
        assert_eq!(db.list_orders(OrderFilter::ManagerAssigned(2)).unwrap().len(), 1);
        assert_eq!(db.list_orders(OrderFilter::Unassigned).unwrap().len(), 1);
    }

    #[test]
    fn offer_responses_require_sent_offer() {
        let db = testing::db();
        testing::user(&db, 1, Role::Client);
        testing::user(&db, 2, Role::Manager);
        let order_id = testing::order(&db, 1, "AAAAAAAAAA");
        let entry = TrackingEntry {
            status: "accepted",
            location: None,
            description: "Accepted for work",
        };

        assert!(!db.accept_offer(order_id, entry).unwrap());
        db.set_order_offer(order_id, 2, &offer(900.0, 2)).unwrap();
        assert!(db.accept_offer(order_id, entry).unwrap());
        assert!(!db.reject_offer(order_id).unwrap());

        let order = db.get_order(order_id).unwrap().unwrap();
        assert_eq!(order.price, Some(900.0));
        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(order.offer_status, OfferStatus::Accepted);
    }
}
