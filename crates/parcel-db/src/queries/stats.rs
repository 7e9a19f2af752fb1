use anyhow::Result;
use rusqlite::{Connection, params};

use parcel_types::Stats;

use crate::Database;

impl Database {
    pub fn client_stats(&self, client_id: i64) -> Result<Stats> {
        self.with_conn(|conn| {
            let count = |status: Option<&str>| -> Result<i64> {
                count_where(
                    conn,
                    "SELECT COUNT(*) FROM orders WHERE client_id = ?1 AND (?2 IS NULL OR status = ?2)",
                    params![client_id, status],
                )
            };
            Ok(Stats::Client {
                total_orders: count(None)?,
                pending: count(Some("pending"))?,
                in_transit: count(Some("in_transit"))?,
                delivered: count(Some("delivered"))?,
            })
        })
    }

    pub fn manager_stats(&self, manager_id: i64) -> Result<Stats> {
        self.with_conn(|conn| {
            Ok(Stats::Manager {
                total_tickets: count_where(
                    conn,
                    "SELECT COUNT(*) FROM tickets WHERE manager_id = ?1",
                    [manager_id],
                )?,
                new_tickets: count_where(
                    conn,
                    "SELECT COUNT(*) FROM tickets WHERE manager_id = ?1 AND status = 'new'",
                    [manager_id],
                )?,
                total_orders: count_where(
                    conn,
                    "SELECT COUNT(*) FROM orders WHERE manager_id = ?1",
                    [manager_id],
                )?,
                in_progress: count_where(
                    conn,
                    "SELECT COUNT(*) FROM orders WHERE manager_id = ?1 AND status = 'in_transit'",
                    [manager_id],
                )?,
            })
        })
    }

    pub fn admin_stats(&self) -> Result<Stats> {
        self.with_conn(|conn| {
            let users = |role: &str| -> Result<i64> {
                count_where(conn, "SELECT COUNT(*) FROM users WHERE role = ?1", [role])
            };
            Ok(Stats::Admin {
                total_orders: count_where(conn, "SELECT COUNT(*) FROM orders", [])?,
                total_users: count_where(conn, "SELECT COUNT(*) FROM users", [])?,
                clients: users("client")?,
                managers: users("manager")?,
                admins: users("admin")?,
                pending_orders: count_where(
                    conn,
                    "SELECT COUNT(*) FROM orders WHERE status = 'pending'",
                    [],
                )?,
            })
        })
    }
}

fn count_where<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<i64> {
    Ok(conn.query_row(sql, params, |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testing;
    use crate::queries::tracking::TrackingEntry;
    use parcel_types::{OrderStatus, Role};

    #[test]
    fn counts_per_role() {
        let db = testing::db();
        testing::user(&db, 1, Role::Client);
        testing::user(&db, 2, Role::Manager);
        testing::user(&db, 3, Role::Admin);
        let first = testing::order(&db, 1, "AAAAAAAAAA");
        testing::order(&db, 1, "BBBBBBBBBB");

        db.assign_order(first, 2).unwrap();
        let entry = TrackingEntry {
            status: "in_transit",
            location: None,
            description: "In transit",
        };
        db.update_order_status(first, OrderStatus::InTransit, None, entry).unwrap();

        assert_eq!(
            db.client_stats(1).unwrap(),
            Stats::Client { total_orders: 2, pending: 1, in_transit: 1, delivered: 0 }
        );
        assert_eq!(
            db.manager_stats(2).unwrap(),
            Stats::Manager { total_tickets: 1, new_tickets: 1, total_orders: 1, in_progress: 1 }
        );
        assert_eq!(
            db.admin_stats().unwrap(),
            Stats::Admin {
                total_orders: 2,
                total_users: 3,
                clients: 1,
                managers: 1,
                admins: 1,
                pending_orders: 1,
            }
        );
    }
}
