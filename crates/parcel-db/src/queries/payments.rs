use anyhow::Result;
use rusqlite::params;

use parcel_types::{Payment, PaymentStatus};

use super::OptionalExt;
use super::orders::set_payment_status;
use crate::Database;
use crate::models::{PAYMENT_COLUMNS, payment_from_row};

impl Database {
    /// Records a pending payment and marks the order's payment as pending.
    pub fn create_payment(
        &self,
        order_id: i64,
        amount: f64,
        payment_method: &str,
        transaction_id: &str,
    ) -> Result<i64> {
        self.with_tx(|conn| {
            conn.execute(
                "INSERT INTO payments (order_id, amount, payment_method, status, transaction_id)
                 VALUES (?1, ?2, ?3, 'pending', ?4)",
                params![order_id, amount, payment_method, transaction_id],
            )?;
            let payment_id = conn.last_insert_rowid();
            conn.execute(
                "UPDATE orders SET payment_method = ?1 WHERE id = ?2",
                params![payment_method, order_id],
            )?;
            set_payment_status(conn, order_id, PaymentStatus::Pending)?;
            Ok(payment_id)
        })
    }

    /// Completes the payment and marks its order paid. Returns false when
    /// the payment does not exist.
    pub fn complete_payment(&self, payment_id: i64) -> Result<bool> {
        self.with_tx(|conn| {
            let order_id: Option<i64> = conn
                .query_row("SELECT order_id FROM payments WHERE id = ?1", [payment_id], |row| {
                    row.get(0)
                })
                .optional()?;
            let Some(order_id) = order_id else {
                return Ok(false);
            };

            conn.execute(
                "UPDATE payments SET status = 'completed', completed_at = datetime('now')
                 WHERE id = ?1",
                [payment_id],
            )?;
            set_payment_status(conn, order_id, PaymentStatus::Paid)?;
            Ok(true)
        })
    }

    pub fn get_payment(&self, payment_id: i64) -> Result<Option<Payment>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM payments WHERE id = ?1", PAYMENT_COLUMNS);
            conn.query_row(&sql, [payment_id], payment_from_row).optional()
        })
    }

    pub fn payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM payments WHERE order_id = ?1 ORDER BY created_at ASC, id ASC",
                PAYMENT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([order_id], payment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testing;
    use parcel_types::{PaymentRecordStatus, Role};

    #[test]
    fn payment_lifecycle_updates_order() {
        let db = testing::db();
        testing::user(&db, 1, Role::Client);
        let order_id = testing::order(&db, 1, "AAAAAAAAAA");

        let payment_id = db.create_payment(order_id, 1000.0, "card", "tx-1").unwrap();
        let order = db.get_order(order_id).unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.payment_method.as_deref(), Some("card"));

        assert!(db.complete_payment(payment_id).unwrap());
        assert!(!db.complete_payment(999).unwrap());

        let payment = db.get_payment(payment_id).unwrap().unwrap();
        assert_eq!(payment.status, PaymentRecordStatus::Completed);
        assert!(payment.completed_at.is_some());
        assert_eq!(
            db.get_order(order_id).unwrap().unwrap().payment_status,
            PaymentStatus::Paid
        );
        assert_eq!(db.payments_for_order(order_id).unwrap().len(), 1);
    }
}
