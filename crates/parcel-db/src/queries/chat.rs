use anyhow::Result;
use rusqlite::params;

use parcel_types::{ChatMessage, Role};

use super::OptionalExt;
use crate::Database;
use crate::models::{CHAT_COLUMNS, chat_from_row};

impl Database {
    pub fn add_chat_message(
        &self,
        order_id: i64,
        sender_id: i64,
        sender_role: Role,
        message: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_messages (order_id, sender_id, sender_role, message)
                 VALUES (?1, ?2, ?3, ?4)",
                params![order_id, sender_id, sender_role.as_str(), message],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_chat_message(&self, message_id: i64) -> Result<Option<ChatMessage>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM chat_messages WHERE id = ?1", CHAT_COLUMNS);
            conn.query_row(&sql, [message_id], chat_from_row).optional()
        })
    }

    /// Oldest first. `limit = None` returns everything after `offset`.
    pub fn chat_messages(
        &self,
        order_id: i64,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<Vec<ChatMessage>> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map_or(-1, i64::from);
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM chat_messages WHERE order_id = ?1
                 ORDER BY created_at ASC, id ASC LIMIT ?2 OFFSET ?3",
                CHAT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![order_id, limit, offset], chat_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testing;

    #[test]
    fn messages_come_back_in_send_order() {
        let db = testing::db();
        testing::user(&db, 1, Role::Client);
        testing::user(&db, 2, Role::Manager);
        let order_id = testing::order(&db, 1, "AAAAAAAAAA");

        for i in 0..5 {
            let (sender, role) = if i % 2 == 0 { (1, Role::Client) } else { (2, Role::Manager) };
            db.add_chat_message(order_id, sender, role, &format!("msg {}", i)).unwrap();
        }

        let all = db.chat_messages(order_id, None, 0).unwrap();
        let texts: Vec<_> = all.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, ["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);
        assert_eq!(all[1].sender_role, Role::Manager);

        let page = db.chat_messages(order_id, Some(2), 1).unwrap();
        let texts: Vec<_> = page.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, ["msg 1", "msg 2"]);
    }
}
