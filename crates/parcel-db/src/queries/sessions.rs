use anyhow::Result;
use rusqlite::params;

use parcel_types::User;

use super::{OptionalExt, qualify};
use crate::Database;
use crate::models::{USER_COLUMNS, user_from_row};

impl Database {
    /// Stores `token` as the user's only web session, replacing any other.
    pub fn replace_session(&self, user_id: i64, token: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO web_sessions (user_id, token) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET
                    token = excluded.token,
                    created_at = datetime('now')",
                params![user_id, token],
            )?;
            Ok(())
        })
    }

    pub fn user_for_session(&self, token: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM web_sessions s JOIN users u ON u.user_id = s.user_id
                 WHERE s.token = ?1",
                qualify(USER_COLUMNS, "u")
            );
            conn.query_row(&sql, [token], user_from_row).optional()
        })
    }

    pub fn delete_session(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM web_sessions WHERE token = ?1", [token])?;
            Ok(changed > 0)
        })
    }
}
