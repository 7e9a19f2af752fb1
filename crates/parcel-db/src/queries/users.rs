use anyhow::Result;
use rusqlite::{Connection, params};

use parcel_types::api::ProfileUpdate;
use parcel_types::{Role, User, UserProfile};

use super::OptionalExt;
use crate::Database;
use crate::models::{USER_COLUMNS, user_from_row};

impl Database {
    /// Inserts the user with `role`, or refreshes the names of an existing
    /// user. The role of an existing user is never touched here.
    pub fn upsert_user(&self, profile: &UserProfile, role: Role) -> Result<User> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (user_id, username, first_name, last_name, role)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET
                    username = COALESCE(excluded.username, users.username),
                    first_name = COALESCE(excluded.first_name, users.first_name),
                    last_name = COALESCE(excluded.last_name, users.last_name),
                    updated_at = datetime('now')",
                params![
                    profile.user_id,
                    profile.username,
                    profile.first_name,
                    profile.last_name,
                    role.as_str()
                ],
            )?;
            query_user(conn, profile.user_id)?
                .ok_or_else(|| anyhow::anyhow!("user {} vanished after upsert", profile.user_id))
        })
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, user_id))
    }

    pub fn set_user_role(&self, user_id: i64, role: Role) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET role = ?1, updated_at = datetime('now') WHERE user_id = ?2",
                params![role.as_str(), user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_profile(&self, user_id: i64, update: &ProfileUpdate) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    first_name = COALESCE(?2, first_name),
                    last_name = COALESCE(?3, last_name),
                    privacy_accepted = COALESCE(?4, privacy_accepted),
                    notifications_enabled = COALESCE(?5, notifications_enabled),
                    updated_at = datetime('now')
                 WHERE user_id = ?1",
                params![
                    user_id,
                    update.first_name,
                    update.last_name,
                    update.privacy_accepted,
                    update.notifications_enabled
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Newest first, optionally restricted to one role.
    pub fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE (?1 IS NULL OR role = ?1)
                 ORDER BY created_at DESC, user_id DESC",
                USER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([role.map(Role::as_str)], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The longest-registered manager: the fallback contact for unassigned
    /// orders and the auto-assignment target.
    pub fn first_manager_id(&self) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id FROM users WHERE role = 'manager'
                 ORDER BY created_at ASC, user_id ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
        })
    }
}

pub(crate) fn query_user(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE user_id = ?1", USER_COLUMNS);
    conn.query_row(&sql, [user_id], user_from_row).optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testing;

    #[test]
    fn upsert_keeps_role_and_fills_missing_names() {
        let db = testing::db();
        db.upsert_user(&UserProfile { user_id: 7, ..UserProfile::default() }, Role::Manager)
            .unwrap();

        let profile = UserProfile {
            user_id: 7,
            username: Some("kate".to_string()),
            first_name: Some("Kate".to_string()),
            last_name: None,
        };
        let user = db.upsert_user(&profile, Role::Client).unwrap();

        assert_eq!(user.role, Role::Manager);
        assert_eq!(user.first_name.as_deref(), Some("Kate"));
        assert!(!user.privacy_accepted);
        assert!(user.notifications_enabled);
    }

    #[test]
    fn profile_update_leaves_absent_fields() {
        let db = testing::db();
        testing::user(&db, 1, Role::Client);

        let update = ProfileUpdate {
            notifications_enabled: Some(false),
            ..ProfileUpdate::default()
        };
        assert!(db.update_profile(1, &update).unwrap());
        assert!(!db.update_profile(2, &update).unwrap());

        let user = db.get_user(1).unwrap().unwrap();
        assert!(!user.notifications_enabled);
        assert_eq!(user.first_name.as_deref(), Some("User 1"));
    }

    #[test]
    fn list_users_filters_by_role() {
        let db = testing::db();
        testing::user(&db, 1, Role::Client);
        testing::user(&db, 2, Role::Manager);
        testing::user(&db, 3, Role::Manager);

        assert_eq!(db.list_users(None).unwrap().len(), 3);
        assert_eq!(db.list_users(Some(Role::Manager)).unwrap().len(), 2);
        assert_eq!(db.first_manager_id().unwrap(), Some(2));
    }
}
