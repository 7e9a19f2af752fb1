use anyhow::Result;
use rusqlite::params;

use parcel_types::{Address, NewAddress};

use crate::Database;
use crate::models::{ADDRESS_COLUMNS, address_from_row};

impl Database {
    /// Saves an address. A new default clears the user's previous default.
    pub fn add_address(&self, user_id: i64, new: &NewAddress) -> Result<i64> {
        self.with_tx(|conn| {
            if new.is_default {
                conn.execute(
                    "UPDATE user_addresses SET is_default = 0 WHERE user_id = ?1",
                    [user_id],
                )?;
            }
            conn.execute(
                "INSERT INTO user_addresses
                    (user_id, address_type, address, contact_name, contact_phone, is_default)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user_id,
                    new.address_type,
                    new.address,
                    new.contact_name,
                    new.contact_phone,
                    new.is_default
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Default address first, then newest.
    pub fn addresses_for_user(&self, user_id: i64) -> Result<Vec<Address>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM user_addresses WHERE user_id = ?1
                 ORDER BY is_default DESC, created_at DESC, id DESC",
                ADDRESS_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], address_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testing;
    use parcel_types::Role;

    #[test]
    fn only_one_default_address() {
        let db = testing::db();
        testing::user(&db, 1, Role::Client);
        let home = NewAddress {
            address: "Home".to_string(),
            is_default: true,
            ..NewAddress::default()
        };
        let office = NewAddress {
            address: "Office".to_string(),
            is_default: true,
            ..NewAddress::default()
        };
        db.add_address(1, &home).unwrap();
        db.add_address(1, &office).unwrap();

        let addresses = db.addresses_for_user(1).unwrap();
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].address, "Office");
        assert!(addresses[0].is_default);
        assert!(!addresses[1].is_default);
    }
}
