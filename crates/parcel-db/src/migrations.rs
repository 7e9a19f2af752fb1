use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Columns that databases created by older releases do not have yet.
/// Added in place with `ALTER TABLE`; SQLite requires a constant default.
const LATE_COLUMNS: &[(&str, &str, &str)] = &[
    ("users", "privacy_accepted", "INTEGER NOT NULL DEFAULT 0"),
    ("users", "notifications_enabled", "INTEGER NOT NULL DEFAULT 1"),
    ("orders", "payment_method", "TEXT"),
    ("orders", "offer_price", "REAL"),
    ("orders", "offer_currency", "TEXT"),
    ("orders", "offer_delivery_days", "INTEGER"),
    ("orders", "offer_comment", "TEXT"),
    ("orders", "offer_status", "TEXT NOT NULL DEFAULT 'draft'"),
];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            user_id                 INTEGER PRIMARY KEY,
            username                TEXT,
            first_name              TEXT,
            last_name               TEXT,
            role                    TEXT NOT NULL DEFAULT 'client',
            privacy_accepted        INTEGER NOT NULL DEFAULT 0,
            notifications_enabled   INTEGER NOT NULL DEFAULT 1,
            created_at              TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at              TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS orders (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            client_id           INTEGER NOT NULL REFERENCES users(user_id),
            manager_id          INTEGER REFERENCES users(user_id),
            status              TEXT NOT NULL DEFAULT 'pending',
            description         TEXT,
            from_address        TEXT,
            to_address          TEXT,
            from_contact        TEXT,
            to_contact          TEXT,
            weight              REAL,
            price               REAL,
            payment_status      TEXT NOT NULL DEFAULT 'unpaid',
            payment_method      TEXT,
            tracking_number     TEXT NOT NULL UNIQUE,
            offer_price         REAL,
            offer_currency      TEXT,
            offer_delivery_days INTEGER,
            offer_comment       TEXT,
            offer_status        TEXT NOT NULL DEFAULT 'draft',
            created_at          TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_orders_client ON orders(client_id);
        CREATE INDEX IF NOT EXISTS idx_orders_manager ON orders(manager_id);

        CREATE TABLE IF NOT EXISTS tickets (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id    INTEGER NOT NULL REFERENCES orders(id),
            manager_id  INTEGER NOT NULL REFERENCES users(user_id),
            status      TEXT NOT NULL DEFAULT 'new',
            assigned_at TEXT NOT NULL DEFAULT (datetime('now')),
            accepted_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_tickets_manager ON tickets(manager_id, assigned_at);

        CREATE TABLE IF NOT EXISTS tracking (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id    INTEGER NOT NULL REFERENCES orders(id),
            status      TEXT NOT NULL,
            location    TEXT,
            description TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_tracking_order ON tracking(order_id, created_at);

        CREATE TABLE IF NOT EXISTS payments (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id        INTEGER NOT NULL REFERENCES orders(id),
            amount          REAL NOT NULL,
            payment_method  TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'pending',
            transaction_id  TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            completed_at    TEXT
        );

        CREATE TABLE IF NOT EXISTS chat_messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id    INTEGER NOT NULL REFERENCES orders(id),
            sender_id   INTEGER NOT NULL REFERENCES users(user_id),
            sender_role TEXT NOT NULL,
            message     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_chat_order ON chat_messages(order_id, created_at);

        CREATE TABLE IF NOT EXISTS user_addresses (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER NOT NULL REFERENCES users(user_id),
            address_type    TEXT,
            address         TEXT NOT NULL,
            contact_name    TEXT,
            contact_phone   TEXT,
            is_default      INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS web_sessions (
            user_id     INTEGER PRIMARY KEY REFERENCES users(user_id),
            token       TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    for (table, column, decl) in LATE_COLUMNS {
        if !has_column(conn, table, column)? {
            conn.execute_batch(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, decl))?;
            info!("Added missing column {}.{}", table, column);
        }
    }

    info!("Database migrations complete");
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_offer_columns_to_legacy_orders_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE users (
                user_id INTEGER PRIMARY KEY,
                username TEXT,
                first_name TEXT,
                last_name TEXT,
                role TEXT DEFAULT 'client',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE TABLE orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client_id INTEGER,
                manager_id INTEGER,
                status TEXT DEFAULT 'pending',
                tracking_number TEXT UNIQUE
            );
            INSERT INTO users (user_id, first_name) VALUES (1, 'Old');
            INSERT INTO orders (client_id, tracking_number) VALUES (1, 'AAAAAAAAAA');
            ",
        )
        .unwrap();

        run(&conn).unwrap();

        assert!(has_column(&conn, "orders", "offer_status").unwrap());
        assert!(has_column(&conn, "users", "notifications_enabled").unwrap());

        let offer_status: String = conn
            .query_row("SELECT offer_status FROM orders WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(offer_status, "draft");
    }

    #[test]
    fn running_twice_is_harmless() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
    }
}
