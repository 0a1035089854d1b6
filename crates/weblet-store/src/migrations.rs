//! Schema versioning
//!
//! Each migration moves the database one version forward. The applied
//! version is tracked in `schema_version`; opening a database replays
//! whatever is missing, so old databases upgrade in place.

use rusqlite::{Connection, OptionalExtension};
use weblet_core::{WebletError, WebletResult};

type Migration = fn(&Connection) -> rusqlite::Result<()>;

/// Ordered migration registry. Index + 1 is the schema version the
/// migration produces.
const MIGRATIONS: &[Migration] = &[migrate_v1, migrate_v2];

pub fn apply(conn: &Connection) -> WebletResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )
    .map_err(|e| WebletError::store(format!("Failed to create version table: {}", e)))?;

    let current: i64 = conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .optional()
        .map_err(|e| WebletError::store(format!("Failed to read schema version: {}", e)))?
        .unwrap_or(0);

    let target = MIGRATIONS.len() as i64;
    if current > target {
        return Err(WebletError::store(format!(
            "Database schema version {} is newer than supported version {}",
            current, target
        )));
    }

    for (i, migration) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let version = i as i64 + 1;
        log::info!("Migrating database schema to version {}", version);
        migration(conn)
            .map_err(|e| WebletError::store(format!("Migration {} failed: {}", version, e)))?;
    }

    if current == 0 {
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [target])
    } else {
        conn.execute("UPDATE schema_version SET version = ?1", [target])
    }
    .map_err(|e| WebletError::store(format!("Failed to record schema version: {}", e)))?;

    Ok(())
}

fn migrate_v1(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS webapps (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            url TEXT NOT NULL,
            icon_path TEXT,
            category TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS webapp_settings (
            webapp_id TEXT PRIMARY KEY REFERENCES webapps(id) ON DELETE CASCADE,
            allow_tabs INTEGER NOT NULL,
            allow_popups INTEGER NOT NULL,
            run_background INTEGER NOT NULL,
            show_tray INTEGER NOT NULL,
            enable_notif INTEGER NOT NULL,
            user_agent TEXT,
            javascript INTEGER NOT NULL,
            zoom_level REAL NOT NULL,
            window_width INTEGER NOT NULL,
            window_height INTEGER NOT NULL,
            window_x INTEGER,
            window_y INTEGER
        );
        CREATE TABLE IF NOT EXISTS app_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_webapps_name ON webapps(name);",
    )
}

/// Launch tracking columns.
fn migrate_v2(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "ALTER TABLE webapps ADD COLUMN last_opened INTEGER;
        ALTER TABLE webapps ADD COLUMN open_count INTEGER NOT NULL DEFAULT 0;",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_reaches_latest_version() {
        let conn = Connection::open_in_memory().unwrap();
        apply(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply(&conn).unwrap();
        apply(&conn).unwrap();
    }

    #[test]
    fn test_v1_database_gains_launch_columns() {
        let conn = Connection::open_in_memory().unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_version (version INTEGER NOT NULL);
             INSERT INTO schema_version (version) VALUES (1);",
        )
        .unwrap();

        apply(&conn).unwrap();

        // The new columns exist and default sensibly.
        conn.execute(
            "INSERT INTO webapps (id, name, url, created_at) VALUES ('a', 'A', 'https://a/', 0)",
            [],
        )
        .unwrap();
        let count: i64 = conn
            .query_row("SELECT open_count FROM webapps WHERE id = 'a'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_future_version_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        apply(&conn).unwrap();
        conn.execute("UPDATE schema_version SET version = 99", [])
            .unwrap();
        assert!(apply(&conn).is_err());
    }
}
