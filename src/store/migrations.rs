//! store::migrations
//!
//! Schema migrations.
//!
//! Each migration runs once, inside its own transaction, and is recorded in
//! `migration_log`. Data migrations run by commands are logged in the same
//! table through [`SqlStore::record_migration`].

use rusqlite::{params, Connection, OptionalExtension};

use super::{now, SqlStore, StoreError};

/// One schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

const CREATE_LOG: &str = "CREATE TABLE IF NOT EXISTS migration_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    migration_id TEXT NOT NULL,
    sql TEXT NOT NULL,
    success INTEGER NOT NULL,
    error TEXT NOT NULL DEFAULT '',
    timestamp TEXT NOT NULL
)";

/// Schema steps in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        id: "create user table",
        sql: "CREATE TABLE user (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            login TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL DEFAULT '',
            password TEXT NOT NULL DEFAULT '',
            salt TEXT NOT NULL DEFAULT '',
            is_admin INTEGER NOT NULL DEFAULT 0,
            created TEXT NOT NULL,
            updated TEXT NOT NULL
        )",
    },
    Migration {
        id: "create data_source table",
        sql: "CREATE TABLE data_source (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            type TEXT NOT NULL,
            url TEXT NOT NULL DEFAULT '',
            password TEXT NOT NULL DEFAULT '',
            basic_auth_password TEXT NOT NULL DEFAULT '',
            created TEXT NOT NULL,
            updated TEXT NOT NULL
        )",
    },
    Migration {
        id: "add secure_json_data to data_source",
        sql: "ALTER TABLE data_source ADD COLUMN secure_json_data TEXT NOT NULL DEFAULT '{}'",
    },
];

fn already_applied(conn: &Connection, id: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT 1 FROM migration_log WHERE migration_id = ?1 AND success = 1 LIMIT 1",
        params![id],
        |_| Ok(()),
    )
    .optional()
    .map(|row| row.is_some())
}

/// Apply every pending migration. Returns how many ran.
pub fn run(conn: &Connection) -> Result<usize, StoreError> {
    conn.execute_batch(CREATE_LOG)
        .map_err(|e| StoreError::Migration {
            id: "create migration_log table",
            source: e,
        })?;

    let mut applied = 0;
    for migration in MIGRATIONS {
        let wrap = |e| StoreError::Migration {
            id: migration.id,
            source: e,
        };
        if already_applied(conn, migration.id).map_err(wrap)? {
            continue;
        }

        let tx = conn.unchecked_transaction().map_err(wrap)?;
        tx.execute_batch(migration.sql).map_err(wrap)?;
        tx.execute(
            "INSERT INTO migration_log (migration_id, sql, success, timestamp)
             VALUES (?1, ?2, 1, ?3)",
            params![migration.id, migration.sql, now()],
        )
        .map_err(wrap)?;
        tx.commit().map_err(wrap)?;

        log::debug!("migration applied: {}", migration.id);
        applied += 1;
    }
    Ok(applied)
}

impl SqlStore {
    /// Record a data migration run by a command.
    pub fn record_migration(&self, migration_id: &str, detail: &str) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO migration_log (migration_id, sql, success, timestamp)
             VALUES (?1, ?2, 1, ?3)",
            params![migration_id, detail, now()],
        )?;
        Ok(())
    }

    /// How many times `migration_id` has been recorded as successful.
    pub fn migration_runs(&self, migration_id: &str) -> Result<i64, StoreError> {
        let count = self.conn()?.query_row(
            "SELECT COUNT(*) FROM migration_log WHERE migration_id = ?1 AND success = 1",
            params![migration_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_applies_all_then_nothing() {
        let conn = Connection::open_in_memory().unwrap();

        assert_eq!(run(&conn).unwrap(), MIGRATIONS.len());
        assert_eq!(run(&conn).unwrap(), 0);

        let logged: i64 = conn
            .query_row("SELECT COUNT(*) FROM migration_log", [], |r| r.get(0))
            .unwrap();
        assert_eq!(logged, MIGRATIONS.len() as i64);
    }

    #[test]
    fn migration_ids_are_unique() {
        let mut ids: Vec<_> = MIGRATIONS.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), MIGRATIONS.len());
    }
}
