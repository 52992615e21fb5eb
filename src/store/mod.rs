//! store
//!
//! SQLite-backed storage handle for database commands.
//!
//! # Lifecycle
//!
//! A [`SqlStore`] is built per invocation from a loaded [`Cfg`] and the
//! process event bus, then [`SqlStore::init`] opens the database, applies
//! schema migrations, and makes sure the configured administrator exists.
//! Every query method fails with [`StoreError::NotInitialized`] before
//! `init` succeeds. The connection closes when the store is dropped.
//!
//! # Modules
//!
//! - [`migrations`] - Schema migrations and the migration log
//! - [`users`] - User rows and password changes
//! - [`datasources`] - Data source rows and their secrets

pub mod datasources;
pub mod migrations;
pub mod users;

pub use datasources::{DataSource, NewDataSource};
pub use users::User;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;
use thiserror::Error;

use crate::core::bus::{Bus, BusError, Event};
use crate::core::config::schema::SUPPORTED_DATABASES;
use crate::core::config::Cfg;
use crate::security::SecurityError;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unsupported database type '{db_type}', supported: {}", SUPPORTED_DATABASES.join(", "))]
    UnsupportedDatabase { db_type: String },

    #[error("failed to create database directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open database '{path}': {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    #[error("migration '{id}' failed: {source}")]
    Migration {
        id: &'static str,
        source: rusqlite::Error,
    },

    #[error("store is already initialized")]
    AlreadyInitialized,

    #[error("store is not initialized")]
    NotInitialized,

    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("data source {0} not found")]
    DataSourceNotFound(i64),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Storage handle owned by a single invocation.
#[derive(Debug)]
pub struct SqlStore {
    cfg: Cfg,
    bus: Arc<Bus>,
    conn: Option<Connection>,
}

impl SqlStore {
    /// Attach configuration and the event bus. Nothing is opened yet.
    pub fn new(cfg: Cfg, bus: Arc<Bus>) -> Self {
        Self {
            cfg,
            bus,
            conn: None,
        }
    }

    pub fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    pub fn is_initialized(&self) -> bool {
        self.conn.is_some()
    }

    /// Open the database and bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Fails if the database type is unsupported, the database cannot be
    /// created or opened, a migration fails, or `init` already ran.
    pub fn init(&mut self) -> Result<(), StoreError> {
        if self.conn.is_some() {
            return Err(StoreError::AlreadyInitialized);
        }

        let db_type = self.cfg.database_type();
        if !SUPPORTED_DATABASES.contains(&db_type) {
            return Err(StoreError::UnsupportedDatabase {
                db_type: db_type.to_string(),
            });
        }

        let path = self.cfg.database_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(&path).map_err(|e| StoreError::Open {
            path: path.clone(),
            source: e,
        })?;
        conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;")?;

        let applied = migrations::run(&conn)?;
        log::debug!("applied {} schema migration(s)", applied);

        self.conn = Some(conn);
        self.ensure_admin_user()?;

        log::info!("Connected to database: {}", path.display());
        self.bus.publish(&Event::StoreInitialized { path })?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or(StoreError::NotInitialized)
    }

    /// Run `f` inside a transaction; commit when it returns `Ok`.
    pub fn with_transaction<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Self) -> anyhow::Result<T>,
    {
        let tx = self.conn()?.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }
}

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}


#[cfg(test)]
mod tests {
    use super::test_support::store_in;
    use super::*;
    use crate::core::config::CommandLineArgs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn cfg_with(temp: &TempDir, args: &[&str]) -> Cfg {
        let mut cfg = Cfg::new();
        cfg.load_with_env(
            &CommandLineArgs {
                config: String::new(),
                home_path: temp.path().to_string_lossy().into_owned(),
                args: args.iter().map(|s| s.to_string()).collect(),
            },
            |_| None,
        )
        .unwrap();
        cfg
    }

    #[test]
    fn init_creates_database_and_publishes() {
        let temp = TempDir::new().unwrap();
        let bus = Arc::new(Bus::new());
        let seen = Arc::new(AtomicUsize::new(0));
        {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |event| {
                if matches!(event, Event::StoreInitialized { .. }) {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            });
        }

        let mut store = SqlStore::new(cfg_with(&temp, &[]), bus);
        assert!(!store.is_initialized());
        store.init().unwrap();

        assert!(store.is_initialized());
        assert!(temp.path().join("data/dash.db").exists());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn second_init_rejected() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        assert!(matches!(store.init(), Err(StoreError::AlreadyInitialized)));
    }

    #[test]
    fn unsupported_database_type_rejected() {
        let temp = TempDir::new().unwrap();
        let cfg = cfg_with(&temp, &["cfg:database.type=postgres"]);
        let mut store = SqlStore::new(cfg, Arc::new(Bus::new()));

        let err = store.init().unwrap_err();
        assert!(err.to_string().contains("postgres"));
        assert!(!store.is_initialized());
        assert!(!temp.path().join("data").exists());
    }

    #[test]
    fn queries_require_init() {
        let temp = TempDir::new().unwrap();
        let store = SqlStore::new(cfg_with(&temp, &[]), Arc::new(Bus::new()));
        assert!(matches!(
            store.get_user_by_login("admin"),
            Err(StoreError::NotInitialized)
        ));
    }

    #[test]
    fn reopening_existing_database_is_idempotent() {
        let temp = TempDir::new().unwrap();
        drop(store_in(&temp));
        let store = store_in(&temp);

        let admins: i64 = store
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM user WHERE login = 'admin'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(admins, 1);
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let result: anyhow::Result<()> = store.with_transaction(|s| {
            s.add_data_source(&NewDataSource {
                name: "temp".to_string(),
                ds_type: "prometheus".to_string(),
                url: String::new(),
                password: String::new(),
                basic_auth_password: String::new(),
            })?;
            anyhow::bail!("abort");
        });

        assert!(result.is_err());
        assert!(store.data_sources().unwrap().is_empty());
    }
}
