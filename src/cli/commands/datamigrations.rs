//! data-migration commands - One-off fixes to data already in the database

use anyhow::Result;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::cli::context::CommandLine;
use crate::security;
use crate::store::{DataSource, SqlStore};
use crate::ui::Terminal;

/// Name recorded in `migration_log` for each run.
pub const ENCRYPT_DATASOURCE_PASSWORDS: &str = "encrypt datasource passwords";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("data source {id} has invalid secure_json_data: {message}")]
    InvalidSecureJson { id: i64, message: String },
}

fn secure_fields(ds: &DataSource) -> Result<Map<String, Value>, MigrationError> {
    if ds.secure_json_data.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str(&ds.secure_json_data) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(MigrationError::InvalidSecureJson {
            id: ds.id,
            message: "not a JSON object".to_string(),
        }),
        Err(e) => Err(MigrationError::InvalidSecureJson {
            id: ds.id,
            message: e.to_string(),
        }),
    }
}

/// `admin data-migration encrypt-datasource-passwords`
///
/// Moves plaintext `password` and `basic_auth_password` values into sealed
/// entries of `secure_json_data`. Rows without plaintext secrets are left
/// alone, so running it again changes nothing.
pub fn encrypt_datasource_passwords(
    _ctx: &dyn CommandLine,
    term: &mut Terminal,
    store: &SqlStore,
) -> Result<()> {
    let secret = store.cfg().secret_key().to_string();

    let updated = store.with_transaction(|store| {
        let mut updated = 0usize;
        for ds in store.data_sources()? {
            if !ds.has_plaintext_secrets() {
                continue;
            }
            let mut secure = secure_fields(&ds)?;
            if !ds.password.is_empty() {
                secure.insert(
                    "password".to_string(),
                    Value::String(security::seal(&secret, &ds.password)?),
                );
            }
            if !ds.basic_auth_password.is_empty() {
                secure.insert(
                    "basicAuthPassword".to_string(),
                    Value::String(security::seal(&secret, &ds.basic_auth_password)?),
                );
            }
            store.secure_data_source(&ds, &Value::Object(secure).to_string())?;
            log::debug!("secured data source {} ({})", ds.id, ds.name);
            updated += 1;
        }
        store.record_migration(
            ENCRYPT_DATASOURCE_PASSWORDS,
            &format!("secured {} data source(s)", updated),
        )?;
        Ok(updated)
    })?;

    term.line(format!("{} data source(s) updated", updated));
    Ok(())
}
