//! store::datasources
//!
//! Data source rows. `secure_json_data` holds a JSON object whose values
//! are sealed with the server secret (see [`crate::security::seal`]).

use rusqlite::{params, OptionalExtension, Row};

use super::{now, SqlStore, StoreError};
use crate::core::bus::Event;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub id: i64,
    pub name: String,
    pub ds_type: String,
    pub url: String,
    pub password: String,
    pub basic_auth_password: String,
    pub secure_json_data: String,
}

/// Fields needed to insert a data source.
#[derive(Debug, Clone, Default)]
pub struct NewDataSource {
    pub name: String,
    pub ds_type: String,
    pub url: String,
    pub password: String,
    pub basic_auth_password: String,
}

const COLUMNS: &str =
    "id, name, type, url, password, basic_auth_password, secure_json_data";

impl DataSource {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            ds_type: row.get("type")?,
            url: row.get("url")?,
            password: row.get("password")?,
            basic_auth_password: row.get("basic_auth_password")?,
            secure_json_data: row.get("secure_json_data")?,
        })
    }

    /// True when any secret is still stored in plaintext.
    pub fn has_plaintext_secrets(&self) -> bool {
        !self.password.is_empty() || !self.basic_auth_password.is_empty()
    }
}

impl SqlStore {
    pub fn add_data_source(&self, new: &NewDataSource) -> Result<i64, StoreError> {
        let ts = now();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO data_source (name, type, url, password, basic_auth_password, created, updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                new.name,
                new.ds_type,
                new.url,
                new.password,
                new.basic_auth_password,
                ts
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All data sources ordered by id.
    pub fn data_sources(&self) -> Result<Vec<DataSource>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM data_source ORDER BY id", COLUMNS))?;
        let rows = stmt.query_map([], DataSource::from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_data_source(&self, id: i64) -> Result<Option<DataSource>, StoreError> {
        let ds = self
            .conn()?
            .query_row(
                &format!("SELECT {} FROM data_source WHERE id = ?1", COLUMNS),
                params![id],
                DataSource::from_row,
            )
            .optional()?;
        Ok(ds)
    }

    /// Store sealed secrets and clear the plaintext columns.
    pub fn secure_data_source(
        &self,
        ds: &DataSource,
        secure_json_data: &str,
    ) -> Result<(), StoreError> {
        let changed = self.conn()?.execute(
            "UPDATE data_source
             SET secure_json_data = ?1, password = '', basic_auth_password = '', updated = ?2
             WHERE id = ?3",
            params![secure_json_data, now(), ds.id],
        )?;
        if changed == 0 {
            return Err(StoreError::DataSourceNotFound(ds.id));
        }

        self.bus().publish(&Event::DataSourceSecured {
            id: ds.id,
            name: ds.name.clone(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::store_in;
    use super::*;
    use tempfile::TempDir;

    fn prometheus(password: &str) -> NewDataSource {
        NewDataSource {
            name: "prometheus".to_string(),
            ds_type: "prometheus".to_string(),
            url: "http://localhost:9090".to_string(),
            password: password.to_string(),
            basic_auth_password: String::new(),
        }
    }

    #[test]
    fn add_and_read_back() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let id = store.add_data_source(&prometheus("pw")).unwrap();
        let ds = store.get_data_source(id).unwrap().unwrap();

        assert_eq!(ds.name, "prometheus");
        assert_eq!(ds.password, "pw");
        assert_eq!(ds.secure_json_data, "{}");
        assert!(ds.has_plaintext_secrets());
        assert_eq!(store.data_sources().unwrap(), vec![ds]);
    }

    #[test]
    fn secure_clears_plaintext() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let id = store.add_data_source(&prometheus("pw")).unwrap();
        let ds = store.get_data_source(id).unwrap().unwrap();

        store.secure_data_source(&ds, r#"{"password":"sealed"}"#).unwrap();

        let ds = store.get_data_source(id).unwrap().unwrap();
        assert!(!ds.has_plaintext_secrets());
        assert_eq!(ds.secure_json_data, r#"{"password":"sealed"}"#);
    }

    #[test]
    fn secure_missing_row_fails() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let ghost = DataSource {
            id: 42,
            name: "ghost".to_string(),
            ds_type: String::new(),
            url: String::new(),
            password: String::new(),
            basic_auth_password: String::new(),
            secure_json_data: String::new(),
        };

        assert!(matches!(
            store.secure_data_source(&ghost, "{}"),
            Err(StoreError::DataSourceNotFound(42))
        ));
    }
}
