//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! [paths]
//! data = "data"
//! plugins = "data/plugins"
//!
//! [database]
//! type = "sqlite3"
//! path = "dash.db"
//!
//! [security]
//! admin_user = "admin"
//! secret_key = "change-me"
//! ```
//!
//! # Validation
//!
//! Every file layer is parsed on its own against these types before it is
//! merged, so unknown sections or keys are reported with the offending path.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Database types the store knows how to open.
pub const SUPPORTED_DATABASES: &[&str] = &["sqlite3"];

/// All settings after every layer has been applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub paths: PathsSection,
    pub database: DatabaseSection,
    pub security: SecuritySection,
}

impl Settings {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.admin_user.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "security.admin_user must not be empty".to_string(),
            ));
        }
        if self.security.secret_key.is_empty() {
            return Err(ConfigError::InvalidValue(
                "security.secret_key must not be empty".to_string(),
            ));
        }
        if self.database.path.is_empty() {
            return Err(ConfigError::InvalidValue(
                "database.path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Filesystem locations. Relative values resolve against the home path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PathsSection {
    pub data: String,
    pub logs: String,
    pub plugins: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            data: "data".to_string(),
            logs: "data/log".to_string(),
            plugins: "data/plugins".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSection {
    /// Database driver (only `sqlite3` is supported)
    #[serde(rename = "type")]
    pub db_type: String,

    /// Database file, relative to the data path unless absolute
    pub path: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            db_type: "sqlite3".to_string(),
            path: "dash.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SecuritySection {
    /// Login of the built-in administrator
    pub admin_user: String,

    /// Password given to the administrator when the store creates it
    pub admin_password: String,

    /// Key used to seal data source secrets
    pub secret_key: String,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            admin_user: "admin".to_string(),
            admin_password: "admin".to_string(),
            secret_key: "dash-change-me-secret".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [database]
            path = "/var/lib/dash/dash.db"
            "#,
        )
        .unwrap();

        assert_eq!(settings.database.path, "/var/lib/dash/dash.db");
        assert_eq!(settings.database.db_type, "sqlite3");
        assert_eq!(settings.paths.plugins, "data/plugins");
    }

    #[test]
    fn database_type_uses_type_key() {
        let settings: Settings = toml::from_str("[database]\ntype = \"postgres\"").unwrap();
        assert_eq!(settings.database.db_type, "postgres");
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<Settings, _> = toml::from_str("[server]\nhttp_port = \"3000\"");
        assert!(result.is_err());
    }

    #[test]
    fn empty_admin_user_rejected() {
        let mut settings = Settings::default();
        settings.security.admin_user = "  ".to_string();
        assert!(settings.validate().is_err());
    }
}
