//! core::config
//!
//! Configuration schema and layered loading.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Built-in defaults ([`Settings::default`])
//! 2. `<homepath>/conf/defaults.toml`
//! 3. Command-line default overrides: `cfg:default.<section>.<key>=<value>`
//! 4. Custom file: `--config <path>`, else `<homepath>/conf/custom.toml`
//! 5. Environment: `DASH_<SECTION>_<KEY>`
//! 6. Command-line overrides: `cfg:<section>.<key>=<value>`
//!
//! The home path is `--homepath` when given, otherwise the current
//! directory. Relative paths in the settings resolve against it.
//!
//! # Example
//!
//! ```no_run
//! use dashcli::core::config::{Cfg, CommandLineArgs};
//!
//! let mut cfg = Cfg::new();
//! cfg.load(&CommandLineArgs {
//!     config: String::new(),
//!     home_path: "/usr/share/dash".to_string(),
//!     args: vec!["cfg:paths.data=/var/lib/dash".to_string()],
//! })
//! .unwrap();
//! cfg.log_config_sources();
//! println!("database: {}", cfg.database_path().display());
//! ```

pub mod schema;

pub use schema::{DatabaseSection, PathsSection, SecuritySection, Settings};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Prefix that marks a positional argument as a configuration override.
pub const OVERRIDE_PREFIX: &str = "cfg:";

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "DASH";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("config file '{0}' does not exist")]
    MissingConfigFile(PathBuf),

    #[error("home path '{0}' is not a directory")]
    InvalidHomePath(PathBuf),

    #[error("could not determine home path: {0}")]
    NoHomePath(std::io::Error),

    #[error("invalid config override '{0}', expected cfg:[default.]<section>.<key>=<value>")]
    InvalidOverride(String),

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Raw invocation inputs that feed configuration loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLineArgs {
    /// Custom config file (`--config`); empty when not given.
    pub config: String,
    /// Home path (`--homepath`); empty when not given.
    pub home_path: String,
    /// Positional arguments; `cfg:` entries are overrides, the rest is ignored.
    pub args: Vec<String>,
}

/// One place a configuration value was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    DefaultsFile(PathBuf),
    CommandLineDefault(String),
    CustomFile(PathBuf),
    Environment(String),
    CommandLine(String),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Defaults => write!(f, "Config loaded from built-in defaults"),
            ConfigSource::DefaultsFile(path) | ConfigSource::CustomFile(path) => {
                write!(f, "Config loaded from file: {}", path.display())
            }
            ConfigSource::CommandLineDefault(arg) => {
                write!(f, "Config overridden from command line (default): {}", arg)
            }
            ConfigSource::Environment(var) => {
                write!(f, "Config overridden from environment variable: {}", var)
            }
            ConfigSource::CommandLine(arg) => {
                write!(f, "Config overridden from command line: {}", arg)
            }
        }
    }
}

/// A parsed `cfg:` positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Override {
    as_default: bool,
    section: String,
    key: String,
    value: String,
}

impl Override {
    fn parse(arg: &str) -> Result<Option<Self>, ConfigError> {
        let Some(rest) = arg.strip_prefix(OVERRIDE_PREFIX) else {
            return Ok(None);
        };
        let invalid = || ConfigError::InvalidOverride(arg.to_string());

        let (path, value) = rest.split_once('=').ok_or_else(invalid)?;
        let (as_default, path) = match path.strip_prefix("default.") {
            Some(stripped) => (true, stripped),
            None => (false, path),
        };
        let (section, key) = path.split_once('.').ok_or_else(invalid)?;
        if section.is_empty() || key.is_empty() || key.contains('.') {
            return Err(invalid());
        }

        Ok(Some(Self {
            as_default,
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }))
    }

    fn describe(&self) -> String {
        format!(
            "{}.{}={}",
            self.section,
            self.key,
            redact(&self.key, &self.value)
        )
    }
}

fn redact(key: &str, value: &str) -> String {
    let key = key.to_ascii_lowercase();
    if key.contains("password") || key.contains("secret") {
        "*********".to_string()
    } else {
        value.to_string()
    }
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone, Default)]
pub struct Cfg {
    settings: Settings,
    home_path: PathBuf,
    sources: Vec<ConfigSource>,
}

impl Cfg {
    /// An empty configuration; call [`Cfg::load`] before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every layer using the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the home path or an explicitly named config file
    /// is missing, a file cannot be read or parsed, an override is
    /// malformed, or the merged result fails validation. Missing optional
    /// files are not an error.
    pub fn load(&mut self, args: &CommandLineArgs) -> Result<(), ConfigError> {
        self.load_with_env(args, |name| std::env::var(name).ok())
    }

    /// Resolve every layer, reading environment overrides through `env`.
    pub fn load_with_env<F>(&mut self, args: &CommandLineArgs, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home_path = resolve_home_path(&args.home_path)?;

        let mut overrides = Vec::new();
        for arg in &args.args {
            if let Some(o) = Override::parse(arg)? {
                overrides.push(o);
            }
        }

        let mut merged = default_table()?;
        let mut sources = vec![ConfigSource::Defaults];

        let defaults_file = home_path.join("conf").join("defaults.toml");
        if defaults_file.is_file() {
            merge_tables(&mut merged, read_layer(&defaults_file)?);
            sources.push(ConfigSource::DefaultsFile(defaults_file));
        }

        for o in overrides.iter().filter(|o| o.as_default) {
            set_value(&mut merged, o);
            sources.push(ConfigSource::CommandLineDefault(o.describe()));
        }

        if let Some(custom) = custom_file(&args.config, &home_path)? {
            merge_tables(&mut merged, read_layer(&custom)?);
            sources.push(ConfigSource::CustomFile(custom));
        }

        apply_env(&mut merged, &env, &mut sources);

        for o in overrides.iter().filter(|o| !o.as_default) {
            set_value(&mut merged, o);
            sources.push(ConfigSource::CommandLine(o.describe()));
        }

        let settings: Settings = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::InvalidValue(e.to_string()))?;
        settings.validate()?;

        self.settings = settings;
        self.home_path = home_path;
        self.sources = sources;
        Ok(())
    }

    /// Lines describing every source consulted, in precedence order.
    pub fn config_source_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.sources.iter().map(|s| s.to_string()).collect();
        lines.push(format!("Path home: {}", self.home_path.display()));
        lines.push(format!("Path data: {}", self.data_path().display()));
        lines.push(format!("Path logs: {}", self.logs_path().display()));
        lines.push(format!("Path plugins: {}", self.plugins_path().display()));
        lines
    }

    /// Log every source consulted while loading.
    pub fn log_config_sources(&self) {
        for line in self.config_source_lines() {
            log::info!("{}", line);
        }
    }

    // =========================================================================
    // Accessor methods
    // =========================================================================

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    pub fn home_path(&self) -> &Path {
        &self.home_path
    }

    fn resolve(&self, value: &str) -> PathBuf {
        let path = Path::new(value);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.home_path.join(path)
        }
    }

    pub fn data_path(&self) -> PathBuf {
        self.resolve(&self.settings.paths.data)
    }

    pub fn logs_path(&self) -> PathBuf {
        self.resolve(&self.settings.paths.logs)
    }

    pub fn plugins_path(&self) -> PathBuf {
        self.resolve(&self.settings.paths.plugins)
    }

    pub fn database_type(&self) -> &str {
        &self.settings.database.db_type
    }

    /// Database file; relative values resolve against the data path.
    pub fn database_path(&self) -> PathBuf {
        let path = Path::new(&self.settings.database.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_path().join(path)
        }
    }

    pub fn admin_user(&self) -> &str {
        &self.settings.security.admin_user
    }

    pub fn admin_password(&self) -> &str {
        &self.settings.security.admin_password
    }

    pub fn secret_key(&self) -> &str {
        &self.settings.security.secret_key
    }
}

fn resolve_home_path(flag: &str) -> Result<PathBuf, ConfigError> {
    if flag.is_empty() {
        return std::env::current_dir().map_err(ConfigError::NoHomePath);
    }
    let path = PathBuf::from(flag);
    if !path.is_dir() {
        return Err(ConfigError::InvalidHomePath(path));
    }
    Ok(path)
}

fn custom_file(flag: &str, home_path: &Path) -> Result<Option<PathBuf>, ConfigError> {
    if !flag.is_empty() {
        let path = PathBuf::from(flag);
        if !path.is_file() {
            return Err(ConfigError::MissingConfigFile(path));
        }
        return Ok(Some(path));
    }
    let fallback = home_path.join("conf").join("custom.toml");
    Ok(fallback.is_file().then_some(fallback))
}

fn default_table() -> Result<toml::Table, ConfigError> {
    match toml::Value::try_from(Settings::default()) {
        Ok(toml::Value::Table(table)) => Ok(table),
        Ok(_) => Err(ConfigError::InvalidValue(
            "default settings did not serialize to a table".to_string(),
        )),
        Err(e) => Err(ConfigError::InvalidValue(e.to_string())),
    }
}

/// Read one file layer, rejecting anything the schema does not know.
fn read_layer(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str::<Settings>(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    toml::from_str::<toml::Table>(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn set_value(table: &mut toml::Table, o: &Override) {
    let section = table
        .entry(o.section.clone())
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    if let toml::Value::Table(section) = section {
        section.insert(o.key.clone(), toml::Value::String(o.value.clone()));
    }
}

fn env_var_name(section: &str, key: &str) -> String {
    format!("{}_{}_{}", ENV_PREFIX, section, key)
        .to_ascii_uppercase()
        .replace(['.', '-'], "_")
}

fn apply_env<F>(table: &mut toml::Table, env: &F, sources: &mut Vec<ConfigSource>)
where
    F: Fn(&str) -> Option<String>,
{
    for (section, value) in table.iter_mut() {
        let toml::Value::Table(keys) = value else {
            continue;
        };
        for (key, slot) in keys.iter_mut() {
            let var = env_var_name(section, key);
            if let Some(found) = env(&var) {
                sources.push(ConfigSource::Environment(format!(
                    "{}={}",
                    var,
                    redact(key, &found)
                )));
                *slot = toml::Value::String(found);
            }
        }
    }
}
