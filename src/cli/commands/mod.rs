//! cli::commands
//!
//! The registered command tree and its handlers.
//!
//! # Architecture
//!
//! Each leaf binds exactly one handler through an adapter:
//! - `plugins ...` leaves use the stateless profile ([`Action::Plugin`])
//! - `admin ...` leaves use the database profile ([`Action::Database`])
//!
//! [`Handlers`] holds the handler for every leaf so the same tree can be
//! built around probe handlers in tests.

mod admin;
mod datamigrations;
mod plugins;

pub use admin::{reset_password_command, AdminError, MIN_PASSWORD_LEN};
pub use datamigrations::{encrypt_datasource_passwords, MigrationError, ENCRYPT_DATASOURCE_PASSWORDS};
pub use plugins::{
    install_command, list_remote_command, list_versions_command, ls_command, remove_command,
    upgrade_all_command, upgrade_command,
};

use super::adapters::{Action, DbHandler, PluginHandler, CONFIG_FLAG, HOMEPATH_FLAG};
use super::tree::{CommandSpec, CommandTree, FlagSpec, TreeError};

/// One handler per leaf command.
pub struct Handlers {
    pub install: PluginHandler,
    pub list_remote: PluginHandler,
    pub list_versions: PluginHandler,
    pub upgrade: PluginHandler,
    pub upgrade_all: PluginHandler,
    pub ls: PluginHandler,
    pub remove: PluginHandler,
    pub reset_admin_password: DbHandler,
    pub encrypt_datasource_passwords: DbHandler,
}

impl Handlers {
    /// Build every handler from a factory keyed by the leaf's name.
    pub fn from_factories<P, D>(plugin: P, db: D) -> Self
    where
        P: Fn(&'static str) -> PluginHandler,
        D: Fn(&'static str) -> DbHandler,
    {
        Self {
            install: plugin("install"),
            list_remote: plugin("list-remote"),
            list_versions: plugin("list-versions"),
            upgrade: plugin("update"),
            upgrade_all: plugin("update-all"),
            ls: plugin("ls"),
            remove: plugin("uninstall"),
            reset_admin_password: db("reset-admin-password"),
            encrypt_datasource_passwords: db("encrypt-datasource-passwords"),
        }
    }
}

impl Default for Handlers {
    fn default() -> Self {
        Self {
            install: Box::new(install_command),
            list_remote: Box::new(list_remote_command),
            list_versions: Box::new(list_versions_command),
            upgrade: Box::new(upgrade_command),
            upgrade_all: Box::new(upgrade_all_command),
            ls: Box::new(ls_command),
            remove: Box::new(remove_command),
            reset_admin_password: Box::new(reset_password_command),
            encrypt_datasource_passwords: Box::new(encrypt_datasource_passwords),
        }
    }
}

/// Flags shared by every database-backed leaf.
pub fn db_command_flags() -> Vec<FlagSpec> {
    vec![
        FlagSpec::string(
            HOMEPATH_FLAG,
            "path to dash-server install/home path, defaults to working directory",
        ),
        FlagSpec::string(CONFIG_FLAG, "path to config file"),
    ]
}

/// The root commands: `plugins` and `admin`.
pub fn commands(h: Handlers) -> Vec<CommandSpec> {
    let plugins = CommandSpec::group(
        "plugins",
        "Manage plugins for dash-server",
        vec![
            CommandSpec::leaf(
                "install",
                "install <plugin id> <plugin version (optional)>",
                Action::Plugin(h.install),
            ),
            CommandSpec::leaf(
                "list-remote",
                "list remote available plugins",
                Action::Plugin(h.list_remote),
            ),
            CommandSpec::leaf(
                "list-versions",
                "list-versions <plugin id>",
                Action::Plugin(h.list_versions),
            ),
            CommandSpec::leaf("update", "update <plugin id>", Action::Plugin(h.upgrade))
                .alias("upgrade"),
            CommandSpec::leaf(
                "update-all",
                "update all your installed plugins",
                Action::Plugin(h.upgrade_all),
            )
            .alias("upgrade-all"),
            CommandSpec::leaf("ls", "list all installed plugins", Action::Plugin(h.ls)),
            CommandSpec::leaf("uninstall", "uninstall <plugin id>", Action::Plugin(h.remove))
                .alias("remove"),
        ],
    );

    let admin = CommandSpec::group(
        "admin",
        "dash-server admin commands",
        vec![
            CommandSpec::leaf(
                "reset-admin-password",
                "reset-admin-password <new password>",
                Action::Database(h.reset_admin_password),
            )
            .flags(db_command_flags()),
            CommandSpec::group(
                "data-migration",
                "Runs a script that migrates or cleanups data in your db",
                vec![CommandSpec::leaf(
                    "encrypt-datasource-passwords",
                    "Migrates passwords from unsecured fields to secure_json_data field. \
                     Return ok unless there is an error. Safe to execute multiple times.",
                    Action::Database(h.encrypt_datasource_passwords),
                )
                .flags(db_command_flags())],
            ),
        ],
    );

    vec![plugins, admin]
}

/// [`commands`] wrapped in a validated tree.
pub fn command_tree(handlers: Handlers) -> Result<CommandTree, TreeError> {
    CommandTree::new(commands(handlers))
}
