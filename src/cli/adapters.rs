//! cli::adapters
//!
//! Turn business handlers into command actions.
//!
//! # Profiles
//!
//! - [`Action::Plugin`]: stateless. The handler gets the context and the
//!   terminal. Success prints the restart notice.
//! - [`Action::Database`]: loads layered configuration, builds and
//!   initializes a fresh [`SqlStore`], then calls the handler with it.
//!   Success prints a blank-line separator.
//!
//! Failures from configuration, store initialization or the handler are
//! reported the same way: an `Error` line on stderr followed by the
//! command's help. The returned [`CommandFailure`] keeps the
//! [`FailureKind`] so callers can tell them apart without parsing output.

use std::fmt;
use std::sync::Arc;

use super::context::CommandLine;
use crate::core::bus::Bus;
use crate::core::config::{Cfg, CommandLineArgs};
use crate::store::SqlStore;
use crate::ui::Terminal;

/// Printed after a successful plugin command.
pub const RESTART_NOTICE: &str =
    "\nRestart dash-server after installing plugins . <service dash-server restart>\n\n";

/// Flag naming the dash-server home directory.
pub const HOMEPATH_FLAG: &str = "homepath";
/// Flag naming a custom config file.
pub const CONFIG_FLAG: &str = "config";

pub type PluginHandler = Box<dyn Fn(&dyn CommandLine, &mut Terminal) -> anyhow::Result<()>>;
pub type DbHandler =
    Box<dyn Fn(&dyn CommandLine, &mut Terminal, &SqlStore) -> anyhow::Result<()>>;

/// What a leaf command runs.
pub enum Action {
    Plugin(PluginHandler),
    Database(DbHandler),
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Plugin(_) => f.write_str("Action::Plugin"),
            Action::Database(_) => f.write_str("Action::Database"),
        }
    }
}

/// Bind a handler with the stateless profile.
pub fn plugin_command<F>(handler: F) -> Action
where
    F: Fn(&dyn CommandLine, &mut Terminal) -> anyhow::Result<()> + 'static,
{
    Action::Plugin(Box::new(handler))
}

/// Bind a handler with the database profile.
pub fn db_command<F>(handler: F) -> Action
where
    F: Fn(&dyn CommandLine, &mut Terminal, &SqlStore) -> anyhow::Result<()> + 'static,
{
    Action::Database(Box::new(handler))
}

/// Which step of an invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Config,
    Store,
    Handler,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Config => "config",
            FailureKind::Store => "store",
            FailureKind::Handler => "handler",
        };
        f.write_str(name)
    }
}

/// A failed command, already reported to the terminal.
#[derive(Debug)]
pub struct CommandFailure {
    pub kind: FailureKind,
    pub error: anyhow::Error,
}

impl CommandFailure {
    pub fn new(kind: FailureKind, error: impl Into<anyhow::Error>) -> Self {
        Self {
            kind,
            error: error.into(),
        }
    }

    /// The error chain on one line.
    pub fn message(&self) -> String {
        format!("{:#}", self.error)
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.error)
    }
}

impl Action {
    /// Run the bound handler under its profile and report the outcome.
    pub fn invoke(
        &self,
        ctx: &dyn CommandLine,
        term: &mut Terminal,
        bus: &Arc<Bus>,
    ) -> Result<(), CommandFailure> {
        match self {
            Action::Plugin(handler) => run_plugin(handler, ctx, term),
            Action::Database(handler) => run_database(handler, ctx, term, bus),
        }
    }
}

fn run_plugin(
    handler: &PluginHandler,
    ctx: &dyn CommandLine,
    term: &mut Terminal,
) -> Result<(), CommandFailure> {
    match handler(ctx, term) {
        Ok(()) => {
            term.print(RESTART_NOTICE);
            Ok(())
        }
        Err(e) => {
            let failure = CommandFailure::new(FailureKind::Handler, e);
            let line = format!(
                "\n{}: {} {}\n\n",
                term.highlight("Error"),
                term.highlight("✗"),
                failure.message()
            );
            term.eprint(line);
            ctx.show_help(term);
            Err(failure)
        }
    }
}

fn run_database(
    handler: &DbHandler,
    ctx: &dyn CommandLine,
    term: &mut Terminal,
    bus: &Arc<Bus>,
) -> Result<(), CommandFailure> {
    let result = open_store(ctx, bus).and_then(|store| {
        handler(ctx, term, &store).map_err(|e| CommandFailure::new(FailureKind::Handler, e))
    });

    match result {
        Ok(()) => {
            term.print("\n\n");
            Ok(())
        }
        Err(failure) => {
            let line = format!("\n{}: {}\n\n", term.highlight("Error"), failure.message());
            term.eprint(line);
            ctx.show_help(term);
            Err(failure)
        }
    }
}

/// Resolve configuration and initialize a store for one invocation.
fn open_store(ctx: &dyn CommandLine, bus: &Arc<Bus>) -> Result<SqlStore, CommandFailure> {
    let args = CommandLineArgs {
        config: ctx.string(CONFIG_FLAG),
        home_path: ctx.string(HOMEPATH_FLAG),
        args: ctx.args().to_vec(),
    };

    let mut cfg = Cfg::new();
    cfg.load(&args)
        .map_err(|e| CommandFailure::new(FailureKind::Config, e))?;
    cfg.log_config_sources();

    let mut store = SqlStore::new(cfg, Arc::clone(bus));
    store
        .init()
        .map_err(|e| CommandFailure::new(FailureKind::Store, e))?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::context::ContextCommandLine;
    use anyhow::bail;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn ctx(args: &[&str]) -> ContextCommandLine {
        ContextCommandLine::new(
            vec!["plugins".to_string(), "ls".to_string()],
            args.iter().map(|s| s.to_string()).collect(),
        )
        .with_help("Usage: dash-cli plugins ls")
    }

    fn db_ctx(home: &TempDir, args: &[&str]) -> ContextCommandLine {
        ctx(args).with_flag(HOMEPATH_FLAG, home.path().to_string_lossy())
    }

    #[test]
    fn plugin_success_prints_restart_notice() {
        let action = plugin_command(|_, term| {
            term.line("ok");
            Ok(())
        });
        let mut term = Terminal::captured();

        action
            .invoke(&ctx(&[]), &mut term, &Arc::new(Bus::new()))
            .unwrap();

        assert_eq!(term.stdout_text(), format!("ok\n{}", RESTART_NOTICE));
        assert_eq!(term.stderr_text(), "");
    }

    #[test]
    fn plugin_failure_reports_error_and_help() {
        let action = plugin_command(|_, _| bail!("plugin not found: x"));
        let mut term = Terminal::captured();

        let failure = action
            .invoke(&ctx(&[]), &mut term, &Arc::new(Bus::new()))
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Handler);
        assert_eq!(
            term.stderr_text(),
            "\nError: ✗ plugin not found: x\n\nUsage: dash-cli plugins ls\n"
        );
        assert!(!term.stdout_text().contains("Restart"));
    }

    #[test]
    fn database_success_runs_handler_after_init() {
        let home = TempDir::new().unwrap();
        let bus = Arc::new(Bus::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        {
            let events = Arc::clone(&events);
            bus.subscribe(move |e| {
                events.lock().unwrap().push(e.name());
                Ok(())
            });
        }
        let seen = Arc::clone(&events);
        let action = db_command(move |ctx, _, store| {
            assert!(store.is_initialized());
            assert_eq!(seen.lock().unwrap().as_slice(), &["store-initialized"]);
            assert_eq!(ctx.args()[0], "x");
            Ok(())
        });
        let mut term = Terminal::captured();

        action
            .invoke(&db_ctx(&home, &["x"]), &mut term, &bus)
            .unwrap();

        assert_eq!(term.stdout_text(), "\n\n");
        assert!(home.path().join("data").join("dash.db").is_file());
    }

    #[test]
    fn store_failure_short_circuits_handler() {
        let home = TempDir::new().unwrap();
        let called = Rc::new(Cell::new(false));
        let flag = Rc::clone(&called);
        let action = db_command(move |_, _, _| {
            flag.set(true);
            Ok(())
        });
        let mut term = Terminal::captured();

        let failure = action
            .invoke(
                &db_ctx(&home, &["cfg:database.type=postgres"]),
                &mut term,
                &Arc::new(Bus::new()),
            )
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Store);
        assert!(!called.get());
        assert!(term.stderr_text().starts_with("\nError: "));
        assert!(term.stderr_text().contains("postgres"));
        assert!(term.stderr_text().ends_with("Usage: dash-cli plugins ls\n"));
    }

    #[test]
    fn config_failure_is_classified() {
        let home = TempDir::new().unwrap();
        let action = db_command(|_, _, _| Ok(()));
        let ctx = db_ctx(&home, &[]).with_flag(CONFIG_FLAG, "/definitely/missing.toml");
        let mut term = Terminal::captured();

        let failure = action
            .invoke(&ctx, &mut term, &Arc::new(Bus::new()))
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Config);
        assert!(term.stderr_text().contains("Error: "));
    }

    #[test]
    fn handler_failure_is_classified() {
        let home = TempDir::new().unwrap();
        let action = db_command(|_, _, _| bail!("New password too short"));
        let mut term = Terminal::captured();

        let failure = action
            .invoke(&db_ctx(&home, &[]), &mut term, &Arc::new(Bus::new()))
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Handler);
        assert_eq!(failure.to_string(), "New password too short");
        assert!(term
            .stderr_text()
            .starts_with("\nError: New password too short\n\n"));
    }

    #[test]
    fn database_failure_colors_only_the_label() {
        let home = TempDir::new().unwrap();
        let action = db_command(|_, _, _| bail!("New password too short"));
        let mut term = Terminal::captured().with_color(true);
        let label = term.highlight("Error");

        action
            .invoke(&db_ctx(&home, &[]), &mut term, &Arc::new(Bus::new()))
            .unwrap_err();

        assert_ne!(label, "Error");
        assert!(term
            .stderr_text()
            .starts_with(&format!("\n{}: New password too short\n\n", label)));
    }
}
