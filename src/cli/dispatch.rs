//! cli::dispatch
//!
//! From argv to a finished command.
//!
//! # Flow
//!
//! 1. clap parses argv against the command tree (plus root global flags)
//! 2. The matched subcommand chain gives the canonical leaf path
//! 3. The leaf's action runs with a [`ContextCommandLine`]
//! 4. An [`Outcome`] comes back; only `main` turns it into a process exit
//!
//! Parse errors, `--help` and `--version` never reach a handler.

use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command};

use super::adapters::CommandFailure;
use super::context::{
    ContextCommandLine, DEBUG_FLAG, PLUGINS_DIR_FLAG, PLUGIN_URL_FLAG, REPO_FLAG,
};
use super::tree::{CommandTree, ARGS_ID};
use crate::core::bus::Bus;
use crate::logger;
use crate::ui::Terminal;

/// Result of one dispatch.
#[derive(Debug)]
pub enum Outcome {
    /// The handler ran and succeeded.
    Success,
    /// Configuration, store or handler failure, already reported.
    Failed(CommandFailure),
    /// clap stopped before dispatch (parse error, help or version).
    Parse { code: i32 },
}

impl Outcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::Failed(_) => 1,
            Outcome::Parse { code } => u8::try_from(*code).unwrap_or(1),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Runs commands from a validated tree.
#[derive(Debug)]
pub struct Dispatcher {
    tree: CommandTree,
    bus: Arc<Bus>,
}

impl Dispatcher {
    pub fn new(tree: CommandTree, bus: Arc<Bus>) -> Self {
        Self { tree, bus }
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    /// The root clap command, global flags included.
    pub fn clap_command(&self) -> Command {
        let root = Command::new("dash-cli")
            .version(clap::crate_version!())
            .about("Administrative command line for dash-server")
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                Arg::new(PLUGINS_DIR_FLAG)
                    .long(PLUGINS_DIR_FLAG)
                    .global(true)
                    .value_name("DIR")
                    .help("path to the dash-server plugins directory"),
            )
            .arg(
                Arg::new(REPO_FLAG)
                    .long(REPO_FLAG)
                    .global(true)
                    .value_name("URL")
                    .help("URL or directory of the plugin repository"),
            )
            .arg(
                Arg::new(PLUGIN_URL_FLAG)
                    .long(PLUGIN_URL_FLAG)
                    .global(true)
                    .value_name("PATH")
                    .help("install a plugin from this directory instead of the repository"),
            )
            .arg(
                Arg::new(DEBUG_FLAG)
                    .long(DEBUG_FLAG)
                    .global(true)
                    .action(ArgAction::SetTrue)
                    .help("enable debug logging"),
            );

        self.tree
            .roots()
            .iter()
            .fold(root, |root, spec| root.subcommand(spec.to_clap()))
    }

    /// Parse `argv` (program name first) and run the matched command.
    pub fn run<I, T>(&self, argv: I, term: &mut Terminal) -> Outcome
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut root = self.clap_command();
        root.build();

        let matches = match root.try_get_matches_from_mut(argv) {
            Ok(matches) => matches,
            Err(e) => {
                if e.use_stderr() {
                    term.eprint(e.render());
                } else {
                    term.print(e.render());
                }
                return Outcome::Parse {
                    code: e.exit_code(),
                };
            }
        };

        let (path, leaf_matches) = matched_path(&matches);
        let tokens: Vec<&str> = path.iter().map(String::as_str).collect();
        let Some(spec) = self.tree.resolve(&tokens) else {
            term.eprint(format!("unknown command: {}\n", path.join(" ")));
            return Outcome::Parse { code: 2 };
        };
        let Some(action) = spec.action() else {
            term.eprint(format!("'{}' requires a subcommand\n", path.join(" ")));
            return Outcome::Parse { code: 2 };
        };

        let mut ctx = ContextCommandLine::new(path.clone(), positional_args(leaf_matches))
            .with_help(leaf_help(&root, &path));
        for flag in &spec.flags {
            if let Some(value) = string_value(leaf_matches, flag.name) {
                ctx = ctx.with_flag(flag.name, value);
            }
        }
        for global in [PLUGINS_DIR_FLAG, REPO_FLAG, PLUGIN_URL_FLAG] {
            if let Some(value) = string_value(leaf_matches, global) {
                ctx = ctx.with_global(global, value);
            }
        }
        if matches!(leaf_matches.try_get_one::<bool>(DEBUG_FLAG), Ok(Some(true))) {
            logger::enable_debug();
            ctx = ctx.with_switch(DEBUG_FLAG);
        }

        log::debug!("dispatching {}", path.join(" "));
        match action.invoke(&ctx, term, &self.bus) {
            Ok(()) => Outcome::Success,
            Err(failure) => {
                log::debug!(
                    "{} failed ({} error): {}",
                    path.join(" "),
                    failure.kind,
                    failure.message()
                );
                Outcome::Failed(failure)
            }
        }
    }
}

/// Canonical subcommand names from the root down, and the leaf's matches.
fn matched_path(matches: &ArgMatches) -> (Vec<String>, &ArgMatches) {
    let mut path = Vec::new();
    let mut current = matches;
    while let Some((name, sub)) = current.subcommand() {
        path.push(name.to_string());
        current = sub;
    }
    (path, current)
}

fn positional_args(matches: &ArgMatches) -> Vec<String> {
    match matches.try_get_many::<String>(ARGS_ID) {
        Ok(Some(values)) => values.cloned().collect(),
        _ => Vec::new(),
    }
}

fn string_value(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.try_get_one::<String>(id).ok().flatten().cloned()
}

/// Rendered help of the subcommand at `path` under an already built `root`.
fn leaf_help(root: &Command, path: &[String]) -> String {
    let mut cmd = root;
    for name in path {
        match cmd.find_subcommand(name) {
            Some(sub) => cmd = sub,
            None => break,
        }
    }
    cmd.clone().render_help().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::adapters::plugin_command;
    use crate::cli::context::CommandLine;
    use crate::cli::tree::{CommandSpec, FlagSpec};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Calls = Rc<RefCell<Vec<(Vec<String>, Vec<String>, String)>>>;

    fn recording(calls: &Calls) -> crate::cli::adapters::Action {
        let calls = Rc::clone(calls);
        plugin_command(move |ctx, _| {
            calls.borrow_mut().push((
                ctx.command_path().to_vec(),
                ctx.args().to_vec(),
                ctx.plugin_directory().display().to_string(),
            ));
            Ok(())
        })
    }

    fn dispatcher(calls: &Calls) -> Dispatcher {
        let tree = CommandTree::new(vec![CommandSpec::group(
            "plugins",
            "Manage plugins",
            vec![
                CommandSpec::leaf("update", "update <plugin id>", recording(calls)).alias("upgrade"),
                CommandSpec::leaf("install", "install <plugin id>", recording(calls))
                    .flags(vec![FlagSpec::string("note", "free text")]),
            ],
        )])
        .unwrap();
        Dispatcher::new(tree, Arc::new(Bus::new()))
    }

    #[test]
    fn alias_dispatches_like_canonical_name() {
        let calls = Calls::default();
        let d = dispatcher(&calls);

        let a = d.run(["dash-cli", "plugins", "update", "x"], &mut Terminal::captured());
        let b = d.run(["dash-cli", "plugins", "upgrade", "x"], &mut Terminal::captured());

        assert!(a.is_success() && b.is_success());
        let calls = calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
        assert_eq!(calls[0].0, vec!["plugins", "update"]);
        assert_eq!(calls[0].1, vec!["x"]);
    }

    #[test]
    fn global_flags_reach_the_context() {
        let calls = Calls::default();
        let d = dispatcher(&calls);

        let outcome = d.run(
            ["dash-cli", "--pluginsDir", "/tmp/p", "plugins", "install", "a", "1.0.0"],
            &mut Terminal::captured(),
        );

        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(calls.borrow()[0].1, vec!["a", "1.0.0"]);
        assert_eq!(calls.borrow()[0].2, "/tmp/p");
    }

    #[test]
    fn unknown_subcommand_is_a_parse_error() {
        let calls = Calls::default();
        let d = dispatcher(&calls);
        let mut term = Terminal::captured();

        let outcome = d.run(["dash-cli", "plugins", "Update", "x"], &mut term);

        assert!(matches!(outcome, Outcome::Parse { code: 2 }));
        assert!(calls.borrow().is_empty());
        assert!(!term.stderr_text().is_empty());
    }

    #[test]
    fn unknown_flag_is_a_parse_error() {
        let calls = Calls::default();
        let d = dispatcher(&calls);

        let outcome = d.run(["dash-cli", "plugins", "update", "--bogus", "x"], &mut Terminal::captured());

        assert_eq!(outcome.exit_code(), 2);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn version_goes_to_stdout_and_exits_zero() {
        let calls = Calls::default();
        let d = dispatcher(&calls);
        let mut term = Terminal::captured();

        let outcome = d.run(["dash-cli", "--version"], &mut term);

        assert_eq!(outcome.exit_code(), 0);
        assert!(term.stdout_text().contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn failure_help_is_the_leaf_help() {
        let d = Dispatcher::new(
            CommandTree::new(vec![CommandSpec::group(
                "plugins",
                "Manage plugins",
                vec![CommandSpec::leaf(
                    "ls",
                    "list all installed plugins",
                    plugin_command(|_, _| anyhow::bail!("boom")),
                )],
            )])
            .unwrap(),
            Arc::new(Bus::new()),
        );
        let mut term = Terminal::captured();

        let outcome = d.run(["dash-cli", "plugins", "ls"], &mut term);

        assert_eq!(outcome.exit_code(), 1);
        let err = term.stderr_text();
        assert!(err.contains("Error: ✗ boom"));
        assert!(err.contains("list all installed plugins"));
        assert!(err.contains("dash-cli plugins ls"));
    }

    #[test]
    fn leaf_help_walks_nested_groups() {
        let d = Dispatcher::new(
            crate::cli::commands::command_tree(crate::cli::commands::Handlers::default()).unwrap(),
            Arc::new(Bus::new()),
        );
        let mut root = d.clap_command();
        root.build();
        let path: Vec<String> = ["admin", "data-migration", "encrypt-datasource-passwords"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let help = leaf_help(&root, &path);

        assert!(help.contains("dash-cli admin data-migration encrypt-datasource-passwords"));
        assert!(help.contains("--homepath"));
        assert!(root.find_subcommand("admin").is_some());
    }
}
