//! cli::context
//!
//! The read-only view a handler gets of its invocation.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::ui::Terminal;

/// Root-level `--pluginsDir`.
pub const PLUGINS_DIR_FLAG: &str = "pluginsDir";
/// Root-level `--repo`.
pub const REPO_FLAG: &str = "repo";
/// Root-level `--pluginUrl`.
pub const PLUGIN_URL_FLAG: &str = "pluginUrl";
/// Root-level `--debug`.
pub const DEBUG_FLAG: &str = "debug";

/// Plugin repository used when `--repo` is not given.
pub const DEFAULT_REPO: &str = "https://plugins.dash.dev/api/plugins";

/// Plugins directory used when `--pluginsDir` is not given.
pub fn default_plugins_dir() -> PathBuf {
    if cfg!(target_os = "windows") {
        PathBuf::from("../data/plugins")
    } else if cfg!(target_os = "macos") {
        PathBuf::from("/usr/local/var/lib/dash/plugins")
    } else {
        PathBuf::from("/var/lib/dash/plugins")
    }
}

/// Parsed flags and positional arguments of the matched command.
pub trait CommandLine {
    /// Value of a flag declared on the matched command; empty when unset.
    fn string(&self, name: &str) -> String;

    /// Positional arguments, in order.
    fn args(&self) -> &[String];

    /// Write the matched command's help to stderr.
    fn show_help(&self, term: &mut Terminal);

    /// Whether a boolean global flag was given.
    fn bool(&self, name: &str) -> bool;

    /// Value of a root-level global flag; empty when unset.
    fn global_string(&self, name: &str) -> String;

    /// Canonical name path of the matched command, aliases resolved.
    fn command_path(&self) -> &[String];

    fn plugin_directory(&self) -> PathBuf {
        let dir = self.global_string(PLUGINS_DIR_FLAG);
        if dir.is_empty() {
            default_plugins_dir()
        } else {
            PathBuf::from(dir)
        }
    }

    fn repo_directory(&self) -> String {
        let repo = self.global_string(REPO_FLAG);
        if repo.is_empty() {
            DEFAULT_REPO.to_string()
        } else {
            repo
        }
    }

    fn plugin_url(&self) -> String {
        self.global_string(PLUGIN_URL_FLAG)
    }
}

/// [`CommandLine`] built by the dispatcher for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextCommandLine {
    path: Vec<String>,
    flags: BTreeMap<String, String>,
    args: Vec<String>,
    globals: BTreeMap<String, String>,
    switches: BTreeSet<String>,
    help: String,
}

impl ContextCommandLine {
    pub fn new(path: Vec<String>, args: Vec<String>) -> Self {
        Self {
            path,
            args,
            ..Self::default()
        }
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.flags.insert(name.into(), value.into());
        self
    }

    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.globals.insert(name.into(), value.into());
        self
    }

    pub fn with_switch(mut self, name: impl Into<String>) -> Self {
        self.switches.insert(name.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }
}

impl CommandLine for ContextCommandLine {
    fn string(&self, name: &str) -> String {
        self.flags.get(name).cloned().unwrap_or_default()
    }

    fn args(&self) -> &[String] {
        &self.args
    }

    fn show_help(&self, term: &mut Terminal) {
        term.eprint(&self.help);
        if !self.help.ends_with('\n') {
            term.eprint("\n");
        }
    }

    fn bool(&self, name: &str) -> bool {
        self.switches.contains(name)
    }

    fn global_string(&self, name: &str) -> String {
        self.globals.get(name).cloned().unwrap_or_default()
    }

    fn command_path(&self) -> &[String] {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ContextCommandLine {
        ContextCommandLine::new(
            vec!["admin".to_string(), "reset-admin-password".to_string()],
            vec!["newpw".to_string()],
        )
    }

    #[test]
    fn unset_flags_read_as_empty() {
        let ctx = ctx().with_flag("config", "/etc/x.ini");
        assert_eq!(ctx.string("config"), "/etc/x.ini");
        assert_eq!(ctx.string("homepath"), "");
        assert_eq!(ctx.args(), ["newpw".to_string()]);
        assert!(!ctx.bool(DEBUG_FLAG));
    }

    #[test]
    fn globals_fall_back_to_defaults() {
        let ctx = ctx();
        assert_eq!(ctx.plugin_directory(), default_plugins_dir());
        assert_eq!(ctx.repo_directory(), DEFAULT_REPO);
        assert_eq!(ctx.plugin_url(), "");

        let ctx = ctx
            .with_global(PLUGINS_DIR_FLAG, "/tmp/plugins")
            .with_global(REPO_FLAG, "/srv/repo")
            .with_switch(DEBUG_FLAG);
        assert_eq!(ctx.plugin_directory(), PathBuf::from("/tmp/plugins"));
        assert_eq!(ctx.repo_directory(), "/srv/repo");
        assert!(ctx.bool(DEBUG_FLAG));
    }

    #[test]
    fn show_help_writes_to_stderr() {
        let ctx = ctx().with_help("Usage: dash-cli admin reset-admin-password");
        let mut term = Terminal::captured();

        ctx.show_help(&mut term);

        assert_eq!(term.stderr_text(), "Usage: dash-cli admin reset-admin-password\n");
        assert_eq!(term.stdout_text(), "");
    }
}
