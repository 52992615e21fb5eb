//! cli::tree
//!
//! Declarative command tree.
//!
//! # Invariants
//!
//! Checked once by [`CommandTree::new`]; the tree is immutable afterwards.
//!
//! - Names and aliases are unique among siblings
//! - Flag names are unique within a command and do not shadow global flags
//! - Every node is either a leaf with an action or a non-empty group
//!
//! Lookup is exact and case-sensitive. Aliases resolve to the same node as
//! the canonical name.

use std::collections::HashSet;

use clap::{Arg, ArgAction, Command};
use thiserror::Error;

use super::adapters::Action;

/// Flag names owned by the root command.
pub const RESERVED_FLAGS: &[&str] = &["pluginsDir", "repo", "pluginUrl", "debug", "help", "version"];

/// Errors found while validating a command tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("command name must not be empty (under '{0}')")]
    EmptyName(String),

    #[error("'{name}' is declared twice under '{parent}'")]
    DuplicateName { parent: String, name: String },

    #[error("flag --{flag} is declared twice on '{command}'")]
    DuplicateFlag { command: String, flag: String },

    #[error("flag --{flag} on '{command}' shadows a global flag")]
    ReservedFlag { command: String, flag: String },

    #[error("command group '{0}' has no subcommands")]
    EmptyGroup(String),
}

/// Kind of value a flag takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    String,
}

/// A `--name <value>` flag on a leaf command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub kind: FlagKind,
}

impl FlagSpec {
    pub fn string(name: &'static str, usage: &'static str) -> Self {
        Self {
            name,
            usage,
            kind: FlagKind::String,
        }
    }
}

/// Leaf action or child commands.
#[derive(Debug)]
pub enum CommandBody {
    Leaf(Action),
    Group(Vec<CommandSpec>),
}

/// One node of the command tree.
#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub aliases: Vec<&'static str>,
    pub flags: Vec<FlagSpec>,
    pub body: CommandBody,
}

impl CommandSpec {
    pub fn leaf(name: &'static str, usage: &'static str, action: Action) -> Self {
        Self {
            name,
            usage,
            aliases: Vec::new(),
            flags: Vec::new(),
            body: CommandBody::Leaf(action),
        }
    }

    pub fn group(name: &'static str, usage: &'static str, children: Vec<CommandSpec>) -> Self {
        Self {
            name,
            usage,
            aliases: Vec::new(),
            flags: Vec::new(),
            body: CommandBody::Group(children),
        }
    }

    pub fn alias(mut self, alias: &'static str) -> Self {
        self.aliases.push(alias);
        self
    }

    pub fn flags(mut self, flags: Vec<FlagSpec>) -> Self {
        self.flags.extend(flags);
        self
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.body, CommandBody::Leaf(_))
    }

    pub fn action(&self) -> Option<&Action> {
        match &self.body {
            CommandBody::Leaf(action) => Some(action),
            CommandBody::Group(_) => None,
        }
    }

    pub fn children(&self) -> &[CommandSpec] {
        match &self.body {
            CommandBody::Leaf(_) => &[],
            CommandBody::Group(children) => children,
        }
    }

    /// Whether `token` is this command's name or one of its aliases.
    pub fn answers_to(&self, token: &str) -> bool {
        self.name == token || self.aliases.iter().any(|a| *a == token)
    }

    /// Build the clap command for this node and its children.
    pub fn to_clap(&self) -> Command {
        let mut cmd = Command::new(self.name).about(self.usage);
        for alias in &self.aliases {
            cmd = cmd.visible_alias(*alias);
        }
        for flag in &self.flags {
            cmd = cmd.arg(
                Arg::new(flag.name)
                    .long(flag.name)
                    .help(flag.usage)
                    .value_name("VALUE")
                    .action(ArgAction::Set),
            );
        }
        match &self.body {
            CommandBody::Leaf(_) => cmd.arg(
                Arg::new(ARGS_ID)
                    .num_args(1..)
                    .action(ArgAction::Append),
            ),
            CommandBody::Group(children) => children
                .iter()
                .fold(cmd, |cmd, child| cmd.subcommand(child.to_clap()))
                .subcommand_required(true)
                .arg_required_else_help(true),
        }
    }
}

/// Id of the positional var-args on every leaf.
pub const ARGS_ID: &str = "args";

/// The validated set of root commands.
#[derive(Debug)]
pub struct CommandTree {
    roots: Vec<CommandSpec>,
}

impl CommandTree {
    pub fn new(roots: Vec<CommandSpec>) -> Result<Self, TreeError> {
        validate_siblings("dash-cli", &roots)?;
        Ok(Self { roots })
    }

    pub fn roots(&self) -> &[CommandSpec] {
        &self.roots
    }

    /// Follow `path` from the roots. Returns interior nodes as well as leaves.
    pub fn resolve(&self, path: &[&str]) -> Option<&CommandSpec> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.iter().find(|c| c.answers_to(first))?;
        for token in rest {
            node = node.children().iter().find(|c| c.answers_to(token))?;
        }
        Some(node)
    }

    /// Canonical path of every leaf, depth-first in declaration order.
    pub fn leaf_paths(&self) -> Vec<Vec<&'static str>> {
        fn walk(node: &CommandSpec, prefix: &mut Vec<&'static str>, out: &mut Vec<Vec<&'static str>>) {
            prefix.push(node.name);
            if node.is_leaf() {
                out.push(prefix.clone());
            }
            for child in node.children() {
                walk(child, prefix, out);
            }
            prefix.pop();
        }

        let mut out = Vec::new();
        for root in &self.roots {
            walk(root, &mut Vec::new(), &mut out);
        }
        out
    }
}

fn validate_siblings(parent: &str, siblings: &[CommandSpec]) -> Result<(), TreeError> {
    let mut seen = HashSet::new();
    for cmd in siblings {
        if cmd.name.is_empty() {
            return Err(TreeError::EmptyName(parent.to_string()));
        }
        for token in std::iter::once(&cmd.name).chain(cmd.aliases.iter()) {
            if !seen.insert(*token) {
                return Err(TreeError::DuplicateName {
                    parent: parent.to_string(),
                    name: token.to_string(),
                });
            }
        }
        validate_command(cmd)?;
    }
    Ok(())
}

fn validate_command(cmd: &CommandSpec) -> Result<(), TreeError> {
    let mut flags = HashSet::new();
    for flag in &cmd.flags {
        if RESERVED_FLAGS.contains(&flag.name) || flag.name == ARGS_ID {
            return Err(TreeError::ReservedFlag {
                command: cmd.name.to_string(),
                flag: flag.name.to_string(),
            });
        }
        if !flags.insert(flag.name) {
            return Err(TreeError::DuplicateFlag {
                command: cmd.name.to_string(),
                flag: flag.name.to_string(),
            });
        }
    }
    if let CommandBody::Group(children) = &cmd.body {
        if children.is_empty() {
            return Err(TreeError::EmptyGroup(cmd.name.to_string()));
        }
        validate_siblings(cmd.name, children)?;
    }
    Ok(())
}
