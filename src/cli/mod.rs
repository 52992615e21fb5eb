//! cli
//!
//! Command-line interface layer for dash-cli.
//!
//! # Responsibilities
//!
//! - Declare the command tree and bind one handler per leaf
//! - Adapt handlers to the plugin or database execution profile
//! - Parse argv and dispatch to the matched leaf
//!
//! # Architecture
//!
//! The tree in [`commands`] is plain data. [`dispatch::Dispatcher`] turns it
//! into a clap command, resolves the leaf and runs its
//! [`adapters::Action`]. Nothing below [`run`] exits the process.

pub mod adapters;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod tree;

pub use context::{CommandLine, ContextCommandLine};
pub use dispatch::{Dispatcher, Outcome};

use std::process::ExitCode;
use std::sync::Arc;

use crate::core::bus::Bus;
use crate::logger;
use crate::ui::Terminal;
use commands::{command_tree, Handlers};

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> ExitCode {
    logger::init();

    let bus = Arc::new(Bus::new());
    bus.subscribe(|event| {
        log::debug!("event: {}", event);
        Ok(())
    });

    let mut term = Terminal::stdio();
    let tree = match command_tree(Handlers::default()) {
        Ok(tree) => tree,
        Err(e) => {
            term.eprint(format!("Error: invalid command tree: {}\n", e));
            return ExitCode::FAILURE;
        }
    };

    let outcome = Dispatcher::new(tree, bus).run(std::env::args_os(), &mut term);
    ExitCode::from(outcome.exit_code())
}
