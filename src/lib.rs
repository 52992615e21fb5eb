//! dash-cli - Administrative command line for dash-server
//!
//! Manages the plugins installed next to a dash-server and runs maintenance
//! commands against its database.
//!
//! # Architecture
//!
//! - [`cli`] - Command tree, adapters and dispatch (parses args, runs handlers)
//! - [`core`] - Event bus, configuration, locking and version ordering
//! - [`plugins`] - Plugin repositories and the local plugins directory
//! - [`store`] - SQLite-backed store used by the admin commands
//! - [`security`] - Password hashing and secret sealing
//! - [`ui`] - Terminal output and prompts
//! - [`logger`] - `log` backend writing to stderr
//!
//! # Exit status
//!
//! Handlers never exit the process. Dispatch returns an
//! [`cli::dispatch::Outcome`] and `main` turns it into the exit code:
//! `0` on success, `1` on any configuration, store or handler failure, and
//! clap's own code for argument errors.

pub mod cli;
pub mod core;
pub mod logger;
pub mod plugins;
pub mod security;
pub mod store;
pub mod ui;
