//! core
//!
//! Process-wide building blocks shared by the commands.
//!
//! # Modules
//!
//! - [`bus`] - Event bus handed to every store
//! - [`config`] - Configuration schema and layered loading
//! - [`ops`] - Locking of the plugins directory
//! - [`version`] - Plugin version ordering

pub mod bus;
pub mod config;
pub mod ops;
pub mod version;
