//! core::ops
//!
//! Locking for mutating operations.
//!
//! # Modules
//!
//! - [`lock`] - Exclusive plugins-directory lock
//!
//! # Architecture
//!
//! Every command that mutates the plugins directory acquires the
//! exclusive lock first and holds it until the command returns.

pub mod lock;

pub use lock::{LockError, PluginDirLock};
