//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Terminal streams and highlighting
//! - [`prompts`] - Interactive prompts
//!
//! # Design
//!
//! All command output and prompts go through this module so that the
//! dispatch layer can run against captured streams in tests.

pub mod output;
pub mod prompts;

pub use output::Terminal;
