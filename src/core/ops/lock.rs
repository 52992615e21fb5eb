//! core::ops::lock
//!
//! Exclusive lock on a plugins directory.
//!
//! # Architecture
//!
//! Commands that add, replace, or delete plugin directories hold this lock
//! for their whole run so two `dash-cli` processes never interleave writes
//! into the same plugins directory. Read-only commands (`ls`,
//! `list-remote`) do not take it.
//!
//! # Storage
//!
//! - `<plugins_dir>/.dash-cli.lock` - Lock file with OS-level exclusive lock
//!
//! # Invariants
//!
//! - Lock is automatically released on drop (RAII pattern)
//! - Lock acquisition is non-blocking (fails fast if locked)
//!
//! # Example
//!
//! ```ignore
//! use dashcli::core::ops::lock::PluginDirLock;
//!
//! let lock = PluginDirLock::acquire(plugins_dir)?;
//! // ... install or remove plugins ...
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// File name of the lock inside the plugins directory.
pub const LOCK_FILE_NAME: &str = ".dash-cli.lock";

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("plugins directory '{0}' is locked by another dash-cli process")]
    AlreadyLocked(PathBuf),

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

/// An exclusive lock on a plugins directory.
///
/// Released when dropped.
#[derive(Debug)]
pub struct PluginDirLock {
    file: File,
}

impl PluginDirLock {
    /// Acquire the lock for `plugins_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the directory or lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(plugins_dir: &Path) -> Result<Self, LockError> {
        fs::create_dir_all(plugins_dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", plugins_dir.display(), e))
        })?;

        let path = plugins_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { file }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(LockError::AlreadyLocked(plugins_dir.to_path_buf()))
            }
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

}

impl Drop for PluginDirLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
