//! plugins
//!
//! Plugin repositories and the local plugins directory.
//!
//! # Layout
//!
//! - [`models`] - `plugin.json` manifests and repository index shapes
//! - [`repo`] - HTTP and local-directory repositories
//! - [`installer`] - install, list and remove plugins on disk

pub mod installer;
pub mod models;
pub mod repo;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::ops::LockError;

pub use installer::InstallReport;
pub use models::{InstalledPlugin, PluginManifest, RemotePlugin, RemoteVersion, RepoIndex};
pub use repo::PluginRepo;

/// Errors from plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin not found: {0}")]
    NotFound(String),

    #[error("version {version} of plugin {id} not found")]
    VersionNotFound { id: String, version: String },

    #[error("plugin {0} has no published versions")]
    NoVersions(String),

    #[error("plugin {0} is not installed")]
    NotInstalled(String),

    #[error("plugins directory {} does not exist", .0.display())]
    PluginsDirMissing(PathBuf),

    #[error("invalid plugin id '{0}'")]
    InvalidId(String),

    #[error("refusing to write outside the plugin directory: {0}")]
    UnsafePath(String),

    #[error("manifest id '{found}' does not match requested plugin '{expected}'")]
    ManifestMismatch { expected: String, found: String },

    #[error("invalid manifest {}: {message}", path.display())]
    Manifest { path: PathBuf, message: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid repository index at {location}: {message}")]
    Index { location: String, message: String },

    #[error("invalid plugin bundle: {0}")]
    Bundle(String),

    #[error(transparent)]
    Lock(#[from] LockError),
}

impl PluginError {
    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
