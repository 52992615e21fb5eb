//! plugins::models
//!
//! Serialized shapes: the `plugin.json` manifest inside every plugin and
//! the repository index served by a plugin repository.

use serde::{Deserialize, Serialize};

use crate::core::version;

/// File name of the manifest at the root of a plugin directory.
pub const MANIFEST_FILE: &str = "plugin.json";

/// `plugin.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PluginManifest {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub plugin_type: String,
    pub info: PluginInfo,
    pub dependencies: PluginDependencies,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PluginInfo {
    pub version: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PluginDependencies {
    pub plugins: Vec<PluginDependency>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PluginDependency {
    pub id: String,
    pub version: String,
}

/// A plugin found in the plugins directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPlugin {
    pub id: String,
    pub version: String,
    pub path: std::path::PathBuf,
    pub manifest: PluginManifest,
}

/// Repository index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RepoIndex {
    pub plugins: Vec<RemotePlugin>,
}

impl RepoIndex {
    pub fn find(&self, id: &str) -> Option<&RemotePlugin> {
        self.plugins.iter().find(|p| p.id == id)
    }
}

/// One plugin as listed by a repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemotePlugin {
    pub id: String,
    #[serde(rename = "type")]
    pub plugin_type: String,
    pub versions: Vec<RemoteVersion>,
}

impl RemotePlugin {
    /// The highest listed version.
    pub fn latest(&self) -> Option<&RemoteVersion> {
        let newest = version::latest(self.versions.iter().map(|v| v.version.as_str()))?;
        self.versions.iter().find(|v| v.version == newest)
    }

    /// The listed version equal to `wanted` (ordering-equal, so `v1.0` finds `1.0.0`).
    pub fn version(&self, wanted: &str) -> Option<&RemoteVersion> {
        self.versions
            .iter()
            .find(|v| version::compare(&v.version, wanted) == std::cmp::Ordering::Equal)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteVersion {
    pub version: String,
    /// Explicit payload location; repositories derive one when absent.
    pub url: Option<String>,
}

/// Payload returned by HTTP repositories for one plugin version.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PluginBundle {
    pub files: Vec<BundleFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BundleFile {
    /// Path relative to the plugin root.
    pub path: String,
    /// Base64-encoded file content.
    pub content: String,
}
