//! plugins::repo
//!
//! Plugin repositories.
//!
//! # Sources
//!
//! - `http://` / `https://` base URL: the index is `GET <base>/repo`, one
//!   plugin is `GET <base>/repo/<id>`, and a version's payload is a
//!   [`PluginBundle`] at the version's `url` or
//!   `<base>/<id>/versions/<version>/download`.
//! - Local directory: the index is `<dir>/repo.json` and a version's
//!   payload is the directory at the version's `url` (relative to `<dir>`)
//!   or `<dir>/<id>/<version>`.
//! - Local `.json` file: treated as the index of its parent directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::installer::{copy_dir_all, safe_join};
use super::models::{PluginBundle, RemotePlugin, RemoteVersion, RepoIndex};
use super::PluginError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Where plugins are listed and downloaded from.
pub trait PluginRepo {
    /// Human-readable location, used in messages.
    fn location(&self) -> &str;

    /// The full plugin listing.
    fn index(&self) -> Result<RepoIndex, PluginError>;

    /// One plugin's listing.
    fn plugin(&self, id: &str) -> Result<RemotePlugin, PluginError> {
        self.index()?
            .find(id)
            .cloned()
            .ok_or_else(|| PluginError::NotFound(id.to_string()))
    }

    /// Materialize `version` of `plugin` into the empty directory `dest`.
    fn fetch(
        &self,
        plugin: &RemotePlugin,
        version: &RemoteVersion,
        dest: &Path,
    ) -> Result<(), PluginError>;
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Open the repository at `location`.
pub fn open(location: &str) -> Result<Box<dyn PluginRepo>, PluginError> {
    if is_remote(location) {
        Ok(Box::new(HttpRepo::new(location)?))
    } else {
        Ok(Box::new(LocalRepo::new(location)))
    }
}

/// Repository served over HTTP.
#[derive(Debug)]
pub struct HttpRepo {
    base: String,
    client: reqwest::blocking::Client,
}

impl HttpRepo {
    pub fn new(base: &str) -> Result<Self, PluginError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("dash-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PluginError::Http {
                url: base.to_string(),
                source: e,
            })?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, PluginError> {
        log::debug!("GET {}", url);
        let http = |e| PluginError::Http {
            url: url.to_string(),
            source: e,
        };
        let resp = self.client.get(url).send().map_err(http)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PluginError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.json().map_err(http)
    }
}

impl PluginRepo for HttpRepo {
    fn location(&self) -> &str {
        &self.base
    }

    fn index(&self) -> Result<RepoIndex, PluginError> {
        self.get_json(&format!("{}/repo", self.base))
    }

    fn plugin(&self, id: &str) -> Result<RemotePlugin, PluginError> {
        match self.get_json(&format!("{}/repo/{}", self.base, id)) {
            Err(PluginError::Status { status: 404, .. }) => {
                Err(PluginError::NotFound(id.to_string()))
            }
            other => other,
        }
    }

    fn fetch(
        &self,
        plugin: &RemotePlugin,
        version: &RemoteVersion,
        dest: &Path,
    ) -> Result<(), PluginError> {
        let url = version.url.clone().unwrap_or_else(|| {
            format!(
                "{}/{}/versions/{}/download",
                self.base, plugin.id, version.version
            )
        });
        let bundle: PluginBundle = self.get_json(&url)?;
        write_bundle(&bundle, dest)
    }
}

/// Write every file of `bundle` under `dest`.
pub fn write_bundle(bundle: &PluginBundle, dest: &Path) -> Result<(), PluginError> {
    if bundle.files.is_empty() {
        return Err(PluginError::Bundle("bundle contains no files".to_string()));
    }
    for file in &bundle.files {
        let target = safe_join(dest, &file.path)?;
        let content = BASE64
            .decode(&file.content)
            .map_err(|e| PluginError::Bundle(format!("{}: {}", file.path, e)))?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| PluginError::io(parent, e))?;
        }
        fs::write(&target, content).map_err(|e| PluginError::io(&target, e))?;
    }
    Ok(())
}

/// Repository laid out on the local filesystem.
#[derive(Debug)]
pub struct LocalRepo {
    location: String,
    root: PathBuf,
    index_path: PathBuf,
}

impl LocalRepo {
    pub fn new(location: &str) -> Self {
        let path = PathBuf::from(location);
        let (root, index_path) = if path.extension().is_some_and(|e| e == "json") {
            let root = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (root, path)
        } else {
            (path.clone(), path.join("repo.json"))
        };
        Self {
            location: location.to_string(),
            root,
            index_path,
        }
    }
}

impl PluginRepo for LocalRepo {
    fn location(&self) -> &str {
        &self.location
    }

    fn index(&self) -> Result<RepoIndex, PluginError> {
        let raw = fs::read_to_string(&self.index_path)
            .map_err(|e| PluginError::io(&self.index_path, e))?;
        serde_json::from_str(&raw).map_err(|e| PluginError::Index {
            location: self.index_path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn fetch(
        &self,
        plugin: &RemotePlugin,
        version: &RemoteVersion,
        dest: &Path,
    ) -> Result<(), PluginError> {
        let src = match &version.url {
            Some(url) => self.root.join(url),
            None => self.root.join(&plugin.id).join(&version.version),
        };
        if !src.is_dir() {
            return Err(PluginError::VersionNotFound {
                id: plugin.id.clone(),
                version: version.version.clone(),
            });
        }
        copy_dir_all(&src, dest)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::local_repo;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_picks_repo_kind() {
        assert_eq!(open("https://example.test/api/").unwrap().location(), "https://example.test/api");
        assert_eq!(open("/srv/repo").unwrap().location(), "/srv/repo");
    }

    #[test]
    fn local_index_and_lookup() {
        let temp = TempDir::new().unwrap();
        local_repo(temp.path(), &[("clock-panel", &["1.0.0", "1.1.0"], &[])]);
        let repo = LocalRepo::new(&temp.path().to_string_lossy());

        let index = repo.index().unwrap();
        assert_eq!(index.plugins.len(), 1);
        assert_eq!(repo.plugin("clock-panel").unwrap().versions.len(), 2);
        assert!(matches!(
            repo.plugin("missing"),
            Err(PluginError::NotFound(id)) if id == "missing"
        ));
    }

    #[test]
    fn local_index_file_location() {
        let temp = TempDir::new().unwrap();
        local_repo(temp.path(), &[("clock-panel", &["1.0.0"], &[])]);
        let repo = LocalRepo::new(&temp.path().join("repo.json").to_string_lossy());

        let plugin = repo.plugin("clock-panel").unwrap();
        let dest = temp.path().join("out");
        repo.fetch(&plugin, &plugin.versions[0], &dest).unwrap();
        assert!(dest.join("dist/module.js").is_file());
    }

    #[test]
    fn local_fetch_missing_payload() {
        let temp = TempDir::new().unwrap();
        local_repo(temp.path(), &[("clock-panel", &["1.0.0"], &[])]);
        let repo = LocalRepo::new(&temp.path().to_string_lossy());
        let plugin = repo.plugin("clock-panel").unwrap();
        let ghost = RemoteVersion {
            version: "9.9.9".to_string(),
            url: None,
        };

        let result = repo.fetch(&plugin, &ghost, &temp.path().join("out"));
        assert!(matches!(result, Err(PluginError::VersionNotFound { .. })));
    }

    #[test]
    fn bundle_written_under_destination() {
        let temp = TempDir::new().unwrap();
        let bundle = PluginBundle {
            files: vec![crate::plugins::models::BundleFile {
                path: "dist/module.js".to_string(),
                content: BASE64.encode("export {}"),
            }],
        };

        write_bundle(&bundle, temp.path()).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join("dist/module.js")).unwrap(),
            "export {}"
        );
    }

    #[test]
    fn bundle_path_traversal_rejected() {
        let temp = TempDir::new().unwrap();
        let bundle = PluginBundle {
            files: vec![crate::plugins::models::BundleFile {
                path: "../escape.js".to_string(),
                content: BASE64.encode("x"),
            }],
        };

        let result = write_bundle(&bundle, &temp.path().join("plugin"));
        assert!(matches!(result, Err(PluginError::UnsafePath(_))));
        assert!(!temp.path().join("escape.js").exists());
    }
}
