//! plugins::installer
//!
//! Operations on the local plugins directory.
//!
//! Every installed plugin is a direct child directory of the plugins
//! directory containing a `plugin.json`. Installs are staged in a hidden
//! sibling directory and swapped in with a rename, so a failed download
//! never leaves a half-written plugin behind.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use super::models::{InstalledPlugin, PluginManifest, MANIFEST_FILE};
use super::repo::PluginRepo;
use super::PluginError;

/// What an install put on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub id: String,
    pub version: String,
    pub path: PathBuf,
    /// `id@version` of every dependency installed along the way.
    pub dependencies: Vec<String>,
}

/// Reject ids that could address anything but a direct child directory.
pub fn validate_id(id: &str) -> Result<(), PluginError> {
    let bad = id.is_empty()
        || id.starts_with('.')
        || id.contains("..")
        || id.contains('/')
        || id.contains('\\');
    if bad {
        return Err(PluginError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Join a relative path under `root`, refusing anything that escapes it.
pub(crate) fn safe_join(root: &Path, relative: &str) -> Result<PathBuf, PluginError> {
    let rel = Path::new(relative);
    let escapes = relative.is_empty()
        || rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(PluginError::UnsafePath(relative.to_string()));
    }
    Ok(root.join(rel))
}

/// Recursively copy `src` into `dst`, creating `dst`.
pub(crate) fn copy_dir_all(src: &Path, dst: &Path) -> Result<(), PluginError> {
    fs::create_dir_all(dst).map_err(|e| PluginError::io(dst, e))?;
    for entry in fs::read_dir(src).map_err(|e| PluginError::io(src, e))? {
        let entry = entry.map_err(|e| PluginError::io(src, e))?;
        let ty = entry.file_type().map_err(|e| PluginError::io(entry.path(), e))?;
        let to = dst.join(entry.file_name());
        if ty.is_dir() {
            copy_dir_all(&entry.path(), &to)?;
        } else {
            fs::copy(entry.path(), &to).map_err(|e| PluginError::io(&to, e))?;
        }
    }
    Ok(())
}

pub fn read_manifest(plugin_dir: &Path) -> Result<PluginManifest, PluginError> {
    let path = plugin_dir.join(MANIFEST_FILE);
    let raw = fs::read_to_string(&path).map_err(|e| PluginError::io(&path, e))?;
    serde_json::from_str(&raw).map_err(|e| PluginError::Manifest {
        path,
        message: e.to_string(),
    })
}

/// Every plugin in `plugins_dir`, sorted by id.
///
/// Hidden entries and directories without a readable manifest are skipped.
pub fn installed_plugins(plugins_dir: &Path) -> Result<Vec<InstalledPlugin>, PluginError> {
    if !plugins_dir.is_dir() {
        return Err(PluginError::PluginsDirMissing(plugins_dir.to_path_buf()));
    }

    let mut plugins = Vec::new();
    for entry in fs::read_dir(plugins_dir).map_err(|e| PluginError::io(plugins_dir, e))? {
        let entry = entry.map_err(|e| PluginError::io(plugins_dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();
        if name.starts_with('.') || !path.is_dir() {
            continue;
        }
        match read_manifest(&path) {
            Ok(manifest) => plugins.push(InstalledPlugin {
                id: if manifest.id.is_empty() {
                    name
                } else {
                    manifest.id.clone()
                },
                version: manifest.info.version.clone(),
                path,
                manifest,
            }),
            Err(e) => log::warn!("skipping {}: {}", path.display(), e),
        }
    }
    plugins.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(plugins)
}

pub fn find_installed(plugins_dir: &Path, id: &str) -> Result<Option<InstalledPlugin>, PluginError> {
    if !plugins_dir.is_dir() {
        return Ok(None);
    }
    Ok(installed_plugins(plugins_dir)?
        .into_iter()
        .find(|p| p.id == id))
}

/// Fill a staging directory with `fill`, check its manifest, then replace
/// `<plugins_dir>/<id>` with it.
fn stage_and_swap<F>(plugins_dir: &Path, id: &str, fill: F) -> Result<(PathBuf, PluginManifest), PluginError>
where
    F: FnOnce(&Path) -> Result<(), PluginError>,
{
    validate_id(id)?;
    fs::create_dir_all(plugins_dir).map_err(|e| PluginError::io(plugins_dir, e))?;

    let staging = plugins_dir.join(format!(".staging-{}-{}", id, uuid::Uuid::new_v4().simple()));
    let result = fill(&staging).and_then(|()| {
        let manifest = read_manifest(&staging)?;
        if !manifest.id.is_empty() && manifest.id != id {
            return Err(PluginError::ManifestMismatch {
                expected: id.to_string(),
                found: manifest.id,
            });
        }
        Ok(manifest)
    });
    let manifest = match result {
        Ok(manifest) => manifest,
        Err(e) => {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }
    };

    let target = plugins_dir.join(id);
    if target.exists() {
        fs::remove_dir_all(&target).map_err(|e| PluginError::io(&target, e))?;
    }
    fs::rename(&staging, &target).map_err(|e| PluginError::io(&target, e))?;
    Ok((target, manifest))
}

/// Install `id` from `repo`: the exact `version` when given, else the latest.
/// Missing plugin dependencies are installed at their latest version.
pub fn install(
    repo: &dyn PluginRepo,
    plugins_dir: &Path,
    id: &str,
    version: Option<&str>,
) -> Result<InstallReport, PluginError> {
    let mut visited = HashSet::new();
    install_inner(repo, plugins_dir, id, version, &mut visited)
}

fn install_inner(
    repo: &dyn PluginRepo,
    plugins_dir: &Path,
    id: &str,
    version: Option<&str>,
    visited: &mut HashSet<String>,
) -> Result<InstallReport, PluginError> {
    validate_id(id)?;
    visited.insert(id.to_string());

    let plugin = repo.plugin(id)?;
    let chosen = match version {
        Some(wanted) => plugin.version(wanted).ok_or_else(|| PluginError::VersionNotFound {
            id: id.to_string(),
            version: wanted.to_string(),
        })?,
        None => plugin
            .latest()
            .ok_or_else(|| PluginError::NoVersions(id.to_string()))?,
    };
    log::info!("installing {} @ {} from {}", id, chosen.version, repo.location());

    let (path, manifest) =
        stage_and_swap(plugins_dir, id, |staging| repo.fetch(&plugin, chosen, staging))?;

    let mut dependencies = Vec::new();
    for dep in &manifest.dependencies.plugins {
        if dep.id.is_empty() || visited.contains(&dep.id) {
            continue;
        }
        if find_installed(plugins_dir, &dep.id)?.is_some() {
            visited.insert(dep.id.clone());
            continue;
        }
        let report = install_inner(repo, plugins_dir, &dep.id, None, visited)?;
        dependencies.push(format!("{}@{}", report.id, report.version));
        dependencies.extend(report.dependencies);
    }

    Ok(InstallReport {
        id: id.to_string(),
        version: chosen.version.clone(),
        path,
        dependencies,
    })
}

/// Install straight from a local plugin directory.
pub fn install_from_path(src: &Path, plugins_dir: &Path, id: &str) -> Result<InstallReport, PluginError> {
    if !src.is_dir() {
        return Err(PluginError::io(
            src,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a plugin directory"),
        ));
    }
    let (path, manifest) = stage_and_swap(plugins_dir, id, |staging| copy_dir_all(src, staging))?;
    Ok(InstallReport {
        id: id.to_string(),
        version: manifest.info.version,
        path,
        dependencies: Vec::new(),
    })
}

/// Delete `<plugins_dir>/<id>`.
pub fn remove(plugins_dir: &Path, id: &str) -> Result<PathBuf, PluginError> {
    validate_id(id)?;
    let path = plugins_dir.join(id);
    if !path.is_dir() {
        return Err(PluginError::NotInstalled(id.to_string()));
    }
    fs::remove_dir_all(&path).map_err(|e| PluginError::io(&path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::super::repo::test_support::local_repo;
    use super::super::repo::LocalRepo;
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        repo: LocalRepo,
        plugins: PathBuf,
    }

    fn fixture(plugins: &[(&str, &[&str], &[&str])]) -> Fixture {
        let temp = TempDir::new().unwrap();
        let repo_dir = temp.path().join("repo");
        fs::create_dir_all(&repo_dir).unwrap();
        local_repo(&repo_dir, plugins);
        Fixture {
            repo: LocalRepo::new(&repo_dir.to_string_lossy()),
            plugins: temp.path().join("plugins"),
            _temp: temp,
        }
    }

    #[test]
    fn validate_id_rejects_traversal() {
        assert!(validate_id("clock-panel").is_ok());
        for bad in ["", "..", "../etc", "a/b", "a\\b", ".hidden"] {
            assert!(validate_id(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn install_latest_version() {
        let f = fixture(&[("clock-panel", &["1.0.0", "1.2.0", "1.10.0"], &[])]);

        let report = install(&f.repo, &f.plugins, "clock-panel", None).unwrap();

        assert_eq!(report.version, "1.10.0");
        assert!(report.path.join("dist/module.js").is_file());
        let installed = installed_plugins(&f.plugins).unwrap();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].version, "1.10.0");
    }

    #[test]
    fn install_exact_version_and_missing_version() {
        let f = fixture(&[("clock-panel", &["1.0.0", "1.2.0"], &[])]);

        let report = install(&f.repo, &f.plugins, "clock-panel", Some("1.0.0")).unwrap();
        assert_eq!(report.version, "1.0.0");

        let err = install(&f.repo, &f.plugins, "clock-panel", Some("7.0.0")).unwrap_err();
        assert!(matches!(err, PluginError::VersionNotFound { .. }));
        // the earlier install is untouched
        assert_eq!(
            find_installed(&f.plugins, "clock-panel").unwrap().unwrap().version,
            "1.0.0"
        );
    }

    #[test]
    fn install_pulls_missing_dependencies() {
        let f = fixture(&[
            ("app", &["2.0.0"], &["panel-a", "panel-b"]),
            ("panel-a", &["1.0.0"], &["panel-b"]),
            ("panel-b", &["0.3.0"], &[]),
        ]);

        let report = install(&f.repo, &f.plugins, "app", None).unwrap();

        let ids: Vec<_> = installed_plugins(&f.plugins)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["app", "panel-a", "panel-b"]);
        assert_eq!(report.dependencies, vec!["panel-a@1.0.0", "panel-b@0.3.0"]);
    }

    #[test]
    fn dependency_cycle_terminates() {
        let f = fixture(&[("a", &["1.0.0"], &["b"]), ("b", &["1.0.0"], &["a"])]);

        let report = install(&f.repo, &f.plugins, "a", None).unwrap();
        assert_eq!(report.dependencies, vec!["b@1.0.0"]);
    }

    #[test]
    fn failed_fetch_leaves_no_staging_dir() {
        let f = fixture(&[("clock-panel", &["1.0.0"], &[])]);
        fs::remove_dir_all(PathBuf::from(f.repo.location()).join("clock-panel")).unwrap();

        assert!(install(&f.repo, &f.plugins, "clock-panel", None).is_err());
        let leftovers: Vec<_> = fs::read_dir(&f.plugins).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn install_from_path_checks_manifest_id() {
        let f = fixture(&[("clock-panel", &["1.0.0"], &[])]);
        let src = PathBuf::from(f.repo.location()).join("clock-panel/1.0.0");

        let err = install_from_path(&src, &f.plugins, "other-id").unwrap_err();
        assert!(matches!(err, PluginError::ManifestMismatch { .. }));

        let report = install_from_path(&src, &f.plugins, "clock-panel").unwrap();
        assert_eq!(report.version, "1.0.0");
    }

    #[test]
    fn installed_plugins_skips_hidden_and_broken() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".staging-x")).unwrap();
        fs::create_dir_all(temp.path().join("broken")).unwrap();
        fs::write(temp.path().join(".dash-cli.lock"), "").unwrap();

        assert!(installed_plugins(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn installed_plugins_requires_directory() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        assert!(matches!(
            installed_plugins(&missing),
            Err(PluginError::PluginsDirMissing(_))
        ));
    }

    #[test]
    fn remove_deletes_plugin() {
        let f = fixture(&[("clock-panel", &["1.0.0"], &[])]);
        install(&f.repo, &f.plugins, "clock-panel", None).unwrap();

        let removed = remove(&f.plugins, "clock-panel").unwrap();
        assert!(!removed.exists());
        assert!(matches!(
            remove(&f.plugins, "clock-panel"),
            Err(PluginError::NotInstalled(_))
        ));
        assert!(matches!(
            remove(&f.plugins, "../etc"),
            Err(PluginError::InvalidId(_))
        ));
    }
}
