//! plugins commands - Install, update, list and remove plugins
//!
//! # Locking
//!
//! Commands that write to the plugins directory hold
//! [`PluginDirLock`] until they return. `ls`, `list-remote` and
//! `list-versions` only read.

use std::path::Path;

use anyhow::{bail, Context as _, Result};

use crate::cli::context::CommandLine;
use crate::core::ops::PluginDirLock;
use crate::core::version;
use crate::plugins::installer::{self, InstallReport};
use crate::plugins::repo;
use crate::plugins::PluginError;
use crate::ui::Terminal;

fn require_id<'a>(ctx: &'a dyn CommandLine, message: &str) -> Result<&'a str> {
    match ctx.args().first() {
        Some(id) if !id.is_empty() => Ok(id.as_str()),
        _ => bail!("{}", message),
    }
}

fn report_install(term: &mut Terminal, report: &InstallReport) {
    for dep in &report.dependencies {
        term.line(format!("✔ Installed dependency {}", dep));
    }
    term.line(format!("✔ Installed {} successfully", report.id));
}

/// `plugins install <plugin id> [version]`
///
/// With `--pluginUrl` the plugin is copied from that directory instead of
/// being resolved through the repository.
pub fn install_command(ctx: &dyn CommandLine, term: &mut Terminal) -> Result<()> {
    let id = require_id(ctx, "please specify plugin to install")?;
    let plugins_dir = ctx.plugin_directory();
    let _lock = PluginDirLock::acquire(&plugins_dir)?;

    let plugin_url = ctx.plugin_url();
    let report = if plugin_url.is_empty() {
        let repo = repo::open(&ctx.repo_directory())?;
        let version = ctx.args().get(1).map(String::as_str);
        installer::install(&*repo, &plugins_dir, id, version)?
    } else {
        installer::install_from_path(Path::new(&plugin_url), &plugins_dir, id)
            .with_context(|| format!("failed to install {} from {}", id, plugin_url))?
    };

    log::debug!("installed {} into {}", report.id, report.path.display());
    report_install(term, &report);
    Ok(())
}

/// `plugins list-remote`
pub fn list_remote_command(ctx: &dyn CommandLine, term: &mut Terminal) -> Result<()> {
    let repo = repo::open(&ctx.repo_directory())?;
    let index = repo.index()?;

    for plugin in &index.plugins {
        match plugin.latest() {
            Some(latest) => term.line(format!("{} @ {}", plugin.id, latest.version)),
            None => term.line(format!("{} @ (no versions)", plugin.id)),
        }
    }
    Ok(())
}

/// `plugins list-versions <plugin id>`
pub fn list_versions_command(ctx: &dyn CommandLine, term: &mut Terminal) -> Result<()> {
    let id = require_id(ctx, "please specify plugin to list versions for")?;
    let repo = repo::open(&ctx.repo_directory())?;
    let plugin = repo.plugin(id)?;

    let mut versions: Vec<&str> = plugin.versions.iter().map(|v| v.version.as_str()).collect();
    versions.sort_by(|a, b| version::compare(b, a));
    for v in versions {
        term.line(v);
    }
    Ok(())
}

/// `plugins update <plugin id>`
pub fn upgrade_command(ctx: &dyn CommandLine, term: &mut Terminal) -> Result<()> {
    let id = require_id(ctx, "please specify plugin to update")?;
    let plugins_dir = ctx.plugin_directory();
    if !plugins_dir.is_dir() {
        return Err(PluginError::NotInstalled(id.to_string()).into());
    }
    let _lock = PluginDirLock::acquire(&plugins_dir)?;
    let installed = installer::find_installed(&plugins_dir, id)?
        .ok_or_else(|| PluginError::NotInstalled(id.to_string()))?;

    let repo = repo::open(&ctx.repo_directory())?;
    let remote = repo.plugin(id)?;
    let latest = remote
        .latest()
        .ok_or_else(|| PluginError::NoVersions(id.to_string()))?;

    if !version::is_newer(&latest.version, &installed.version) {
        term.line(format!("{} {} is up to date", id, installed.version));
        return Ok(());
    }

    let report = installer::install(&*repo, &plugins_dir, id, Some(latest.version.as_str()))?;
    term.line(format!(
        "✔ Updated {} from {} to {}",
        id, installed.version, report.version
    ));
    Ok(())
}

/// `plugins update-all`
pub fn upgrade_all_command(ctx: &dyn CommandLine, term: &mut Terminal) -> Result<()> {
    let plugins_dir = ctx.plugin_directory();
    if !plugins_dir.is_dir() {
        return Err(PluginError::PluginsDirMissing(plugins_dir).into());
    }
    let _lock = PluginDirLock::acquire(&plugins_dir)?;
    let installed = installer::installed_plugins(&plugins_dir)?;
    let repo = repo::open(&ctx.repo_directory())?;

    let mut outdated = Vec::new();
    for plugin in &installed {
        let remote = match repo.plugin(&plugin.id) {
            Ok(remote) => remote,
            Err(PluginError::NotFound(_)) => {
                log::warn!("{} is not listed in {}, skipping", plugin.id, repo.location());
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if let Some(latest) = remote.latest() {
            if version::is_newer(&latest.version, &plugin.version) {
                outdated.push((plugin.id.clone(), plugin.version.clone(), latest.version.clone()));
            }
        }
    }

    if outdated.is_empty() {
        term.line("all installed plugins are up to date");
        return Ok(());
    }

    for (id, from, to) in &outdated {
        installer::install(&*repo, &plugins_dir, id, Some(to.as_str()))?;
        term.line(format!("✔ Updated {} from {} to {}", id, from, to));
    }
    term.line(format!("updated {} plugin(s)", outdated.len()));
    Ok(())
}

/// `plugins ls`
pub fn ls_command(ctx: &dyn CommandLine, term: &mut Terminal) -> Result<()> {
    let plugins = installer::installed_plugins(&ctx.plugin_directory())?;

    if plugins.is_empty() {
        term.line("no installed plugins found");
        return Ok(());
    }

    term.line("installed plugins:");
    for plugin in &plugins {
        term.line(format!("{} @ {}", plugin.id, plugin.version));
    }
    Ok(())
}

/// `plugins uninstall <plugin id>`
pub fn remove_command(ctx: &dyn CommandLine, term: &mut Terminal) -> Result<()> {
    let id = require_id(ctx, "please specify plugin to uninstall")?;
    installer::validate_id(id)?;
    let plugins_dir = ctx.plugin_directory();
    if !plugins_dir.is_dir() {
        return Err(PluginError::NotInstalled(id.to_string()).into());
    }
    let _lock = PluginDirLock::acquire(&plugins_dir)?;
    if !plugins_dir.join(id).is_dir() {
        return Err(PluginError::NotInstalled(id.to_string()).into());
    }

    let removed = installer::remove(&plugins_dir, id)?;
    log::debug!("removed {}", removed.display());
    term.line(format!("✔ Removed {}", id));
    Ok(())
}
