//! admin commands - Server administration against the database

use anyhow::Result;
use thiserror::Error;

use crate::cli::context::CommandLine;
use crate::core::config::OVERRIDE_PREFIX;
use crate::store::SqlStore;
use crate::ui::{prompts, Terminal};

/// Shortest accepted admin password.
pub const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdminError {
    #[error("New password too short")]
    PasswordTooShort,

    #[error("could not find admin user '{0}'")]
    AdminUserNotFound(String),
}

/// The first positional argument that is not a `cfg:` override.
fn password_arg(ctx: &dyn CommandLine) -> Option<&str> {
    ctx.args()
        .iter()
        .map(String::as_str)
        .find(|a| !a.starts_with(OVERRIDE_PREFIX))
}

/// `admin reset-admin-password <new password>`
///
/// Without a password argument the user is prompted, which only works when
/// stdin is a terminal.
pub fn reset_password_command(
    ctx: &dyn CommandLine,
    term: &mut Terminal,
    store: &SqlStore,
) -> Result<()> {
    let password = match password_arg(ctx) {
        Some(pw) => pw.to_string(),
        None => prompts::password_confirmed("New admin password: ", prompts::is_interactive())?,
    };
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AdminError::PasswordTooShort.into());
    }

    let login = store.cfg().admin_user();
    let user = store
        .get_user_by_login(login)?
        .ok_or_else(|| AdminError::AdminUserNotFound(login.to_string()))?;
    store.change_user_password(&user, &password)?;

    term.line("");
    term.line("Admin password changed successfully ✔");
    Ok(())
}
