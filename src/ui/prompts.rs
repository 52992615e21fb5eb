//! ui::prompts
//!
//! Interactive prompts.
//!
//! # Design
//!
//! Prompts are only shown in interactive mode. In non-interactive mode,
//! operations requiring user input must either have defaults or fail
//! with a clear error message.

use std::io::IsTerminal;

use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("entered values do not match")]
    Mismatch,

    #[error("not in interactive mode")]
    NotInteractive,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Whether stdin is attached to a terminal.
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal()
}

/// Prompt for masked input (e.g., passwords).
///
/// The input is not echoed to the terminal.
pub fn password(message: &str, interactive: bool) -> Result<String, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    Ok(rpassword::prompt_password(message)?)
}

/// Prompt for masked input twice and require both entries to match.
pub fn password_confirmed(message: &str, interactive: bool) -> Result<String, PromptError> {
    let first = password(message, interactive)?;
    let second = password("Confirm: ", interactive)?;
    if first != second {
        return Err(PromptError::Mismatch);
    }
    Ok(first)
}
