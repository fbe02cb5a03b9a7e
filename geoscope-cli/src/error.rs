//! CLI error types.

use thiserror::Error;

/// Errors surfaced to the terminal.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown temporal layer '{0}' (expected co2 or ozone)")]
    UnknownLayer(String),

    #[error("HTTP client setup failed: {0}")]
    HttpSetup(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("session failed: {0}")]
    Session(String),
}
