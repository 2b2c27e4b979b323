//! # Battle Development Tools
//!
//! Command-line tools for development:
//! - Definition validators
//! - Headless seeded battle runs

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod simulate;
pub mod validate;

use thiserror::Error;

/// Errors raised by the tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A file or directory could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Definitions failed to load or validate.
    #[error(transparent)]
    Game(#[from] battle_core::error::GameError),

    /// A definition file names no characters.
    #[error("'{0}' defines no characters")]
    EmptyRoster(String),

    /// No definition files were found.
    #[error("No .ron files found in '{0}'")]
    NothingToValidate(String),

    /// Output encoding failed.
    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;

/// Read a file to a string, tagging errors with the path.
///
/// # Errors
///
/// [`ToolError::Io`] if the file cannot be read.
pub fn read_source(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.display().to_string(),
        source,
    })
}
