//! Error types for the battle simulation.
//!
//! Errors only surface at the boundary (loading data, issuing commands,
//! serializing snapshots). Inside a tick every fault degrades to a no-op.

use thiserror::Error;

use crate::components::EntityId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all battle simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path (or label) of the source that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Definitions parsed but reference each other inconsistently.
    #[error("Invalid definition '{id}': {message}")]
    DefinitionError {
        /// Identifier of the offending definition.
        id: String,
        /// What is wrong with it.
        message: String,
    },

    /// Unknown character definition requested from the factory.
    #[error("Unknown character: {0}")]
    UnknownCharacter(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Snapshot encoding failure.
    #[error("Snapshot serialization failed: {0}")]
    Serialization(String),
}

impl GameError {
    /// Build a [`GameError::DataParseError`] from any displayable error.
    pub fn parse(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::DataParseError {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
