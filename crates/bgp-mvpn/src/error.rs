//! Error types for the multicast VPN table crate.
//!
//! Only recoverable conditions live here: configuration problems, unknown
//! or duplicate table families, and malformed textual input. Broken
//! internal invariants panic instead.

use bgp_types::ParseError;
use std::io;
use thiserror::Error;

/// Result type alias for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

/// Errors that can occur while building or configuring tables.
#[derive(Debug, Error)]
pub enum TableError {
    /// No factory is registered for the requested table name.
    #[error("No table factory registered for '{0}'")]
    UnknownFamily(String),

    /// A factory is already registered under this family name.
    #[error("Table factory already registered for '{0}'")]
    DuplicateFamily(String),

    /// Configuration validation or parse error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed prefix, route distinguisher or community.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl TableError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
