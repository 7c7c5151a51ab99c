//! Error types for catalog lookups and round building.

use thiserror::Error;

/// Failures surfaced by the word catalog and the round builder.
///
/// None of these are retried inside the crate; they propagate to whoever
/// asked for the round or the answer check.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The backing store failed to read or parse its data.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An ordinal offset or id has no matching record.
    #[error("{what} not found at {key}")]
    NotFound { what: &'static str, key: String },

    /// There is not enough data to draw from.
    #[error("catalog too small: {0}")]
    EmptyCatalog(&'static str),
}

impl CatalogError {
    pub fn storage(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        CatalogError::Storage(err.into())
    }

    pub fn not_found(what: &'static str, key: impl ToString) -> Self {
        CatalogError::NotFound { what, key: key.to_string() }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::storage(err)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::storage(err)
    }
}

/// Convenience alias used across the core modules.
pub type Result<T> = std::result::Result<T, CatalogError>;
