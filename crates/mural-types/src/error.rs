//! Error types for parsing in mural-types.

use thiserror::Error;

/// Errors that can occur when parsing feed values.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error
/// variants in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A date string did not match the expected format.
    #[error("Invalid date '{value}': {source}")]
    InvalidDate {
        /// The offending input.
        value: String,
        /// The underlying parse failure.
        source: time::error::Parse,
    },

    /// An unknown wallpaper surface name.
    #[error("Invalid wallpaper surface '{0}' (expected home, lock, or both)")]
    InvalidSurface(String),
}

/// Result type alias using mural-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
