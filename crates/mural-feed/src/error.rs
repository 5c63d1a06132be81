//! Error types for mural-feed.

use thiserror::Error;

/// Result type alias using mural-feed's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the remote feed.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error
/// variants in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport-level HTTP failure.
    #[error("Feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The feed answered with a non-success status.
    #[error("Feed returned HTTP {status} for {url}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The request URL.
        url: String,
    },

    /// The response document was not well-formed feed XML.
    #[error("Malformed feed document: {0}")]
    Xml(String),

    /// An `image` element was missing a required child element.
    #[error("Feed entry is missing <{0}>")]
    MissingField(&'static str),

    /// A feed value failed to parse (dates, surfaces).
    #[error(transparent)]
    Parse(#[from] mural_types::ParseError),
}

impl Error {
    /// Create a malformed-document error from any displayable cause.
    pub(crate) fn xml(cause: impl std::fmt::Display) -> Self {
        Self::Xml(cause.to_string())
    }
}
