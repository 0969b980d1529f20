//! Error types for extension negotiation and message processing.
//!
//! Grammar, registration and negotiation errors are returned synchronously
//! from the call that caused them. Processing errors travel through the
//! pipeline and reach the failing message's own callback.

use thiserror::Error;

/// Result type alias for extension operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while negotiating or running extensions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The extension header value does not match the grammar.
    #[error("Invalid Sec-WebSocket-Extensions header: {0}")]
    InvalidHeader(String),

    /// Header value exceeds the configured maximum.
    #[error("Extension header too large: {size} bytes (max: {max})")]
    HeaderTooLarge {
        /// Actual header size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Header lists more extension specs than allowed.
    #[error("Too many extension specs: {count} (max: {max})")]
    TooManyExtensions {
        /// Actual spec count.
        count: usize,
        /// Maximum allowed specs.
        max: usize,
    },

    /// Invalid extension registration (bad or duplicate name).
    #[error("Invalid extension: {0}")]
    InvalidExtension(String),

    /// The peer's offer or response cannot be accepted.
    #[error("Negotiation failed: {0}")]
    Negotiation(String),

    /// Generic failure raised by a session while transforming a message.
    #[error("Extension error: {0}")]
    Extension(String),

    /// A session failed to process a message.
    ///
    /// Wraps the session's own error with the name of its extension.
    #[error("{extension}: {source}")]
    Session {
        /// Name of the extension whose session failed.
        extension: String,
        /// Error reported by the session.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap a session error with the name of the extension that raised it.
    pub(crate) fn session(extension: impl Into<String>, source: Error) -> Self {
        Error::Session {
            extension: extension.into(),
            source: Box::new(source),
        }
    }

    /// Returns `true` for errors raised while negotiating.
    #[must_use]
    pub const fn is_negotiation(&self) -> bool {
        matches!(self, Error::Negotiation(_))
    }
}
