//! Stream error types

use thiserror::Error;

/// Errors raised while building a stream graph
///
/// Writes never fail with an error: a panic inside a user-supplied function
/// unwinds through the `set` call that triggered it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// A combinator was given an argument it cannot work with
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        name: &'static str,
        reason: &'static str,
    },
}

impl StreamError {
    /// Build an [`StreamError::InvalidArgument`]
    pub fn invalid_argument(name: &'static str, reason: &'static str) -> Self {
        StreamError::InvalidArgument { name, reason }
    }
}

/// Result type for stream graph construction
pub type Result<T> = std::result::Result<T, StreamError>;
