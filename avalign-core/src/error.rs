//! Error types for the core time math.

use thiserror::Error;

/// Core error type.
#[derive(Error, Debug)]
pub enum Error {
    /// A time or duration string could not be parsed.
    #[error("Invalid time specification '{input}': {reason}")]
    InvalidTime {
        /// The offending input string.
        input: String,
        /// What was wrong with it.
        reason: &'static str,
    },
}

impl Error {
    pub(crate) fn invalid_time(input: &str, reason: &'static str) -> Self {
        Error::InvalidTime {
            input: input.to_string(),
            reason,
        }
    }
}

/// Result type alias using the core Error type.
pub type Result<T> = std::result::Result<T, Error>;
