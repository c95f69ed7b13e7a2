//! Option parsing errors.

use avalign_session::SessionError;
use thiserror::Error;

/// Command-line parsing error type.
#[derive(Error, Debug)]
pub enum OptError {
    /// An option that takes a value appeared last on the line.
    #[error("Missing value for option {flag}")]
    MissingValue { flag: String },

    /// An option value could not be parsed.
    #[error("Invalid value for option {flag}: {message}")]
    InvalidValue { flag: String, message: String },

    /// A stream map argument was malformed.
    #[error(transparent)]
    Map(#[from] SessionError),
}

impl OptError {
    pub(crate) fn missing(flag: &str) -> Self {
        OptError::MissingValue {
            flag: flag.to_string(),
        }
    }

    pub(crate) fn invalid(flag: &str, message: impl Into<String>) -> Self {
        OptError::InvalidValue {
            flag: flag.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias using OptError.
pub type Result<T> = std::result::Result<T, OptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_value_display() {
        assert_eq!(
            OptError::missing("-ss").to_string(),
            "Missing value for option -ss"
        );
    }

    #[test]
    fn test_invalid_value_display() {
        let err = OptError::invalid("-isync", "'x' is not an input index");
        assert_eq!(
            err.to_string(),
            "Invalid value for option -isync: 'x' is not an input index"
        );
    }
}
