//! Session error types.

use thiserror::Error;

/// Session setup error type.
///
/// Only genuinely fatal configuration problems become errors; per-input
/// anomalies (chained sync references, missing start times) are logged and
/// skipped inside the passes.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A sync reference names an input that does not exist.
    #[error("Sync reference for input #{input} names non-existent input #{reference} (have {inputs} inputs)")]
    InvalidSyncReference {
        input: usize,
        reference: usize,
        inputs: usize,
    },

    /// Sync references combined with -copyts require -start_at_zero.
    #[error("Input sync references require -start_at_zero when -copyts is set")]
    CopyTsRequiresStartAtZero,

    /// A stream map string could not be parsed.
    #[error("Invalid stream map '{map}': {reason}")]
    InvalidStreamMap { map: String, reason: String },

    /// A stream map names an input that does not exist.
    #[error("Stream map '{map}' names non-existent input #{file_index} (have {inputs} inputs)")]
    MapInputOutOfRange {
        map: String,
        file_index: usize,
        inputs: usize,
    },

    /// A stream map matched no streams and had no trailing '?'.
    #[error("Stream map '{map}' matches no streams; add a trailing '?' to ignore")]
    MapMatchesNothing { map: String },

    /// A stream map matched only streams the user discarded.
    #[error("Stream map '{map}' matches only disabled streams; add a trailing '?' to ignore")]
    MapMatchesDisabled { map: String },
}

/// Result type alias using SessionError.
pub type Result<T> = std::result::Result<T, SessionError>;
