//! Parsed command-line structures.

use avalign_session::{Discard, StreamMap, StreamSpecifier, SyncFlags};

/// Diagnostic verbosity requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Quiet,
    Error,
    Warning,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

impl Verbosity {
    /// Parse a `-loglevel` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "quiet" => Some(Self::Quiet),
            "error" | "panic" | "fatal" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "info" => Some(Self::Info),
            "verbose" => Some(Self::Verbose),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }
}

/// Options scoped to one input file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputOptions {
    /// Input URL (the `-i` argument).
    pub url: String,
    /// Start seek in microseconds (-ss).
    pub start_time: Option<i64>,
    /// Base timestamp offset in microseconds (-itsoffset).
    pub ts_offset: i64,
    /// Index of the input to align with (-isync).
    pub sync_ref: Option<usize>,
    /// Per-stream discard directives, in command-line order.
    pub discard: Vec<(StreamSpecifier, Discard)>,
}

/// Options scoped to one output file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputOptions {
    /// Output URL (the positional argument).
    pub url: String,
    /// Recording duration in microseconds (-t).
    pub duration: Option<i64>,
    /// Stop time in microseconds (-to).
    pub stop_time: Option<i64>,
    /// Stream maps for this output, in command-line order.
    pub maps: Vec<StreamMap>,
}

/// An option this layer does not own, kept for the warning report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedOption {
    /// The flag as written, including the dash.
    pub flag: String,
    /// Its value, when one followed.
    pub value: Option<String>,
}

/// A fully split and translated command line.
#[derive(Debug, Clone, Default)]
pub struct CommandLine {
    /// Global timestamp flags.
    pub flags: SyncFlags,
    /// Requested verbosity.
    pub verbosity: Verbosity,
    /// Overwrite policy: `Some(true)` for -y, `Some(false)` for -n.
    pub overwrite: Option<bool>,
    /// Inputs in `-i` order.
    pub inputs: Vec<InputOptions>,
    /// Outputs in positional order.
    pub outputs: Vec<OutputOptions>,
    /// Options that were collected but not translated.
    pub ignored: Vec<UnsupportedOption>,
}
