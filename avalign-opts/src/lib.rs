//! FFmpeg-style command-line parsing for avalign.
//!
//! This crate splits an FFmpeg-shaped command line into global, per-input
//! and per-output option groups and translates the options this layer owns
//! into session configuration. Options are positional the way FFmpeg's
//! are: input options accumulate until the `-i` they apply to, output
//! options until the positional output URL.
//!
//! # Supported Options
//!
//! ## Global
//! - `-copyts` / `-start_at_zero` → timestamp handling flags
//! - `-y` / `-n` → overwrite policy
//! - `-v <level>` / `-loglevel <level>` → diagnostic verbosity
//!
//! ## Per input (before the `-i` they apply to)
//! - `-i <url>` → input file
//! - `-ss <time>` → start seek
//! - `-itsoffset <time>` → base timestamp offset
//! - `-isync <index>` → align this input with another (`-1` for none)
//! - `-discard[:<spec>] <value>` → per-stream discard state
//!
//! ## Per output (before the positional output URL)
//! - `-map <map>` → stream selection
//! - `-t <time>` / `-to <time>` → duration / stop time
//!
//! Anything else is collected with a warning and ignored, so existing
//! scripts keep working while only the session-setup options take effect.
//!
//! # Example
//!
//! ```
//! use avalign_opts::CommandLine;
//!
//! let cli = CommandLine::parse(&[
//!     "-copyts", "-start_at_zero",
//!     "-ss", "2", "-i", "main.mkv",
//!     "-isync", "0", "-i", "mic.wav",
//!     "-map", "0:v", "-map", "1:a", "out.mkv",
//! ]).unwrap();
//!
//! assert!(cli.flags.copy_ts);
//! assert_eq!(cli.inputs.len(), 2);
//! assert_eq!(cli.inputs[0].start_time, Some(2_000_000));
//! assert_eq!(cli.inputs[1].sync_ref, Some(0));
//! assert_eq!(cli.outputs[0].maps.len(), 2);
//! ```

mod error;
mod options;
mod parser;

pub use error::{OptError, Result};
pub use options::{
    CommandLine, InputOptions, OutputOptions, UnsupportedOption, Verbosity,
};
