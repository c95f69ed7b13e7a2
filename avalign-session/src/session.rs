//! Session-level configuration and the finalize entry point.

use crate::error::Result;
use crate::input::{InputDescriptor, InputRegistry};
use crate::sync;
use tracing::debug;

/// Global timestamp-handling flags.
///
/// One instance per session, passed by reference into the passes. There is
/// deliberately no process-global or thread-local copy of these; concurrent
/// sessions each carry their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncFlags {
    /// Copy input timestamps to the output instead of regenerating them
    /// (-copyts).
    pub copy_ts: bool,
    /// Shift timestamps so the output starts at zero (-start_at_zero).
    pub start_at_zero: bool,
}

/// Computed alignment for one input, as handed to the demux pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputOffset {
    /// Registry index.
    pub index: usize,
    /// Source URL, for reporting.
    pub url: String,
    /// Corrected start time in microseconds, if known.
    pub effective_start_time: Option<i64>,
    /// Offset in microseconds to add to every timestamp demuxed from this
    /// input.
    pub ts_offset: i64,
}

/// One transcode session's view of its inputs.
///
/// The registry is exclusively owned here between opening and demuxing;
/// both passes run on the caller's thread.
#[derive(Debug, Default)]
pub struct Session {
    /// Opened inputs.
    pub inputs: InputRegistry,
    /// Global timestamp flags.
    pub flags: SyncFlags,
}

impl Session {
    /// Create an empty session with the given flags.
    pub fn new(flags: SyncFlags) -> Self {
        Self {
            inputs: InputRegistry::new(),
            flags,
        }
    }

    /// Add an opened input, returning its stable index.
    pub fn add_input(&mut self, input: InputDescriptor) -> usize {
        self.inputs.push(input)
    }

    /// Reconcile timestamps across all inputs.
    ///
    /// Runs start-time correction, then cross-input alignment, in that
    /// order. Fails fast on fatal configuration errors; corrections already
    /// applied when that happens are safe to keep, since the session aborts
    /// anyway.
    pub fn finalize(&mut self) -> Result<()> {
        debug!("Finalizing session with {} inputs", self.inputs.len());
        sync::correct_start_times(&mut self.inputs, &self.flags);
        sync::apply_sync_offsets(&mut self.inputs, &self.flags)
    }

    /// Per-input offsets for the downstream pipeline.
    pub fn offsets(&self) -> Vec<InputOffset> {
        self.inputs
            .iter()
            .enumerate()
            .map(|(index, input)| InputOffset {
                index,
                url: input.url.clone(),
                effective_start_time: input.effective_start_time,
                ts_offset: input.ts_offset,
            })
            .collect()
    }
}
