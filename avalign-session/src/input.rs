//! Input and stream descriptors.
//!
//! Descriptors are created and populated by the input-opening collaborator
//! (the wrapped media engine), then handed to the session passes, which
//! mutate `effective_start_time` and `ts_offset` in place. Teardown stays
//! with whoever opened the inputs.

use avalign_core::TimeBase;
use std::fmt;

/// What the user asked to do with a stream's packets.
///
/// Streams marked [`Discard::All`] are excluded from every aggregate
/// computation in the session passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Discard {
    /// Keep every packet.
    #[default]
    Keep,
    /// Drop some packets (non-reference frames, non-keyframes, ...).
    Partial,
    /// Drop the stream entirely.
    All,
}

impl Discard {
    /// Parse a `-discard` option value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" | "default" => Some(Self::Keep),
            "noref" | "bidir" | "nokey" => Some(Self::Partial),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// Elementary stream media kind, for stream specifier matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Subtitle => "subtitle",
            Self::Data => "data",
            Self::Attachment => "attachment",
        };
        f.write_str(s)
    }
}

/// One elementary stream within an opened input.
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    /// Media kind.
    pub kind: MediaKind,
    /// Reported start time in stream-local ticks, if known.
    pub start_time: Option<i64>,
    /// Time base interpreting `start_time`.
    pub time_base: TimeBase,
    /// User-requested discard state.
    pub discard: Discard,
}

impl StreamDescriptor {
    /// Create a stream descriptor with no start time and default discard.
    pub fn new(kind: MediaKind, time_base: TimeBase) -> Self {
        Self {
            kind,
            start_time: None,
            time_base,
            discard: Discard::default(),
        }
    }

    /// Set the reported start time (builder style).
    pub fn with_start_time(mut self, ticks: i64) -> Self {
        self.start_time = Some(ticks);
        self
    }

    /// Set the discard state (builder style).
    pub fn with_discard(mut self, discard: Discard) -> Self {
        self.discard = discard;
        self
    }

    /// Start time converted to global microseconds, if known.
    pub fn start_micros(&self) -> Option<i64> {
        self.start_time.map(|ts| self.time_base.to_micros(ts))
    }
}

/// One opened input source.
#[derive(Debug, Clone)]
pub struct InputDescriptor {
    /// Source URL or path, for diagnostics.
    pub url: String,
    /// Container-reported start time in microseconds, if known.
    pub format_start_time: Option<i64>,
    /// Wall-clock start time in microseconds, reported by some live
    /// sources; independent of `format_start_time`.
    pub realtime_start: Option<i64>,
    /// User-requested start seek (-ss) in microseconds, if given.
    pub user_start_time: Option<i64>,
    /// Corrected start time in microseconds; starts equal to
    /// `format_start_time` and is recomputed by start-time correction.
    pub effective_start_time: Option<i64>,
    /// User-supplied base timestamp offset (-itsoffset) in microseconds.
    pub base_ts_offset: i64,
    /// Working timestamp offset in microseconds, added to every timestamp
    /// demuxed from this input. Starts at `base_ts_offset`.
    pub ts_offset: i64,
    /// Index of another input this one should be aligned with (-isync).
    /// `None` and self-reference are both "no alignment".
    pub sync_ref: Option<usize>,
    /// Container format allows timestamp jumps or resets, fixed at open
    /// time.
    pub discontinuous_ts: bool,
    /// Streams in container order.
    pub streams: Vec<StreamDescriptor>,
}

impl InputDescriptor {
    /// Create a descriptor with nothing known yet.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format_start_time: None,
            realtime_start: None,
            user_start_time: None,
            effective_start_time: None,
            base_ts_offset: 0,
            ts_offset: 0,
            sync_ref: None,
            discontinuous_ts: false,
            streams: Vec::new(),
        }
    }

    /// Set the container-reported start time; also initializes the
    /// effective start time (builder style).
    pub fn with_format_start(mut self, micros: i64) -> Self {
        self.format_start_time = Some(micros);
        self.effective_start_time = Some(micros);
        self
    }

    /// Set the user base timestamp offset; also initializes the working
    /// offset (builder style).
    pub fn with_base_offset(mut self, micros: i64) -> Self {
        self.base_ts_offset = micros;
        self.ts_offset = micros;
        self
    }

    /// User seek start, zero when not requested.
    pub fn seek_start(&self) -> i64 {
        self.user_start_time.unwrap_or(0)
    }
}

/// Ordered collection of opened inputs.
///
/// Indices are stable for the life of the session and serve as the
/// sync-reference relation between inputs.
#[derive(Debug, Clone, Default)]
pub struct InputRegistry {
    inputs: Vec<InputDescriptor>,
}

impl InputRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input, returning its stable index.
    pub fn push(&mut self, input: InputDescriptor) -> usize {
        self.inputs.push(input);
        self.inputs.len() - 1
    }

    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Input at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&InputDescriptor> {
        self.inputs.get(index)
    }

    /// Mutable input at `index`, if present.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut InputDescriptor> {
        self.inputs.get_mut(index)
    }

    /// Iterate inputs in order.
    pub fn iter(&self) -> std::slice::Iter<'_, InputDescriptor> {
        self.inputs.iter()
    }

    /// Iterate inputs mutably, in order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, InputDescriptor> {
        self.inputs.iter_mut()
    }
}

impl std::ops::Index<usize> for InputRegistry {
    type Output = InputDescriptor;

    fn index(&self, index: usize) -> &Self::Output {
        &self.inputs[index]
    }
}

impl std::ops::IndexMut<usize> for InputRegistry {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.inputs[index]
    }
}
