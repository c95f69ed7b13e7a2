//! Probed-input descriptions.
//!
//! Opening containers belongs to the wrapped media engine; its probe step
//! hands this tool a JSON document describing what it found. This module
//! deserializes that document and merges it with the per-input command-line
//! options into session descriptors.

use anyhow::{bail, Context};
use avalign_core::TimeBase;
use avalign_opts::InputOptions;
use avalign_session::map::apply_discard;
use avalign_session::{InputDescriptor, MediaKind, StreamDescriptor};
use serde::Deserialize;

/// Top-level probe document: one entry per input, in `-i` order.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeDocument {
    pub inputs: Vec<ProbeInput>,
}

/// What the engine reported for one opened input.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeInput {
    /// Container-reported start time in microseconds.
    #[serde(default)]
    pub start_time_us: Option<i64>,
    /// Wall-clock start time in microseconds, for live sources.
    #[serde(default)]
    pub realtime_start_us: Option<i64>,
    /// Container allows timestamp jumps or resets.
    #[serde(default)]
    pub discontinuous_timestamps: bool,
    /// Streams in container order.
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

/// What the engine reported for one stream.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeStream {
    pub kind: ProbeKind,
    /// Start time in stream-local ticks.
    #[serde(default)]
    pub start_time: Option<i64>,
    /// Time base as `[numerator, denominator]`.
    pub time_base: (i64, i64),
}

/// Stream media kind, as spelled in probe JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
}

impl From<ProbeKind> for MediaKind {
    fn from(kind: ProbeKind) -> Self {
        match kind {
            ProbeKind::Video => MediaKind::Video,
            ProbeKind::Audio => MediaKind::Audio,
            ProbeKind::Subtitle => MediaKind::Subtitle,
            ProbeKind::Data => MediaKind::Data,
            ProbeKind::Attachment => MediaKind::Attachment,
        }
    }
}

impl ProbeDocument {
    /// Parse a probe document from JSON text.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("malformed probe document")
    }
}

/// Merge probe data with the command line's per-input options into session
/// descriptors. Entries are matched positionally, so the counts must agree.
pub fn build_inputs(
    probe: &ProbeDocument,
    options: &[InputOptions],
) -> anyhow::Result<Vec<InputDescriptor>> {
    if probe.inputs.len() != options.len() {
        bail!(
            "probe document describes {} inputs but the command line names {}",
            probe.inputs.len(),
            options.len()
        );
    }

    let mut inputs = Vec::with_capacity(options.len());
    for (probed, opts) in probe.inputs.iter().zip(options) {
        let mut input = InputDescriptor::new(opts.url.clone());
        input.format_start_time = probed.start_time_us;
        input.effective_start_time = probed.start_time_us;
        input.realtime_start = probed.realtime_start_us;
        input.discontinuous_ts = probed.discontinuous_timestamps;
        input.user_start_time = opts.start_time;
        input.base_ts_offset = opts.ts_offset;
        input.ts_offset = opts.ts_offset;
        input.sync_ref = opts.sync_ref;
        input.streams = probed
            .streams
            .iter()
            .map(|st| {
                let (num, den) = st.time_base;
                if den <= 0 || num <= 0 {
                    bail!("invalid time base {num}/{den} in probe document");
                }
                let mut stream =
                    StreamDescriptor::new(st.kind.into(), TimeBase::new(num, den));
                stream.start_time = st.start_time;
                Ok(stream)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        for (specifier, discard) in &opts.discard {
            apply_discard(&mut input, specifier, *discard);
        }
        inputs.push(input);
    }

    Ok(inputs)
}
