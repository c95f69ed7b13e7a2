//! Stream-map syntax and resolution.
//!
//! A map selects streams for an output. The accepted syntax is
//! `[-]file_index[:specifier][?]` for demuxed streams and `[label]` for
//! filter-graph outputs:
//!
//! - a leading `-` disables streams selected by earlier maps,
//! - the specifier narrows the selection to a media kind and/or index,
//! - a trailing `?` turns "matches nothing" from an error into a note.

use crate::error::{Result, SessionError};
use crate::input::{Discard, InputRegistry, MediaKind, StreamDescriptor};
use std::fmt;
use tracing::{debug, trace};

/// A stream specifier: which streams of one input a map applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSpecifier {
    /// Every stream.
    Any,
    /// Streams of one media kind.
    Kind(MediaKind),
    /// The stream at an absolute index.
    Index(usize),
    /// The n-th stream of a media kind.
    KindIndex(MediaKind, usize),
}

impl StreamSpecifier {
    /// Parse the specifier part of a map or per-stream option.
    pub fn parse(spec: &str) -> Option<Self> {
        if spec.is_empty() {
            return Some(Self::Any);
        }
        if let Ok(index) = spec.parse::<usize>() {
            return Some(Self::Index(index));
        }
        let (kind, rest) = match spec.split_once(':') {
            Some((k, rest)) => (k, Some(rest)),
            None => (spec, None),
        };
        let kind = match kind {
            "v" | "V" => MediaKind::Video,
            "a" => MediaKind::Audio,
            "s" => MediaKind::Subtitle,
            "d" => MediaKind::Data,
            "t" => MediaKind::Attachment,
            _ => return None,
        };
        match rest {
            None => Some(Self::Kind(kind)),
            Some(index) => index.parse::<usize>().ok().map(|i| Self::KindIndex(kind, i)),
        }
    }

    /// Whether `stream`, living at `index` within its input, is selected.
    ///
    /// Kind-relative indices count streams of that kind only, so the caller
    /// passes the kind-relative position via `kind_index`.
    pub fn matches(&self, stream: &StreamDescriptor, index: usize, kind_index: usize) -> bool {
        match self {
            Self::Any => true,
            Self::Kind(kind) => stream.kind == *kind,
            Self::Index(i) => index == *i,
            Self::KindIndex(kind, i) => stream.kind == *kind && kind_index == *i,
        }
    }
}

impl fmt::Display for StreamSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => Ok(()),
            Self::Kind(kind) => write!(f, "{}", kind_letter(*kind)),
            Self::Index(i) => write!(f, "{i}"),
            Self::KindIndex(kind, i) => write!(f, "{}:{i}", kind_letter(*kind)),
        }
    }
}

fn kind_letter(kind: MediaKind) -> char {
    match kind {
        MediaKind::Video => 'v',
        MediaKind::Audio => 'a',
        MediaKind::Subtitle => 's',
        MediaKind::Data => 'd',
        MediaKind::Attachment => 't',
    }
}

/// What a map selects from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapSource {
    /// Streams of an opened input.
    Stream {
        file_index: usize,
        specifier: StreamSpecifier,
    },
    /// A named filter-graph output, resolved by the filter layer.
    LinkLabel(String),
}

/// One parsed `-map` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMap {
    /// Disables earlier selections instead of adding new ones.
    pub negative: bool,
    /// Matching nothing is acceptable.
    pub allow_unmatched: bool,
    /// Selection source.
    pub source: MapSource,
}

impl StreamMap {
    /// Parse a `-map` argument.
    pub fn parse(arg: &str) -> Result<Self> {
        let invalid = |reason: &str| SessionError::InvalidStreamMap {
            map: arg.to_string(),
            reason: reason.to_string(),
        };

        let (negative, body) = match arg.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, arg),
        };
        if body.is_empty() {
            return Err(invalid("empty map"));
        }

        if let Some(rest) = body.strip_prefix('[') {
            let label = rest
                .strip_suffix(']')
                .ok_or_else(|| invalid("unterminated output link label"))?;
            if label.is_empty() {
                return Err(invalid("empty output link label"));
            }
            if negative {
                return Err(invalid("filter outputs cannot be negated"));
            }
            return Ok(Self {
                negative: false,
                allow_unmatched: false,
                source: MapSource::LinkLabel(label.to_string()),
            });
        }

        let (body, allow_unmatched) = match body.strip_suffix('?') {
            Some(rest) => (rest, true),
            None => (body, false),
        };

        let (file_part, spec_part) = match body.split_once(':') {
            Some((f, s)) => (f, s),
            None => (body, ""),
        };
        let file_index = file_part
            .parse::<usize>()
            .map_err(|_| invalid("invalid input file index"))?;
        let specifier =
            StreamSpecifier::parse(spec_part).ok_or_else(|| invalid("invalid stream specifier"))?;

        Ok(Self {
            negative,
            allow_unmatched,
            source: MapSource::Stream {
                file_index,
                specifier,
            },
        })
    }
}

impl fmt::Display for StreamMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        match &self.source {
            MapSource::LinkLabel(label) => write!(f, "[{label}]")?,
            MapSource::Stream {
                file_index,
                specifier,
            } => {
                write!(f, "{file_index}")?;
                if *specifier != StreamSpecifier::Any {
                    write!(f, ":{specifier}")?;
                }
            }
        }
        if self.allow_unmatched {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// One stream (or filter output) selected for an output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappedStream {
    /// A demuxed stream.
    Stream {
        file_index: usize,
        stream_index: usize,
        /// Disabled by a later negative map.
        disabled: bool,
    },
    /// A filter-graph output to be connected by the filter layer.
    FilterOutput { label: String },
}

/// Expand maps, in order, against the registry.
///
/// Positive maps append every matching stream that is not fully discarded;
/// negative maps disable matching entries created earlier. A positive map
/// that selects nothing is a fatal error unless it carries a trailing `?`.
pub fn resolve_maps(maps: &[StreamMap], registry: &InputRegistry) -> Result<Vec<MappedStream>> {
    let mut resolved: Vec<MappedStream> = Vec::new();

    for map in maps {
        let (file_index, specifier) = match &map.source {
            MapSource::LinkLabel(label) => {
                resolved.push(MappedStream::FilterOutput {
                    label: label.clone(),
                });
                continue;
            }
            MapSource::Stream {
                file_index,
                specifier,
            } => (*file_index, specifier),
        };

        if file_index >= registry.len() {
            return Err(SessionError::MapInputOutOfRange {
                map: map.to_string(),
                file_index,
                inputs: registry.len(),
            });
        }
        let input = &registry[file_index];

        if map.negative {
            let mut disabled = 0usize;
            for entry in &mut resolved {
                let MappedStream::Stream {
                    file_index: entry_file,
                    stream_index,
                    disabled: entry_disabled,
                } = entry
                else {
                    continue;
                };
                if *entry_file != file_index {
                    continue;
                }
                let stream = &input.streams[*stream_index];
                let kind_index = kind_relative_index(input, *stream_index);
                if specifier.matches(stream, *stream_index, kind_index) {
                    *entry_disabled = true;
                    disabled += 1;
                }
            }
            trace!("map '{map}': disabled {disabled} earlier selections");
            continue;
        }

        let mut matched = false;
        let mut matched_discarded = false;
        let mut kind_counts = KindCounter::default();
        for (stream_index, stream) in input.streams.iter().enumerate() {
            let kind_index = kind_counts.next(stream.kind);
            if !specifier.matches(stream, stream_index, kind_index) {
                continue;
            }
            if stream.discard == Discard::All {
                matched_discarded = true;
                continue;
            }
            matched = true;
            resolved.push(MappedStream::Stream {
                file_index,
                stream_index,
                disabled: false,
            });
        }

        if !matched {
            if map.allow_unmatched {
                debug!("Stream map '{map}' matches no streams; ignoring");
            } else if matched_discarded {
                return Err(SessionError::MapMatchesDisabled {
                    map: map.to_string(),
                });
            } else {
                return Err(SessionError::MapMatchesNothing {
                    map: map.to_string(),
                });
            }
        }
    }

    Ok(resolved)
}

/// Apply a per-stream discard directive to every matching stream of an
/// input, returning how many streams it touched.
pub fn apply_discard(
    input: &mut crate::input::InputDescriptor,
    specifier: &StreamSpecifier,
    discard: Discard,
) -> usize {
    let mut kind_counts = KindCounter::default();
    let mut touched = 0;
    for (stream_index, stream) in input.streams.iter_mut().enumerate() {
        let kind_index = kind_counts.next(stream.kind);
        if specifier.matches(stream, stream_index, kind_index) {
            stream.discard = discard;
            touched += 1;
        }
    }
    touched
}

/// Position of `stream_index` among streams of its own kind.
fn kind_relative_index(input: &crate::input::InputDescriptor, stream_index: usize) -> usize {
    let kind = input.streams[stream_index].kind;
    input.streams[..stream_index]
        .iter()
        .filter(|st| st.kind == kind)
        .count()
}

/// Running per-kind stream counter.
#[derive(Default)]
struct KindCounter {
    video: usize,
    audio: usize,
    subtitle: usize,
    data: usize,
    attachment: usize,
}

impl KindCounter {
    /// Current index for `kind`, then advance it.
    fn next(&mut self, kind: MediaKind) -> usize {
        let slot = match kind {
            MediaKind::Video => &mut self.video,
            MediaKind::Audio => &mut self.audio,
            MediaKind::Subtitle => &mut self.subtitle,
            MediaKind::Data => &mut self.data,
            MediaKind::Attachment => &mut self.attachment,
        };
        let current = *slot;
        *slot += 1;
        current
    }
}
