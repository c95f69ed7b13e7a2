//! Session setup for multi-input transcoding.
//!
//! This crate owns the bookkeeping that happens between "all inputs are
//! open" and "demuxing starts":
//!
//! - the [`InputRegistry`] of opened inputs and their streams,
//! - start-time correction for containers with discontinuous timestamps
//!   ([`sync::correct_start_times`]),
//! - cross-input timestamp alignment driven by user-declared sync
//!   references ([`sync::apply_sync_offsets`]),
//! - stream-map resolution ([`map::resolve_maps`]).
//!
//! Opening inputs and everything downstream of the computed per-input
//! timestamp offsets (demuxing, decoding, muxing) belong to the wrapped
//! media engine, not to this crate. Both passes here are plain sequential
//! loops over an exclusively owned registry; nothing blocks or suspends.

mod error;
pub mod input;
pub mod map;
pub mod session;
pub mod sync;

pub use error::{Result, SessionError};
pub use input::{Discard, InputDescriptor, InputRegistry, MediaKind, StreamDescriptor};
pub use map::{MappedStream, StreamMap, StreamSpecifier};
pub use session::{InputOffset, Session, SyncFlags};
