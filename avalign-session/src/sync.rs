//! Start-time correction and cross-input timestamp alignment.
//!
//! Two passes run once each over the full [`InputRegistry`], in order,
//! after all inputs are open and before demuxing starts:
//!
//! 1. [`correct_start_times`] recomputes each input's effective start time
//!    from its active streams when the container allows discontinuous
//!    timestamps, and derives the demux-time timestamp offset.
//! 2. [`apply_sync_offsets`] shifts inputs that carry a sync reference so
//!    their timeline lines up with the referenced input's.
//!
//! All arithmetic happens in global microseconds.

use crate::error::{Result, SessionError};
use crate::input::{Discard, InputRegistry};
use crate::session::SyncFlags;
use tracing::{error, info, trace, warn};

/// Recompute effective start times and demux offsets (pass 1).
///
/// For every input whose container reports a start time and allows
/// discontinuous timestamps, the effective start time becomes the minimum
/// start time over all streams that are not fully discarded, converted to
/// microseconds. Inputs without such streams, or whose minimum matches the
/// reported start, are left untouched.
///
/// Always succeeds; a no-op is success. Running the pass twice produces the
/// same registry as running it once.
pub fn correct_start_times(registry: &mut InputRegistry, flags: &SyncFlags) {
    for (index, input) in registry.iter_mut().enumerate() {
        input.effective_start_time = input.format_start_time;

        let Some(format_start) = input.format_start_time else {
            continue;
        };
        if !input.discontinuous_ts {
            continue;
        }

        let new_start = input
            .streams
            .iter()
            .filter(|st| st.discard != Discard::All)
            .filter_map(|st| st.start_micros())
            .min();
        let Some(new_start) = new_start else {
            trace!("input #{index}: no active stream reports a start time");
            continue;
        };

        let diff = new_start - format_start;
        if diff == 0 {
            trace!("input #{index}: start time already consistent");
            continue;
        }

        info!("Correcting start time of input #{index} by {diff} us");
        input.effective_start_time = Some(new_start);
        input.ts_offset = if flags.copy_ts && flags.start_at_zero {
            -new_start
        } else if !flags.copy_ts {
            let abs_start_seek = format_start + input.seek_start();
            -abs_start_seek.max(new_start)
        } else {
            // copy_ts without start_at_zero: timestamps pass through as-is
            0
        };
        input.ts_offset += input.base_ts_offset;
    }
}

/// Apply user-declared cross-input alignment (pass 2).
///
/// Consumes the effective start times produced by [`correct_start_times`].
/// For every input with a valid, non-self sync reference the pass adds an
/// adjustment to the input's timestamp offset so that its timeline lines up
/// with the referenced input's.
///
/// An out-of-range reference, or `-copyts` without `-start_at_zero` while
/// any reference is active, is a fatal configuration error. A reference
/// that is itself re-synced to a third input, or a pair with no comparable
/// start times, is logged and skipped.
pub fn apply_sync_offsets(registry: &mut InputRegistry, flags: &SyncFlags) -> Result<()> {
    for index in 0..registry.len() {
        let Some(ref_index) = registry[index].sync_ref else {
            continue;
        };
        if ref_index == index {
            continue;
        }
        if ref_index >= registry.len() {
            error!(
                "Sync reference for input #{index} names non-existent input #{ref_index}"
            );
            return Err(SessionError::InvalidSyncReference {
                input: index,
                reference: ref_index,
                inputs: registry.len(),
            });
        }

        if flags.copy_ts && !flags.start_at_zero {
            error!("Input sync references require -start_at_zero when -copyts is set");
            return Err(SessionError::CopyTsRequiresStartAtZero);
        }

        let reference = &registry[ref_index];
        // Chained references would make the adjustment below depend on the
        // order the inputs are visited in; only un-synced (or self-synced)
        // inputs may serve as references.
        if reference.sync_ref.is_some() && reference.sync_ref != Some(ref_index) {
            warn!(
                "Sync reference of input #{index} is input #{ref_index}, which is itself \
                 re-synced; sync not set"
            );
            continue;
        }

        let starts = match (registry[index].realtime_start, reference.realtime_start) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => match (
                registry[index].effective_start_time,
                reference.effective_start_time,
            ) {
                (Some(a), Some(b)) => Some((a, b)),
                _ => None,
            },
        };
        let Some((self_start, ref_start)) = starts else {
            info!(
                "Unable to identify start times for inputs #{index} and #{ref_index} both; \
                 no sync adjustment made"
            );
            continue;
        };

        let seek_term = if flags.copy_ts {
            0
        } else {
            registry[index].seek_start() - reference.seek_start()
        };
        let adjustment = (self_start - ref_start) + seek_term + reference.ts_offset;

        registry[index].ts_offset += adjustment;
        info!(
            "Adjusted ts offset for input #{index} by {adjustment} us to sync with \
             input #{ref_index}"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputDescriptor, MediaKind, StreamDescriptor};
    use avalign_core::TimeBase;

    fn stream(start: i64) -> StreamDescriptor {
        StreamDescriptor::new(MediaKind::Video, TimeBase::MICROS).with_start_time(start)
    }

    fn discont_input(url: &str, format_start: i64, starts: &[i64]) -> InputDescriptor {
        let mut input = InputDescriptor::new(url).with_format_start(format_start);
        input.discontinuous_ts = true;
        input.streams = starts.iter().map(|&s| stream(s)).collect();
        input
    }

    #[test]
    fn test_continuous_container_is_left_alone() {
        let mut reg = InputRegistry::new();
        let mut input = InputDescriptor::new("a.mp4").with_format_start(5_000);
        input.streams = vec![stream(1_000)];
        reg.push(input);

        correct_start_times(&mut reg, &SyncFlags::default());
        assert_eq!(reg[0].effective_start_time, Some(5_000));
        assert_eq!(reg[0].ts_offset, 0);
    }

    #[test]
    fn test_minimum_over_active_streams() {
        let mut reg = InputRegistry::new();
        let mut input = discont_input("a.ts", 1_000, &[5_000, 2_000, 8_000]);
        input.streams[1].discard = Discard::Partial;
        reg.push(input);

        correct_start_times(&mut reg, &SyncFlags::default());
        assert_eq!(reg[0].effective_start_time, Some(2_000));
    }

    #[test]
    fn test_fully_discarded_streams_are_excluded() {
        let mut reg = InputRegistry::new();
        let mut input = discont_input("a.ts", 1_000, &[2_000, 5_000]);
        input.streams[0].discard = Discard::All;
        reg.push(input);

        correct_start_times(&mut reg, &SyncFlags::default());
        assert_eq!(reg[0].effective_start_time, Some(5_000));
    }

    #[test]
    fn test_unknown_stream_starts_leave_input_unchanged() {
        let mut reg = InputRegistry::new();
        let mut input = InputDescriptor::new("a.ts").with_format_start(7_000);
        input.discontinuous_ts = true;
        input.streams = vec![StreamDescriptor::new(MediaKind::Video, TimeBase::MPEG)];
        reg.push(input);

        correct_start_times(&mut reg, &SyncFlags::default());
        assert_eq!(reg[0].effective_start_time, Some(7_000));
        assert_eq!(reg[0].ts_offset, 0);
    }

    #[test]
    fn test_offset_copy_ts_start_at_zero() {
        let mut reg = InputRegistry::new();
        reg.push(discont_input("a.ts", 1_000, &[4_000]));

        let flags = SyncFlags {
            copy_ts: true,
            start_at_zero: true,
        };
        correct_start_times(&mut reg, &flags);
        assert_eq!(reg[0].ts_offset, -4_000);
    }

    #[test]
    fn test_offset_copy_ts_without_start_at_zero_is_zero() {
        let mut reg = InputRegistry::new();
        reg.push(discont_input("a.ts", 1_000, &[4_000]));

        let flags = SyncFlags {
            copy_ts: true,
            start_at_zero: false,
        };
        correct_start_times(&mut reg, &flags);
        assert_eq!(reg[0].ts_offset, 0);
    }

    #[test]
    fn test_offset_without_copy_ts_uses_larger_of_seek_and_start() {
        // new start (4000) above the absolute seek point (1000 + 2000)
        let mut reg = InputRegistry::new();
        let mut input = discont_input("a.ts", 1_000, &[4_000]);
        input.user_start_time = Some(2_000);
        reg.push(input);

        correct_start_times(&mut reg, &SyncFlags::default());
        assert_eq!(reg[0].ts_offset, -4_000);

        // absolute seek point (1000 + 5000) above the new start
        let mut reg = InputRegistry::new();
        let mut input = discont_input("b.ts", 1_000, &[4_000]);
        input.user_start_time = Some(5_000);
        reg.push(input);

        correct_start_times(&mut reg, &SyncFlags::default());
        assert_eq!(reg[0].ts_offset, -6_000);
    }

    #[test]
    fn test_base_offset_is_added_on_top() {
        let mut reg = InputRegistry::new();
        reg.push(discont_input("a.ts", 1_000, &[4_000]).with_base_offset(250));

        correct_start_times(&mut reg, &SyncFlags::default());
        assert_eq!(reg[0].ts_offset, -4_000 + 250);
    }

    #[test]
    fn test_correction_is_idempotent() {
        let mut reg = InputRegistry::new();
        let mut input = discont_input("a.ts", 1_000, &[5_000, 2_000, 8_000]);
        input.user_start_time = Some(500);
        reg.push(input.with_base_offset(-300));
        reg.push(discont_input("b.ts", 0, &[100]));

        let flags = SyncFlags::default();
        correct_start_times(&mut reg, &flags);
        let first: Vec<(Option<i64>, i64)> = reg
            .iter()
            .map(|i| (i.effective_start_time, i.ts_offset))
            .collect();

        correct_start_times(&mut reg, &flags);
        let second: Vec<(Option<i64>, i64)> = reg
            .iter()
            .map(|i| (i.effective_start_time, i.ts_offset))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sync_no_reference_and_self_reference_are_noops() {
        let mut reg = InputRegistry::new();
        reg.push(InputDescriptor::new("a.ts").with_format_start(0));
        let mut b = InputDescriptor::new("b.ts").with_format_start(100);
        b.sync_ref = Some(1); // self
        reg.push(b);

        apply_sync_offsets(&mut reg, &SyncFlags::default()).unwrap();
        assert_eq!(reg[0].ts_offset, 0);
        assert_eq!(reg[1].ts_offset, 0);
    }

    #[test]
    fn test_sync_out_of_range_reference_is_fatal_without_mutation() {
        let mut reg = InputRegistry::new();
        let mut a = InputDescriptor::new("a.ts").with_format_start(0);
        a.sync_ref = Some(5);
        reg.push(a);
        reg.push(InputDescriptor::new("b.ts").with_format_start(100));

        let err = apply_sync_offsets(&mut reg, &SyncFlags::default()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidSyncReference {
                input: 0,
                reference: 5,
                inputs: 2,
            }
        ));
        assert!(reg.iter().all(|i| i.ts_offset == 0));
    }

    #[test]
    fn test_sync_copy_ts_requires_start_at_zero() {
        let mut reg = InputRegistry::new();
        reg.push(InputDescriptor::new("a.ts").with_format_start(0));
        let mut b = InputDescriptor::new("b.ts").with_format_start(100);
        b.sync_ref = Some(0);
        reg.push(b);

        let flags = SyncFlags {
            copy_ts: true,
            start_at_zero: false,
        };
        let err = apply_sync_offsets(&mut reg, &flags).unwrap_err();
        assert!(matches!(err, SessionError::CopyTsRequiresStartAtZero));

        // with start_at_zero the same configuration is accepted
        let flags = SyncFlags {
            copy_ts: true,
            start_at_zero: true,
        };
        apply_sync_offsets(&mut reg, &flags).unwrap();
    }

    #[test]
    fn test_sync_two_inputs_effective_start_adjustment() {
        let mut reg = InputRegistry::new();
        reg.push(InputDescriptor::new("ref.ts").with_format_start(1_000_000));
        let mut b = InputDescriptor::new("self.ts").with_format_start(1_200_000);
        b.sync_ref = Some(0);
        reg.push(b);

        apply_sync_offsets(&mut reg, &SyncFlags::default()).unwrap();
        assert_eq!(reg[1].ts_offset, 200_000);
        assert_eq!(reg[0].ts_offset, 0);
    }

    #[test]
    fn test_sync_prefers_realtime_starts() {
        let mut reg = InputRegistry::new();
        let mut a = InputDescriptor::new("ref.ts").with_format_start(1_000_000);
        a.realtime_start = Some(50_000);
        reg.push(a);
        let mut b = InputDescriptor::new("self.ts").with_format_start(9_999_999);
        b.realtime_start = Some(80_000);
        b.sync_ref = Some(0);
        reg.push(b);

        apply_sync_offsets(&mut reg, &SyncFlags::default()).unwrap();
        assert_eq!(reg[1].ts_offset, 30_000);
    }

    #[test]
    fn test_sync_seek_term_and_reference_offset() {
        let mut reg = InputRegistry::new();
        let mut a = InputDescriptor::new("ref.ts").with_format_start(1_000_000);
        a.user_start_time = Some(250_000);
        reg.push(a.with_base_offset(10_000));
        let mut b = InputDescriptor::new("self.ts").with_format_start(1_200_000);
        b.user_start_time = Some(400_000);
        b.sync_ref = Some(0);
        reg.push(b);

        apply_sync_offsets(&mut reg, &SyncFlags::default()).unwrap();
        // (1200000-1000000) + (400000-250000) + 10000
        assert_eq!(reg[1].ts_offset, 360_000);

        // with copy_ts (and start_at_zero) the seek term drops out
        let mut reg2 = InputRegistry::new();
        let mut a = InputDescriptor::new("ref.ts").with_format_start(1_000_000);
        a.user_start_time = Some(250_000);
        reg2.push(a.with_base_offset(10_000));
        let mut b = InputDescriptor::new("self.ts").with_format_start(1_200_000);
        b.user_start_time = Some(400_000);
        b.sync_ref = Some(0);
        reg2.push(b);

        let flags = SyncFlags {
            copy_ts: true,
            start_at_zero: true,
        };
        apply_sync_offsets(&mut reg2, &flags).unwrap();
        assert_eq!(reg2[1].ts_offset, 210_000);
    }

    #[test]
    fn test_sync_chained_reference_is_skipped() {
        let mut reg = InputRegistry::new();
        reg.push(InputDescriptor::new("root.ts").with_format_start(0));
        let mut b = InputDescriptor::new("mid.ts").with_format_start(100);
        b.sync_ref = Some(0);
        reg.push(b);
        let mut c = InputDescriptor::new("leaf.ts").with_format_start(200);
        c.sync_ref = Some(1); // references a re-synced input
        reg.push(c);

        apply_sync_offsets(&mut reg, &SyncFlags::default()).unwrap();
        assert_eq!(reg[1].ts_offset, 100); // mid synced against root
        assert_eq!(reg[2].ts_offset, 0); // leaf skipped
    }

    #[test]
    fn test_sync_mutual_references_are_skipped() {
        let mut reg = InputRegistry::new();
        let mut a = InputDescriptor::new("a.ts").with_format_start(0);
        a.sync_ref = Some(1);
        reg.push(a);
        let mut b = InputDescriptor::new("b.ts").with_format_start(100);
        b.sync_ref = Some(0);
        reg.push(b);

        apply_sync_offsets(&mut reg, &SyncFlags::default()).unwrap();
        assert_eq!(reg[0].ts_offset, 0);
        assert_eq!(reg[1].ts_offset, 0);
    }

    #[test]
    fn test_sync_self_referencing_reference_is_accepted() {
        // a reference that names itself counts as un-synced
        let mut reg = InputRegistry::new();
        let mut a = InputDescriptor::new("ref.ts").with_format_start(500);
        a.sync_ref = Some(0);
        reg.push(a);
        let mut b = InputDescriptor::new("self.ts").with_format_start(900);
        b.sync_ref = Some(0);
        reg.push(b);

        apply_sync_offsets(&mut reg, &SyncFlags::default()).unwrap();
        assert_eq!(reg[1].ts_offset, 400);
    }

    #[test]
    fn test_sync_missing_start_times_is_skipped() {
        let mut reg = InputRegistry::new();
        reg.push(InputDescriptor::new("ref.ts")); // nothing known
        let mut b = InputDescriptor::new("self.ts").with_format_start(900);
        b.sync_ref = Some(0);
        reg.push(b);

        apply_sync_offsets(&mut reg, &SyncFlags::default()).unwrap();
        assert_eq!(reg[1].ts_offset, 0);
    }

    #[test]
    fn test_corrected_start_feeds_synchronizer() {
        // pass 1 lowers the ref's effective start, pass 2 consumes it
        let mut reg = InputRegistry::new();
        reg.push(discont_input("ref.ts", 1_000_000, &[600_000]));
        let mut b = InputDescriptor::new("self.ts").with_format_start(1_200_000);
        b.sync_ref = Some(0);
        reg.push(b);

        let flags = SyncFlags::default();
        correct_start_times(&mut reg, &flags);
        assert_eq!(reg[0].effective_start_time, Some(600_000));
        assert_eq!(reg[0].ts_offset, -1_000_000);

        apply_sync_offsets(&mut reg, &flags).unwrap();
        // (1200000 - 600000) + 0 + (-1000000)
        assert_eq!(reg[1].ts_offset, -400_000);
    }
}
