//! Command-line splitting and option translation.

use crate::error::{OptError, Result};
use crate::options::{
    CommandLine, InputOptions, OutputOptions, UnsupportedOption, Verbosity,
};
use avalign_core::parse_time;
use avalign_session::{Discard, StreamMap, StreamSpecifier};
use tracing::warn;

impl CommandLine {
    /// Parse an FFmpeg-shaped argument list.
    ///
    /// Input-scoped options apply to the next `-i`; output-scoped options
    /// to the next positional URL; global flags take effect wherever they
    /// appear. Options left pending at the end of the line are reported and
    /// dropped, matching the original tool's trailing-option behavior.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut cli = CommandLine::default();
        let mut pending_input = InputOptions::default();
        let mut pending_output = OutputOptions::default();

        let mut iter = args.iter().map(AsRef::as_ref).peekable();
        while let Some(arg) = iter.next() {
            match arg {
                "-i" => {
                    pending_input.url = value_for(&mut iter, "-i")?.to_string();
                    cli.inputs.push(std::mem::take(&mut pending_input));
                }

                "-ss" => {
                    let value = value_for(&mut iter, "-ss")?;
                    pending_input.start_time = Some(parse_time_value("-ss", value)?);
                }
                "-itsoffset" => {
                    let value = value_for(&mut iter, "-itsoffset")?;
                    pending_input.ts_offset = parse_time_value("-itsoffset", value)?;
                }
                "-isync" => {
                    let value = value_for(&mut iter, "-isync")?;
                    pending_input.sync_ref = parse_sync_ref(value)?;
                }

                "-map" => {
                    let value = value_for(&mut iter, "-map")?;
                    pending_output.maps.push(StreamMap::parse(value)?);
                }
                "-t" => {
                    let value = value_for(&mut iter, "-t")?;
                    pending_output.duration = Some(parse_time_value("-t", value)?);
                }
                "-to" => {
                    let value = value_for(&mut iter, "-to")?;
                    pending_output.stop_time = Some(parse_time_value("-to", value)?);
                }

                "-copyts" => cli.flags.copy_ts = true,
                "-start_at_zero" => cli.flags.start_at_zero = true,
                "-y" => cli.overwrite = Some(true),
                "-n" => cli.overwrite = Some(false),
                "-v" | "-loglevel" => {
                    let value = value_for(&mut iter, arg)?;
                    cli.verbosity = Verbosity::parse(value)
                        .ok_or_else(|| OptError::invalid(arg, format!("unknown level '{value}'")))?;
                }

                flag if flag == "-discard" || flag.starts_with("-discard:") => {
                    let spec = parse_discard_specifier(flag)?;
                    let value = value_for(&mut iter, flag)?;
                    let discard = Discard::parse(value)
                        .ok_or_else(|| OptError::invalid(flag, format!("unknown state '{value}'")))?;
                    pending_input.discard.push((spec, discard));
                }

                other if other.starts_with('-') && other.len() > 1 => {
                    // unknown flag; swallow a following bare value like the
                    // original splitter does
                    let value = iter
                        .next_if(|next| !next.starts_with('-'))
                        .map(str::to_string);
                    warn!(
                        "Ignoring unsupported option '{other}'{}",
                        value.as_deref().map(|v| format!(" '{v}'")).unwrap_or_default()
                    );
                    cli.ignored.push(UnsupportedOption {
                        flag: other.to_string(),
                        value,
                    });
                }

                url => {
                    pending_output.url = url.to_string();
                    cli.outputs.push(std::mem::take(&mut pending_output));
                }
            }
        }

        if pending_input != InputOptions::default() {
            warn!("Trailing input options found with no following -i; ignoring");
        }
        if pending_output != OutputOptions::default() {
            warn!("Trailing output options found with no following output URL; ignoring");
        }

        Ok(cli)
    }
}

/// Consume the value of an option that requires one.
fn value_for<'a, I>(iter: &mut std::iter::Peekable<I>, flag: &str) -> Result<&'a str>
where
    I: Iterator<Item = &'a str>,
{
    iter.next().ok_or_else(|| OptError::missing(flag))
}

fn parse_time_value(flag: &str, value: &str) -> Result<i64> {
    parse_time(value).map_err(|err| OptError::invalid(flag, err.to_string()))
}

/// `-isync` takes an input index; `-1` stands for "no reference".
fn parse_sync_ref(value: &str) -> Result<Option<usize>> {
    let index: i64 = value
        .parse()
        .map_err(|_| OptError::invalid("-isync", format!("'{value}' is not an input index")))?;
    match index {
        -1 => Ok(None),
        n if n >= 0 => Ok(Some(n as usize)),
        _ => Err(OptError::invalid(
            "-isync",
            format!("'{value}' is not an input index"),
        )),
    }
}

/// The optional `:spec` suffix of `-discard`.
fn parse_discard_specifier(flag: &str) -> Result<StreamSpecifier> {
    match flag.strip_prefix("-discard") {
        Some("") => Ok(StreamSpecifier::Any),
        Some(rest) => {
            let spec = rest.strip_prefix(':').unwrap_or(rest);
            StreamSpecifier::parse(spec)
                .ok_or_else(|| OptError::invalid(flag, "invalid stream specifier"))
        }
        None => unreachable!("caller matched the -discard prefix"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avalign_session::MediaKind;

    #[test]
    fn test_groups_split_in_order() {
        let cli = CommandLine::parse(&[
            "-ss", "1.5", "-i", "a.mkv", "-itsoffset", "-0.5", "-i", "b.wav", "out.mkv",
        ])
        .unwrap();

        assert_eq!(cli.inputs.len(), 2);
        assert_eq!(cli.inputs[0].url, "a.mkv");
        assert_eq!(cli.inputs[0].start_time, Some(1_500_000));
        assert_eq!(cli.inputs[0].ts_offset, 0);
        assert_eq!(cli.inputs[1].url, "b.wav");
        assert_eq!(cli.inputs[1].start_time, None);
        assert_eq!(cli.inputs[1].ts_offset, -500_000);
        assert_eq!(cli.outputs.len(), 1);
        assert_eq!(cli.outputs[0].url, "out.mkv");
    }

    #[test]
    fn test_global_flags_anywhere() {
        let cli = CommandLine::parse(&[
            "-i", "a.mkv", "-copyts", "out.mkv", "-start_at_zero", "-y",
        ])
        .unwrap();
        assert!(cli.flags.copy_ts);
        assert!(cli.flags.start_at_zero);
        assert_eq!(cli.overwrite, Some(true));
    }

    #[test]
    fn test_isync_values() {
        let cli = CommandLine::parse(&["-isync", "0", "-i", "a", "-isync", "-1", "-i", "b"])
            .unwrap();
        assert_eq!(cli.inputs[0].sync_ref, Some(0));
        assert_eq!(cli.inputs[1].sync_ref, None);

        assert!(CommandLine::parse(&["-isync", "x", "-i", "a"]).is_err());
        assert!(CommandLine::parse(&["-isync", "-2", "-i", "a"]).is_err());
    }

    #[test]
    fn test_discard_with_specifier() {
        let cli = CommandLine::parse(&[
            "-discard", "all", "-discard:a:1", "noref", "-i", "a.mkv",
        ])
        .unwrap();
        assert_eq!(
            cli.inputs[0].discard,
            vec![
                (StreamSpecifier::Any, Discard::All),
                (
                    StreamSpecifier::KindIndex(MediaKind::Audio, 1),
                    Discard::Partial
                ),
            ]
        );

        assert!(CommandLine::parse(&["-discard", "sometimes", "-i", "a"]).is_err());
        assert!(CommandLine::parse(&["-discard:q", "all", "-i", "a"]).is_err());
    }

    #[test]
    fn test_maps_belong_to_their_output() {
        let cli = CommandLine::parse(&[
            "-i", "a.mkv", "-i", "b.wav",
            "-map", "0:v", "-map", "1:a", "first.mkv",
            "-map", "0", "second.mkv",
        ])
        .unwrap();
        assert_eq!(cli.outputs[0].maps.len(), 2);
        assert_eq!(cli.outputs[1].maps.len(), 1);
        assert!(CommandLine::parse(&["-i", "a", "-map", "[x", "out"]).is_err());
    }

    #[test]
    fn test_durations() {
        let cli = CommandLine::parse(&["-i", "a", "-t", "30", "-to", "01:00", "out.mkv"]).unwrap();
        assert_eq!(cli.outputs[0].duration, Some(30_000_000));
        assert_eq!(cli.outputs[0].stop_time, Some(60_000_000));
    }

    #[test]
    fn test_verbosity() {
        let cli = CommandLine::parse(&["-v", "debug", "-i", "a", "out"]).unwrap();
        assert_eq!(cli.verbosity, Verbosity::Debug);
        assert!(CommandLine::parse(&["-loglevel", "chatty"]).is_err());
    }

    #[test]
    fn test_missing_values() {
        assert!(matches!(
            CommandLine::parse(&["-i"]).unwrap_err(),
            OptError::MissingValue { .. }
        ));
        assert!(CommandLine::parse(&["-i", "a", "-ss"]).is_err());
        assert!(CommandLine::parse(&["-map"]).is_err());
    }

    #[test]
    fn test_unknown_options_are_collected() {
        let cli = CommandLine::parse(&[
            "-hide_banner", "-c:v", "libx264", "-i", "a.mkv", "out.mkv",
        ])
        .unwrap();
        assert_eq!(cli.ignored.len(), 2);
        assert_eq!(cli.ignored[0].flag, "-hide_banner");
        assert_eq!(cli.ignored[0].value, None);
        assert_eq!(cli.ignored[1].flag, "-c:v");
        assert_eq!(cli.ignored[1].value.as_deref(), Some("libx264"));
        assert_eq!(cli.inputs.len(), 1);
        assert_eq!(cli.outputs.len(), 1);
    }

    #[test]
    fn test_trailing_options_are_dropped() {
        let cli = CommandLine::parse(&["-i", "a.mkv", "out.mkv", "-ss", "5"]).unwrap();
        assert_eq!(cli.inputs.len(), 1);
        assert_eq!(cli.outputs.len(), 1);

        let cli = CommandLine::parse(&["-i", "a.mkv", "-map", "0"]).unwrap();
        assert!(cli.outputs.is_empty());
    }
}
