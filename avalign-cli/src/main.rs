//! avalign CLI - plan multi-input timestamp alignment for a transcode session.
//!
//! The wrapped media engine opens the inputs and produces a probe document;
//! this tool parses the FFmpeg-style session arguments, reconciles start
//! times across the inputs, resolves stream maps, and prints the per-input
//! timestamp offsets the demux pipeline should apply.

mod probe;

use anyhow::Context;
use avalign_opts::{CommandLine, Verbosity};
use avalign_session::map::resolve_maps;
use avalign_session::{MappedStream, Session};
use clap::Parser;
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Command-line arguments for the planner.
#[derive(Parser, Debug)]
#[command(name = "avalign")]
#[command(version)]
#[command(about = "Plan multi-input timestamp alignment for a transcode session")]
#[command(long_about = "Avalign reconciles timestamps across multiple inputs before \n\
    transcoding starts: it corrects start times of containers with \n\
    discontinuous timestamps and aligns inputs that carry -isync \n\
    references.\n\n\
    EXAMPLES:\n    \
    avalign --probe probe.json -- -i main.mkv -isync 0 -i mic.wav -map 0:v -map 1:a out.mkv\n    \
    avalign --probe probe.json --json -- -copyts -start_at_zero -i a.ts -i b.ts out.mkv")]
struct Args {
    /// Probe document (JSON) describing the opened inputs, in -i order
    #[arg(long, value_name = "FILE")]
    probe: PathBuf,

    /// Emit the computed plan as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Log errors only
    #[arg(short, long)]
    quiet: bool,

    /// FFmpeg-style session arguments
    #[arg(last = true, required = true, value_name = "ARGS")]
    session: Vec<String>,
}

/// The computed plan, as printed in JSON mode.
#[derive(Debug, Serialize)]
struct PlanReport {
    inputs: Vec<InputPlan>,
    outputs: Vec<OutputPlan>,
}

/// Alignment computed for one input.
#[derive(Debug, Serialize)]
struct InputPlan {
    index: usize,
    url: String,
    format_start_us: Option<i64>,
    effective_start_us: Option<i64>,
    ts_offset_us: i64,
    sync_ref: Option<usize>,
}

/// Stream selection computed for one output.
#[derive(Debug, Serialize)]
struct OutputPlan {
    url: String,
    streams: Vec<StreamPlan>,
}

/// One selected stream, JSON form.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StreamPlan {
    Stream {
        file: usize,
        stream: usize,
        disabled: bool,
    },
    FilterOutput {
        label: String,
    },
}

impl From<&MappedStream> for StreamPlan {
    fn from(mapped: &MappedStream) -> Self {
        match mapped {
            MappedStream::Stream {
                file_index,
                stream_index,
                disabled,
            } => StreamPlan::Stream {
                file: *file_index,
                stream: *stream_index,
                disabled: *disabled,
            },
            MappedStream::FilterOutput { label } => StreamPlan::FilterOutput {
                label: label.clone(),
            },
        }
    }
}

/// Pick the subscriber level from the flag side and the session side,
/// whichever asks for more.
fn log_level(quiet: bool, verbose: u8, requested: Verbosity) -> tracing::Level {
    let from_flags = if quiet {
        tracing::Level::ERROR
    } else {
        match verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    };
    let from_session = match requested {
        Verbosity::Quiet | Verbosity::Error => tracing::Level::ERROR,
        Verbosity::Warning => tracing::Level::WARN,
        Verbosity::Info => tracing::Level::INFO,
        Verbosity::Verbose | Verbosity::Debug => tracing::Level::DEBUG,
        Verbosity::Trace => tracing::Level::TRACE,
    };
    from_flags.max(from_session)
}

/// Format a microsecond timestamp as seconds for the plan table.
fn format_start(micros: Option<i64>) -> String {
    match micros {
        Some(us) => format!("{:.6}s", us as f64 / 1_000_000.0),
        None => "unknown".to_string(),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let cli = match CommandLine::parse(&args.session) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{} {err}", style("Error:").red().bold());
            std::process::exit(1);
        }
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level(args.quiet, args.verbose, cli.verbosity))
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    for ignored in &cli.ignored {
        warn!(
            "Option '{}' is not handled by session setup; passed over",
            ignored.flag
        );
    }
    debug!(
        "Parsed {} input group(s), {} output group(s)",
        cli.inputs.len(),
        cli.outputs.len()
    );

    let probe_text = std::fs::read_to_string(&args.probe)
        .with_context(|| format!("reading probe document {}", args.probe.display()))?;
    let probe_doc = probe::ProbeDocument::from_json(&probe_text)?;

    let mut session = Session::new(cli.flags);
    for input in probe::build_inputs(&probe_doc, &cli.inputs)? {
        session.add_input(input);
    }

    if let Err(err) = session.finalize() {
        eprintln!("{} {err}", style("Error:").red().bold());
        std::process::exit(1);
    }

    let mut outputs = Vec::with_capacity(cli.outputs.len());
    for output in &cli.outputs {
        match resolve_maps(&output.maps, &session.inputs) {
            Ok(resolved) => outputs.push(OutputPlan {
                url: output.url.clone(),
                streams: resolved.iter().map(StreamPlan::from).collect(),
            }),
            Err(err) => {
                eprintln!("{} {err}", style("Error:").red().bold());
                std::process::exit(1);
            }
        }
    }

    let report = PlanReport {
        inputs: session
            .offsets()
            .into_iter()
            .map(|offset| {
                let input = &session.inputs[offset.index];
                InputPlan {
                    index: offset.index,
                    url: offset.url,
                    format_start_us: input.format_start_time,
                    effective_start_us: offset.effective_start_time,
                    ts_offset_us: offset.ts_offset,
                    sync_ref: input.sync_ref,
                }
            })
            .collect(),
        outputs,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_plan(&report);
    }

    Ok(())
}

/// Human-readable plan table.
fn print_plan(report: &PlanReport) {
    println!();
    println!("{}", style("Inputs:").cyan().bold());
    for input in &report.inputs {
        println!(
            "  {} {}",
            style(format!("#{}", input.index)).yellow(),
            style(&input.url).white()
        );
        println!("     format start:    {}", format_start(input.format_start_us));
        println!(
            "     effective start: {}",
            format_start(input.effective_start_us)
        );
        println!("     ts offset:       {} us", input.ts_offset_us);
        if let Some(reference) = input.sync_ref {
            println!("     synced with:     #{reference}");
        }
    }

    if report.outputs.is_empty() {
        return;
    }
    println!();
    println!("{}", style("Outputs:").cyan().bold());
    for output in &report.outputs {
        println!("  {}", style(&output.url).white());
        if output.streams.is_empty() {
            println!("     (no explicit maps; engine defaults apply)");
        }
        for stream in &output.streams {
            match stream {
                StreamPlan::Stream {
                    file,
                    stream,
                    disabled,
                } => {
                    if *disabled {
                        println!("     {}", style(format!("{file}:{stream} (disabled)")).dim());
                    } else {
                        println!("     {file}:{stream}");
                    }
                }
                StreamPlan::FilterOutput { label } => {
                    println!("     [{label}]");
                }
            }
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_flags() {
        assert_eq!(
            log_level(true, 0, Verbosity::Info),
            tracing::Level::ERROR
        );
        assert_eq!(
            log_level(false, 0, Verbosity::Info),
            tracing::Level::INFO
        );
        assert_eq!(
            log_level(false, 1, Verbosity::Info),
            tracing::Level::DEBUG
        );
        assert_eq!(
            log_level(false, 3, Verbosity::Info),
            tracing::Level::TRACE
        );
    }

    #[test]
    fn test_log_level_session_side_can_raise() {
        assert_eq!(
            log_level(false, 0, Verbosity::Trace),
            tracing::Level::TRACE
        );
        // the louder side wins
        assert_eq!(
            log_level(false, 2, Verbosity::Quiet),
            tracing::Level::TRACE
        );
    }

    #[test]
    fn test_format_start() {
        assert_eq!(format_start(Some(1_500_000)), "1.500000s");
        assert_eq!(format_start(Some(-400_000)), "-0.400000s");
        assert_eq!(format_start(None), "unknown");
    }

    #[test]
    fn test_stream_plan_from_mapped() {
        let mapped = MappedStream::Stream {
            file_index: 0,
            stream_index: 2,
            disabled: true,
        };
        assert_eq!(
            StreamPlan::from(&mapped),
            StreamPlan::Stream {
                file: 0,
                stream: 2,
                disabled: true,
            }
        );

        let mapped = MappedStream::FilterOutput {
            label: "outv".to_string(),
        };
        assert_eq!(
            StreamPlan::from(&mapped),
            StreamPlan::FilterOutput {
                label: "outv".to_string(),
            }
        );
    }

    #[test]
    fn test_stream_plan_serialization() {
        let plan = StreamPlan::Stream {
            file: 1,
            stream: 0,
            disabled: false,
        };
        let json = serde_json::to_string(&plan).unwrap();
        assert!(json.contains("\"kind\":\"stream\""));
        assert!(json.contains("\"file\":1"));
    }
}
