use std::env;
use std::fmt::Write as _;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use clap::Args;
use owo_colors::OwoColorize;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{self, ColorChoice, OutputMode, ProfileConfig};
use crate::logging;
use crate::rchain::assembler::{AssembleError, Assembled, try_assemble_decoded};
use crate::rchain::chunk::decode_line;
use crate::rchain::messages::{Message, MessageRole};
use crate::rchain::throttle::{DEFAULT_THROTTLE_WINDOW, UpdateThrottle};

#[derive(Debug, Args, Clone)]
pub struct ReplayArgs {
    /// Newline-delimited JSON events; stdin when omitted.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
    /// Profile from the config file.
    #[arg(long)]
    pub profile: Option<String>,
    /// Quiet period before a render frame fires.
    #[arg(long, value_name = "MS")]
    pub throttle_ms: Option<u64>,
    /// Pause between events, simulating a live stream.
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,
    #[arg(long, value_enum)]
    pub output: Option<OutputMode>,
    /// Shorthand for `--output json`.
    #[arg(long)]
    pub json: bool,
    /// Print a summary line for every throttled render frame.
    #[arg(long)]
    pub frames: bool,
    /// Print event counters on stderr.
    #[arg(long)]
    pub show_stats: bool,
    #[arg(long, value_enum)]
    pub color: Option<ColorChoice>,
    #[arg(short, long)]
    pub verbose: bool,
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct ReplaySettings {
    throttle: Duration,
    delay: Duration,
    output: OutputMode,
    show_stats: bool,
    color: bool,
}

#[derive(Debug, Default)]
struct ReplayStats {
    events: usize,
    applied: usize,
    skipped: usize,
    malformed: usize,
}

pub async fn run(args: ReplayArgs) -> Result<(), String> {
    logging::init(args.verbose, args.quiet);
    let settings = resolve_settings(&args)?;
    debug!(?settings, "replay settings");

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &args.file {
        Some(path) => {
            let file = File::open(path).await.map_err(|err| {
                format!("Failed to open input file '{}': {err}", path.display())
            })?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let frames = Arc::new(AtomicUsize::new(0));
    let print_frames = args.frames && !args.quiet;
    let mut throttle = UpdateThrottle::new(settings.throttle);
    let mut messages: Vec<Message> = Vec::new();
    let mut stats = ReplayStats::default();
    let mut lines = reader.lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|err| format!("Failed to read input: {err}"))?
    {
        if line.trim().is_empty() {
            continue;
        }
        stats.events += 1;

        match try_assemble_decoded(&messages, decode_line(&line)) {
            Ok(Assembled::Updated(updated)) => {
                stats.applied += 1;
                messages = updated;
                let snapshot = frame_summary(&messages);
                let frames = Arc::clone(&frames);
                throttle.schedule(move || {
                    let frame = frames.fetch_add(1, Ordering::SeqCst) + 1;
                    if print_frames {
                        eprintln!("frame {frame}: {snapshot}");
                    }
                });
            }
            Ok(Assembled::Unchanged(skip)) => {
                stats.skipped += 1;
                debug!(event = stats.events, ?skip, "event skipped");
            }
            Err(err @ AssembleError::Decode(_)) => {
                stats.malformed += 1;
                warn!(event = stats.events, error = %err, "malformed event");
            }
        }

        if !settings.delay.is_zero() {
            sleep(settings.delay).await;
        }
    }
    // The final render below supersedes any pending frame.
    throttle.cancel();

    match settings.output {
        OutputMode::Json => {
            let body = serde_json::to_string_pretty(&messages)
                .map_err(|err| format!("Failed to serialize messages: {err}"))?;
            println!("{body}");
        }
        OutputMode::Text => print!("{}", render_text(&messages, settings.color)),
    }

    if settings.show_stats && !args.quiet {
        eprintln!(
            "stats: events={} applied={} skipped={} malformed={} frames={}",
            stats.events,
            stats.applied,
            stats.skipped,
            stats.malformed,
            frames.load(Ordering::SeqCst)
        );
    }
    Ok(())
}

fn resolve_settings(args: &ReplayArgs) -> Result<ReplaySettings, String> {
    let (profile_name, profile) = match &args.profile {
        Some(name) => (name.as_str(), config::load_profile(name)?),
        None => ("", ProfileConfig::default()),
    };

    let throttle_ms = match args.throttle_ms {
        Some(value) => Some(value),
        None => env_millis("MP_THROTTLE_MS")?.or(profile.throttle_ms),
    };
    let delay_ms = match args.delay_ms {
        Some(value) => Some(value),
        None => env_millis("MP_DELAY_MS")?.or(profile.delay_ms),
    };

    let output = if args.json {
        OutputMode::Json
    } else if let Some(output) = args.output {
        output
    } else if let Some(output) = env_output()? {
        output
    } else {
        profile.output_mode(profile_name)?.unwrap_or(OutputMode::Text)
    };

    let color = match args.color {
        Some(choice) => choice,
        None => profile
            .color_choice(profile_name)?
            .unwrap_or(ColorChoice::Auto),
    };

    Ok(ReplaySettings {
        throttle: throttle_ms.map_or(DEFAULT_THROTTLE_WINDOW, Duration::from_millis),
        delay: Duration::from_millis(delay_ms.unwrap_or(0)),
        output,
        show_stats: args.show_stats || profile.show_stats.unwrap_or(false),
        color: match color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stdout().is_terminal(),
        },
    })
}

fn env_millis(key: &str) -> Result<Option<u64>, String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| format!("Invalid {key} '{value}'. Expected milliseconds as an integer.")),
        _ => Ok(None),
    }
}

fn env_output() -> Result<Option<OutputMode>, String> {
    match env::var("MP_OUTPUT") {
        Ok(value) if !value.trim().is_empty() => OutputMode::parse(&value)
            .map(Some)
            .ok_or_else(|| format!("Invalid MP_OUTPUT '{value}'. Supported values: text, json.")),
        _ => Ok(None),
    }
}

fn frame_summary(messages: &[Message]) -> String {
    let chars = messages
        .iter()
        .map(|message| message.content.chars().count())
        .sum::<usize>();
    let tool_calls = messages
        .iter()
        .map(|message| message.tool_calls.as_ref().map_or(0, Vec::len))
        .sum::<usize>();
    format!(
        "messages={} chars={chars} tool_calls={tool_calls}",
        messages.len()
    )
}

fn role_label(role: MessageRole, color: bool) -> String {
    let label = role.as_str();
    if !color {
        return label.to_string();
    }
    match role {
        MessageRole::Ai => label.bold().cyan().to_string(),
        MessageRole::Human => label.bold().green().to_string(),
        MessageRole::Tool => label.bold().yellow().to_string(),
        MessageRole::System => label.bold().magenta().to_string(),
    }
}

fn render_text(messages: &[Message], color: bool) -> String {
    let mut out = String::new();
    for (position, message) in messages.iter().enumerate() {
        if position > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{} {}", role_label(message.role, color), message.id);
        if !message.content.is_empty() {
            let _ = writeln!(out, "{}", message.content);
        }
        for call in message.tool_calls.iter().flatten() {
            let args = match call.parsed_args() {
                Some(parsed) => parsed.to_string(),
                None => format!("{} (partial)", call.args_as_string()),
            };
            let _ = writeln!(out, "  -> tool {} ({}) {args}", call.name, call.id);
        }
    }
    out
}
