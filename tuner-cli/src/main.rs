//! # Practice Tuner - Terminal Front End
//!
//! Drives the tuner core from the microphone (or a WAV file) and prints one
//! reading per analysis tick. All detection logic lives in `tuner-core`; this
//! binary only parses flags, sets up logging and formats readings.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tuner_core::audio::{AudioInput, MicrophoneInput};
use tuner_core::scheduler::{self, stop_channel};
use tuner_core::wav::WavInput;
use tuner_core::{ReferencePitch, Tuner, TunerConfig, TunerReading};

#[derive(Parser, Debug)]
#[command(name = "practice-tuner", version, about = "Real-time instrument tuner")]
struct Args {
    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// A4 reference pitch in Hz (400-480).
    #[arg(long, short = 'a')]
    reference: Option<f32>,

    /// Samples per analysis frame (power of two).
    #[arg(long)]
    window: Option<usize>,

    /// Analyses per second.
    #[arg(long)]
    rate: Option<f32>,

    /// Analyze a WAV file instead of the microphone.
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Input device name (defaults to the system default input).
    #[arg(long)]
    device: Option<String>,

    /// Stop after this many seconds.
    #[arg(long)]
    duration: Option<f32>,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    dump_config: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Readings go to stdout; keep logs on stderr.
    let stderr_layer = fmt::layer().with_writer(io::stderr).with_target(false);
    tracing_subscriber::registry().with(filter).with(stderr_layer).init();
}

fn build_config(args: &Args) -> Result<TunerConfig> {
    let mut config = match &args.config {
        Some(path) => TunerConfig::load(path)?,
        None => TunerConfig::default(),
    };
    if let Some(hz) = args.reference {
        config.reference_pitch = ReferencePitch::new(hz)?;
    }
    if let Some(window) = args.window {
        config.window_size = window;
    }
    if let Some(rate) = args.rate {
        config.analysis_rate_hz = rate;
    }
    config.validate()?;
    Ok(config)
}

fn format_reading(reading: &TunerReading) -> String {
    match reading.frequency {
        Some(frequency) => format!(
            "{:<4} {:+6.1} cents  {:8.2} Hz  {}",
            reading.note.name(),
            reading.note.cents,
            frequency,
            reading.note.quality
        ),
        None => format!("{:<4} {:>12}  {:>11}  --", "--", "", ""),
    }
}

fn listen<I: AudioInput>(input: I, config: TunerConfig, duration: Option<f32>) -> Result<()> {
    let mut tuner = Tuner::new(input, config)?;
    let (stop, signal) = stop_channel();

    if let Some(secs) = duration {
        let stop = stop.clone();
        let limit = Duration::from_secs_f32(secs.max(0.0));
        std::thread::Builder::new()
            .name("duration-limit".to_string())
            .spawn(move || {
                std::thread::sleep(limit);
                tracing::debug!("Duration limit reached");
                stop.stop();
            })
            .context("Failed to spawn duration timer")?;
    }

    let interactive = io::stdout().is_terminal();
    let mut stdout = io::stdout().lock();
    let mut write_error = None;

    scheduler::run(&mut tuner, &signal, |reading| {
        if write_error.is_some() {
            return;
        }
        let line = format_reading(reading);
        let result = if interactive {
            write!(stdout, "\r{}", line).and_then(|_| stdout.flush())
        } else {
            writeln!(stdout, "{}", line)
        };
        if let Err(e) = result {
            // Most likely a closed pipe; nothing left to print to.
            write_error = Some(e);
            stop.stop();
        }
    })?;

    if interactive {
        writeln!(stdout)?;
    }
    match write_error {
        Some(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e.into()),
        _ => Ok(()),
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = build_config(&args)?;

    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    tracing::debug!("Effective config: {:?}", config);

    match &args.wav {
        Some(path) => {
            let input = WavInput::new(path, config.analysis_rate_hz);
            listen(input, config, args.duration)
        }
        None => {
            let input = match &args.device {
                Some(name) => MicrophoneInput::with_device(name.clone()),
                None => MicrophoneInput::new(),
            };
            listen(input, config, args.duration)
        }
    }
}
