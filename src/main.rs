mod meter;
mod player;
mod recorder;
mod session;
mod ui;

use crate::meter::aggregate;
use crate::player::Clip;
use crate::recorder::{DEFAULT_SAMPLE_RATE, Recorder, default_output_path, list_devices};
use crate::session::{METER_INTERVAL, MeterSession};
use crate::ui::{MeterFrame, encode_meter_frame, render_bars};
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "recmeter")]
#[command(about = "Voice recorder with a live microphone level meter")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record from the default microphone with a live level meter
    Record {
        /// Output WAV path (defaults to a timestamped file in the data dir)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Maximum recording duration in seconds (0 = until ctrl-c)
        #[arg(long, default_value = "0")]
        max_duration: u64,

        /// Capture sample rate in Hz
        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        /// Number of meter bars to draw
        #[arg(long, default_value = "24")]
        bars: usize,
    },

    /// Meter the microphone without writing a file
    Monitor {
        /// Duration in seconds (0 = until ctrl-c)
        #[arg(long, default_value = "0")]
        duration: u64,

        /// Capture sample rate in Hz
        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        /// Number of meter bars to draw
        #[arg(long, default_value = "24")]
        bars: usize,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Play back a saved recording
    Play {
        /// WAV file to play
        file: PathBuf,
    },

    /// List available audio input devices
    Devices,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn meter_progress() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {elapsed_precise} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}

async fn run_record(
    output: Option<PathBuf>,
    max_duration: u64,
    sample_rate: u32,
    bars: usize,
) -> Result<()> {
    let path = match output {
        Some(path) => path,
        None => default_output_path()?,
    };

    let recorder = Recorder::new(sample_rate)?;
    eprintln!(
        "Recording at {} Hz, {} channel(s)",
        recorder.sample_rate(),
        recorder.channels()
    );
    eprintln!("Writing to {} (ctrl-c to stop)", path.display());

    let recording = recorder.start(Some(&path))?;
    let mut session = MeterSession::start(recording.probe(), METER_INTERVAL);

    let pb = meter_progress();
    let started = Instant::now();
    let mut redraw = tokio::time::interval(METER_INTERVAL);

    loop {
        tokio::select! {
            _ = redraw.tick() => {
                let snapshot = session.snapshot();
                let row = render_bars(&aggregate(&snapshot.history, bars));
                pb.set_message(format!("{}  {:3.0}%", row, snapshot.level * 100.0));

                if max_duration > 0 && started.elapsed() >= Duration::from_secs(max_duration) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.stop();
    pb.finish_and_clear();

    if let Some(path) = recording.finish()? {
        println!("Saved {}", path.display());
    }
    Ok(())
}

async fn run_monitor(
    duration: u64,
    sample_rate: u32,
    bars: usize,
    format: OutputFormat,
) -> Result<()> {
    let recorder = Recorder::new(sample_rate)?;
    let recording = recorder.start(None)?;
    let mut session = MeterSession::start(recording.probe(), METER_INTERVAL);

    let pb = match format {
        OutputFormat::Text => {
            eprintln!("Monitoring input level (ctrl-c to stop)");
            Some(meter_progress())
        }
        OutputFormat::Json => None,
    };

    let started = Instant::now();
    let mut redraw = tokio::time::interval(METER_INTERVAL);

    loop {
        tokio::select! {
            _ = redraw.tick() => {
                let snapshot = session.snapshot();
                let bar_values = aggregate(&snapshot.history, bars);

                match format {
                    OutputFormat::Text => {
                        if let Some(ref pb) = pb {
                            let row = render_bars(&bar_values);
                            pb.set_message(format!("{}  {:3.0}%", row, snapshot.level * 100.0));
                        }
                    }
                    OutputFormat::Json => {
                        let frame = MeterFrame {
                            level: session.level(),
                            bars: bar_values,
                        };
                        print!("{}", encode_meter_frame(&frame)?);
                        // Frames must not sit in the stdout buffer when piped.
                        use std::io::Write;
                        std::io::stdout().flush().ok();
                    }
                }

                if duration > 0 && started.elapsed() >= Duration::from_secs(duration) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.stop();
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    recording.finish()?;
    Ok(())
}

async fn run_play(file: PathBuf) -> Result<()> {
    let clip = Clip::load(&file)?;
    println!("Playing {} ({:.1}s)", file.display(), clip.duration_secs());

    let playback = clip.play()?;

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {percent}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut tick = tokio::time::interval(Duration::from_millis(50));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                pb.set_position((playback.progress() * 100.0) as u64);
                if playback.finished() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    pb.finish_and_clear();
    Ok(())
}

fn run_devices() -> Result<()> {
    let devices = list_devices()?;
    if devices.is_empty() {
        println!("No audio input devices found");
        return Ok(());
    }

    for device in devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("{}{}", device.name, marker);

        let mut rates = device.sample_rates.clone();
        rates.sort_unstable();
        rates.dedup();
        let rates: Vec<String> = rates.iter().map(|r| r.to_string()).collect();
        println!("  sample rates: {}", rates.join(", "));

        let formats: Vec<String> = device
            .formats
            .iter()
            .map(|f| format!("{:?}", f))
            .collect();
        println!("  formats: {}", formats.join(", "));
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Record {
            output,
            max_duration,
            sample_rate,
            bars,
        } => run_record(output, max_duration, sample_rate, bars).await,
        Commands::Monitor {
            duration,
            sample_rate,
            bars,
            format,
        } => run_monitor(duration, sample_rate, bars, format).await,
        Commands::Play { file } => run_play(file).await,
        Commands::Devices => run_devices(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
