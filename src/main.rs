//! Subtitle Reader - replay a recorded recognition session
//!
//! Feeds recorded recognizer output through the stabilization pipeline at
//! the configured poll interval and prints every phrase that would be spoken.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use subtitle_reader::app::SubtitleReaderApp;
use subtitle_reader::capture::CapturedFrame;
use subtitle_reader::config::{self, AppConfig};
use subtitle_reader::narration::Utterance;
use subtitle_reader::storage;
use subtitle_reader::vision::ReplayRecognizer;

/// Width of the synthetic frames handed to the recognizer
const FRAME_WIDTH: u32 = 1280;

/// Subtitle Reader - OCR stabilization for subtitle narration
#[derive(Parser, Debug)]
#[command(name = "subtitle-reader")]
#[command(about = "Replay recorded subtitle recognition and print what would be narrated")]
struct Args {
    /// Recorded session: JSON array of recognition results (null = no result)
    #[arg(short, long)]
    input: PathBuf,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the confidence threshold
    #[arg(short, long)]
    threshold: Option<i32>,

    /// Only recognize the top band of the frame
    #[arg(long)]
    quarter_frame: bool,

    /// Height of the recorded frames in pixels
    #[arg(long, default_value = "720")]
    frame_height: u32,

    /// Tick immediately instead of waiting for the poll interval
    #[arg(long)]
    no_delay: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Subtitle Reader starting...");

    let mut config = load_or_create_config(args.config.as_deref())?;
    if let Some(threshold) = args.threshold {
        config.capture.confidence_threshold = threshold;
    }
    if args.quarter_frame {
        config.capture.quarter_frame = true;
    }

    let recognizer = ReplayRecognizer::load(&args.input, &config.capture.language)?;
    let app = SubtitleReaderApp::new(config, recognizer)?;
    let poll_interval = Duration::from_millis(app.config().capture.poll_interval_ms.max(1));

    run_replay(&app, args.frame_height, poll_interval, args.no_delay).await?;

    info!("Subtitle Reader shutdown complete");

    Ok(())
}

/// Tick through the whole recording, speaking at most one phrase per tick
async fn run_replay(
    app: &SubtitleReaderApp<ReplayRecognizer>,
    frame_height: u32,
    poll_interval: Duration,
    no_delay: bool,
) -> Result<()> {
    let mut interval = tokio::time::interval(poll_interval);
    let mut ticks = 0usize;

    app.start_session()?;

    while app.pipeline().recognizer().remaining() > 0 {
        if !no_delay {
            interval.tick().await;
        }
        ticks += 1;

        let frame = CapturedFrame::blank(FRAME_WIDTH, frame_height);
        app.tick(&frame).await;

        if let Some(utterance) = app.next_utterance() {
            print_utterance(ticks, &utterance);
        }
    }

    // The exhausted recording reads as a null result, flushing the last phrase
    ticks += 1;
    app.tick(&CapturedFrame::blank(FRAME_WIDTH, frame_height)).await;
    while let Some(utterance) = app.next_utterance() {
        print_utterance(ticks, &utterance);
    }

    app.stop_session()?;
    info!("Replayed {} ticks", ticks);

    Ok(())
}

fn print_utterance(tick: usize, utterance: &Utterance) {
    println!(
        "[tick {:>4}] ({:>3}, rate {:.1}) {}",
        tick, utterance.confidence, utterance.rate, utterance.text
    );
}

/// Load configuration from file or create default
fn load_or_create_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        let config = config::load_config(path)
            .with_context(|| format!("Could not load configuration {:?}", path))?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    let config_path = match storage::default_config_path() {
        Ok(path) => path,
        Err(e) => {
            warn!("No config directory ({}), using default configuration", e);
            return Ok(AppConfig::default());
        }
    };

    if config_path.exists() {
        match config::load_config(&config_path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", config_path);
                return Ok(config);
            }
            Err(e) => warn!("Ignoring unreadable configuration: {:#}", e),
        }
    } else {
        let config = AppConfig::default();
        match config::save_config(&config, &config_path) {
            Ok(()) => info!("Wrote default configuration to {:?}", config_path),
            Err(e) => warn!("Could not write default configuration: {:#}", e),
        }
        return Ok(config);
    }

    info!("Using default configuration");
    Ok(AppConfig::default())
}
