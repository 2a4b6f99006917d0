//! MrzScanner - command line front end
//!
//! Decodes a machine readable zone typed on the command line, or replays a
//! recording of recognizer output through the full consensus pipeline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use mrz_scanner::analysis::ScanEvent;
use mrz_scanner::capture::{FrameSource, JsonLinesSource};
use mrz_scanner::config::{self, AppConfig};
use mrz_scanner::mrz::{encode, DecodedMrzFields};
use mrz_scanner::shared::ScannerToCaller;
use mrz_scanner::{storage, ScannerApp};

/// MrzScanner - passport and ID card MRZ reader
#[derive(Parser, Debug)]
#[command(name = "mrz-scanner")]
#[command(about = "Decode ICAO 9303 machine readable zones from recognized text")]
struct Args {
    /// Configuration file (defaults to the per-user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a single MRZ given as separate lines
    Decode {
        /// MRZ lines in any order
        #[arg(required = true)]
        lines: Vec<String>,
    },
    /// Feed recorded recognizer payloads (one JSON document per line) through the scanner
    Replay {
        /// File with one payload per line
        file: PathBuf,
        /// Width of the camera preview the payloads were recognized in
        #[arg(long, default_value = "1000")]
        view_width: f32,
    },
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => Some(path.clone()),
        None => storage::default_config_path().ok(),
    };
    let loaded = config_path
        .as_deref()
        .filter(|path| path.exists())
        .map(|path| (path, config::load_config(path)));

    // Initialize logging
    let level = args.log_level.clone().unwrap_or_else(|| match &loaded {
        Some((_, Ok(config))) => config.logging.level.clone(),
        _ => AppConfig::default().logging.level,
    });
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match loaded {
        Some((path, Ok(config))) => {
            info!("Loaded configuration from {:?}", path);
            config
        }
        Some((path, Err(e))) => {
            if args.config.is_some() {
                return Err(e);
            }
            warn!("Ignoring configuration at {:?}: {:#}", path, e);
            AppConfig::default()
        }
        None => {
            info!("Using default configuration");
            AppConfig::default()
        }
    };

    match args.command {
        Command::Decode { lines } => run_decode(&config, &lines),
        Command::Replay { file, view_width } => run_replay(&config, &file, view_width),
        Command::InitConfig { force } => {
            let path = config_path.context("Could not determine config file location")?;
            init_config(&path, force)
        }
    }
}

/// Decode one MRZ and print it as JSON
fn run_decode(config: &AppConfig, lines: &[String]) -> Result<()> {
    let parser = config.parser.build();
    match parser.decode_lines(lines.iter().map(String::as_str)) {
        Some(fields) => print_fields(&fields),
        None => {
            println!("No MRZ found");
            Ok(())
        }
    }
}

/// Replay a recording and print the first consensus result
fn run_replay(config: &AppConfig, file: &Path, view_width: f32) -> Result<()> {
    let reader = File::open(file).with_context(|| format!("Failed to open {:?}", file))?;
    let mut source = JsonLinesSource::new(BufReader::new(reader), view_width);

    let app = ScannerApp::start(config)?;
    let events = app.events().clone();
    let started = Instant::now();

    let mut submitted = 0u64;
    while let Some(frame) = source
        .next_frame()
        .with_context(|| format!("Failed to read frame {} of {:?}", submitted, file))?
    {
        app.submit(frame)?;
        submitted += 1;
    }

    let runtime = app.runtime.clone();
    app.shutdown()?;

    let mut resolved = None;
    for message in events.try_iter() {
        if let ScannerToCaller::Event(stamped) = message {
            match stamped.event {
                ScanEvent::Resolved(fields) if resolved.is_none() => {
                    info!(
                        "Consensus reached {:?} into the replay",
                        stamped.timestamp.duration_since(started)
                    );
                    resolved = Some(fields);
                }
                ScanEvent::PhaseChanged { from, to } => info!("Phase {} -> {}", from, to),
                _ => {}
            }
        }
    }

    let stats = runtime.read().clone();
    info!(
        "Replayed {} frames: {} decoded, {} dropped",
        stats.frames_received, stats.frames_decoded, stats.frames_dropped
    );

    match resolved {
        Some(fields) => print_fields(&fields),
        None => {
            println!("No consensus reached (phase: {})", stats.phase);
            Ok(())
        }
    }
}

fn print_fields(fields: &DecodedMrzFields) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(fields)?);
    let today = chrono::Local::now().date_naive();
    match fields.is_expired_on(today) {
        Some(true) => warn!("Document expired on {}", fields.expiry_date),
        Some(false) => {}
        None => warn!("Expiry date {} is not a calendar date", fields.expiry_date),
    }
    if !fields.valid {
        warn!("Check digits do not match; normalized form:");
        for line in encode(fields) {
            warn!("  {}", line);
        }
    }
    Ok(())
}

/// Write the default configuration
fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{:?} already exists (use --force to overwrite)", path);
    }
    config::save_config(&AppConfig::default(), path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
