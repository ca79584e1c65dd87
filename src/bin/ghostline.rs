//! ghostline - replay telemetry command line tool
//!
//! Lists the drivers in a replay, exports a driver's telemetry as JSON and computes the
//! phase shift between two laps.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ghostline::TelemetryTrace;
use ghostline::analysis::LapComparison;
use ghostline::config::AnalysisConfig;
use ghostline::export::{export_file_name, read_json, to_json, to_json_pretty};
use ghostline::replay::ReplayFile;

#[derive(Parser)]
#[command(name = "ghostline")]
#[command(about = "Replay telemetry extraction and lap alignment")]
#[command(version)]
struct Cli {
    /// YAML analysis configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the drivers in a replay
    Drivers {
        /// Replay file
        replay: PathBuf,
    },

    /// Export one driver's telemetry as JSON
    Export {
        /// Replay file
        replay: PathBuf,

        /// Driver name (case-insensitive, partial names match)
        #[arg(short, long)]
        driver: String,

        /// Output file (default: <replay>_<driver>_telemetry.json next to the replay)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Compute the phase shift aligning a candidate lap to a reference lap
    Align {
        /// Reference replay or telemetry JSON
        reference: PathBuf,

        /// Candidate replay or telemetry JSON
        candidate: PathBuf,

        /// Reference driver (required for replay input)
        #[arg(long)]
        reference_driver: Option<String>,

        /// Candidate driver (required for replay input)
        #[arg(long)]
        candidate_driver: Option<String>,

        /// Reference frame to align at
        #[arg(short, long, default_value_t = 0)]
        frame: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    match cli.command {
        Commands::Drivers { replay } => {
            let file = open_replay(&replay)?;
            let drivers = file.drivers_with(&config.scan).context("Failed to list drivers")?;
            if drivers.is_empty() {
                println!("No drivers found");
            }
            for (slot, name) in drivers.iter().enumerate() {
                println!("{:>3}  {}", slot, name);
            }
        }
        Commands::Export { replay, driver, output, pretty } => {
            let file = open_replay(&replay)?;
            let trace = file
                .decode_driver(&driver)
                .with_context(|| format!("Failed to decode driver '{}'", driver))?;
            let json = if pretty { to_json_pretty(&trace)? } else { to_json(&trace)? };

            let output = output.unwrap_or_else(|| {
                replay.with_file_name(export_file_name(&file.file_name(), &driver))
            });
            std::fs::write(&output, json)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Exported {} frames to {}", trace.num_frames(), output.display());
            println!("{}", output.display());
        }
        Commands::Align { reference, candidate, reference_driver, candidate_driver, frame } => {
            let reference = load_trace(&reference, reference_driver.as_deref())?;
            let candidate = load_trace(&candidate, candidate_driver.as_deref())?;
            let comparison = LapComparison::with_config(reference, candidate, &config);

            match comparison.align_at(frame) {
                Some(alignment) => {
                    println!("reference frame: {}", alignment.reference_frame);
                    println!("matched frame:   {}", alignment.matched_frame);
                    println!("distance:        {:.3}", alignment.distance_sq.sqrt());
                    println!("phase shift:     {}", alignment.phase_shift);
                    println!("candidate shift: {}", alignment.candidate_shift());
                }
                None => bail!("No alignment candidate found at reference frame {}", frame),
            }
        }
    }

    Ok(())
}

fn open_replay(path: &Path) -> Result<ReplayFile> {
    ReplayFile::open(path).with_context(|| format!("Failed to open replay {}", path.display()))
}

/// Load a trace from a telemetry JSON export, or decode `driver` from a replay.
fn load_trace(path: &Path, driver: Option<&str>) -> Result<TelemetryTrace> {
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        return read_json(path).with_context(|| format!("Failed to read {}", path.display()));
    }
    let Some(driver) = driver else {
        bail!("A driver name is required to decode {}", path.display());
    };
    open_replay(path)?
        .decode_driver(driver)
        .with_context(|| format!("Failed to decode driver '{}' from {}", driver, path.display()))
}
