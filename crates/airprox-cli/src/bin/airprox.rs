//! Batch conflict detection over a flat record table.
//!
//! Reads the record table, writes the conflict table and one audit log per
//! conflict event. Settings come from `AIRPROX_*` variables; flags win.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use airprox_cli::{logging, run_detection, Config};
use airprox_core::SameIdentityExclusion;
use clap::{Parser, ValueEnum};
use tokio::sync::broadcast;

/// Field that marks two records as the same flight
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExcludeSame {
    /// Equal flight identifier (callsign)
    FlightId,
    /// Equal aircraft type
    AircraftType,
    /// Never exclude
    None,
}

impl From<ExcludeSame> for SameIdentityExclusion {
    fn from(value: ExcludeSame) -> Self {
        match value {
            ExcludeSame::FlightId => SameIdentityExclusion::FlightId,
            ExcludeSame::AircraftType => SameIdentityExclusion::AircraftType,
            ExcludeSame::None => SameIdentityExclusion::Disabled,
        }
    }
}

/// Detect loss-of-separation events in recorded traffic
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Record table (CSV)
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// Conflict table to write (CSV)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Directory for per-event audit logs
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// JSON file with detection rules, replacing any rules taken from the
    /// environment
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Horizontal threshold in feet
    #[arg(long)]
    horizontal_ft: Option<f64>,

    /// Vertical threshold in feet
    #[arg(long)]
    vertical_ft: Option<f64>,

    /// Deduplication window in seconds
    #[arg(long)]
    window_secs: Option<u64>,

    /// Same-identity exclusion
    #[arg(long, value_enum)]
    exclude_same: Option<ExcludeSame>,

    /// Write a JSON run summary here
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Worker threads for the scan (default: all cores)
    #[arg(long)]
    threads: Option<usize>,
}

impl Args {
    fn apply(self, mut config: Config) -> anyhow::Result<Config> {
        if let Some(path) = self.rules {
            config.rules = airprox_cli::config::load_rules_file(path)?;
        }
        if let Some(path) = self.input {
            config.input_path = path;
        }
        if let Some(path) = self.output {
            config.output_path = path;
        }
        if let Some(path) = self.log_dir {
            config.log_dir = path;
        }
        if let Some(path) = self.summary_json {
            config.summary_path = Some(path);
        }
        if let Some(ft) = self.horizontal_ft {
            config.rules.horizontal_threshold_ft = ft;
        }
        if let Some(ft) = self.vertical_ft {
            config.rules.vertical_threshold_ft = ft;
        }
        if let Some(secs) = self.window_secs {
            config.rules.time_window_seconds = secs;
        }
        if let Some(mode) = self.exclude_same {
            config.rules.same_identity_exclusion = mode.into();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("airprox=info")?;

    let args = Args::parse();
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }
    let config = args.apply(Config::from_env()?)?;

    tracing::info!(
        "Detecting conflicts in {} (horizontal {} ft, vertical {} ft, window {} s)",
        config.input_path.display(),
        config.rules.horizontal_threshold_ft,
        config.rules.vertical_threshold_ft,
        config.rules.time_window_seconds
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    {
        let cancel = cancel.clone();
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping");
                cancel.store(true, Ordering::Relaxed);
                let _ = shutdown_tx.send(());
            }
        });
    }

    let summary = run_detection(&config, cancel, shutdown_rx).await?;

    println!("\nDetection complete");
    println!(
        "  Rows: {} read, {} unreadable, {} kept",
        summary.rows_read, summary.rows_unreadable, summary.detection.sanitize.kept
    );
    println!(
        "  Dropped: {} missing fields, {} sentinel, {} low altitude",
        summary.detection.sanitize.missing_fields,
        summary.detection.sanitize.sentinel_id,
        summary.detection.sanitize.low_altitude
    );
    println!(
        "  Candidates: {}, conflict events: {}",
        summary.detection.candidates, summary.detection.events
    );
    println!(
        "  Audit logs: {} written, {} failed ({})",
        summary.audit.files_written,
        summary.audit.files_failed,
        summary.log_dir.display()
    );
    println!("  Conflict table: {}", summary.output_path.display());
    Ok(())
}
