//! Generate a synthetic record table from a traffic scenario.

use std::path::PathBuf;

use airprox_cli::logging;
use airprox_cli::sim::{
    create_converging_scenario, create_crossing_scenario, create_parallel_scenario,
};
use airprox_ingest::write_record_table_file;
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Available traffic scenarios
#[derive(Debug, Clone, ValueEnum)]
enum ScenarioType {
    /// Two aircraft crossing over the center
    Crossing,
    /// Two aircraft on parallel tracks
    Parallel,
    /// Four aircraft converging on a point
    Converging,
}

/// Synthetic traffic generator
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Scenario to generate
    #[arg(long, value_enum, default_value = "crossing")]
    scenario: ScenarioType,

    /// Center latitude (default: Orlando, FL)
    #[arg(long, default_value_t = 28.4294)]
    lat: f64,

    /// Center longitude (default: Orlando, FL)
    #[arg(long, default_value_t = -81.3089)]
    lon: f64,

    /// Duration in seconds
    #[arg(long, default_value_t = 200)]
    duration: u32,

    /// Maximum random position error in feet
    #[arg(long, default_value_t = 0.0)]
    jitter_ft: f64,

    /// RNG seed for reproducible jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Start time (RFC 3339, default: now)
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// Record table to write (CSV)
    #[arg(long, short, default_value = "ARIA_flight_data.csv")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    logging::init("airprox=info")?;
    let args = Args::parse();

    let scenario = match args.scenario {
        ScenarioType::Crossing => create_crossing_scenario(args.lat, args.lon),
        ScenarioType::Parallel => create_parallel_scenario(args.lat, args.lon),
        ScenarioType::Converging => create_converging_scenario(args.lat, args.lon),
    };

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let start = args.start.unwrap_or_else(Utc::now);
    let rows = scenario.sample(start, args.duration, args.jitter_ft.max(0.0), &mut rng);

    write_record_table_file(&args.output, &rows)
        .with_context(|| format!("writing record table {}", args.output.display()))?;

    println!("\nScenario: {}", scenario.name);
    println!("  Aircraft: {}", scenario.aircraft.len());
    println!("  Duration: {}s, rows: {}", args.duration, rows.len());
    println!("  Written to {}", args.output.display());
    Ok(())
}
