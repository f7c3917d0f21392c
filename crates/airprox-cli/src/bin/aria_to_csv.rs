//! Convert an ARIA surveillance log (one XML document per line) into the
//! flat record table.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use airprox_cli::logging;
use airprox_ingest::{parse_aria_log, write_record_table_file, AriaOptions};
use anyhow::Context;
use clap::Parser;

/// ARIA log to record table converter
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// ARIA log file
    #[arg(long, short)]
    input: PathBuf,

    /// Record table to write (CSV)
    #[arg(long, short, default_value = "ARIA_flight_data.csv")]
    output: PathBuf,

    /// Value for the Primary Partition column
    #[arg(long, default_value = "USA")]
    primary_partition: String,

    /// Value for the Secondary Partition column
    #[arg(long, default_value = "Florida")]
    secondary_partition: String,
}

fn main() -> anyhow::Result<()> {
    logging::init("airprox=info")?;
    let args = Args::parse();

    let file = File::open(&args.input)
        .with_context(|| format!("opening ARIA log {}", args.input.display()))?;
    let options = AriaOptions {
        primary_partition: args.primary_partition,
        secondary_partition: args.secondary_partition,
    };
    let parse = parse_aria_log(BufReader::new(file), &options)?;

    write_record_table_file(&args.output, &parse.rows)
        .with_context(|| format!("writing record table {}", args.output.display()))?;

    println!(
        "Converted {} line(s) into {} row(s), skipped {} -> {}",
        parse.lines_read,
        parse.rows.len(),
        parse.skipped_lines,
        args.output.display()
    );
    Ok(())
}
