//! Airprox CLI - batch tools around the conflict detection core.
//!
//! Binaries:
//! - airprox: record table in, conflict table and audit logs out
//! - aria_to_csv: ARIA surveillance log to record table
//! - generate_traffic: synthetic scenario record tables

pub mod config;
pub mod logging;
pub mod run;
pub mod sim;

pub use config::Config;
pub use run::{run_detection, RunSummary};
