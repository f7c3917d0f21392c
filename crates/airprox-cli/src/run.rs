//! One batch detection run: read, detect, persist.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use airprox_audit::{spawn_audit_writer, write_conflict_table_file, AuditConfig, AuditSummary};
use airprox_core::{detect_conflicts, DetectionReport};
use airprox_ingest::read_record_table_file;
use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::Config;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub rows_read: usize,
    pub rows_unreadable: usize,
    pub detection: DetectionReport,
    pub audit: AuditSummary,
    pub output_path: PathBuf,
    pub log_dir: PathBuf,
}

/// Run the pipeline once.
///
/// `cancel` interrupts the proximity scan between time buckets; a
/// cancelled run writes nothing. `shutdown` stops the audit writer; it
/// must be subscribed before the run starts so that a signal sent during
/// detection is still seen.
pub async fn run_detection(
    config: &Config,
    cancel: Arc<AtomicBool>,
    shutdown: broadcast::Receiver<()>,
) -> Result<RunSummary> {
    let table = read_record_table_file(&config.input_path)
        .with_context(|| format!("reading record table {}", config.input_path.display()))?;
    tracing::info!(
        "Loaded {} row(s) from {} ({} unreadable)",
        table.rows.len(),
        config.input_path.display(),
        table.skipped_rows
    );
    let rows_read = table.rows.len();

    let rules = config.rules.clone();
    let rows = table.rows;
    let detection = tokio::task::spawn_blocking(move || detect_conflicts(rows, &rules, &cancel))
        .await
        .context("detection task panicked")??;

    write_conflict_table_file(&config.output_path, &detection.events)
        .with_context(|| format!("writing conflict table {}", config.output_path.display()))?;
    tracing::info!(
        "Wrote {} conflict(s) to {}",
        detection.events.len(),
        config.output_path.display()
    );

    let events = detection.events;
    let records = Arc::new(detection.records);
    let (tx, handle) = spawn_audit_writer(
        AuditConfig::new(&config.log_dir),
        records,
        shutdown,
    );
    for event in events {
        if tx.send(event).await.is_err() {
            tracing::warn!("Audit writer stopped before all events were delivered");
            break;
        }
    }
    drop(tx);
    let audit = handle.await.context("audit writer panicked")?;

    let summary = RunSummary {
        rows_read,
        rows_unreadable: table.skipped_rows,
        detection: detection.report,
        audit,
        output_path: config.output_path.clone(),
        log_dir: config.log_dir.clone(),
    };

    if let Some(path) = &config.summary_path {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing run summary {}", path.display()))?;
    }

    Ok(summary)
}
