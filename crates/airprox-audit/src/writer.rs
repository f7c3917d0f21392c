//! Per-event audit log writer.
//!
//! Runs as a background task fed by an mpsc channel of conflict events.
//! For every event it writes the full sanitized history of both aircraft
//! to `<log_dir>/conflict_<A>_<B>_<time>.log`. A failed file is logged and
//! counted; it never stops the remaining events.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use airprox_core::{ConflictEvent, PositionRecord};
use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::table::position_log_csv;

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub log_dir: PathBuf,
    /// Capacity of the event channel
    pub channel_capacity: usize,
}

impl AuditConfig {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            channel_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub events_received: usize,
    pub files_written: usize,
    pub files_failed: usize,
}

/// Sanitized records grouped by aircraft, in table order.
#[derive(Debug, Clone)]
pub struct AircraftIndex {
    records: Arc<Vec<PositionRecord>>,
    by_aircraft: HashMap<String, Vec<usize>>,
}

impl AircraftIndex {
    pub fn new(records: Arc<Vec<PositionRecord>>) -> Self {
        let mut by_aircraft: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            by_aircraft
                .entry(record.aircraft_id.clone())
                .or_default()
                .push(idx);
        }
        Self {
            records,
            by_aircraft,
        }
    }

    pub fn history(&self, aircraft_id: &str) -> impl Iterator<Item = &PositionRecord> + '_ {
        self.by_aircraft
            .get(aircraft_id)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.records[idx])
    }

    /// All records of the first aircraft, then all records of the second.
    pub fn pair_history<'a>(
        &'a self,
        event: &'a ConflictEvent,
    ) -> impl Iterator<Item = &'a PositionRecord> + 'a {
        let pair = event.aircraft_pair();
        self.history(pair.first()).chain(self.history(pair.second()))
    }
}

/// Write the audit log for one event and return its path.
pub async fn write_event_log(
    log_dir: &Path,
    index: &AircraftIndex,
    event: &ConflictEvent,
) -> Result<PathBuf> {
    let body = position_log_csv(index.pair_history(event))?;
    let path = log_dir.join(event.log_file_name());
    tokio::fs::write(&path, body)
        .await
        .with_context(|| format!("writing audit log {}", path.display()))?;
    Ok(path)
}

/// Consume events until the channel closes or shutdown is signalled.
pub async fn run_audit_writer(
    config: AuditConfig,
    index: AircraftIndex,
    mut rx: mpsc::Receiver<ConflictEvent>,
    mut shutdown: broadcast::Receiver<()>,
) -> AuditSummary {
    let mut summary = AuditSummary::default();

    if let Err(err) = tokio::fs::create_dir_all(&config.log_dir).await {
        tracing::error!(
            "Failed to create audit log directory {}: {}",
            config.log_dir.display(),
            err
        );
    }

    // A dropped shutdown sender only means nobody will interrupt us.
    let mut listen_shutdown = true;
    loop {
        tokio::select! {
            // Shutdown wins over queued events.
            biased;
            result = shutdown.recv(), if listen_shutdown => {
                if let Err(broadcast::error::RecvError::Closed) = result {
                    listen_shutdown = false;
                    continue;
                }
                tracing::info!("Audit writer shutting down");
                break;
            }
            maybe_event = rx.recv() => {
                let Some(event) = maybe_event else {
                    tracing::debug!("Audit event channel closed");
                    break;
                };
                summary.events_received += 1;
                match write_event_log(&config.log_dir, &index, &event).await {
                    Ok(path) => {
                        summary.files_written += 1;
                        tracing::debug!("Wrote audit log {}", path.display());
                    }
                    Err(err) => {
                        summary.files_failed += 1;
                        tracing::warn!(
                            "Failed to write audit log for {}: {:#}",
                            event.aircraft_pair(),
                            err
                        );
                    }
                }
            }
        }
    }

    tracing::info!(
        "Audit writer finished: {} written, {} failed",
        summary.files_written,
        summary.files_failed
    );
    summary
}

/// Start the writer task. Drop the returned sender to let it finish.
pub fn spawn_audit_writer(
    config: AuditConfig,
    records: Arc<Vec<PositionRecord>>,
    shutdown: broadcast::Receiver<()>,
) -> (mpsc::Sender<ConflictEvent>, JoinHandle<AuditSummary>) {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let index = AircraftIndex::new(records);
    let handle = tokio::spawn(run_audit_writer(config, index, rx, shutdown));
    (tx, handle)
}
