//! Sanitize, scan and group in one batch call.

use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DetectError;
use crate::grouper::ConflictGrouper;
use crate::models::{ConflictEvent, PositionRecord, RawRecord};
use crate::rules::DetectionRules;
use crate::sanitize::{sanitize_records, SanitizeReport};
use crate::scanner::ProximityScanner;

/// Counts from one detection run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub sanitize: SanitizeReport,
    pub buckets: usize,
    pub indexed_buckets: usize,
    pub candidates: usize,
    pub events: usize,
}

/// Output of a detection run.
///
/// `records` is the sanitized table; audit logs are built from it.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub records: Vec<PositionRecord>,
    pub events: Vec<ConflictEvent>,
    pub report: DetectionReport,
}

pub fn detect_conflicts(
    rows: Vec<RawRecord>,
    rules: &DetectionRules,
    cancel: &AtomicBool,
) -> Result<Detection, DetectError> {
    rules.validate()?;
    let grouper = ConflictGrouper::from_rules(rules)?;

    let sanitized = sanitize_records(rows, rules);
    info!(
        "Sanitized {} row(s): kept {}, dropped {}",
        sanitized.report.rows_in,
        sanitized.report.kept,
        sanitized.report.dropped()
    );

    let scan = ProximityScanner::new(rules).scan_with_cancel(&sanitized.records, cancel)?;
    let events = grouper.group(&scan.candidates);

    if events.is_empty() {
        info!("No conflicts detected");
    } else {
        info!("Conflicts detected: {}", events.len());
    }

    let report = DetectionReport {
        sanitize: sanitized.report,
        buckets: scan.buckets,
        indexed_buckets: scan.indexed_buckets,
        candidates: scan.candidates.len(),
        events: events.len(),
    };

    Ok(Detection {
        records: sanitized.records,
        events,
        report,
    })
}
