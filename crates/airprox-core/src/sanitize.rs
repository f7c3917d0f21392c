//! Record cleanup ahead of proximity scanning.
//!
//! Rows that cannot take part in detection are dropped and counted,
//! never reported as errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{PositionRecord, RawRecord};
use crate::rules::DetectionRules;
use crate::spatial::quantize;

/// Row counts from one sanitizer pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeReport {
    pub rows_in: usize,
    pub kept: usize,
    /// Missing timestamp, identity or geospatial field
    pub missing_fields: usize,
    pub sentinel_id: usize,
    /// At or below the minimum altitude
    pub low_altitude: usize,
}

impl SanitizeReport {
    pub fn dropped(&self) -> usize {
        self.missing_fields + self.sentinel_id + self.low_altitude
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sanitized {
    pub records: Vec<PositionRecord>,
    pub report: SanitizeReport,
}

enum Rejection {
    MissingFields,
    SentinelId,
    LowAltitude,
}

/// Clean a raw record table. Surviving rows keep their input order.
pub fn sanitize_records(
    rows: impl IntoIterator<Item = RawRecord>,
    rules: &DetectionRules,
) -> Sanitized {
    let mut out = Sanitized::default();

    for row in rows {
        out.report.rows_in += 1;
        match sanitize_row(row, rules) {
            Ok(record) => out.records.push(record),
            Err(Rejection::MissingFields) => out.report.missing_fields += 1,
            Err(Rejection::SentinelId) => out.report.sentinel_id += 1,
            Err(Rejection::LowAltitude) => out.report.low_altitude += 1,
        }
    }
    out.report.kept = out.records.len();

    debug!(
        "Sanitized {} rows: kept {}, missing fields {}, sentinel {}, low altitude {}",
        out.report.rows_in,
        out.report.kept,
        out.report.missing_fields,
        out.report.sentinel_id,
        out.report.low_altitude
    );

    out
}

fn sanitize_row(row: RawRecord, rules: &DetectionRules) -> Result<PositionRecord, Rejection> {
    let (Some(timestamp), Some(aircraft_id), Some(latitude), Some(longitude), Some(altitude_ft)) = (
        row.timestamp,
        row.aircraft_id,
        finite(row.latitude),
        finite(row.longitude),
        finite(row.altitude_ft),
    ) else {
        return Err(Rejection::MissingFields);
    };

    let aircraft_id = aircraft_id.trim().to_string();
    if aircraft_id.is_empty() {
        return Err(Rejection::MissingFields);
    }
    if aircraft_id == rules.sentinel_aircraft_id {
        return Err(Rejection::SentinelId);
    }
    if altitude_ft <= rules.min_altitude_ft {
        return Err(Rejection::LowAltitude);
    }

    let timestamp = floor_to_second(timestamp);
    Ok(PositionRecord {
        primary_partition: row.primary_partition,
        secondary_partition: row.secondary_partition,
        time_seconds: timestamp.timestamp(),
        timestamp,
        aircraft_id,
        latitude: quantize(latitude, rules.coordinate_decimals),
        longitude: quantize(longitude, rules.coordinate_decimals),
        altitude_ft,
        flight_id: normalize_label(row.flight_id.as_deref()),
        aircraft_type: normalize_label(row.aircraft_type.as_deref()),
    })
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Lower-case and trim; a missing label becomes the empty string.
pub fn normalize_label(value: Option<&str>) -> String {
    value.map(|v| v.trim().to_lowercase()).unwrap_or_default()
}

pub fn floor_to_second(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp.timestamp(), 0).unwrap_or(timestamp)
}
