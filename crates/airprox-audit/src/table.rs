//! CSV layouts for the conflict table and the per-event audit logs.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use airprox_core::{ConflictEvent, PositionRecord};
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

pub const CONFLICT_HEADERS: [&str; 14] = [
    "aircraft_pair",
    "timestamp_a",
    "aircraft_a",
    "flight_a",
    "type_a",
    "timestamp_b",
    "aircraft_b",
    "flight_b",
    "type_b",
    "horizontal_distance_ft",
    "vertical_distance_ft",
    "conflict_latitude",
    "conflict_longitude",
    "time_window",
];

const POSITION_LOG_HEADERS: [&str; 10] = [
    "Primary Partition",
    "Secondary Partition",
    "Timestamp",
    "VIN or ID",
    "Latitude",
    "Longitude",
    "Altitude",
    "Custom 1",
    "Custom 2",
    "Timestamp Seconds",
];

#[derive(Serialize)]
struct ConflictRow<'a> {
    aircraft_pair: String,
    timestamp_a: String,
    aircraft_a: &'a str,
    flight_a: &'a str,
    type_a: &'a str,
    timestamp_b: String,
    aircraft_b: &'a str,
    flight_b: &'a str,
    type_b: &'a str,
    horizontal_distance_ft: f64,
    vertical_distance_ft: f64,
    conflict_latitude: f64,
    conflict_longitude: f64,
    time_window: i64,
}

impl<'a> From<&'a ConflictEvent> for ConflictRow<'a> {
    fn from(event: &'a ConflictEvent) -> Self {
        let c = &event.candidate;
        Self {
            aircraft_pair: c.aircraft_pair.to_string(),
            timestamp_a: format_time(c.time_a),
            aircraft_a: &c.aircraft_a,
            flight_a: &c.flight_a,
            type_a: &c.type_a,
            timestamp_b: format_time(c.time_b),
            aircraft_b: &c.aircraft_b,
            flight_b: &c.flight_b,
            type_b: &c.type_b,
            horizontal_distance_ft: c.horizontal_distance_ft,
            vertical_distance_ft: c.vertical_distance_ft,
            conflict_latitude: c.midpoint_lat,
            conflict_longitude: c.midpoint_lon,
            time_window: event.time_window,
        }
    }
}

#[derive(Serialize)]
struct PositionRow<'a> {
    primary_partition: &'a str,
    secondary_partition: &'a str,
    timestamp: String,
    aircraft_id: &'a str,
    latitude: f64,
    longitude: f64,
    altitude_ft: f64,
    flight_id: &'a str,
    aircraft_type: &'a str,
    time_seconds: i64,
}

impl<'a> From<&'a PositionRecord> for PositionRow<'a> {
    fn from(record: &'a PositionRecord) -> Self {
        Self {
            primary_partition: &record.primary_partition,
            secondary_partition: &record.secondary_partition,
            timestamp: format_time(record.timestamp),
            aircraft_id: &record.aircraft_id,
            latitude: record.latitude,
            longitude: record.longitude,
            altitude_ft: record.altitude_ft,
            flight_id: &record.flight_id,
            aircraft_type: &record.aircraft_type,
            time_seconds: record.time_seconds,
        }
    }
}

fn format_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Write the conflict table. An empty event list still gets a header row.
pub fn write_conflict_table<W: Write>(writer: W, events: &[ConflictEvent]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(CONFLICT_HEADERS)?;
    for event in events {
        csv_writer.serialize(ConflictRow::from(event))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_conflict_table_file(path: impl AsRef<Path>, events: &[ConflictEvent]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_conflict_table(file, events)
}

/// Render sanitized records as an audit log body (CSV bytes).
pub fn position_log_csv<'a>(records: impl IntoIterator<Item = &'a PositionRecord>) -> Result<Vec<u8>> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    csv_writer.write_record(POSITION_LOG_HEADERS)?;
    for record in records {
        csv_writer.serialize(PositionRow::from(record))?;
    }
    let bytes = csv_writer.into_inner().map_err(|e| e.into_error())?;
    Ok(bytes)
}
