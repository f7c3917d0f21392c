//! Flat record table in CSV form.
//!
//! Column names follow the ARIA export: `Custom 1` carries the flight id
//! (callsign) and `Custom 2` the aircraft type.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use airprox_core::RawRecord;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::IngestError;

pub const RECORD_HEADERS: [&str; 9] = [
    "Primary Partition",
    "Secondary Partition",
    "Timestamp",
    "VIN or ID",
    "Latitude",
    "Longitude",
    "Altitude",
    "Custom 1",
    "Custom 2",
];

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// One CSV row. Every cell is read as text so that a single bad value
/// turns into a missing field instead of rejecting the whole row.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TableRow {
    #[serde(rename = "Primary Partition", default)]
    primary_partition: Option<String>,
    #[serde(rename = "Secondary Partition", default)]
    secondary_partition: Option<String>,
    #[serde(rename = "Timestamp", default)]
    timestamp: Option<String>,
    #[serde(rename = "VIN or ID", default)]
    aircraft_id: Option<String>,
    #[serde(rename = "Latitude", default)]
    latitude: Option<String>,
    #[serde(rename = "Longitude", default)]
    longitude: Option<String>,
    #[serde(rename = "Altitude", default)]
    altitude: Option<String>,
    #[serde(rename = "Custom 1", default)]
    custom_1: Option<String>,
    #[serde(rename = "Custom 2", default)]
    custom_2: Option<String>,
}

impl TableRow {
    fn into_raw(self) -> RawRecord {
        RawRecord {
            primary_partition: self.primary_partition.unwrap_or_default(),
            secondary_partition: self.secondary_partition.unwrap_or_default(),
            timestamp: self.timestamp.as_deref().and_then(parse_timestamp),
            aircraft_id: non_empty(self.aircraft_id),
            latitude: self.latitude.as_deref().and_then(parse_number),
            longitude: self.longitude.as_deref().and_then(parse_number),
            altitude_ft: self.altitude.as_deref().and_then(parse_number),
            flight_id: self.custom_1,
            aircraft_type: self.custom_2,
        }
    }

    fn from_raw(record: &RawRecord) -> Self {
        Self {
            primary_partition: Some(record.primary_partition.clone()),
            secondary_partition: Some(record.secondary_partition.clone()),
            timestamp: record
                .timestamp
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            aircraft_id: record.aircraft_id.clone(),
            latitude: record.latitude.map(|v| v.to_string()),
            longitude: record.longitude.map(|v| v.to_string()),
            altitude: record.altitude_ft.map(|v| v.to_string()),
            custom_1: record.flight_id.clone(),
            custom_2: record.aircraft_type.clone(),
        }
    }
}

/// Rows read from a record table plus the count of unreadable rows.
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    pub rows: Vec<RawRecord>,
    pub skipped_rows: usize,
}

/// Parse RFC 3339, or a naive `YYYY-MM-DD[ T]HH:MM:SS[.fff]` taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn read_record_table<R: Read>(reader: R) -> Result<RecordTable, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut table = RecordTable::default();
    for (line, result) in csv_reader.deserialize::<TableRow>().enumerate() {
        match result {
            Ok(row) => table.rows.push(row.into_raw()),
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                table.skipped_rows += 1;
                warn!("Skipping unreadable record row {}: {}", line + 2, err);
            }
        }
    }

    debug!(
        "Read {} record row(s), skipped {}",
        table.rows.len(),
        table.skipped_rows
    );
    Ok(table)
}

pub fn read_record_table_file(path: impl AsRef<Path>) -> Result<RecordTable, IngestError> {
    let file = File::open(path.as_ref())?;
    read_record_table(file)
}

pub fn write_record_table<W: Write>(writer: W, rows: &[RawRecord]) -> Result<(), IngestError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(RECORD_HEADERS)?;
    for record in rows {
        csv_writer.serialize(TableRow::from_raw(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_record_table_file(
    path: impl AsRef<Path>,
    rows: &[RawRecord],
) -> Result<(), IngestError> {
    let file = File::create(path.as_ref())?;
    write_record_table(file, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_and_naive_timestamps() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 3).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T12:00:03Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T08:00:03-04:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01 12:00:03"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-05-01T12:00:03.250").map(|ts| ts.timestamp()),
            Some(expected.timestamp())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("   "), None);
    }

    #[test]
    fn bad_cells_become_missing_fields() {
        let csv = "\
Primary Partition,Secondary Partition,Timestamp,VIN or ID,Latitude,Longitude,Altitude,Custom 1,Custom 2
USA,Florida,2024-05-01T12:00:03Z,A1B2C3,28.4294,-81.3089,4000,JBU101,A320
USA,Florida,not-a-time,D4E5F6,north,-81.3089,,SWA202,B737
USA,Florida,2024-05-01T12:00:04Z,,28.4,-81.3,3000,,
";
        let table = read_record_table(csv.as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.skipped_rows, 0);

        let first = &table.rows[0];
        assert_eq!(first.aircraft_id.as_deref(), Some("A1B2C3"));
        assert_eq!(first.altitude_ft, Some(4000.0));
        assert_eq!(first.flight_id.as_deref(), Some("JBU101"));

        let second = &table.rows[1];
        assert!(second.timestamp.is_none());
        assert!(second.latitude.is_none());
        assert!(second.altitude_ft.is_none());

        let third = &table.rows[2];
        assert!(third.aircraft_id.is_none());
        assert!(third.flight_id.is_none());
    }

    #[test]
    fn short_rows_are_padded_with_missing_fields() {
        let csv = "\
Primary Partition,Secondary Partition,Timestamp,VIN or ID,Latitude,Longitude,Altitude,Custom 1,Custom 2
USA,Florida,2024-05-01T12:00:03Z,A1B2C3
";
        let table = read_record_table(csv.as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert!(table.rows[0].latitude.is_none());
    }

    #[test]
    fn written_table_reads_back() {
        let rows = vec![RawRecord {
            primary_partition: "USA".into(),
            secondary_partition: "Florida".into(),
            timestamp: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 3).unwrap()),
            aircraft_id: Some("A1B2C3".into()),
            latitude: Some(28.4294),
            longitude: Some(-81.3089),
            altitude_ft: None,
            flight_id: Some("JBU101".into()),
            aircraft_type: None,
        }];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");
        write_record_table_file(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Primary Partition,Secondary Partition,Timestamp,VIN or ID"));

        let table = read_record_table_file(&path).unwrap();
        assert_eq!(table.rows, rows);
    }
}
