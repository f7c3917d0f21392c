//! Core data models for the conflict detection pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A position report as supplied by the record store, before cleanup.
///
/// Any field may be missing; the sanitizer decides which rows survive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub primary_partition: String,
    #[serde(default)]
    pub secondary_partition: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub aircraft_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_ft: Option<f64>,
    pub flight_id: Option<String>,
    pub aircraft_type: Option<String>,
}

/// A cleaned position report, ready for proximity scanning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub primary_partition: String,
    pub secondary_partition: String,
    /// Report time floored to whole seconds (the time bucket).
    pub timestamp: DateTime<Utc>,
    /// Seconds since the Unix epoch for `timestamp`.
    pub time_seconds: i64,
    pub aircraft_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: f64,
    /// Lower-cased, trimmed flight identifier (callsign).
    pub flight_id: String,
    /// Lower-cased, trimmed aircraft type designator.
    pub aircraft_type: String,
}

/// Canonically ordered pair of aircraft identifiers.
///
/// `first() <= second()` always holds, so the pair is insensitive to the
/// order in which the two aircraft were discovered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AircraftPair(String, String);

impl AircraftPair {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }

    pub fn first(&self) -> &str {
        &self.0
    }

    pub fn second(&self) -> &str {
        &self.1
    }
}

impl fmt::Display for AircraftPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.0, self.1)
    }
}

/// A raw proximity match between two records at the same instant.
///
/// Side `a` is the record that was scanning, side `b` the record it found.
/// The same physical conflict is normally found twice, once from each side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictCandidate {
    pub aircraft_pair: AircraftPair,
    pub time_a: DateTime<Utc>,
    pub aircraft_a: String,
    pub flight_a: String,
    pub type_a: String,
    pub time_b: DateTime<Utc>,
    pub aircraft_b: String,
    pub flight_b: String,
    pub type_b: String,
    pub horizontal_distance_ft: f64,
    pub vertical_distance_ft: f64,
    pub midpoint_lat: f64,
    pub midpoint_lon: f64,
}

impl ConflictCandidate {
    pub(crate) fn from_match(
        a: &PositionRecord,
        b: &PositionRecord,
        horizontal_distance_ft: f64,
        vertical_distance_ft: f64,
    ) -> Self {
        Self {
            aircraft_pair: AircraftPair::new(&a.aircraft_id, &b.aircraft_id),
            time_a: a.timestamp,
            aircraft_a: a.aircraft_id.clone(),
            flight_a: a.flight_id.clone(),
            type_a: a.aircraft_type.clone(),
            time_b: b.timestamp,
            aircraft_b: b.aircraft_id.clone(),
            flight_b: b.flight_id.clone(),
            type_b: b.aircraft_type.clone(),
            horizontal_distance_ft,
            vertical_distance_ft,
            midpoint_lat: (a.latitude + b.latitude) / 2.0,
            midpoint_lon: (a.longitude + b.longitude) / 2.0,
        }
    }

    /// Seconds since epoch of the scanning side; this keys the time window.
    pub fn time_seconds(&self) -> i64 {
        self.time_a.timestamp()
    }
}

/// The representative candidate for one (aircraft pair, time window).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictEvent {
    #[serde(flatten)]
    pub candidate: ConflictCandidate,
    /// Start of the deduplication window, seconds since epoch.
    pub time_window: i64,
}

impl ConflictEvent {
    pub fn aircraft_pair(&self) -> &AircraftPair {
        &self.candidate.aircraft_pair
    }

    /// Deterministic audit log file name, e.g.
    /// `conflict_A1B2C3_D4E5F6_2024-05-01T12-00-03.log`.
    pub fn log_file_name(&self) -> String {
        let pair = self.aircraft_pair();
        format!(
            "conflict_{}_{}_{}.log",
            sanitize_file_component(pair.first()),
            sanitize_file_component(pair.second()),
            self.candidate.time_a.format("%Y-%m-%dT%H-%M-%S")
        )
    }
}

fn sanitize_file_component(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, lat: f64) -> PositionRecord {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 3).unwrap();
        PositionRecord {
            primary_partition: "USA".into(),
            secondary_partition: "Florida".into(),
            timestamp,
            time_seconds: timestamp.timestamp(),
            aircraft_id: id.into(),
            latitude: lat,
            longitude: -80.0,
            altitude_ft: 3000.0,
            flight_id: format!("flt{}", id.to_lowercase()),
            aircraft_type: "b738".into(),
        }
    }

    #[test]
    fn pair_is_sorted_regardless_of_argument_order() {
        let ab = AircraftPair::new("B00002", "A00001");
        let ba = AircraftPair::new("A00001", "B00002");
        assert_eq!(ab, ba);
        assert_eq!(ab.first(), "A00001");
        assert_eq!(ab.second(), "B00002");
        assert_eq!(ab.to_string(), "A00001|B00002");
    }

    #[test]
    fn candidate_keeps_scanning_side_as_a() {
        let scanning = record("ZZ0001", 28.0);
        let found = record("AA0001", 28.001);
        let candidate = ConflictCandidate::from_match(&scanning, &found, 120.0, 50.0);

        assert_eq!(candidate.aircraft_a, "ZZ0001");
        assert_eq!(candidate.aircraft_pair.first(), "AA0001");
        assert!((candidate.midpoint_lat - 28.0005).abs() < 1e-9);
        assert_eq!(candidate.time_seconds(), scanning.time_seconds);
    }

    #[test]
    fn log_file_name_uses_pair_and_first_timestamp() {
        let candidate =
            ConflictCandidate::from_match(&record("ZZ0001", 28.0), &record("AA0001", 28.0), 0.0, 0.0);
        let event = ConflictEvent {
            time_window: candidate.time_seconds() - 3,
            candidate,
        };
        assert_eq!(
            event.log_file_name(),
            "conflict_AA0001_ZZ0001_2024-05-01T12-00-03.log"
        );
    }

    #[test]
    fn log_file_name_replaces_path_separators() {
        let candidate =
            ConflictCandidate::from_match(&record("A/1", 28.0), &record("B 2", 28.0), 0.0, 0.0);
        let event = ConflictEvent {
            time_window: 0,
            candidate,
        };
        assert!(event.log_file_name().starts_with("conflict_A_1_B_2_"));
    }
}
