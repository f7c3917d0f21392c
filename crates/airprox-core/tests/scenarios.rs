//! End-to-end detection scenarios over small hand-built tables.

use std::sync::atomic::AtomicBool;

use airprox_core::{detect_conflicts, DetectionRules, RawRecord, SameIdentityExclusion};
use chrono::{DateTime, Utc};

const BASE: i64 = 1_714_564_800;

fn raw(id: &str, second: i64, lat: f64, lon: f64, alt: f64, flight: &str) -> RawRecord {
    RawRecord {
        primary_partition: "USA".into(),
        secondary_partition: "Florida".into(),
        timestamp: DateTime::<Utc>::from_timestamp(BASE + second, 0),
        aircraft_id: Some(id.into()),
        latitude: Some(lat),
        longitude: Some(lon),
        altitude_ft: Some(alt),
        flight_id: Some(flight.into()),
        aircraft_type: Some("A320".into()),
    }
}

fn run(rows: Vec<RawRecord>) -> airprox_core::Detection {
    detect_conflicts(rows, &DetectionRules::default(), &AtomicBool::new(false))
        .expect("detection should succeed")
}

#[test]
fn colocated_aircraft_produce_one_event() {
    let detection = run(vec![
        raw("A1B2C3", 0, 28.4294, -81.3089, 4000.0, "JBU101"),
        raw("D4E5F6", 0, 28.4294, -81.3089, 4000.0, "SWA202"),
    ]);

    // Discovered once from each side, collapsed by the grouper.
    assert_eq!(detection.report.candidates, 2);
    assert_eq!(detection.events.len(), 1);
    let event = &detection.events[0];
    assert_eq!(event.aircraft_pair().first(), "A1B2C3");
    assert_eq!(event.aircraft_pair().second(), "D4E5F6");
    assert_eq!(event.candidate.horizontal_distance_ft, 0.0);
    assert_eq!(event.candidate.vertical_distance_ft, 0.0);
    assert_eq!(event.candidate.midpoint_lat, 28.4294);
}

#[test]
fn identical_flight_identity_is_not_a_conflict() {
    let detection = run(vec![
        raw("A1B2C3", 0, 28.4294, -81.3089, 4000.0, " jbu101"),
        raw("D4E5F6", 0, 28.4294, -81.3089, 4000.0, "JBU101 "),
    ]);
    assert_eq!(detection.report.candidates, 0);
    assert!(detection.events.is_empty());
}

#[test]
fn identical_aircraft_type_is_excluded_under_type_rule() {
    // Same type, different flights.
    let rows = vec![
        raw("A1B2C3", 0, 28.4294, -81.3089, 4000.0, "JBU101"),
        raw("D4E5F6", 0, 28.4294, -81.3089, 4000.0, "SWA202"),
    ];
    let by_type = DetectionRules {
        same_identity_exclusion: SameIdentityExclusion::AircraftType,
        ..Default::default()
    };

    let detection = detect_conflicts(rows.clone(), &by_type, &AtomicBool::new(false)).unwrap();
    assert_eq!(detection.report.candidates, 0);
    assert!(detection.events.is_empty());

    let detection = run(rows.clone());
    assert_eq!(detection.report.candidates, 2);
    assert_eq!(detection.events.len(), 1);

    // Differing types pass the type rule.
    let mut mixed = rows;
    mixed[1].aircraft_type = Some(" b738".into());
    let detection = detect_conflicts(mixed, &by_type, &AtomicBool::new(false)).unwrap();
    assert_eq!(detection.report.candidates, 2);
    assert_eq!(detection.events.len(), 1);
}

#[test]
fn one_second_apart_is_not_a_conflict() {
    let detection = run(vec![
        raw("A1B2C3", 0, 28.4294, -81.3089, 4000.0, "JBU101"),
        raw("D4E5F6", 1, 28.4294, -81.3089, 4000.0, "SWA202"),
    ]);
    assert_eq!(detection.report.candidates, 0);
    assert_eq!(detection.report.buckets, 2);
}

#[test]
fn burst_within_window_keeps_closest_entry() {
    let detection = run(vec![
        raw("A1B2C3", 1, 28.4294, -81.3089, 4000.0, "JBU101"),
        raw("D4E5F6", 1, 28.4300, -81.3089, 4200.0, "SWA202"),
        raw("A1B2C3", 3, 28.4294, -81.3089, 4000.0, "JBU101"),
        raw("D4E5F6", 3, 28.4296, -81.3089, 4300.0, "SWA202"),
        raw("A1B2C3", 9, 28.4294, -81.3089, 4000.0, "JBU101"),
        raw("D4E5F6", 9, 28.4298, -81.3089, 4000.0, "SWA202"),
    ]);

    assert_eq!(detection.report.candidates, 6);
    assert_eq!(detection.events.len(), 1);
    let event = &detection.events[0];
    assert_eq!(event.time_window, BASE);
    assert_eq!(event.candidate.time_a.timestamp(), BASE + 3);
    assert_eq!(event.candidate.vertical_distance_ft, 300.0);
}

#[test]
fn altitude_of_exactly_700_is_dropped() {
    let detection = run(vec![
        raw("A1B2C3", 0, 28.4294, -81.3089, 700.0, "JBU101"),
        raw("D4E5F6", 0, 28.4294, -81.3089, 701.0, "SWA202"),
    ]);
    assert_eq!(detection.records.len(), 1);
    assert_eq!(detection.records[0].aircraft_id, "D4E5F6");
    assert!(detection.events.is_empty());
}

#[test]
fn empty_table_gives_empty_results() {
    let detection = run(Vec::new());
    assert!(detection.records.is_empty());
    assert_eq!(detection.report.candidates, 0);
    assert!(detection.events.is_empty());
}

#[test]
fn distinct_pairs_in_one_bucket_are_reported_separately() {
    let detection = run(vec![
        raw("AAA001", 0, 28.4294, -81.3089, 4000.0, "F1"),
        raw("BBB002", 0, 28.4295, -81.3089, 4100.0, "F2"),
        raw("CCC003", 0, 28.4296, -81.3089, 4200.0, "F3"),
        raw("000000", 0, 28.4294, -81.3089, 4000.0, "F4"),
    ]);
    assert_eq!(detection.report.sanitize.sentinel_id, 1);
    let pairs: Vec<String> = detection
        .events
        .iter()
        .map(|event| event.aircraft_pair().to_string())
        .collect();
    assert_eq!(pairs, vec!["AAA001|BBB002", "AAA001|CCC003", "BBB002|CCC003"]);
}
