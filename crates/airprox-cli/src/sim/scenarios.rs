//! Pre-defined traffic scenarios for exercising the detector.

use std::sync::Arc;

use airprox_core::RawRecord;
use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;

use super::paths::{offset_feet, FlightPath, LinearPath};

const APPROACH_FT: f64 = 30_000.0;
const CRUISE_ALT_FT: f64 = 4_000.0;
const SPEED_KT: f64 = 180.0;

/// Spread between aircraft reporting in the same second.
const REPORT_STAGGER_MS: i64 = 137;

pub struct SimAircraft {
    pub aircraft_id: String,
    pub flight_id: String,
    pub aircraft_type: String,
    pub path: Arc<dyn FlightPath>,
}

/// A named scenario consisting of several aircraft with flight paths.
pub struct Scenario {
    pub name: String,
    pub aircraft: Vec<SimAircraft>,
}

impl Scenario {
    /// One report per aircraft per second for `duration_secs`.
    ///
    /// Aircraft report at staggered sub-second offsets. Each position is
    /// displaced by up to `jitter_ft` in a random direction.
    pub fn sample<R: Rng>(
        &self,
        start: DateTime<Utc>,
        duration_secs: u32,
        jitter_ft: f64,
        rng: &mut R,
    ) -> Vec<RawRecord> {
        let mut rows = Vec::with_capacity(duration_secs as usize * self.aircraft.len());
        for second in 0..i64::from(duration_secs) {
            for (slot, aircraft) in self.aircraft.iter().enumerate() {
                let offset_ms = (slot as i64 * REPORT_STAGGER_MS) % 1000;
                let t = second as f64 + offset_ms as f64 / 1000.0;
                let (mut lat, mut lon, alt) = aircraft.path.get_position(t);
                if jitter_ft > 0.0 {
                    let distance = rng.random_range(0.0..jitter_ft);
                    let bearing = rng.random_range(0.0..std::f64::consts::TAU);
                    (lat, lon) = offset_feet(lat, lon, distance, bearing);
                }

                rows.push(RawRecord {
                    primary_partition: "USA".to_string(),
                    secondary_partition: "Florida".to_string(),
                    timestamp: Some(
                        start + TimeDelta::seconds(second) + TimeDelta::milliseconds(offset_ms),
                    ),
                    aircraft_id: Some(aircraft.aircraft_id.clone()),
                    latitude: Some(lat),
                    longitude: Some(lon),
                    altitude_ft: Some(alt),
                    flight_id: Some(aircraft.flight_id.clone()),
                    aircraft_type: Some(aircraft.aircraft_type.clone()),
                });
            }
        }
        rows
    }
}

fn aircraft(index: usize, aircraft_type: &str, path: Arc<dyn FlightPath>) -> SimAircraft {
    SimAircraft {
        aircraft_id: format!("A{:05X}", 0xC0DE + index),
        flight_id: format!("SIM{:03}", index + 1),
        aircraft_type: aircraft_type.to_string(),
        path,
    }
}

/// Two aircraft crossing over the center at the same altitude.
///
/// - Aircraft 1: West to East
/// - Aircraft 2: South to North
pub fn create_crossing_scenario(center_lat: f64, center_lon: f64) -> Scenario {
    let leg = |from_deg: f64, to_deg: f64| -> Arc<dyn FlightPath> {
        let (start_lat, start_lon) =
            offset_feet(center_lat, center_lon, APPROACH_FT, from_deg.to_radians());
        let (end_lat, end_lon) =
            offset_feet(center_lat, center_lon, APPROACH_FT, to_deg.to_radians());
        Arc::new(LinearPath::new(
            start_lat,
            start_lon,
            end_lat,
            end_lon,
            CRUISE_ALT_FT,
            SPEED_KT,
        ))
    };

    Scenario {
        name: "crossing".to_string(),
        aircraft: vec![
            aircraft(0, "A320", leg(270.0, 90.0)),
            aircraft(1, "B738", leg(180.0, 0.0)),
        ],
    }
}

/// Two aircraft on parallel tracks 3000 ft apart (no conflict).
pub fn create_parallel_scenario(center_lat: f64, center_lon: f64) -> Scenario {
    let separation_ft = 3_000.0;
    let track = |lat: f64, lon: f64| -> Arc<dyn FlightPath> {
        let (start_lat, start_lon) = offset_feet(lat, lon, APPROACH_FT, 270.0_f64.to_radians());
        let (end_lat, end_lon) = offset_feet(lat, lon, APPROACH_FT, 90.0_f64.to_radians());
        Arc::new(LinearPath::new(
            start_lat,
            start_lon,
            end_lat,
            end_lon,
            CRUISE_ALT_FT,
            SPEED_KT,
        ))
    };
    let (north_lat, north_lon) = offset_feet(center_lat, center_lon, separation_ft, 0.0);

    Scenario {
        name: "parallel".to_string(),
        aircraft: vec![
            aircraft(0, "A320", track(center_lat, center_lon)),
            aircraft(1, "E175", track(north_lat, north_lon)),
        ],
    }
}

/// Four aircraft converging on the center from the cardinal directions,
/// stacked 200 ft apart in altitude.
pub fn create_converging_scenario(center_lat: f64, center_lon: f64) -> Scenario {
    let bearings: [f64; 4] = [0.0, 90.0, 180.0, 270.0];
    let types = ["A320", "B738", "CRJ9", "E175"];

    let aircraft = bearings
        .iter()
        .zip(types)
        .enumerate()
        .map(|(i, (&bearing, aircraft_type))| {
            let (start_lat, start_lon) =
                offset_feet(center_lat, center_lon, APPROACH_FT, bearing.to_radians());
            let path = Arc::new(LinearPath::new(
                start_lat,
                start_lon,
                center_lat,
                center_lon,
                CRUISE_ALT_FT + 200.0 * i as f64,
                SPEED_KT,
            )) as Arc<dyn FlightPath>;
            self::aircraft(i, aircraft_type, path)
        })
        .collect();

    Scenario {
        name: "converging".to_string(),
        aircraft,
    }
}
