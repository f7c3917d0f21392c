//! Detection thresholds and filtering policy.

use serde::{Deserialize, Serialize};

use crate::error::DetectError;
use crate::grouper::MAX_WINDOW_SECONDS;
use crate::models::PositionRecord;
use crate::spatial::FEET_PER_MILE;

/// Which normalized field, when equal on both records, suppresses a match.
///
/// Equal flight identifiers usually mean the same flight reported twice
/// under different transponder addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameIdentityExclusion {
    #[default]
    FlightId,
    AircraftType,
    Disabled,
}

impl SameIdentityExclusion {
    pub fn excludes(self, a: &PositionRecord, b: &PositionRecord) -> bool {
        match self {
            Self::FlightId => a.flight_id == b.flight_id,
            Self::AircraftType => a.aircraft_type == b.aircraft_type,
            Self::Disabled => false,
        }
    }
}

/// Configuration for conflict detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionRules {
    /// Maximum horizontal separation (feet) that counts as a conflict
    pub horizontal_threshold_ft: f64,
    /// Maximum vertical separation (feet) that counts as a conflict
    pub vertical_threshold_ft: f64,
    /// Width of the deduplication window in seconds
    pub time_window_seconds: u64,
    /// Flat-earth conversion applied to both latitude and longitude degrees
    pub miles_per_degree: f64,
    /// Records must be strictly above this altitude (feet)
    pub min_altitude_ft: f64,
    /// Transponder address used by ground equipment and test targets
    pub sentinel_aircraft_id: String,
    /// Decimal places kept on latitude/longitude
    pub coordinate_decimals: u32,
    pub same_identity_exclusion: SameIdentityExclusion,
    /// Buckets with at least this many records use the grid index
    pub spatial_index_min_bucket: usize,
}

impl Default for DetectionRules {
    fn default() -> Self {
        Self {
            horizontal_threshold_ft: 500.0,
            vertical_threshold_ft: 500.0,
            time_window_seconds: 10,
            miles_per_degree: 69.0,
            min_altitude_ft: 700.0,
            sentinel_aircraft_id: "000000".to_string(),
            coordinate_decimals: 4,
            same_identity_exclusion: SameIdentityExclusion::FlightId,
            spatial_index_min_bucket: 64,
        }
    }
}

impl DetectionRules {
    pub fn validate(&self) -> Result<(), DetectError> {
        if !self.horizontal_threshold_ft.is_finite() || self.horizontal_threshold_ft < 0.0 {
            return Err(DetectError::InvalidRules(format!(
                "horizontal_threshold_ft must be finite and >= 0, got {}",
                self.horizontal_threshold_ft
            )));
        }
        if !self.vertical_threshold_ft.is_finite() || self.vertical_threshold_ft < 0.0 {
            return Err(DetectError::InvalidRules(format!(
                "vertical_threshold_ft must be finite and >= 0, got {}",
                self.vertical_threshold_ft
            )));
        }
        if self.time_window_seconds == 0 || self.time_window_seconds > MAX_WINDOW_SECONDS {
            return Err(DetectError::InvalidRules(format!(
                "time_window_seconds must be between 1 and {}, got {}",
                MAX_WINDOW_SECONDS, self.time_window_seconds
            )));
        }
        if !self.miles_per_degree.is_finite() || self.miles_per_degree <= 0.0 {
            return Err(DetectError::InvalidRules(format!(
                "miles_per_degree must be finite and > 0, got {}",
                self.miles_per_degree
            )));
        }
        if !self.min_altitude_ft.is_finite() {
            return Err(DetectError::InvalidRules(
                "min_altitude_ft must be finite".to_string(),
            ));
        }
        // 10^15 still fits in the f64 mantissa.
        if self.coordinate_decimals > 15 {
            return Err(DetectError::InvalidRules(format!(
                "coordinate_decimals must be <= 15, got {}",
                self.coordinate_decimals
            )));
        }
        Ok(())
    }

    pub fn horizontal_threshold_miles(&self) -> f64 {
        self.horizontal_threshold_ft / FEET_PER_MILE
    }

    /// Horizontal threshold expressed in (flat) degrees.
    pub fn horizontal_threshold_deg(&self) -> f64 {
        self.horizontal_threshold_miles() / self.miles_per_degree
    }
}
