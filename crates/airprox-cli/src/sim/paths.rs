//! Flight path implementations.
//!
//! Geometry is flat: one degree of latitude or longitude is the same
//! number of miles. That is the metric the detector measures with, so a
//! scenario placed N feet apart is detected as N feet apart.

use airprox_core::FEET_PER_MILE;

/// Feet per second in one knot.
pub const FPS_PER_KNOT: f64 = 1.687_81;

/// Miles per degree used for scenario placement.
pub const MILES_PER_DEGREE: f64 = 69.0;

/// Trait for flight path implementations.
pub trait FlightPath: Send + Sync {
    /// Get (lat, lon, altitude_ft) at time t seconds from start.
    fn get_position(&self, t: f64) -> (f64, f64, f64);
}

/// Move a point `distance_ft` along `bearing_rad` (0 = north).
pub fn offset_feet(lat: f64, lon: f64, distance_ft: f64, bearing_rad: f64) -> (f64, f64) {
    let deg = distance_ft / (MILES_PER_DEGREE * FEET_PER_MILE);
    (lat + deg * bearing_rad.cos(), lon + deg * bearing_rad.sin())
}

/// Straight line between two points at constant altitude and speed.
/// Holds the end point once reached.
pub struct LinearPath {
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
    pub altitude_ft: f64,
    /// Seconds from start to end point
    pub duration: f64,
}

impl LinearPath {
    pub fn new(
        start_lat: f64,
        start_lon: f64,
        end_lat: f64,
        end_lon: f64,
        altitude_ft: f64,
        speed_kt: f64,
    ) -> Self {
        let distance_ft = (end_lat - start_lat).hypot(end_lon - start_lon)
            * MILES_PER_DEGREE
            * FEET_PER_MILE;
        let speed_fps = speed_kt * FPS_PER_KNOT;
        let duration = if speed_fps > 0.0 {
            distance_ft / speed_fps
        } else {
            0.0
        };

        Self {
            start_lat,
            start_lon,
            end_lat,
            end_lon,
            altitude_ft,
            duration,
        }
    }
}

impl FlightPath for LinearPath {
    fn get_position(&self, t: f64) -> (f64, f64, f64) {
        let progress = if self.duration > 0.0 {
            (t / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let lat = self.start_lat + progress * (self.end_lat - self.start_lat);
        let lon = self.start_lon + progress * (self.end_lon - self.start_lon);

        (lat, lon, self.altitude_ft)
    }
}
