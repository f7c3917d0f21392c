//! Synthetic traffic for exercising the detector end to end.

pub mod paths;
pub mod scenarios;

pub use paths::{offset_feet, FlightPath, LinearPath};
pub use scenarios::{
    create_converging_scenario, create_crossing_scenario, create_parallel_scenario, Scenario,
    SimAircraft,
};
