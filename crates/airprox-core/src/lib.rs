pub mod error;
pub mod grouper;
pub mod models;
pub mod pipeline;
pub mod rules;
pub mod sanitize;
pub mod scanner;
pub mod spatial;

pub use error::DetectError;
pub use grouper::{time_window, ConflictGrouper};
pub use models::{AircraftPair, ConflictCandidate, ConflictEvent, PositionRecord, RawRecord};
pub use pipeline::{detect_conflicts, Detection, DetectionReport};
pub use rules::{DetectionRules, SameIdentityExclusion};
pub use sanitize::{sanitize_records, SanitizeReport, Sanitized};
pub use scanner::{partition_by_second, ProximityScanner, ScanOutcome};
pub use spatial::FEET_PER_MILE;
