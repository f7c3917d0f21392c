//! Errors raised by the detection core.
//!
//! Dropped rows and empty results are not errors; see `SanitizeReport`
//! and the empty `Vec`s returned by the scanner and grouper.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DetectError {
    #[error("invalid detection rules: {0}")]
    InvalidRules(String),

    /// Interrupted between time buckets. Partial candidates are discarded.
    #[error("scan cancelled after {buckets_done} of {buckets_total} time buckets")]
    Cancelled {
        buckets_done: usize,
        buckets_total: usize,
    },
}
