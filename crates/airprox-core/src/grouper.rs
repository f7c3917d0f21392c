//! Reduction of raw candidates into one event per pair and time window.
//!
//! Within a `(aircraft_pair, time_window)` group the representative is the
//! candidate with the smallest horizontal distance, then the smallest
//! vertical distance, then the earliest position in the input sequence.
//! That is exactly "stable sort by (horizontal, vertical), take first", but
//! computed as a keyed min-reduction so shards can be folded in parallel
//! and merged in any order.

use std::cmp::Ordering;
use std::collections::HashMap;

use rayon::prelude::*;
use tracing::info;

use crate::error::DetectError;
use crate::models::{AircraftPair, ConflictCandidate, ConflictEvent};
use crate::rules::DetectionRules;

/// Start of the deduplication window containing `time_seconds`.
///
/// Floors toward negative infinity so pre-epoch instants stay in the
/// window that starts at or before them.
pub fn time_window(time_seconds: i64, window_seconds: u64) -> i64 {
    let width = i64::try_from(window_seconds).unwrap_or(i64::MAX).max(1);
    time_seconds.div_euclid(width) * width
}

/// Widest window whose width still fits in epoch seconds.
pub const MAX_WINDOW_SECONDS: u64 = i64::MAX as u64;

type GroupKey = (AircraftPair, i64);

#[derive(Clone, Copy)]
struct Ranked<'a> {
    seq: usize,
    candidate: &'a ConflictCandidate,
}

impl Ranked<'_> {
    fn cmp_rank(&self, other: &Self) -> Ordering {
        self.candidate
            .horizontal_distance_ft
            .total_cmp(&other.candidate.horizontal_distance_ft)
            .then(
                self.candidate
                    .vertical_distance_ft
                    .total_cmp(&other.candidate.vertical_distance_ft),
            )
            .then(self.seq.cmp(&other.seq))
    }
}

fn offer<'a>(groups: &mut HashMap<GroupKey, Ranked<'a>>, key: GroupKey, entry: Ranked<'a>) {
    groups
        .entry(key)
        .and_modify(|best| {
            if entry.cmp_rank(best) == Ordering::Less {
                *best = entry;
            }
        })
        .or_insert(entry);
}

#[derive(Debug, Clone)]
pub struct ConflictGrouper {
    time_window_seconds: u64,
}

impl ConflictGrouper {
    pub fn new(time_window_seconds: u64) -> Result<Self, DetectError> {
        if time_window_seconds == 0 || time_window_seconds > MAX_WINDOW_SECONDS {
            return Err(DetectError::InvalidRules(format!(
                "time_window_seconds must be between 1 and {}, got {}",
                MAX_WINDOW_SECONDS, time_window_seconds
            )));
        }
        Ok(Self { time_window_seconds })
    }

    pub fn from_rules(rules: &DetectionRules) -> Result<Self, DetectError> {
        Self::new(rules.time_window_seconds)
    }

    /// Reduce candidates to events, ordered by time window then pair.
    pub fn group(&self, candidates: &[ConflictCandidate]) -> Vec<ConflictEvent> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let window = self.time_window_seconds;
        let groups: HashMap<GroupKey, Ranked<'_>> = candidates
            .par_iter()
            .enumerate()
            .fold(HashMap::new, |mut acc, (seq, candidate)| {
                let key = (
                    candidate.aircraft_pair.clone(),
                    time_window(candidate.time_seconds(), window),
                );
                offer(&mut acc, key, Ranked { seq, candidate });
                acc
            })
            .reduce(HashMap::new, |mut left, right| {
                for (key, entry) in right {
                    offer(&mut left, key, entry);
                }
                left
            });

        let mut events: Vec<ConflictEvent> = groups
            .into_iter()
            .map(|((_, time_window), best)| ConflictEvent {
                candidate: best.candidate.clone(),
                time_window,
            })
            .collect();
        events.sort_by(|a, b| {
            a.time_window
                .cmp(&b.time_window)
                .then_with(|| a.candidate.aircraft_pair.cmp(&b.candidate.aircraft_pair))
        });

        info!(
            "Grouped {} candidate(s) into {} conflict event(s) ({}s windows)",
            candidates.len(),
            events.len(),
            window
        );

        events
    }
}
