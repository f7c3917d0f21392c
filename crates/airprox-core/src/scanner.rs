//! Same-instant proximity scan.
//!
//! Records are partitioned by whole-second timestamp and every record is
//! compared with the other records of its bucket. Buckets are independent
//! and scanned in parallel; each worker fills its own `Vec` and the results
//! are concatenated in bucket order once all workers finish.
//!
//! The scan is symmetric: a conflict between R and C is emitted once while
//! R scans and once while C scans. Duplicates are resolved by the grouper.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::DetectError;
use crate::models::{ConflictCandidate, PositionRecord};
use crate::rules::DetectionRules;
use crate::spatial::{degrees_to_miles, miles_to_feet, planar_distance_deg, BucketGrid};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub candidates: Vec<ConflictCandidate>,
    /// Number of distinct whole-second buckets scanned
    pub buckets: usize,
    /// Buckets large enough to use the grid index
    pub indexed_buckets: usize,
}

/// Group record indices by `time_seconds`, preserving table order within
/// each bucket.
pub fn partition_by_second(records: &[PositionRecord]) -> BTreeMap<i64, Vec<usize>> {
    let mut buckets: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        buckets.entry(record.time_seconds).or_default().push(idx);
    }
    buckets
}

/// Finds raw conflict candidates. Does not modify the record table.
pub struct ProximityScanner<'a> {
    rules: &'a DetectionRules,
}

impl<'a> ProximityScanner<'a> {
    pub fn new(rules: &'a DetectionRules) -> Self {
        Self { rules }
    }

    pub fn scan(&self, records: &[PositionRecord]) -> Result<ScanOutcome, DetectError> {
        self.scan_with_cancel(records, &AtomicBool::new(false))
    }

    /// Scan, checking `cancel` before each bucket. A cancelled scan returns
    /// `DetectError::Cancelled` and discards what was found so far.
    pub fn scan_with_cancel(
        &self,
        records: &[PositionRecord],
        cancel: &AtomicBool,
    ) -> Result<ScanOutcome, DetectError> {
        self.rules.validate()?;

        let buckets: Vec<(i64, Vec<usize>)> = partition_by_second(records).into_iter().collect();
        let buckets_total = buckets.len();
        let buckets_done = AtomicUsize::new(0);
        let indexed = AtomicUsize::new(0);

        let per_bucket: Result<Vec<Vec<ConflictCandidate>>, DetectError> = buckets
            .par_iter()
            .map(|(second, indices)| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(DetectError::Cancelled {
                        buckets_done: buckets_done.load(Ordering::Relaxed),
                        buckets_total,
                    });
                }
                let (found, used_grid) = self.scan_bucket(records, indices);
                if used_grid {
                    indexed.fetch_add(1, Ordering::Relaxed);
                }
                buckets_done.fetch_add(1, Ordering::Relaxed);
                if !found.is_empty() {
                    debug!(
                        "Bucket {} ({} records) produced {} candidate(s)",
                        second,
                        indices.len(),
                        found.len()
                    );
                }
                Ok(found)
            })
            .collect();

        let candidates: Vec<ConflictCandidate> = per_bucket?.into_iter().flatten().collect();

        info!(
            "Scanned {} records in {} time bucket(s): {} candidate(s)",
            records.len(),
            buckets_total,
            candidates.len()
        );

        Ok(ScanOutcome {
            candidates,
            buckets: buckets_total,
            indexed_buckets: indexed.into_inner(),
        })
    }

    /// Scan one bucket. Returns the candidates and whether the grid was used.
    fn scan_bucket(
        &self,
        records: &[PositionRecord],
        indices: &[usize],
    ) -> (Vec<ConflictCandidate>, bool) {
        let mut found = Vec::new();
        if indices.len() < 2 {
            return (found, false);
        }

        let threshold_deg = self.rules.horizontal_threshold_deg();
        let grid = if indices.len() >= self.rules.spatial_index_min_bucket {
            BucketGrid::build(
                indices
                    .iter()
                    .map(|&i| (i, records[i].latitude, records[i].longitude)),
                threshold_deg,
            )
        } else {
            None
        };

        let mut peers = Vec::new();
        for &i in indices {
            let scanning = &records[i];
            let peer_indices: &[usize] = match &grid {
                Some(grid) => {
                    grid.neighbours(scanning.latitude, scanning.longitude, &mut peers);
                    &peers
                }
                None => indices,
            };

            for &j in peer_indices {
                if j == i {
                    continue;
                }
                if let Some(candidate) = self.compare(scanning, &records[j], threshold_deg) {
                    found.push(candidate);
                }
            }
        }

        (found, grid.is_some())
    }

    fn compare(
        &self,
        scanning: &PositionRecord,
        other: &PositionRecord,
        threshold_deg: f64,
    ) -> Option<ConflictCandidate> {
        // Cheap latitude-only box before any distance math.
        if (scanning.latitude - other.latitude).abs() > threshold_deg {
            return None;
        }
        if scanning.aircraft_id == other.aircraft_id {
            return None;
        }
        if self.rules.same_identity_exclusion.excludes(scanning, other) {
            return None;
        }

        let distance_deg = planar_distance_deg(
            scanning.latitude,
            scanning.longitude,
            other.latitude,
            other.longitude,
        );
        let distance_miles = degrees_to_miles(distance_deg, self.rules.miles_per_degree);
        let vertical_ft = (scanning.altitude_ft - other.altitude_ft).abs();

        if distance_miles <= self.rules.horizontal_threshold_miles()
            && vertical_ft <= self.rules.vertical_threshold_ft
        {
            Some(ConflictCandidate::from_match(
                scanning,
                other,
                miles_to_feet(distance_miles),
                vertical_ft,
            ))
        } else {
            None
        }
    }
}
