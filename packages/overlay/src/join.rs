//! Resolves population records to tract centroids.
//!
//! Records whose tract has no boundary, or whose population count cannot
//! be read, are returned as [`UnjoinedRecord`]s instead of being dropped
//! so callers can report the loss.

use serde::Serialize;
use visitor_map_boundary::BoundarySet;
use visitor_map_population_models::PopulationRecord;

/// A population observation placed at its tract's centroid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedPoint {
    /// Tract code.
    pub tract_id: String,
    /// Centroid latitude.
    pub latitude: f64,
    /// Centroid longitude.
    pub longitude: f64,
    /// Total living population, truncated to a whole count.
    pub weight: i64,
    /// `TOT_LVPOP_CO` as the API reported it.
    pub total_population: String,
}

/// Why a record could not be joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnjoinedReason {
    /// No boundary in the uploaded file has this tract code.
    NoMatchingTract,
    /// `TOT_LVPOP_CO` is not a number.
    InvalidWeight,
}

/// A record that was left out of the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnjoinedRecord {
    /// Tract code of the record.
    pub tract_id: String,
    /// Why it was left out.
    pub reason: UnjoinedReason,
}

/// Result of joining one hour of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOutcome {
    /// Joined points, in input order.
    pub joined: Vec<JoinedPoint>,
    /// Records that could not be joined, in input order.
    pub unjoined: Vec<UnjoinedRecord>,
}

/// Counts of a [`JoinOutcome`], for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinReport {
    /// Records placed on the map.
    pub joined: usize,
    /// Records whose tract has no boundary.
    pub no_matching_tract: usize,
    /// Records with an unreadable population count.
    pub invalid_weight: usize,
}

impl JoinOutcome {
    /// Summarizes the outcome.
    #[must_use]
    pub fn report(&self) -> JoinReport {
        let mut report = JoinReport {
            joined: self.joined.len(),
            ..JoinReport::default()
        };
        for record in &self.unjoined {
            match record.reason {
                UnjoinedReason::NoMatchingTract => report.no_matching_tract += 1,
                UnjoinedReason::InvalidWeight => report.invalid_weight += 1,
            }
        }
        report
    }

    /// `[lat, lng, weight]` triples of the joined points.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn heat_points(&self) -> Vec<[f64; 3]> {
        self.joined
            .iter()
            .map(|p| [p.latitude, p.longitude, p.weight as f64])
            .collect()
    }
}

/// Joins records to boundary centroids by exact tract code.
#[must_use]
pub fn join(records: &[PopulationRecord], boundaries: &BoundarySet) -> JoinOutcome {
    let mut outcome = JoinOutcome::default();

    for record in records {
        let Some(centroid) = boundaries.centroid(&record.tract_id) else {
            log::debug!("No boundary for tract {}", record.tract_id);
            outcome.unjoined.push(UnjoinedRecord {
                tract_id: record.tract_id.clone(),
                reason: UnjoinedReason::NoMatchingTract,
            });
            continue;
        };

        let Some(weight) = record.total_population_count() else {
            log::debug!(
                "Tract {} has unreadable population {:?}",
                record.tract_id,
                record.total_population
            );
            outcome.unjoined.push(UnjoinedRecord {
                tract_id: record.tract_id.clone(),
                reason: UnjoinedReason::InvalidWeight,
            });
            continue;
        };

        outcome.joined.push(JoinedPoint {
            tract_id: record.tract_id.clone(),
            latitude: centroid.latitude,
            longitude: centroid.longitude,
            weight,
            total_population: record.total_population.clone(),
        });
    }

    if !outcome.unjoined.is_empty() {
        let report = outcome.report();
        log::warn!(
            "{} of {} records left off the map ({} without boundary, {} invalid count)",
            outcome.unjoined.len(),
            records.len(),
            report.no_matching_tract,
            report.invalid_weight
        );
    }

    outcome
}
