//! Cost matrix construction and minimum-cost assignment between tracks and
//! detections.

use ndarray::Array2;
use tracing::trace;

use crate::error::{Error, Result};
use crate::tracker::detection::Observation;
use crate::tracker::history::TrackHistory;
use crate::tracker::similarity::{AppearanceMetric, SimilarityScorer};

/// Sentinel cost for pairs that must never be accepted, whatever the
/// score threshold.
pub const AGED_COST: f64 = 1e6;

/// Cost of every cell in a padding row or column.
pub const PADDING_COST: f64 = 1.0;

/// Square cost matrix between the live tracks and one frame's detections.
///
/// Rows `0..row_ids.len()` belong to the identities in `row_ids`; any further
/// rows are padding. Columns `0..num_detections` are detections in frame
/// order; any further columns are padding.
#[derive(Debug, Clone)]
pub struct CostMatrix {
    pub costs: Array2<f64>,
    pub row_ids: Vec<u64>,
    pub num_detections: usize,
}

impl CostMatrix {
    /// Build the matrix for `frame`. Every identity in `history` that has not
    /// aged out gets a row, in ascending identity order; aged identities are
    /// left out, so the side is `max(live tracks, detections)`.
    pub fn build<M: AppearanceMetric>(
        history: &TrackHistory,
        observations: &[Observation],
        frame: u32,
        max_age: u32,
        scorer: &SimilarityScorer<M>,
    ) -> Self {
        let live: Vec<_> = history.live(frame, max_age).collect();
        let size = live.len().max(observations.len());
        let mut costs = Array2::from_elem((size, size), PADDING_COST);

        for (row, (_, entry)) in live.iter().enumerate() {
            for (col, obs) in observations.iter().enumerate() {
                let score = scorer.score(
                    &entry.latest.rect,
                    entry.histograms(),
                    &obs.detection.rect,
                    &obs.histogram,
                ) as f64;
                costs[[row, col]] = score.min(AGED_COST);
            }
        }

        Self {
            costs,
            row_ids: live.into_iter().map(|(id, _)| id).collect(),
            num_detections: observations.len(),
        }
    }

    pub fn size(&self) -> usize {
        self.costs.nrows()
    }

    /// Identity owning `row`, or `None` for a padding row.
    pub fn row_id(&self, row: usize) -> Option<u64> {
        self.row_ids.get(row).copied()
    }
}

/// Solve the square assignment problem, returning `(row, col)` pairs that
/// cover every row and every column exactly once.
pub fn solve_assignment(costs: &Array2<f64>) -> Result<Vec<(usize, usize)>> {
    let (rows, cols) = costs.dim();
    if rows != cols {
        return Err(Error::Assignment {
            size: rows.max(cols),
            reason: format!("matrix is {rows}x{cols}, not square"),
        });
    }
    if rows == 0 {
        return Ok(Vec::new());
    }

    let (row_to_col, _) = lapjv::lapjv(costs).map_err(|e| Error::Assignment {
        size: rows,
        reason: format!("{e:?}"),
    })?;

    Ok(row_to_col.into_iter().enumerate().collect())
}

/// Outcome of matching one frame's detections against the track history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    /// `(detection index, identity)` pairs accepted under the score threshold
    pub matches: Vec<(usize, u64)>,
    /// Detection indices that need a new identity, ascending
    pub unmatched_detections: Vec<usize>,
}

/// Solve `cost_matrix` and keep the pairs whose cost is at most `thresh`.
///
/// Pairs on padding columns are skipped. Pairs on padding rows, above the
/// threshold, or at [`AGED_COST`] leave their detection unmatched.
pub fn linear_assignment(cost_matrix: &CostMatrix, thresh: f32) -> Result<AssignmentResult> {
    let pairs = solve_assignment(&cost_matrix.costs)?;

    let mut matches = Vec::new();
    let mut unmatched_detections = Vec::new();
    for (row, col) in pairs {
        if col >= cost_matrix.num_detections {
            continue;
        }
        let cost = cost_matrix.costs[[row, col]];
        match cost_matrix.row_id(row) {
            Some(id) if cost <= thresh as f64 && cost < AGED_COST => {
                matches.push((col, id))
            }
            row_id => {
                trace!(detection = col, ?row_id, cost, "pair rejected");
                unmatched_detections.push(col);
            }
        }
    }

    matches.sort_unstable_by_key(|&(col, _)| col);
    unmatched_detections.sort_unstable();

    Ok(AssignmentResult {
        matches,
        unmatched_detections,
    })
}
