//! Matching utilities for multi-object tracking.

use nalgebra::Vector2;
use ndarray::Array2;

use crate::tracker::rect::Rect;

/// Cost given to pairings beyond the gating distance, and to padding cells.
pub const GATED_COST: f64 = 1e6;

/// Blob reported by the detector for a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Connected-component label within the frame
    pub label_id: u32,
    /// Centroid in image pixels
    pub centroid: Vector2<f32>,
    /// Bounding box of the blob
    pub bbox: Rect,
    /// Pixel count of the blob
    pub area: u32,
}

impl Detection {
    pub fn new(label_id: u32, centroid: Vector2<f32>, bbox: Rect, area: u32) -> Self {
        Self {
            label_id,
            centroid,
            bbox,
            area,
        }
    }

    /// Detection whose centroid is the centre of `bbox`.
    pub fn from_rect(label_id: u32, bbox: Rect, area: u32) -> Self {
        Self {
            label_id,
            centroid: bbox.center(),
            bbox,
            area,
        }
    }
}

/// Compute the gated euclidean cost matrix between predicted track positions and detections.
///
/// Any distance at or beyond `gating_distance` is replaced by [`GATED_COST`].
pub fn distance_cost(
    predictions: &[Vector2<f32>],
    detections: &[&Detection],
    gating_distance: f32,
) -> Array2<f64> {
    let mut costs = Array2::from_elem((predictions.len(), detections.len()), GATED_COST);
    for (i, p) in predictions.iter().enumerate() {
        for (j, d) in detections.iter().enumerate() {
            let dist = (p - d.centroid).norm() as f64;
            if dist < gating_distance as f64 {
                costs[[i, j]] = dist;
            }
        }
    }
    costs
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Optimal assignment over `cost_matrix`, accepting only pairs strictly below `thresh`.
///
/// The matrix is padded square with [`GATED_COST`]; pairings landing on padding or on
/// gated cells are reported as unmatched on both sides.
pub fn linear_assignment(cost_matrix: &Array2<f64>, thresh: f64) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    let all_unmatched = || AssignmentResult {
        matches: vec![],
        unmatched_tracks: (0..num_rows).collect(),
        unmatched_detections: (0..num_cols).collect(),
    };

    if num_rows == 0 || num_cols == 0 {
        return all_unmatched();
    }

    // Nothing can be accepted; skip the solver.
    if !cost_matrix.iter().any(|&c| c < thresh) {
        return all_unmatched();
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), GATED_COST);
    for i in 0..num_rows {
        for j in 0..num_cols {
            padded[[i, j]] = cost_matrix[[i, j]];
        }
    }

    let mut matches = vec![];
    let mut unmatched_tracks = vec![];
    let mut unmatched_detections_mask: Vec<bool> = vec![true; num_cols];

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (row_idx, &col_idx) in row_to_col.iter().enumerate().take(num_rows) {
                if col_idx < num_cols && cost_matrix[[row_idx, col_idx]] < thresh {
                    matches.push((row_idx, col_idx));
                    unmatched_detections_mask[col_idx] = false;
                } else {
                    unmatched_tracks.push(row_idx);
                }
            }
        }
        Err(_) => {
            tracing::warn!("assignment solver failed on {size}x{size} matrix, leaving frame unmatched");
            return all_unmatched();
        }
    }

    let unmatched_detections: Vec<usize> = unmatched_detections_mask
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| if u { Some(i) } else { None })
        .collect();

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}
