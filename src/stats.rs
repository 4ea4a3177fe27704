//! End-of-run speed statistics per track.

use std::collections::BTreeMap;

use nalgebra::Vector2;
use serde::Serialize;

use crate::config::SorterConfig;
use crate::tracker::{Channel, Track};

/// One observation of a visible track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingStatsRow {
    pub frame: u64,
    pub channel: Channel,
    pub assigned_number: u32,
    pub unique_id: u64,
    pub centroid: Vector2<f32>,
}

/// Average speed of one track over its trimmed lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackSummary {
    pub assigned_number: u32,
    pub channel: Channel,
    /// Rows remaining after trimming
    pub frame_count: usize,
    pub speed_pixels_per_sec: f64,
}

#[derive(Debug, Clone)]
pub struct StatsAggregator {
    rows: Vec<TrackingStatsRow>,
    min_track_length: usize,
    trim: usize,
    fps: f32,
}

impl StatsAggregator {
    pub fn new(min_track_length: usize, trim: usize, fps: f32) -> Self {
        Self {
            rows: Vec::new(),
            min_track_length,
            trim,
            fps,
        }
    }

    pub fn from_config(config: &SorterConfig) -> Self {
        Self::new(
            config.min_track_length_for_stats,
            config.trim_frames_from_ends,
            config.fps,
        )
    }

    /// Record one row for every track visible in `frame`.
    ///
    /// Rows are kept for the whole run so [`summarize`](Self::summarize) can trim
    /// each track's ends. Call [`clear`](Self::clear) after summarizing to bound
    /// memory on endless streams.
    pub fn record<'a>(&mut self, frame: u64, tracks: impl IntoIterator<Item = &'a Track>) {
        self.rows.extend(tracks.into_iter().filter(|t| t.is_visible()).map(|t| {
            TrackingStatsRow {
                frame,
                channel: t.channel,
                assigned_number: t.assigned_number,
                unique_id: t.unique_id,
                centroid: t.centroid,
            }
        }));
    }

    pub fn rows(&self) -> &[TrackingStatsRow] {
        &self.rows
    }

    /// Drop every recorded row.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Speed summary of every track long enough to measure.
    ///
    /// Rows are grouped by `(assigned_number, channel)`, so lanes whose number
    /// ranges overlap still yield separate summaries. Output is ordered by that key.
    pub fn summarize(&self) -> Vec<TrackSummary> {
        let mut groups: BTreeMap<(u32, Channel), Vec<&TrackingStatsRow>> = BTreeMap::new();
        for row in &self.rows {
            groups
                .entry((row.assigned_number, row.channel))
                .or_default()
                .push(row);
        }

        let mut summaries = Vec::new();
        for ((assigned_number, channel), group) in groups {
            if group.len() < self.min_track_length
                || group.len() < self.trim.saturating_mul(2).saturating_add(2)
            {
                continue;
            }
            let trimmed = &group[self.trim..group.len() - self.trim];
            let (first, last) = (trimmed[0], trimmed[trimmed.len() - 1]);

            let distance = (last.centroid - first.centroid).norm() as f64;
            let elapsed = (last.frame as f64 - first.frame as f64) / self.fps as f64;
            let speed = if elapsed > 0.0 { distance / elapsed } else { 0.0 };

            summaries.push(TrackSummary {
                assigned_number,
                channel,
                frame_count: trimmed.len(),
                speed_pixels_per_sec: speed,
            });
        }
        summaries
    }
}
