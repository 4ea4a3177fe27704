//! Persistent identity of one object across frames.

use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::Vector2;

use crate::tracker::channel::Channel;
use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Global track ID counter, unique for the lifetime of the process.
static TRACK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Get the next unique track ID.
fn next_unique_id() -> u64 {
    TRACK_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Display colour as RGB.
pub type Rgb = [u8; 3];

/// Fixed round-robin palette handed to new tracks.
pub const PALETTE: [Rgb; 12] = [
    [255, 0, 0],
    [0, 255, 0],
    [0, 0, 255],
    [255, 255, 0],
    [0, 255, 255],
    [255, 0, 255],
    [128, 0, 0],
    [0, 128, 0],
    [0, 0, 128],
    [128, 128, 0],
    [0, 128, 128],
    [128, 0, 128],
];

/// Single tracked object.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Process-wide unique identifier
    pub unique_id: u64,
    /// Lane the track was born in; never changes
    pub channel: Channel,
    /// Sequential number within the channel
    pub assigned_number: u32,
    /// Last known (or extrapolated) centroid
    pub centroid: Vector2<f32>,
    /// Smoothed per-frame displacement
    pub velocity: Vector2<f32>,
    pub color: Rgb,
    /// Consecutive frames without a matching detection
    pub missed_frames: u32,
    /// Label of the detection matched this frame, if any
    pub last_label_id: Option<u32>,
    pub last_bbox: Rect,
    pub state: TrackState,
    /// Frame the track was created in
    pub start_frame: u64,
    /// Frame the track was last matched in
    pub frame_id: u64,
}

impl Track {
    /// Create a new track from an unmatched detection.
    pub(crate) fn new(
        det: &Detection,
        channel: Channel,
        assigned_number: u32,
        velocity: Vector2<f32>,
        color: Rgb,
        frame_id: u64,
    ) -> Self {
        Self {
            unique_id: next_unique_id(),
            channel,
            assigned_number,
            centroid: det.centroid,
            velocity,
            color,
            missed_frames: 0,
            last_label_id: Some(det.label_id),
            last_bbox: det.bbox,
            state: TrackState::Active,
            start_frame: frame_id,
            frame_id,
        }
    }

    /// Position the track is expected at in the next frame.
    #[inline]
    pub fn predicted(&self) -> Vector2<f32> {
        self.centroid + self.velocity
    }

    /// Whether the track was matched in the latest frame.
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.missed_frames == 0
    }

    /// Absorb a matched detection. `smoothing` weighs the previous velocity.
    pub(crate) fn update(&mut self, det: &Detection, smoothing: f32, frame_id: u64) {
        let displacement = det.centroid - self.centroid;
        self.velocity = self.velocity * smoothing + displacement * (1.0 - smoothing);
        self.centroid = det.centroid;
        self.missed_frames = 0;
        self.last_label_id = Some(det.label_id);
        self.last_bbox = det.bbox;
        self.state = TrackState::Active;
        self.frame_id = frame_id;
    }

    /// Age an unmatched track by one frame, coasting while still alive.
    pub(crate) fn mark_missed(&mut self, max_missed_frames: u32) {
        self.missed_frames += 1;
        if self.missed_frames <= max_missed_frames {
            self.centroid += self.velocity;
        }
        self.last_label_id = None;
        self.state = TrackState::Coasting;
    }

    #[inline]
    pub(crate) fn is_expired(&self, max_missed_frames: u32) -> bool {
        self.missed_frames > max_missed_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn det(x: f32, y: f32) -> Detection {
        Detection::new(7, Vector2::new(x, y), Rect::new(x - 5.0, y - 5.0, 10.0, 10.0), 100)
    }

    #[test]
    fn test_update_blends_velocity() {
        let mut track = Track::new(&det(100.0, 500.0), Channel::A, 1, Vector2::new(0.0, -20.0), PALETTE[0], 0);
        track.update(&det(100.0, 470.0), 0.5, 1);

        assert_relative_eq!(track.velocity.y, -25.0);
        assert_relative_eq!(track.velocity.x, 0.0);
        assert_eq!(track.centroid, Vector2::new(100.0, 470.0));
        assert_eq!(track.frame_id, 1);
        assert_eq!(track.state, TrackState::Active);
    }

    #[test]
    fn test_mark_missed_coasts_until_limit() {
        let mut track = Track::new(&det(0.0, 100.0), Channel::A, 1, Vector2::new(0.0, -10.0), PALETTE[0], 0);
        track.mark_missed(1);
        assert_eq!(track.centroid, Vector2::new(0.0, 90.0));
        assert_eq!(track.last_label_id, None);
        assert_eq!(track.state, TrackState::Coasting);
        assert!(!track.is_expired(1));

        track.mark_missed(1);
        // Past the limit the position is frozen.
        assert_eq!(track.centroid, Vector2::new(0.0, 90.0));
        assert!(track.is_expired(1));
    }

    #[test]
    fn test_unique_ids_increase() {
        let a = Track::new(&det(0.0, 0.0), Channel::A, 1, Vector2::zeros(), PALETTE[0], 0);
        let b = Track::new(&det(0.0, 0.0), Channel::B, 1, Vector2::zeros(), PALETTE[1], 0);
        assert!(b.unique_id > a.unique_id);
    }
}
