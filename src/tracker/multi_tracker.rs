//! Per-channel gated assignment tracker.

use std::collections::{BTreeMap, HashSet};

use nalgebra::Vector2;

use crate::config::{SorterConfig, TrackerConfig};
use crate::tracker::channel::{Channel, ChannelState};
use crate::tracker::matching::{self, AssignmentResult, Detection};
use crate::tracker::track::{PALETTE, Track};

/// Emitted once when a track is retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitEvent {
    pub unique_id: u64,
    pub channel: Channel,
    pub assigned_number: u32,
    /// Frame in which the track was retired
    pub frame_id: u64,
    /// Whether the assigned number is in the channel's sorting subsequence
    pub sort: bool,
}

/// What changed in a single tracker step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerUpdate {
    pub exits: Vec<ExitEvent>,
    /// Unique ids of tracks created this frame, in creation order
    pub created: Vec<u64>,
}

pub struct MultiTracker {
    /// Keyed by unique id so iteration order is reproducible
    tracks: BTreeMap<u64, Track>,
    channels: [ChannelState; 2],
    config: TrackerConfig,
    color_index: usize,
    frame_count: u64,
}

impl MultiTracker {
    pub fn new(config: &SorterConfig) -> Self {
        Self {
            tracks: BTreeMap::new(),
            channels: [
                ChannelState::new(config.channel_a.clone()),
                ChannelState::new(config.channel_b.clone()),
            ],
            config: config.tracker.clone(),
            color_index: 0,
            frame_count: 0,
        }
    }

    /// Advance every channel by one frame.
    pub fn update(&mut self, frame_id: u64, detections: &[Detection]) -> TrackerUpdate {
        self.frame_count += 1;
        let mut update = TrackerUpdate::default();
        for channel in Channel::ALL {
            self.update_channel(channel, frame_id, detections, &mut update);
        }
        update
    }

    fn update_channel(
        &mut self,
        channel: Channel,
        frame_id: u64,
        detections: &[Detection],
        update: &mut TrackerUpdate,
    ) {
        let region = self.channels[channel.index()].config.region;

        // Step 1: Detections of sufficient size inside the lane
        let channel_dets: Vec<&Detection> = detections
            .iter()
            .filter(|d| d.area >= self.config.min_area_threshold && region.contains(&d.centroid))
            .collect();

        // Step 2: Candidate tracks, ordered by unique id
        let candidate_ids: Vec<u64> = self
            .tracks
            .values()
            .filter(|t| t.channel == channel && region.contains(&t.centroid))
            .map(|t| t.unique_id)
            .collect();

        // Step 3: Gated cost matrix against predicted positions
        let predictions: Vec<Vector2<f32>> = candidate_ids
            .iter()
            .map(|id| self.tracks[id].predicted())
            .collect();
        let costs = matching::distance_cost(&predictions, &channel_dets, self.config.gating_distance);

        // Step 4: Optimal assignment, rejecting gated and padded pairs
        let AssignmentResult {
            matches,
            unmatched_detections,
            ..
        } = matching::linear_assignment(&costs, self.config.gating_distance as f64);

        tracing::trace!(
            %channel,
            frame_id,
            tracks = candidate_ids.len(),
            detections = channel_dets.len(),
            matched = matches.len(),
            "associated"
        );

        // Step 5: Refresh matched tracks
        let mut matched: HashSet<u64> = HashSet::with_capacity(matches.len());
        for (itrack, idet) in matches {
            let id = candidate_ids[itrack];
            if let Some(track) = self.tracks.get_mut(&id) {
                track.update(channel_dets[idet], self.config.velocity_smoothing, frame_id);
                matched.insert(id);
            }
        }

        // Step 6: Age every other track of this lane
        for track in self.tracks.values_mut() {
            if track.channel == channel && !matched.contains(&track.unique_id) {
                track.mark_missed(self.config.max_missed_frames);
            }
        }

        // Step 7: Births
        let state = &mut self.channels[channel.index()];
        let velocity = state.config.initial_velocity();
        for idet in unmatched_detections {
            let Some(number) = state.next_number() else {
                tracing::warn!(%channel, frame_id, "assigned numbers exhausted, detection not tracked");
                continue;
            };
            let det = channel_dets[idet];
            let color = PALETTE[self.color_index % PALETTE.len()];
            self.color_index += 1;
            let track = Track::new(det, channel, number, velocity, color, frame_id);
            tracing::debug!(
                %channel,
                unique_id = track.unique_id,
                assigned_number = track.assigned_number,
                x = track.centroid.x,
                y = track.centroid.y,
                "track created"
            );
            update.created.push(track.unique_id);
            self.tracks.insert(track.unique_id, track);
        }

        // Step 8: Retire tracks that have been missing too long
        let max_missed = self.config.max_missed_frames;
        let expired: Vec<u64> = self
            .tracks
            .values()
            .filter(|t| t.channel == channel && t.is_expired(max_missed))
            .map(|t| t.unique_id)
            .collect();
        for id in expired {
            if let Some(track) = self.tracks.remove(&id) {
                state.record_exit();
                let sort = state.sorting_subsequence().contains(&track.assigned_number);
                tracing::debug!(
                    %channel,
                    unique_id = id,
                    assigned_number = track.assigned_number,
                    sort,
                    "track exited"
                );
                update.exits.push(ExitEvent {
                    unique_id: id,
                    channel,
                    assigned_number: track.assigned_number,
                    frame_id,
                    sort,
                });
            }
        }
    }

    /// Every live track, ordered by unique id.
    pub fn tracks(&self) -> Vec<Track> {
        self.tracks.values().cloned().collect()
    }

    /// Tracks matched in the latest frame.
    pub fn active_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values().filter(|t| t.is_visible())
    }

    pub fn get(&self, unique_id: u64) -> Option<&Track> {
        self.tracks.get(&unique_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Number of tracks retired so far in `channel`.
    pub fn exit_count(&self, channel: Channel) -> u64 {
        self.channels[channel.index()].exits()
    }

    /// Frames processed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
