//! Run configuration, built once and passed to every component.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tracker::{Channel, GATED_COST, Rect};

/// Settings for one monitored lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Image region belonging to this lane
    pub region: Rect,
    /// First assigned number handed out in this lane
    pub starting_number: u32,
    /// Velocity given to freshly created tracks, in pixels per frame
    pub initial_velocity: [f32; 2],
    /// Assigned numbers whose exit triggers actuation
    pub sorting_subsequence: BTreeSet<u32>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            region: Rect::new(820.0, 100.0, 200.0, 900.0),
            starting_number: 1,
            initial_velocity: [0.0, -20.0],
            sorting_subsequence: BTreeSet::from([1, 8]),
        }
    }
}

impl ChannelConfig {
    pub fn initial_velocity(&self) -> Vector2<f32> {
        Vector2::new(self.initial_velocity[0], self.initial_velocity[1])
    }

    fn default_b() -> Self {
        Self {
            region: Rect::new(1130.0, 100.0, 250.0, 900.0),
            starting_number: 1001,
            initial_velocity: [0.0, -20.0],
            sorting_subsequence: BTreeSet::from([1001, 1002]),
        }
    }
}

/// Configuration for the multi-object tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Smallest blob area considered an object
    pub min_area_threshold: u32,
    /// Maximum predicted-to-detection distance for a match
    pub gating_distance: f32,
    /// Misses tolerated before a track is retired
    pub max_missed_frames: u32,
    /// Weight of the previous velocity when blending in a new displacement
    pub velocity_smoothing: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_area_threshold: 2750,
            gating_distance: 100.0,
            max_missed_frames: 5,
            velocity_smoothing: 0.5,
        }
    }
}

/// Full configuration of a sorting line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SorterConfig {
    pub channel_a: ChannelConfig,
    pub channel_b: ChannelConfig,
    pub tracker: TrackerConfig,
    /// Delay between a qualifying exit and its actuation
    pub action_delay_ms: u64,
    /// Nominal frame rate, used for speed statistics
    pub fps: f32,
    pub min_track_length_for_stats: usize,
    pub trim_frames_from_ends: usize,
    /// Worker threads; derived from the host when unset
    pub worker_count: Option<usize>,
    /// How long the orchestrator waits for a result before rechecking timers
    pub poll_interval_ms: u64,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            channel_a: ChannelConfig::default(),
            channel_b: ChannelConfig::default_b(),
            tracker: TrackerConfig::default(),
            action_delay_ms: 500,
            fps: 30.0,
            min_track_length_for_stats: 20,
            trim_frames_from_ends: 10,
            worker_count: None,
            poll_interval_ms: 5,
        }
    }
}

impl SorterConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn channel(&self, channel: Channel) -> &ChannelConfig {
        match channel {
            Channel::A => &self.channel_a,
            Channel::B => &self.channel_b,
        }
    }

    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.action_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Configured worker count, or the host's parallelism minus two (at least one).
    pub fn workers(&self) -> usize {
        self.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(2))
                .unwrap_or(1)
        })
        .max(1)
    }

    /// Reject degenerate settings before anything starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for channel in Channel::ALL {
            let region = self.channel(channel).region;
            if region.is_degenerate() {
                return Err(ConfigError::DegenerateRegion {
                    channel,
                    width: region.width,
                    height: region.height,
                });
            }
        }
        if self.channel_a.region.intersects(&self.channel_b.region) {
            return Err(ConfigError::OverlappingRegions);
        }

        let tracker = &self.tracker;
        if !(tracker.gating_distance > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "gating_distance",
            });
        }
        if tracker.gating_distance as f64 >= GATED_COST {
            return Err(ConfigError::GatingTooLarge(tracker.gating_distance));
        }
        if tracker.min_area_threshold == 0 {
            return Err(ConfigError::NonPositive {
                field: "min_area_threshold",
            });
        }
        if !(0.0..=1.0).contains(&tracker.velocity_smoothing) {
            return Err(ConfigError::InvalidSmoothing(tracker.velocity_smoothing));
        }
        if !(self.fps > 0.0) {
            return Err(ConfigError::NonPositive { field: "fps" });
        }
        if self.worker_count == Some(0) {
            return Err(ConfigError::NonPositive {
                field: "worker_count",
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::NonPositive {
                field: "poll_interval_ms",
            });
        }
        Ok(())
    }
}
