//! Error types shared across the crate.

use thiserror::Error;

use crate::tracker::Channel;

/// Rejected configuration. Raised before any thread is started.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("channel {channel} region has non-positive size ({width}x{height})")]
    DegenerateRegion {
        channel: Channel,
        width: f32,
        height: f32,
    },
    #[error("channel regions overlap; a detection could belong to both channels")]
    OverlappingRegions,
    #[error("`{field}` must be positive")]
    NonPositive { field: &'static str },
    #[error("velocity smoothing must lie in [0, 1], got {0}")]
    InvalidSmoothing(f32),
    #[error("gating distance {0} must be below the gated cost sentinel")]
    GatingTooLarge(f32),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure reported by a frame source.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// A single image could not be read. No sequence id is consumed.
    #[error("frame skipped: {0}")]
    Skipped(String),
    /// The source is gone for good.
    #[error("frame source unavailable: {0}")]
    Unavailable(String),
}

/// Failure writing an actuation signal.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("actuator unavailable: {0}")]
    Unavailable(String),
    #[error("actuator write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal pipeline failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("frame source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("a pipeline thread panicked")]
    WorkerPanicked,
}
