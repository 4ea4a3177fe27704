//! Multi-object tracking and delayed actuation for camera-driven sorting lines.
//!
//! Objects moving through two monitored lanes are detected on a pool of worker
//! threads, re-ordered into capture order, and tracked with gated optimal
//! assignment. Each object gets a sequential number within its lane; when a
//! configured number leaves the lane an actuation signal is fired after a delay.
//!
//! ```ignore
//! use sortline::{NullActuator, SorterConfig, SortingPipeline};
//!
//! let pipeline = SortingPipeline::new(MyDetector::new(), SorterConfig::default())?;
//! let summary = pipeline.run(camera, &mut NullActuator, |report| {
//!     render(&report.image, &report.tracks);
//! })?;
//! ```

pub mod action;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod stats;
pub mod tracker;

pub use action::{ActionScheduler, Actuator, NullActuator, PendingAction, WriterActuator, dispatch};
pub use config::{ChannelConfig, SorterConfig, TrackerConfig};
pub use error::{ActuatorError, ConfigError, PipelineError, SourceError};
pub use pipeline::{
    BlobDetector, DetectionBuilder, FrameReport, FrameSource, IterSource, RunSummary,
    SortingLine, SortingPipeline, StopHandle,
};
pub use stats::{StatsAggregator, TrackSummary, TrackingStatsRow};
pub use tracker::{Channel, Detection, ExitEvent, MultiTracker, Rect, Track, TrackState};
