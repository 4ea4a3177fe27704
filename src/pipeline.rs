//! Concurrent frame pipeline: ingestion, parallel detection, in-order delivery.
//!
//! Frames flow one way through the stages:
//!
//! ```text
//! FrameSource ─▶ input queue ─▶ workers (BlobDetector) ─▶ output queue
//!                                                            │
//!                    SortingLine: Sequencer ─▶ MultiTracker ─▶ ActionScheduler
//!                                                    └──────▶ StatsAggregator
//! ```
//!
//! Only the two queues and a handful of atomic flags are shared between threads.
//! Everything downstream of the sequencer runs on the calling thread.

mod builder;
mod detector;
mod line;
mod queue;
mod sequencer;
mod sorting_pipeline;
mod worker;

pub use builder::DetectionBuilder;
pub use detector::{BlobDetector, FrameSource, IterSource};
pub use line::{FrameReport, RunSummary, SortingLine};
pub use queue::BlockingQueue;
pub use sequencer::Sequencer;
pub use sorting_pipeline::{SortingPipeline, StopHandle};
pub use worker::{Frame, FrameResult, Task, process_frame, run_worker};
