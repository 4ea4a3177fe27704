//! Detection workers.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::pipeline::detector::BlobDetector;
use crate::pipeline::queue::BlockingQueue;
use crate::tracker::{Detection, Rect};

/// Frame handed to the worker pool.
#[derive(Debug, Clone)]
pub struct Frame<I> {
    pub sequence_id: u64,
    pub image: I,
}

/// Unit of work on the input queue.
#[derive(Debug)]
pub enum Task<I> {
    Frame(Frame<I>),
    /// Reserved sentinel; one is pushed per worker at shutdown
    Stop,
}

/// Detector output for one frame.
#[derive(Debug, Clone)]
pub struct FrameResult<I> {
    pub sequence_id: u64,
    pub detections: Vec<Detection>,
    pub image: I,
    /// Set when detection failed and `detections` is an empty placeholder
    pub degraded: bool,
}

/// Run the detector over every channel region of one frame.
///
/// Blobs whose centroid lies outside the region they were reported for are dropped.
///
/// Never fails: detector errors and panics yield an empty placeholder so the
/// sequencer can move past this frame.
pub fn process_frame<D: BlobDetector>(detector: &D, regions: &[Rect], frame: Frame<D::Image>) -> FrameResult<D::Image> {
    let Frame { sequence_id, image } = frame;
    let mut detections = Vec::new();
    let mut degraded = false;

    for region in regions {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| detector.detect(&image, region)));
        match outcome {
            Ok(Ok(found)) => {
                detections.extend(found.into_iter().filter(|d| region.contains(&d.centroid)));
            }
            Ok(Err(err)) => {
                tracing::warn!(sequence_id, "detector failed, emitting empty result: {err}");
                degraded = true;
                break;
            }
            Err(_) => {
                tracing::warn!(sequence_id, "detector panicked, emitting empty result");
                degraded = true;
                break;
            }
        }
    }
    if degraded {
        detections.clear();
    }

    FrameResult {
        sequence_id,
        detections,
        image,
        degraded,
    }
}

/// Body of one worker thread: pop, detect, push, until a stop sentinel arrives.
pub fn run_worker<D: BlobDetector>(
    worker_id: usize,
    detector: &D,
    regions: &[Rect],
    input: &BlockingQueue<Task<D::Image>>,
    output: &BlockingQueue<FrameResult<D::Image>>,
    stop: &AtomicBool,
) {
    tracing::debug!(worker_id, "worker started");
    let mut processed = 0u64;
    loop {
        match input.blocking_pop() {
            Task::Stop => break,
            Task::Frame(_) if stop.load(Ordering::Acquire) => break,
            Task::Frame(frame) => {
                output.push(process_frame(detector, regions, frame));
                processed += 1;
            }
        }
    }
    tracing::debug!(worker_id, processed, "worker stopped");
}
