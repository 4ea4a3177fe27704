//! SortingPipeline wiring ingestion, the worker pool and the orchestrator together.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use crate::action::{self, Actuator};
use crate::config::SorterConfig;
use crate::error::{PipelineError, SourceError};
use crate::pipeline::detector::{BlobDetector, FrameSource};
use crate::pipeline::line::{FrameReport, RunSummary, SortingLine};
use crate::pipeline::queue::BlockingQueue;
use crate::pipeline::worker::{self, Frame, FrameResult, Task};

/// Request a running pipeline to stop from any thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Progress shared between the feeder and the orchestrator.
#[derive(Default)]
struct FeedState {
    submitted: AtomicU64,
    done: AtomicBool,
    failed: AtomicBool,
}

/// Halts the run and releases every worker when dropped, including on unwind.
struct Shutdown<'a, I> {
    halt: &'a AtomicBool,
    input: &'a BlockingQueue<Task<I>>,
    workers: usize,
}

impl<I> Drop for Shutdown<'_, I> {
    fn drop(&mut self) {
        self.halt.store(true, Ordering::Release);
        for _ in 0..self.workers {
            self.input.push(Task::Stop);
        }
    }
}

/// A camera-to-actuator sorting line.
///
/// Frames are read on an ingestion thread, segmented by a pool of workers, and
/// tracked strictly in capture order on the calling thread.
pub struct SortingPipeline<D: BlobDetector> {
    detector: D,
    config: SorterConfig,
    stop: StopHandle,
}

impl<D: BlobDetector> SortingPipeline<D> {
    /// Validate `config` and build a pipeline. Fails before any thread starts.
    pub fn new(detector: D, config: SorterConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            detector,
            config,
            stop: StopHandle::default(),
        })
    }

    /// Create a pipeline with the default line configuration.
    pub fn with_default_config(detector: D) -> Result<Self, PipelineError> {
        Self::new(detector, SorterConfig::default())
    }

    /// Handle that ends [`run`](Self::run) early. A stopped pipeline stays stopped.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn config(&self) -> &SorterConfig {
        &self.config
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Process `source` until it ends, fails, or a stop is requested.
    ///
    /// Every delivered frame is handed to `on_frame` in capture order, after its
    /// fired actions have been written to `actuator`.
    pub fn run<S, A, F>(
        &self,
        source: S,
        actuator: &mut A,
        mut on_frame: F,
    ) -> Result<RunSummary, PipelineError>
    where
        S: FrameSource<Image = D::Image>,
        D::Image: Send,
        A: Actuator + ?Sized,
        F: FnMut(FrameReport<D::Image>),
    {
        let mut line = SortingLine::new(&self.config)?;
        let workers = self.config.workers();
        let poll_interval = self.config.poll_interval();
        let regions = [self.config.channel_a.region, self.config.channel_b.region];

        let input: BlockingQueue<Task<D::Image>> = BlockingQueue::new();
        let output: BlockingQueue<FrameResult<D::Image>> = BlockingQueue::new();
        let feed = FeedState::default();
        let halt = AtomicBool::new(false);

        tracing::info!(workers, "sorting pipeline started");

        let (feed_outcome, workers_ok) = thread::scope(|s| {
            let (detector, regions, input, output, feed, halt) =
                (&self.detector, &regions, &input, &output, &feed, &halt);

            let feeder = s.spawn(move || feed_frames(source, input, feed, halt));
            let pool: Vec<_> = (0..workers)
                .map(|id| {
                    s.spawn(move || worker::run_worker(id, detector, regions, input, output, halt))
                })
                .collect();

            let shutdown = Shutdown {
                halt,
                input,
                workers,
            };

            loop {
                if self.stop.is_stopped() {
                    tracing::info!("stop requested");
                    break;
                }
                if feed.failed.load(Ordering::Acquire) {
                    break;
                }
                if feed.done.load(Ordering::Acquire)
                    && line.emitted() == feed.submitted.load(Ordering::Acquire)
                {
                    break;
                }

                if let Some(result) = output.pop_timeout(poll_interval) {
                    for report in line.accept(result, Instant::now()) {
                        action::dispatch(actuator, &report.fired);
                        on_frame(report);
                    }
                }
                let fired = line.tick(Instant::now());
                action::dispatch(actuator, &fired);
            }

            drop(shutdown);
            let feed_outcome = feeder.join();
            let workers_ok = pool.into_iter().all(|h| h.join().is_ok());
            (feed_outcome, workers_ok)
        });

        let summary = line.finish();
        tracing::info!(
            frames = summary.frames,
            exits_a = summary.exits_a,
            exits_b = summary.exits_b,
            fired = summary.fired_actions,
            "sorting pipeline finished"
        );

        match feed_outcome {
            Ok(Ok(())) if workers_ok => Ok(summary),
            Ok(Err(err)) => Err(err),
            _ => Err(PipelineError::WorkerPanicked),
        }
    }
}

/// Ingestion loop. Assigns gapless sequence ids to every frame the source yields.
fn feed_frames<S: FrameSource>(
    mut source: S,
    input: &BlockingQueue<Task<S::Image>>,
    feed: &FeedState,
    halt: &AtomicBool,
) -> Result<(), PipelineError> {
    let mut next_id = 0u64;
    let outcome = loop {
        if halt.load(Ordering::Acquire) {
            break Ok(());
        }
        match source.next_frame() {
            Ok(Some(image)) => {
                input.push(Task::Frame(Frame {
                    sequence_id: next_id,
                    image,
                }));
                next_id += 1;
                feed.submitted.store(next_id, Ordering::Release);
            }
            Ok(None) => {
                tracing::debug!(frames = next_id, "frame source exhausted");
                break Ok(());
            }
            Err(SourceError::Skipped(reason)) => {
                tracing::warn!(next_id, "skipping unreadable frame: {reason}");
            }
            Err(SourceError::Unavailable(reason)) => {
                tracing::error!("frame source failed: {reason}");
                feed.failed.store(true, Ordering::Release);
                break Err(PipelineError::SourceUnavailable(reason));
            }
        }
    };
    feed.done.store(true, Ordering::Release);
    outcome
}
