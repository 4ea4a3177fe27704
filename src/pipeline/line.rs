//! Single-threaded orchestrator core: sequencing, tracking, scheduling and statistics.

use std::time::Instant;

use crate::action::{ActionScheduler, PendingAction};
use crate::config::SorterConfig;
use crate::error::ConfigError;
use crate::pipeline::sequencer::Sequencer;
use crate::pipeline::worker::FrameResult;
use crate::stats::{StatsAggregator, TrackSummary};
use crate::tracker::{Channel, Detection, ExitEvent, MultiTracker, Track};

/// Everything produced for one delivered frame.
#[derive(Debug, Clone)]
pub struct FrameReport<I> {
    pub sequence_id: u64,
    pub image: I,
    pub detections: Vec<Detection>,
    /// Detection failed for this frame and an empty placeholder was tracked
    pub degraded: bool,
    /// Snapshot of every live track after this frame, ordered by unique id
    pub tracks: Vec<Track>,
    pub exits: Vec<ExitEvent>,
    /// Actions that came due while handling this frame
    pub fired: Vec<PendingAction>,
}

/// Totals of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub frames: u64,
    pub exits_a: u64,
    pub exits_b: u64,
    pub fired_actions: u64,
    /// Actions still waiting for their trigger time at shutdown
    pub unfired_actions: Vec<PendingAction>,
    pub summaries: Vec<TrackSummary>,
}

/// State owned by the orchestrator thread. Nothing here is shared.
pub struct SortingLine<I> {
    sequencer: Sequencer<FrameResult<I>>,
    tracker: MultiTracker,
    scheduler: ActionScheduler,
    stats: StatsAggregator,
    fired: u64,
}

impl<I> SortingLine<I> {
    pub fn new(config: &SorterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            sequencer: Sequencer::new(),
            tracker: MultiTracker::new(config),
            scheduler: ActionScheduler::new(config.action_delay()),
            stats: StatsAggregator::from_config(config),
            fired: 0,
        })
    }

    /// Accept one worker result; returns a report for every frame now in order.
    pub fn accept(&mut self, result: FrameResult<I>, now: Instant) -> Vec<FrameReport<I>> {
        self.sequencer
            .push(result.sequence_id, result)
            .into_iter()
            .map(|(_, result)| self.track(result, now))
            .collect()
    }

    fn track(&mut self, result: FrameResult<I>, now: Instant) -> FrameReport<I> {
        let FrameResult {
            sequence_id,
            detections,
            image,
            degraded,
        } = result;

        let update = self.tracker.update(sequence_id, &detections);
        for exit in update.exits.iter().filter(|e| e.sort) {
            self.scheduler.schedule(exit, now);
        }
        self.stats.record(sequence_id, self.tracker.active_tracks());
        let fired = self.tick(now);

        FrameReport {
            sequence_id,
            image,
            detections,
            degraded,
            tracks: self.tracker.tracks(),
            exits: update.exits,
            fired,
        }
    }

    /// Collect actions due at `now` without a new frame.
    pub fn tick(&mut self, now: Instant) -> Vec<PendingAction> {
        let fired = self.scheduler.poll(now);
        self.fired += fired.len() as u64;
        fired
    }

    /// Frames delivered to the tracker so far.
    pub fn emitted(&self) -> u64 {
        self.sequencer.emitted()
    }

    /// Results held back waiting for an earlier frame.
    pub fn buffered(&self) -> usize {
        self.sequencer.pending()
    }

    pub fn tracker(&self) -> &MultiTracker {
        &self.tracker
    }

    pub fn scheduler(&self) -> &ActionScheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut StatsAggregator {
        &mut self.stats
    }

    /// Close the run, dropping actions that never came due.
    pub fn finish(mut self) -> RunSummary {
        let unfired = self.scheduler.drain_all();
        for action in &unfired {
            tracing::info!(
                channel = %action.channel,
                assigned_number = action.assigned_number,
                "action never fired before shutdown"
            );
        }
        RunSummary {
            frames: self.sequencer.emitted(),
            exits_a: self.tracker.exit_count(Channel::A),
            exits_b: self.tracker.exit_count(Channel::B),
            fired_actions: self.fired,
            unfired_actions: unfired,
            summaries: self.stats.summarize(),
        }
    }
}
