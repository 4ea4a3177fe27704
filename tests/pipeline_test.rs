use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use sortline::{
    ActionScheduler, BlobDetector, Channel, Detection, DetectionBuilder, ExitEvent, FrameSource,
    IterSource, NullActuator, PipelineError, Rect, SorterConfig, SortingPipeline, SourceError,
    WriterActuator,
};

const SPAWN_EVERY: u64 = 60;
const LANE_X: f32 = 150.0;

fn config() -> SorterConfig {
    let mut config = SorterConfig::default();
    config.channel_a.region = Rect::new(0.0, 0.0, 400.0, 1000.0);
    config.channel_b.region = Rect::new(500.0, 0.0, 400.0, 1000.0);
    config.channel_a.initial_velocity = [0.0, -20.0];
    config.tracker.min_area_threshold = 100;
    config.action_delay_ms = 0;
    config.worker_count = Some(3);
    config.poll_interval_ms = 1;
    config
}

/// One object every 60 frames climbing lane A at 20 px per frame. Fails on
/// every frame congruent to 5 mod 17.
struct Conveyor;

impl BlobDetector for Conveyor {
    type Image = u64;
    type Error = String;

    fn detect(&self, frame: &u64, region: &Rect) -> Result<Vec<Detection>, String> {
        if frame % 17 == 5 {
            return Err(format!("exposure glitch on frame {frame}"));
        }
        let travelled = frame % SPAWN_EVERY;
        let y = 950.0 - 20.0 * travelled as f32;
        let det = DetectionBuilder::new()
            .label(1)
            .tlwh(LANE_X - 20.0, y - 20.0, 40.0, 40.0)
            .centroid(LANE_X, y)
            .build();
        Ok(if y >= 0.0 && region.contains(&det.centroid) { vec![det] } else { vec![] })
    }
}

#[test]
fn test_end_to_end_with_failing_frames() {
    let pipeline = SortingPipeline::new(Conveyor, config()).unwrap();
    let mut actuator = WriterActuator::new(Vec::new());
    let mut sequence = Vec::new();
    let mut degraded = Vec::new();

    let summary = pipeline
        .run(IterSource(0..180u64), &mut actuator, |report| {
            assert_eq!(report.sequence_id, report.image);
            if report.degraded {
                assert!(report.detections.is_empty());
                degraded.push(report.sequence_id);
            }
            sequence.push(report.sequence_id);
        })
        .unwrap();

    assert_eq!(sequence, (0..180).collect::<Vec<_>>());
    assert_eq!(degraded, (0..180).filter(|f| f % 17 == 5).collect::<Vec<_>>());
    assert_eq!(summary.frames, 180);

    // Single-frame dropouts are bridged, so each object is counted once.
    assert_eq!(summary.exits_a, 3);
    assert_eq!(summary.exits_b, 0);
    // Only number 1 is in lane A's default subsequence.
    assert_eq!(summary.fired_actions, 1);
    assert_eq!(actuator.into_inner(), b"A".to_vec());

    let numbers: Vec<u32> = summary.summaries.iter().map(|s| s.assigned_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    for s in &summary.summaries {
        assert_relative_eq!(s.speed_pixels_per_sec, 600.0, max_relative = 1e-4);
    }
}

#[test]
fn test_scheduler_fires_once_after_delay() {
    let mut scheduler = ActionScheduler::new(Duration::from_millis(500));
    let subsequence = config().channel_a.sorting_subsequence;
    assert!(subsequence.contains(&1) && subsequence.contains(&8));

    let now = Instant::now();
    let exit = ExitEvent {
        unique_id: 42,
        channel: Channel::A,
        assigned_number: 1,
        frame_id: 30,
        sort: true,
    };
    scheduler.schedule(&exit, now);

    assert!(scheduler.poll(now + Duration::from_millis(100)).is_empty());
    let fired = scheduler.poll(now + Duration::from_millis(600));
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].channel, Channel::A);
    assert_eq!(fired[0].signal(), [b'A']);
    assert!(scheduler.poll(now + Duration::from_millis(600)).is_empty());
}

/// Replays a scripted list of source outcomes.
struct Scripted(std::vec::IntoIter<Result<Option<u64>, SourceError>>);

impl Scripted {
    fn new(script: Vec<Result<Option<u64>, SourceError>>) -> Self {
        Self(script.into_iter())
    }
}

impl FrameSource for Scripted {
    type Image = u64;

    fn next_frame(&mut self) -> Result<Option<u64>, SourceError> {
        self.0.next().unwrap_or(Ok(None))
    }
}

struct Blind;

impl BlobDetector for Blind {
    type Image = u64;
    type Error = std::convert::Infallible;

    fn detect(&self, _frame: &u64, _region: &Rect) -> Result<Vec<Detection>, Self::Error> {
        Ok(vec![])
    }
}

#[test]
fn test_skipped_frame_consumes_no_sequence_id() {
    let source = Scripted::new(vec![
        Ok(Some(10)),
        Ok(Some(11)),
        Err(SourceError::Skipped("truncated jpeg".into())),
        Ok(Some(12)),
        Ok(Some(13)),
    ]);
    let pipeline = SortingPipeline::new(Blind, config()).unwrap();
    let mut delivered = Vec::new();

    let summary = pipeline
        .run(source, &mut NullActuator, |report| {
            delivered.push((report.sequence_id, report.image));
        })
        .unwrap();

    assert_eq!(delivered, vec![(0, 10), (1, 11), (2, 12), (3, 13)]);
    assert_eq!(summary.frames, 4);
}

#[test]
fn test_unavailable_source_is_fatal() {
    let mut script: Vec<_> = (0..10).map(|i| Ok(Some(i))).collect();
    script.push(Err(SourceError::Unavailable("camera unplugged".into())));
    script.extend((10..20).map(|i| Ok(Some(i))));

    let pipeline = SortingPipeline::new(Blind, config()).unwrap();
    let outcome = pipeline.run(Scripted::new(script), &mut NullActuator, |report| {
        assert!(report.image < 10);
    });

    match outcome {
        Err(PipelineError::SourceUnavailable(reason)) => assert_eq!(reason, "camera unplugged"),
        other => panic!("expected source failure, got {other:?}"),
    }
}

#[test]
fn test_stop_handle_ends_endless_run() {
    let pipeline = SortingPipeline::new(Blind, config()).unwrap();
    let stop = pipeline.stop_handle();
    let mut last = None;

    let summary = pipeline
        .run(IterSource(0u64..), &mut NullActuator, |report| {
            if report.sequence_id == 50 {
                stop.stop();
            }
            last = Some(report.sequence_id);
        })
        .unwrap();

    assert!(pipeline.stop_handle().is_stopped());
    assert!(summary.frames > 50);
    assert_eq!(last, Some(summary.frames - 1));
}

/// Reports the same blob for every region it is asked about.
struct RegionBlind;

impl BlobDetector for RegionBlind {
    type Image = u64;
    type Error = std::convert::Infallible;

    fn detect(&self, frame: &u64, _region: &Rect) -> Result<Vec<Detection>, Self::Error> {
        let y = 900.0 - 10.0 * *frame as f32;
        Ok(vec![
            DetectionBuilder::new()
                .label(1)
                .tlwh(80.0, y - 20.0, 40.0, 40.0)
                .build(),
        ])
    }
}

#[test]
fn test_region_blind_detector_yields_one_track() {
    let mut config = config();
    config.channel_a.initial_velocity = [0.0, -10.0];
    let pipeline = SortingPipeline::new(RegionBlind, config).unwrap();
    let mut max_live = 0;

    let summary = pipeline
        .run(IterSource(0..30u64), &mut NullActuator, |report| {
            assert_eq!(report.detections.len(), 1);
            max_live = max_live.max(report.tracks.len());
        })
        .unwrap();

    assert_eq!(max_live, 1);
    assert_eq!(summary.exits_a + summary.exits_b, 0);
}
