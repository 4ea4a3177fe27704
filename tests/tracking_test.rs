use std::collections::HashSet;

use nalgebra::Vector2;
use proptest::prelude::*;
use sortline::{Channel, Detection, MultiTracker, Rect, SorterConfig, TrackState};

fn config() -> SorterConfig {
    let mut config = SorterConfig::default();
    config.channel_a.region = Rect::new(0.0, 0.0, 400.0, 1000.0);
    config.channel_b.region = Rect::new(500.0, 0.0, 400.0, 1000.0);
    config.channel_a.initial_velocity = [0.0, 0.0];
    config.channel_b.initial_velocity = [0.0, 0.0];
    config.tracker.min_area_threshold = 100;
    config.tracker.gating_distance = 100.0;
    config.tracker.max_missed_frames = 5;
    config
}

fn blob(x: f32, y: f32) -> Detection {
    Detection::new(1, Vector2::new(x, y), Rect::new(x - 20.0, y - 20.0, 40.0, 40.0), 1600)
}

#[test]
fn test_track_retired_after_six_misses() {
    let mut tracker = MultiTracker::new(&config());

    for frame in 0..=10 {
        let update = tracker.update(frame, &[blob(100.0, 500.0)]);
        assert!(update.exits.is_empty());
    }
    assert_eq!(tracker.len(), 1);
    let number = tracker.tracks()[0].assigned_number;

    let mut exits = Vec::new();
    for frame in 11..=16 {
        exits.extend(tracker.update(frame, &[]).exits);
        if frame < 16 {
            assert_eq!(tracker.len(), 1, "track retired too early at frame {frame}");
        }
    }

    assert_eq!(exits.len(), 1);
    assert_eq!(exits[0].frame_id, 16);
    assert_eq!(exits[0].assigned_number, number);
    assert_eq!(exits[0].channel, Channel::A);
    assert!(tracker.is_empty());
    assert_eq!(tracker.exit_count(Channel::A), 1);
}

#[test]
fn test_match_against_prediction_within_gate() {
    let mut config = config();
    config.channel_a.initial_velocity = [5.0, 2.0];
    config.tracker.gating_distance = 150.0;
    let mut tracker = MultiTracker::new(&config);

    tracker.update(0, &[blob(100.0, 100.0)]);
    let id = tracker.tracks()[0].unique_id;
    assert_eq!(tracker.tracks()[0].predicted(), Vector2::new(105.0, 102.0));

    let update = tracker.update(1, &[blob(100.0, 100.0)]);
    assert!(update.created.is_empty());
    let track = tracker.get(id).unwrap();
    assert_eq!(track.missed_frames, 0);
    assert_eq!(track.state, TrackState::Active);
}

#[test]
fn test_isolated_pair_always_matches() {
    let mut tracker = MultiTracker::new(&config());
    tracker.update(0, &[blob(200.0, 800.0)]);
    let id = tracker.tracks()[0].unique_id;

    // A lone detection well inside the gate must never spawn a second track.
    for (frame, y) in (1..20).zip((0..).map(|i| 790.0 - i as f32 * 15.0)) {
        let update = tracker.update(frame, &[blob(200.0, y)]);
        assert!(update.created.is_empty());
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get(id).unwrap().centroid.y, y);
    }
}

#[test]
fn test_distant_detection_starts_new_track() {
    let mut tracker = MultiTracker::new(&config());
    tracker.update(0, &[blob(100.0, 800.0)]);
    let update = tracker.update(1, &[blob(100.0, 300.0)]);

    assert_eq!(update.created.len(), 1);
    assert_eq!(tracker.len(), 2);
    let numbers: Vec<u32> = tracker.tracks().iter().map(|t| t.assigned_number).collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[test]
fn test_numbers_assigned_in_arrival_order() {
    let mut tracker = MultiTracker::new(&config());
    let mut numbers = Vec::new();
    for (frame, y) in [(0, 900.0), (10, 600.0), (20, 300.0)] {
        let update = tracker.update(frame, &[blob(150.0, y)]);
        numbers.extend(update.created.iter().map(|id| tracker.get(*id).unwrap().assigned_number));
    }
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[test]
fn test_channels_number_independently() {
    let config = config();
    let start_b = config.channel_b.starting_number;
    let mut tracker = MultiTracker::new(&config);

    let update = tracker.update(0, &[blob(100.0, 500.0), blob(700.0, 500.0), blob(700.0, 200.0)]);
    let created: Vec<(Channel, u32)> = update
        .created
        .iter()
        .map(|id| {
            let t = tracker.get(*id).unwrap();
            (t.channel, t.assigned_number)
        })
        .collect();
    assert_eq!(
        created,
        vec![(Channel::A, 1), (Channel::B, start_b), (Channel::B, start_b + 1)]
    );
}

#[test]
fn test_detections_outside_every_lane_ignored() {
    let mut tracker = MultiTracker::new(&config());
    let update = tracker.update(0, &[blob(450.0, 500.0), blob(1200.0, 500.0)]);
    assert!(update.created.is_empty());
    assert!(tracker.is_empty());
}

#[test]
fn test_sort_flag_follows_subsequence() {
    let mut config = config();
    config.tracker.max_missed_frames = 0;
    config.channel_a.sorting_subsequence = [2].into_iter().collect();
    let mut tracker = MultiTracker::new(&config);

    tracker.update(0, &[blob(100.0, 800.0), blob(100.0, 200.0)]);
    let exits = tracker.update(1, &[]).exits;

    let flags: Vec<(u32, bool)> = exits.iter().map(|e| (e.assigned_number, e.sort)).collect();
    assert_eq!(flags, vec![(1, false), (2, true)]);
}

#[derive(Debug, Clone)]
enum Step {
    Spawn { lane: bool, y: f32 },
    Idle,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (any::<bool>(), 50.0f32..950.0).prop_map(|(lane, y)| Step::Spawn { lane, y }),
        Just(Step::Idle),
    ]
}

proptest! {
    #[test]
    fn numbers_unique_and_increasing_per_channel(steps in prop::collection::vec(step(), 1..60)) {
        let mut tracker = MultiTracker::new(&config());
        let mut last: [Option<u32>; 2] = [None, None];
        let mut seen_ids = HashSet::new();
        let mut exited = HashSet::new();

        for (frame, step) in steps.into_iter().enumerate() {
            let dets = match step {
                Step::Spawn { lane, y } => vec![blob(if lane { 700.0 } else { 100.0 }, y)],
                Step::Idle => vec![],
            };
            let update = tracker.update(frame as u64, &dets);

            for id in &update.created {
                prop_assert!(seen_ids.insert(*id));
                let track = tracker.get(*id).unwrap();
                let slot = match track.channel {
                    Channel::A => 0,
                    Channel::B => 1,
                };
                if let Some(prev) = last[slot] {
                    prop_assert!(track.assigned_number > prev);
                }
                last[slot] = Some(track.assigned_number);
            }
            for exit in &update.exits {
                prop_assert!(exited.insert(exit.unique_id), "track {} retired twice", exit.unique_id);
                prop_assert!(tracker.get(exit.unique_id).is_none());
            }
        }
    }
}
