mod channel;
mod matching;
mod multi_tracker;
mod rect;
mod track;
mod track_state;

pub use channel::Channel;
pub use matching::{AssignmentResult, Detection, GATED_COST, distance_cost, linear_assignment};
pub use multi_tracker::{ExitEvent, MultiTracker, TrackerUpdate};
pub use rect::Rect;
pub use track::{PALETTE, Rgb, Track};
pub use track_state::TrackState;
