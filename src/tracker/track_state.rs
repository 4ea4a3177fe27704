/// Track state within its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Matched to a detection in the latest frame
    #[default]
    Active,
    /// Unmatched in the latest frame, position extrapolated from velocity
    Coasting,
}
