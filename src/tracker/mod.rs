mod state;

pub use state::{PageEvent, TrackerChange, TrackerState, VideoTracker};
