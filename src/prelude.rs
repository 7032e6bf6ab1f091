pub use crate::trackers::batch::{FrameBatchRequest, FrameBatchResult};
pub use crate::trackers::byte::track::{Track, TrackState};
pub use crate::trackers::byte::tracker::ByteTracker;
pub use crate::trackers::byte::{ByteTrackerConfig, TrackIdGenerator};
pub use crate::trackers::manager::output::{TrackStatus, TrackedObject, ZoneTransition};
pub use crate::trackers::manager::{
    CameraStats, ManagerStats, TrackObserver, TrackingManager, TransitionObserver,
};
pub use crate::trackers::Detection;
pub use crate::utils::assignment::{Assigner, AssignerKind, AssignmentOutcome};
pub use crate::utils::bbox::{BoundingBox, Xyah};
pub use crate::utils::kalman::xyah_box::XyahKalmanFilter;
pub use crate::utils::kalman::KalmanState;
pub use crate::zones::{StaticZones, Zone, ZoneProvider};
