use crate::trackers::byte::track::TrackState;
use thiserror::Error;

/// Tracking engines (per-camera ByteTrack association, multi-camera manager)
///
pub mod trackers;

/// Math primitives: bounding boxes, Kalman filtering, bipartite assignment
///
pub mod utils;

/// Zone capability interface consumed by the tracking manager
///
pub mod zones;

pub mod prelude;

/// Deterministic generators shared by the crate tests
pub mod test_stuff;

#[derive(Error, Debug, Clone)]
pub enum Errors {
    #[error("Invalid tracker configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Illegal track state transition {from:?} -> {to:?}")]
    IllegalTransition { from: TrackState, to: TrackState },
    #[error("Motion state is missing - the track was never activated.")]
    MissingMotionState,
}

/// Compares estimated quantities with the tolerance
///
pub trait EstimateClose {
    fn almost_same(&self, other: &Self, eps: f32) -> bool;
}

pub(crate) const EPS: f32 = 0.00001;
