use crate::trackers::byte::TrackIdGenerator;
use crate::trackers::Detection;
use crate::utils::bbox::{BoundingBox, Xyah};
use crate::utils::kalman::xyah_box::{XyahKalmanFilter, DIM_XYAH_X2};
use crate::utils::kalman::KalmanState;
use crate::Errors;
use std::collections::VecDeque;

/// Lifecycle states of a track.
///
/// `New` covers the unconfirmed stage: a track born from an unmatched
/// high-confidence detection stays `New` until its first successful match on a
/// later frame confirms it (frame 1 confirms immediately). `Removed` is
/// terminal.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    New,
    Tracked,
    Lost,
    Removed,
}

impl TrackState {
    /// The enforced transition table
    ///
    pub fn transition(self, to: TrackState) -> Result<TrackState, Errors> {
        use TrackState::*;
        let legal = matches!(
            (self, to),
            (New, Tracked)
                | (New, Removed)
                | (Tracked, Tracked)
                | (Tracked, Lost)
                | (Lost, Tracked)
                | (Lost, Removed)
        );
        if legal {
            Ok(to)
        } else {
            Err(Errors::IllegalTransition { from: self, to })
        }
    }
}

/// One tracked object: identity, motion state and lifecycle status.
///
#[derive(Debug, Clone)]
pub struct Track {
    track_id: u64,
    bbox: BoundingBox,
    score: f32,
    class_id: i64,
    state: TrackState,
    is_activated: bool,
    frame_id: u64,
    tracklet_len: u64,
    start_frame: u64,
    history: VecDeque<BoundingBox>,
    history_len: usize,
    /// None exactly while the track was never activated
    motion: Option<KalmanState<DIM_XYAH_X2>>,
}

impl Track {
    /// Wraps a detection into a candidate track. No id and no motion state yet.
    ///
    pub fn new_pending(detection: &Detection, frame_id: u64, history_len: usize) -> Self {
        Self {
            track_id: 0,
            bbox: detection.bbox,
            score: detection.confidence,
            class_id: detection.class_id,
            state: TrackState::New,
            is_activated: false,
            frame_id,
            tracklet_len: 0,
            start_frame: frame_id,
            history: VecDeque::default(),
            history_len,
            motion: None,
        }
    }

    /// Activate a new track: assign a fresh id and initialize the motion state.
    ///
    /// Only a track born on the very first frame is confirmed right away;
    /// later-born tracks stay unconfirmed until the next frame matches them.
    ///
    pub fn activate(
        &mut self,
        filter: &XyahKalmanFilter,
        ids: &TrackIdGenerator,
        frame_id: u64,
    ) {
        self.track_id = ids.next_id();
        self.tracklet_len = 0;
        self.frame_id = frame_id;
        self.start_frame = frame_id;
        self.motion = Some(filter.initiate(&self.bbox.as_xyah()));

        if frame_id == 1 {
            self.set_state(TrackState::Tracked);
            self.is_activated = true;
        }
    }

    /// Re-activate a lost track from a matched detection.
    ///
    /// The identity is preserved by default; `new_id` is reserved for
    /// deliberate re-identification and is not used by the base algorithm.
    ///
    pub fn re_activate(
        &mut self,
        filter: &XyahKalmanFilter,
        ids: &TrackIdGenerator,
        detection: &Detection,
        frame_id: u64,
        new_id: bool,
    ) {
        let state = self
            .motion
            .expect("A lost track always carries a motion state");
        self.motion = Some(filter.update(&state, &detection.bbox.as_xyah()));

        self.tracklet_len = 0;
        self.set_state(TrackState::Tracked);
        self.is_activated = true;
        self.frame_id = frame_id;
        self.score = detection.confidence;
        self.bbox = detection.bbox;

        if new_id {
            self.track_id = ids.next_id();
        }
    }

    /// Update the track with the matched detection
    ///
    pub fn update(&mut self, filter: &XyahKalmanFilter, detection: &Detection, frame_id: u64) {
        self.frame_id = frame_id;
        self.tracklet_len += 1;

        let state = self
            .motion
            .expect("An updated track always carries a motion state");
        self.motion = Some(filter.update(&state, &detection.bbox.as_xyah()));

        self.set_state(TrackState::Tracked);
        self.is_activated = true;

        self.score = detection.confidence;
        self.bbox = detection.bbox;

        self.history.push_back(detection.bbox);
        if self.history.len() > self.history_len {
            self.history.pop_front();
        }
    }

    /// Project the motion state one frame forward. Must run exactly once per
    /// frame, before matching.
    ///
    pub fn predict(&mut self, filter: &XyahKalmanFilter) {
        let mut state = self
            .motion
            .expect("A predicted track always carries a motion state");

        // a coasting track gets its height velocity pinned so the box does not
        // drift unbounded while no measurements arrive
        if self.state != TrackState::Tracked {
            state.mean[7] = 0.0;
        }

        self.motion = Some(filter.predict(&state));
    }

    pub fn mark_lost(&mut self) {
        self.set_state(TrackState::Lost);
    }

    pub fn mark_removed(&mut self) {
        self.set_state(TrackState::Removed);
    }

    fn set_state(&mut self, to: TrackState) {
        self.state = self
            .state
            .transition(to)
            .expect("Track lifecycle must follow the transition table");
    }

    /// Kalman-smoothed box in `(top-left x, top-left y, width, height)` form;
    /// falls back to the raw detection before the motion state exists.
    ///
    pub fn tlwh(&self) -> (f32, f32, f32, f32) {
        let b = self.tlbr();
        (b.x1(), b.y1(), b.width(), b.height())
    }

    /// Kalman-smoothed box in `(x1, y1, x2, y2)` form; falls back to the raw
    /// detection before the motion state exists.
    ///
    pub fn tlbr(&self) -> BoundingBox {
        match self.motion {
            Some(state) => Xyah::from(state).as_tlbr(),
            None => self.bbox,
        }
    }

    pub fn track_id(&self) -> u64 {
        self.track_id
    }

    /// The raw bbox of the last matched detection
    pub fn observed_bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn class_id(&self) -> i64 {
        self.class_id
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn is_activated(&self) -> bool {
        self.is_activated
    }

    /// The frame of the last successful update
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    /// Consecutive successful updates since the last (re)activation
    pub fn tracklet_len(&self) -> u64 {
        self.tracklet_len
    }

    pub fn history(&self) -> &VecDeque<BoundingBox> {
        &self.history
    }
}
