use crate::trackers::byte::track::{Track, TrackState};
use crate::trackers::byte::{
    ByteTrackerConfig, TrackIdGenerator, SECOND_STAGE_MATCH_THRESHOLD,
    UNCONFIRMED_MATCH_THRESHOLD,
};
use crate::trackers::{Detection, MIN_DETECTION_CONFIDENCE};
use crate::utils::assignment::Assigner;
use crate::utils::bbox::{iou_matrix, BoundingBox};
use crate::utils::kalman::xyah_box::XyahKalmanFilter;
use crate::Errors;
use log::debug;
use std::sync::Arc;

/// Per-camera association engine (ByteTrack).
///
/// `update()` must be called exactly once per video frame, in strict temporal
/// order, for the camera this tracker serves. It is synchronous, CPU-bound and
/// never fails on detection data: invalid detections are filtered, an empty
/// frame ages the live tracks.
///
pub struct ByteTracker {
    config: ByteTrackerConfig,
    filter: XyahKalmanFilter,
    assigner: Box<dyn Assigner>,
    ids: Arc<TrackIdGenerator>,
    tracked_tracks: Vec<Track>,
    lost_tracks: Vec<Track>,
    removed_tracks: Vec<Track>,
    frame_id: u64,
    max_time_lost: u64,
}

impl ByteTracker {
    /// Creates a tracker with its own id space
    ///
    pub fn new(config: ByteTrackerConfig) -> Result<Self, Errors> {
        Self::with_id_generator(config, Arc::new(TrackIdGenerator::new()))
    }

    /// Creates a tracker over a caller-provided id generator (shared or
    /// partitioned between cameras, at the caller's discretion)
    ///
    pub fn with_id_generator(
        config: ByteTrackerConfig,
        ids: Arc<TrackIdGenerator>,
    ) -> Result<Self, Errors> {
        config.validate()?;
        Ok(Self {
            max_time_lost: config.max_time_lost(),
            assigner: config.get_assigner().build(),
            filter: XyahKalmanFilter::default(),
            ids,
            tracked_tracks: Vec::default(),
            lost_tracks: Vec::default(),
            removed_tracks: Vec::default(),
            frame_id: 0,
            config,
        })
    }

    /// Runs one tracking step and returns the snapshots of all confirmed
    /// tracks alive after the frame.
    ///
    pub fn update(&mut self, detections: &[Detection]) -> Vec<Track> {
        self.frame_id += 1;
        let frame_id = self.frame_id;

        // partition by confidence; sub-floor and malformed detections are out
        let mut high = Vec::new();
        let mut low = Vec::new();
        for d in detections {
            if !d.is_valid() || d.confidence < MIN_DETECTION_CONFIDENCE {
                continue;
            }
            if d.confidence >= self.config.get_track_thresh() {
                high.push(*d);
            } else {
                low.push(*d);
            }
        }

        // split the tracked pool into confirmed tracks and unconfirmed newborns
        let mut unconfirmed = Vec::new();
        let mut pool = Vec::new();
        for t in self.tracked_tracks.drain(..) {
            if t.is_activated() {
                pool.push(t);
            } else {
                unconfirmed.push(t);
            }
        }
        pool.append(&mut self.lost_tracks);

        for t in pool.iter_mut() {
            t.predict(&self.filter);
        }

        // stage 1: confirmed + lost tracks vs high-confidence detections
        let sim = iou_matrix(&boxes_of(&pool), &det_boxes(&high));
        let stage1 = self
            .assigner
            .assign(&sim, self.config.get_match_thresh());

        for &(ti, di) in &stage1.matches {
            self.apply_match(&mut pool[ti], &high[di], frame_id);
        }

        // stage 2: tracks missed by stage 1 that are still Tracked vs
        // low-confidence detections; recovers occluded/blurred objects without
        // ever opening tracks from weak evidence
        let leftover: Vec<usize> = stage1
            .unmatched_rows
            .iter()
            .copied()
            .filter(|&i| pool[i].state() == TrackState::Tracked)
            .collect();

        let leftover_boxes: Vec<BoundingBox> =
            leftover.iter().map(|&i| pool[i].tlbr()).collect();
        let sim = iou_matrix(&leftover_boxes, &det_boxes(&low));
        let stage2 = self.assigner.assign(&sim, SECOND_STAGE_MATCH_THRESHOLD);

        for &(ri, di) in &stage2.matches {
            self.apply_match(&mut pool[leftover[ri]], &low[di], frame_id);
        }

        for &ri in &stage2.unmatched_rows {
            let t = &mut pool[leftover[ri]];
            if t.state() != TrackState::Lost {
                t.mark_lost();
            }
        }

        // unconfirmed newborns vs the high-confidence detections nobody claimed
        let remaining_high: Vec<usize> = stage1.unmatched_cols;
        let remaining_boxes: Vec<BoundingBox> =
            remaining_high.iter().map(|&j| high[j].bbox).collect();
        let sim = iou_matrix(&boxes_of(&unconfirmed), &remaining_boxes);
        let confirm = self.assigner.assign(&sim, UNCONFIRMED_MATCH_THRESHOLD);

        for &(ui, dj) in &confirm.matches {
            unconfirmed[ui].update(&self.filter, &high[remaining_high[dj]], frame_id);
        }
        for &ui in &confirm.unmatched_rows {
            unconfirmed[ui].mark_removed();
        }

        // leftover high-confidence detections open new tracks
        let mut newborn = Vec::new();
        for &dj in &confirm.unmatched_cols {
            let d = &high[remaining_high[dj]];
            if d.confidence < self.config.get_track_thresh() {
                continue;
            }
            let mut t = Track::new_pending(d, frame_id, self.config.get_history_len());
            t.activate(&self.filter, &self.ids, frame_id);
            debug!("frame {}: new track {} opened", frame_id, t.track_id());
            newborn.push(t);
        }

        // expire tracks lost for too long
        for t in pool.iter_mut() {
            if t.state() == TrackState::Lost && frame_id - t.frame_id() > self.max_time_lost {
                debug!("frame {}: track {} removed", frame_id, t.track_id());
                t.mark_removed();
            }
        }

        // pool bookkeeping: every track lands in exactly one collection
        for t in pool {
            match t.state() {
                TrackState::Tracked => self.tracked_tracks.push(t),
                TrackState::Lost => self.lost_tracks.push(t),
                TrackState::Removed => self.removed_tracks.push(t),
                TrackState::New => unreachable!("Pool tracks are always activated"),
            }
        }
        for t in unconfirmed {
            match t.state() {
                TrackState::Removed => self.removed_tracks.push(t),
                _ => self.tracked_tracks.push(t),
            }
        }
        self.tracked_tracks.append(&mut newborn);

        debug!(
            "frame {}: {} high / {} low detections, {} tracked, {} lost",
            frame_id,
            high.len(),
            low.len(),
            self.tracked_tracks.len(),
            self.lost_tracks.len()
        );

        self.tracked_tracks
            .iter()
            .filter(|t| t.is_activated())
            .cloned()
            .collect()
    }

    fn apply_match(&self, track: &mut Track, detection: &Detection, frame_id: u64) {
        if track.state() == TrackState::Tracked {
            track.update(&self.filter, detection, frame_id);
        } else {
            track.re_activate(&self.filter, &self.ids, detection, frame_id, false);
        }
    }

    /// Drains the tracks that reached the terminal state since the last call.
    ///
    /// Callers that never drain would otherwise accumulate removed tracks
    /// forever.
    ///
    pub fn wasted(&mut self) -> Vec<Track> {
        std::mem::take(&mut self.removed_tracks)
    }

    /// Clears all tracking state and restarts the id space
    ///
    pub fn reset(&mut self) {
        self.frame_id = 0;
        self.tracked_tracks.clear();
        self.lost_tracks.clear();
        self.removed_tracks.clear();
        self.ids.reset();
        debug!("tracker reset");
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked_tracks.len()
    }

    pub fn lost_count(&self) -> usize {
        self.lost_tracks.len()
    }

    pub fn assigner_kind(&self) -> crate::utils::assignment::AssignerKind {
        self.assigner.kind()
    }

    pub fn config(&self) -> &ByteTrackerConfig {
        &self.config
    }
}

fn boxes_of(tracks: &[Track]) -> Vec<BoundingBox> {
    tracks.iter().map(|t| t.tlbr()).collect()
}

fn det_boxes(detections: &[Detection]) -> Vec<BoundingBox> {
    detections.iter().map(|d| d.bbox).collect()
}

#[cfg(test)]
mod tests {
    use crate::trackers::byte::tracker::ByteTracker;
    use crate::trackers::byte::ByteTrackerConfig;
    use crate::trackers::Detection;
    use crate::test_stuff::{det, init_logging};
    use crate::utils::assignment::AssignerKind;
    use crate::utils::bbox::BoundingBox;
    use crate::{EstimateClose, EPS};

    fn tracker() -> ByteTracker {
        init_logging();
        ByteTracker::new(ByteTrackerConfig::default()).unwrap()
    }

    #[test]
    fn single_detection_opens_track_one() {
        let mut t = tracker();
        let tracks = t.update(&[det(100.0, 100.0, 150.0, 200.0, 0.9)]);

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id(), 1);
        assert!((tracks[0].score() - 0.9).abs() < EPS);
        assert!(tracks[0]
            .tlbr()
            .almost_same(&BoundingBox::new(100.0, 100.0, 150.0, 200.0), EPS));
    }

    #[test]
    fn linear_motion_keeps_identity() {
        let mut t = tracker();
        let mut last_len = 0;
        let mut tracks = Vec::new();

        for frame in 0..10u64 {
            let x = 100.0 + 5.0 * frame as f32;
            tracks = t.update(&[det(x, 100.0, x + 50.0, 200.0, 0.9)]);
            assert_eq!(tracks.len(), 1);
            assert_eq!(tracks[0].track_id(), 1);
            if frame > 0 {
                assert_eq!(tracks[0].tracklet_len(), last_len + 1);
            }
            last_len = tracks[0].tracklet_len();
        }

        // the smoothed box follows the +5 px/frame motion
        let expected_x1 = 100.0 + 5.0 * 9.0;
        assert!((tracks[0].tlbr().x1() - expected_x1).abs() < 3.0);
    }

    #[test]
    fn short_occlusion_preserves_identity() {
        let mut t = tracker();
        let bb = [100.0, 100.0, 150.0, 200.0];
        t.update(&[det(bb[0], bb[1], bb[2], bb[3], 0.9)]);

        for _ in 0..5 {
            let tracks = t.update(&[]);
            assert!(tracks.is_empty());
        }

        let tracks = t.update(&[det(bb[0], bb[1], bb[2], bb[3], 0.9)]);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id(), 1);
        assert_eq!(tracks[0].tracklet_len(), 0);
    }

    #[test]
    fn expired_track_is_not_reused() {
        let mut t = tracker();
        let max_lost = t.config().max_time_lost();
        let bb = [100.0, 100.0, 150.0, 200.0];
        t.update(&[det(bb[0], bb[1], bb[2], bb[3], 0.9)]);

        for _ in 0..max_lost + 1 {
            t.update(&[]);
        }

        // the reappeared object becomes an unconfirmed newborn first...
        let tracks = t.update(&[det(bb[0], bb[1], bb[2], bb[3], 0.9)]);
        assert!(tracks.is_empty());

        // ...and is confirmed with a fresh id on the next frame
        let tracks = t.update(&[det(bb[0], bb[1], bb[2], bb[3], 0.9)]);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id(), 2);

        let wasted = t.wasted();
        assert_eq!(wasted.len(), 1);
        assert_eq!(wasted[0].track_id(), 1);
        assert!(t.wasted().is_empty());
    }

    #[test]
    fn threshold_boundary_is_high_confidence() {
        let mut t = tracker();
        let tracks = t.update(&[det(0.0, 0.0, 50.0, 100.0, 0.5)]);
        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn sub_floor_detections_never_participate() {
        let mut t = tracker();
        for _ in 0..5 {
            let tracks = t.update(&[det(0.0, 0.0, 50.0, 100.0, 0.09)]);
            assert!(tracks.is_empty());
        }
        assert_eq!(t.tracked_count(), 0);
        assert_eq!(t.lost_count(), 0);
    }

    #[test]
    fn low_confidence_never_opens_tracks() {
        let mut t = tracker();
        for _ in 0..5 {
            let tracks = t.update(&[det(0.0, 0.0, 50.0, 100.0, 0.3)]);
            assert!(tracks.is_empty());
        }
        assert_eq!(t.tracked_count(), 0);
    }

    #[test]
    fn stage_two_recovers_under_weak_evidence() {
        let mut t = tracker();
        t.update(&[det(100.0, 100.0, 150.0, 200.0, 0.9)]);

        // the object blurs: only a low-confidence detection remains, yet the
        // track survives without a gap
        let tracks = t.update(&[det(101.0, 100.0, 151.0, 200.0, 0.3)]);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id(), 1);
        assert!((tracks[0].score() - 0.3).abs() < EPS);
        assert_eq!(t.lost_count(), 0);
    }

    #[test]
    fn invalid_detections_are_dropped() {
        let mut t = tracker();
        let tracks = t.update(&[
            det(50.0, 50.0, 10.0, 10.0, 0.9),
            det(0.0, f32::NAN, 10.0, 10.0, 0.9),
            Detection::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 1.5, 0),
        ]);
        assert!(tracks.is_empty());
        assert_eq!(t.tracked_count(), 0);
    }

    #[test]
    fn two_objects_get_distinct_ids() {
        let mut t = tracker();
        let tracks = t.update(&[
            det(0.0, 0.0, 50.0, 100.0, 0.9),
            det(500.0, 0.0, 550.0, 100.0, 0.9),
        ]);
        assert_eq!(tracks.len(), 2);
        let mut ids: Vec<u64> = tracks.iter().map(|t| t.track_id()).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn pools_stay_disjoint() {
        let mut t = tracker();
        t.update(&[
            det(0.0, 0.0, 50.0, 100.0, 0.9),
            det(500.0, 0.0, 550.0, 100.0, 0.9),
        ]);
        // one object disappears, one stays
        t.update(&[det(0.0, 0.0, 50.0, 100.0, 0.9)]);

        let tracked: Vec<u64> = t.tracked_tracks.iter().map(|x| x.track_id()).collect();
        let lost: Vec<u64> = t.lost_tracks.iter().map(|x| x.track_id()).collect();
        let removed: Vec<u64> = t.removed_tracks.iter().map(|x| x.track_id()).collect();

        for id in &tracked {
            assert!(!lost.contains(id) && !removed.contains(id));
        }
        for id in &lost {
            assert!(!removed.contains(id));
        }
        assert_eq!(t.lost_count(), 1);
    }

    #[test]
    fn identical_runs_are_deterministic() {
        use rand::prelude::*;

        for kind in [AssignerKind::Hungarian, AssignerKind::Greedy] {
            let config = ByteTrackerConfig::new().assigner(kind);
            let mut a = ByteTracker::new(config.clone()).unwrap();
            let mut b = ByteTracker::new(config).unwrap();

            let mut rng = StdRng::seed_from_u64(42);
            for frame in 0..50u64 {
                let mut frame_dets = Vec::new();
                for obj in 0..4 {
                    let jx: f32 = rng.gen_range(-2.0..2.0);
                    let jy: f32 = rng.gen_range(-2.0..2.0);
                    let x = 100.0 * obj as f32 + 3.0 * frame as f32 + jx;
                    let y = 50.0 + jy;
                    let score = rng.gen_range(0.55..0.95);
                    frame_dets.push(det(x, y, x + 40.0, y + 80.0, score));
                }

                let ra = a.update(&frame_dets);
                let rb = b.update(&frame_dets);

                assert_eq!(ra.len(), rb.len());
                for (ta, tb) in ra.iter().zip(rb.iter()) {
                    assert_eq!(ta.track_id(), tb.track_id());
                    assert!(ta.tlbr().almost_same(&tb.tlbr(), EPS));
                }
            }
        }
    }

    #[test]
    fn reset_restarts_the_id_space() {
        let mut t = tracker();
        t.update(&[det(0.0, 0.0, 50.0, 100.0, 0.9)]);
        t.reset();
        assert_eq!(t.frame_id(), 0);
        let tracks = t.update(&[det(0.0, 0.0, 50.0, 100.0, 0.9)]);
        assert_eq!(tracks[0].track_id(), 1);
    }
}
