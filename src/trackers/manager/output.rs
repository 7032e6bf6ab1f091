use crate::trackers::byte::track::TrackState;
use crate::utils::bbox::BoundingBox;
use std::fmt;
use std::time::SystemTime;

/// Externally visible track status
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    Active,
    Lost,
    Finished,
}

impl From<TrackState> for TrackStatus {
    fn from(state: TrackState) -> Self {
        match state {
            TrackState::Tracked => TrackStatus::Active,
            TrackState::Lost => TrackStatus::Lost,
            _ => TrackStatus::Finished,
        }
    }
}

impl fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrackStatus::Active => "active",
            TrackStatus::Lost => "lost",
            TrackStatus::Finished => "finished",
        })
    }
}

/// Enriched per-frame snapshot of one confirmed track
///
#[derive(Debug, Clone)]
pub struct TrackedObject {
    pub track_id: u64,
    pub camera_id: u64,
    pub class_id: i64,
    pub class_name: String,
    /// Kalman-smoothed box
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub status: TrackStatus,
    pub frame_id: u64,
    /// consecutive successful updates since the last (re)activation
    pub age: u64,
    pub center_x: f32,
    pub center_y: f32,
    pub zone_id: Option<u64>,
    pub zone_name: Option<String>,
    pub first_seen: SystemTime,
    pub last_seen: SystemTime,
}

/// A change of the zone containing a track's centroid
///
#[derive(Debug, Clone)]
pub struct ZoneTransition {
    pub track_id: u64,
    pub camera_id: u64,
    pub from_zone_id: Option<u64>,
    pub from_zone_name: Option<String>,
    pub to_zone_id: Option<u64>,
    pub to_zone_name: Option<String>,
    pub transition_time: SystemTime,
    /// seconds spent in the previous zone, None when there was no previous zone
    pub duration_in_prev_zone: Option<f64>,
}

#[cfg(test)]
mod tests {
    use crate::trackers::byte::track::TrackState;
    use crate::trackers::manager::output::TrackStatus;

    #[test]
    fn status_mapping() {
        assert_eq!(TrackStatus::from(TrackState::Tracked), TrackStatus::Active);
        assert_eq!(TrackStatus::from(TrackState::Lost), TrackStatus::Lost);
        assert_eq!(TrackStatus::from(TrackState::Removed), TrackStatus::Finished);
        assert_eq!(TrackStatus::from(TrackState::New), TrackStatus::Finished);
        assert_eq!(TrackStatus::Active.to_string(), "active");
    }
}
