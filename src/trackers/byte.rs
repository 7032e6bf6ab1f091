use crate::utils::assignment::AssignerKind;
use crate::Errors;
use std::sync::atomic::{AtomicU64, Ordering};

/// Track lifecycle state machine
///
pub mod track;

/// The per-camera association engine
///
pub mod tracker;

/// Default detection confidence gate for opening tracks and stage-1 partitioning
pub const DEFAULT_TRACK_THRESHOLD: f32 = 0.5;

/// Default number of frames a lost track survives (at 30 fps)
pub const DEFAULT_TRACK_BUFFER: usize = 30;

/// Default IoU gate of the first association stage
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.8;

pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Default bound of the per-track bbox history
pub const DEFAULT_HISTORY_LENGTH: usize = 30;

/// Looser IoU gate of the second (low-confidence) association stage
pub(crate) const SECOND_STAGE_MATCH_THRESHOLD: f32 = 0.5;

/// Stricter IoU gate for unconfirmed tracks
pub(crate) const UNCONFIRMED_MATCH_THRESHOLD: f32 = 0.7;

/// ByteTracker configuration.
///
/// All values have defaults; out-of-range values are rejected at tracker
/// construction time, never during `update()`.
///
#[derive(Debug, Clone)]
pub struct ByteTrackerConfig {
    track_thresh: f32,
    track_buffer: usize,
    match_thresh: f32,
    frame_rate: u32,
    history_len: usize,
    assigner: AssignerKind,
}

impl Default for ByteTrackerConfig {
    fn default() -> Self {
        Self {
            track_thresh: DEFAULT_TRACK_THRESHOLD,
            track_buffer: DEFAULT_TRACK_BUFFER,
            match_thresh: DEFAULT_MATCH_THRESHOLD,
            frame_rate: DEFAULT_FRAME_RATE,
            history_len: DEFAULT_HISTORY_LENGTH,
            assigner: AssignerKind::default(),
        }
    }
}

impl ByteTrackerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_thresh(mut self, v: f32) -> Self {
        self.track_thresh = v;
        self
    }

    pub fn track_buffer(mut self, v: usize) -> Self {
        self.track_buffer = v;
        self
    }

    pub fn match_thresh(mut self, v: f32) -> Self {
        self.match_thresh = v;
        self
    }

    pub fn frame_rate(mut self, v: u32) -> Self {
        self.frame_rate = v;
        self
    }

    pub fn history_len(mut self, v: usize) -> Self {
        self.history_len = v;
        self
    }

    pub fn assigner(mut self, v: AssignerKind) -> Self {
        self.assigner = v;
        self
    }

    pub fn get_track_thresh(&self) -> f32 {
        self.track_thresh
    }

    pub fn get_track_buffer(&self) -> usize {
        self.track_buffer
    }

    pub fn get_match_thresh(&self) -> f32 {
        self.match_thresh
    }

    pub fn get_frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn get_history_len(&self) -> usize {
        self.history_len
    }

    pub fn get_assigner(&self) -> AssignerKind {
        self.assigner
    }

    /// How many frames a track survives in `Lost` before removal
    ///
    pub fn max_time_lost(&self) -> u64 {
        (self.frame_rate as f32 / 30.0 * self.track_buffer as f32) as u64
    }

    pub fn validate(&self) -> Result<(), Errors> {
        if !(self.track_thresh > 0.0 && self.track_thresh <= 1.0) {
            return Err(Errors::InvalidConfiguration(format!(
                "track_thresh must lay in (0.0, 1.0], got {}",
                self.track_thresh
            )));
        }
        if !(self.match_thresh > 0.0 && self.match_thresh <= 1.0) {
            return Err(Errors::InvalidConfiguration(format!(
                "match_thresh must lay in (0.0, 1.0], got {}",
                self.match_thresh
            )));
        }
        if self.track_buffer == 0 {
            return Err(Errors::InvalidConfiguration(
                "track_buffer must be positive".to_owned(),
            ));
        }
        if self.frame_rate == 0 {
            return Err(Errors::InvalidConfiguration(
                "frame_rate must be positive".to_owned(),
            ));
        }
        if self.history_len == 0 {
            return Err(Errors::InvalidConfiguration(
                "history_len must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Monotonic track id source.
///
/// Every tracker owns one by default; sharing a single generator between
/// camera trackers is safe (atomic increment) and partitions nothing, while
/// per-camera instances give each camera its own id space.
///
#[derive(Debug, Default)]
pub struct TrackIdGenerator {
    counter: AtomicU64,
}

impl TrackIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn reset(&self) {
        self.counter.store(0, Ordering::SeqCst);
    }

    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use crate::trackers::byte::{ByteTrackerConfig, TrackIdGenerator};

    #[test]
    fn default_config_is_valid() {
        let config = ByteTrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_time_lost(), 30);
    }

    #[test]
    fn max_time_lost_scales_with_frame_rate() {
        let config = ByteTrackerConfig::new().frame_rate(60).track_buffer(30);
        assert_eq!(config.max_time_lost(), 60);

        let config = ByteTrackerConfig::new().frame_rate(15).track_buffer(30);
        assert_eq!(config.max_time_lost(), 15);
    }

    #[test]
    fn invalid_configs_fail_fast() {
        assert!(ByteTrackerConfig::new().track_thresh(0.0).validate().is_err());
        assert!(ByteTrackerConfig::new().track_thresh(1.5).validate().is_err());
        assert!(ByteTrackerConfig::new().match_thresh(-0.8).validate().is_err());
        assert!(ByteTrackerConfig::new().track_buffer(0).validate().is_err());
        assert!(ByteTrackerConfig::new().frame_rate(0).validate().is_err());
        assert!(ByteTrackerConfig::new().history_len(0).validate().is_err());
    }

    #[test]
    fn id_generator_is_monotonic() {
        let gen = TrackIdGenerator::new();
        assert_eq!(gen.next_id(), 1);
        assert_eq!(gen.next_id(), 2);
        assert_eq!(gen.current(), 2);
        gen.reset();
        assert_eq!(gen.next_id(), 1);
    }
}
