use crate::trackers::batch::FrameBatchRequest;
use crate::trackers::byte::tracker::ByteTracker;
use crate::trackers::byte::ByteTrackerConfig;
use crate::trackers::manager::output::{TrackStatus, TrackedObject, ZoneTransition};
use crate::trackers::Detection;
use crate::utils::assignment::AssignerKind;
use crate::zones::{Zone, ZoneProvider};
use crate::Errors;
use log::{error, info, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;

/// Output DTOs
///
pub mod output;

/// Synchronous observer of per-frame track snapshots
///
pub trait TrackObserver: Send + Sync {
    fn on_track(&self, object: &TrackedObject) -> anyhow::Result<()>;
}

/// Synchronous observer of zone transitions
///
pub trait TransitionObserver: Send + Sync {
    fn on_transition(&self, transition: &ZoneTransition) -> anyhow::Result<()>;
}

static DEFAULT_CLASS_LABELS: Lazy<HashMap<i64, &'static str>> =
    Lazy::new(|| HashMap::from([(0, "person")]));

/// Per-(camera, track) bookkeeping for zone semantics. Entries are pruned as
/// soon as the underlying track is drained as removed.
#[derive(Debug, Clone, Copy)]
struct LedgerEntry {
    zone_id: Option<u64>,
    zone_entered: SystemTime,
    first_seen: SystemTime,
}

/// Health snapshot of one camera pipeline
///
#[derive(Debug, Clone)]
pub struct CameraStats {
    pub active_tracks: usize,
    pub lost_tracks: usize,
    pub frame_id: u64,
}

/// Health snapshot of the whole manager; the degraded-condition probe
///
#[derive(Debug, Clone)]
pub struct ManagerStats {
    pub total_cameras: usize,
    pub assigner: AssignerKind,
    pub callback_errors: usize,
    pub cameras: HashMap<u64, CameraStats>,
}

/// Multi-camera tracking orchestrator.
///
/// Owns one `ByteTracker` per camera, enriches tracker output with zone
/// membership, derives zone transitions and fans results out to registered
/// observers. Calls for one camera must be serialized by the caller; different
/// cameras may update concurrently.
///
pub struct TrackingManager {
    zones: Arc<dyn ZoneProvider>,
    config: ByteTrackerConfig,
    trackers: RwLock<HashMap<u64, Arc<Mutex<ByteTracker>>>>,
    ledger: Mutex<HashMap<(u64, u64), LedgerEntry>>,
    track_observers: RwLock<Vec<Box<dyn TrackObserver>>>,
    transition_observers: RwLock<Vec<Box<dyn TransitionObserver>>>,
    labels: HashMap<i64, String>,
    callback_errors: AtomicUsize,
}

impl TrackingManager {
    pub fn new(zones: Arc<dyn ZoneProvider>, config: ByteTrackerConfig) -> Result<Self, Errors> {
        config.validate()?;
        info!(
            "TrackingManager initialized (thresh={}, buffer={})",
            config.get_track_thresh(),
            config.get_track_buffer()
        );
        Ok(Self {
            zones,
            config,
            trackers: RwLock::new(HashMap::default()),
            ledger: Mutex::new(HashMap::default()),
            track_observers: RwLock::new(Vec::default()),
            transition_observers: RwLock::new(Vec::default()),
            labels: DEFAULT_CLASS_LABELS
                .iter()
                .map(|(&k, &v)| (k, v.to_owned()))
                .collect(),
            callback_errors: AtomicUsize::new(0),
        })
    }

    /// Replaces the class-name table used for `TrackedObject::class_name`
    ///
    pub fn with_labels(mut self, labels: HashMap<i64, String>) -> Self {
        self.labels = labels;
        self
    }

    /// Creates the tracker for the camera ahead of the first frame
    ///
    pub fn add_camera(&self, camera_id: u64) {
        let mut trackers = self
            .trackers
            .write()
            .expect("Tracker registry must always be accessible");
        if trackers.contains_key(&camera_id) {
            warn!("Tracker for camera {} already exists", camera_id);
            return;
        }
        let tracker = ByteTracker::new(self.config.clone())
            .expect("The manager configuration was validated at construction");
        trackers.insert(camera_id, Arc::new(Mutex::new(tracker)));
        info!("Added tracker for camera {}", camera_id);
    }

    /// Drops the camera tracker and its zone bookkeeping
    ///
    pub fn remove_camera(&self, camera_id: u64) {
        let removed = self
            .trackers
            .write()
            .expect("Tracker registry must always be accessible")
            .remove(&camera_id);
        if removed.is_some() {
            self.ledger
                .lock()
                .expect("Zone ledger must always be accessible")
                .retain(|&(cam, _), _| cam != camera_id);
            info!("Removed tracker for camera {}", camera_id);
        }
    }

    fn tracker_for(&self, camera_id: u64) -> Arc<Mutex<ByteTracker>> {
        {
            let trackers = self
                .trackers
                .read()
                .expect("Tracker registry must always be accessible");
            if let Some(t) = trackers.get(&camera_id) {
                return t.clone();
            }
        }
        self.add_camera(camera_id);
        self.trackers
            .read()
            .expect("Tracker registry must always be accessible")
            .get(&camera_id)
            .cloned()
            .expect("The camera tracker was just created")
    }

    pub fn add_track_observer(&self, observer: Box<dyn TrackObserver>) {
        self.track_observers
            .write()
            .expect("Observer registry must always be accessible")
            .push(observer);
    }

    pub fn add_transition_observer(&self, observer: Box<dyn TransitionObserver>) {
        self.transition_observers
            .write()
            .expect("Observer registry must always be accessible")
            .push(observer);
    }

    /// Runs one tracking step for the camera and returns the enriched
    /// snapshots. Zone transitions are synthesized and dispatched before the
    /// per-track snapshots, observer failures are contained.
    ///
    pub fn update(
        &self,
        camera_id: u64,
        detections: &[Detection],
        timestamp: SystemTime,
    ) -> Vec<TrackedObject> {
        let tracker = self.tracker_for(camera_id);
        let (tracks, frame_id, removed) = {
            let mut tracker = tracker
                .lock()
                .expect("A camera tracker must always be lockable");
            let tracks = tracker.update(detections);
            (tracks, tracker.frame_id(), tracker.wasted())
        };

        if !removed.is_empty() {
            let mut ledger = self
                .ledger
                .lock()
                .expect("Zone ledger must always be accessible");
            for t in &removed {
                ledger.remove(&(camera_id, t.track_id()));
            }
        }

        let zones: Vec<Zone> = self
            .zones
            .zones_for_camera(camera_id)
            .into_iter()
            .filter(|z| z.active)
            .collect();

        let mut result = Vec::with_capacity(tracks.len());
        for track in tracks {
            let bbox = track.tlbr();
            let (center_x, center_y) = bbox.center();

            // first containing zone wins; zones are not mutually exclusive
            let current = zones.iter().find(|z| z.contains((center_x, center_y)));
            let current_zone_id = current.map(|z| z.zone_id);

            let (first_seen, transition) = {
                let mut ledger = self
                    .ledger
                    .lock()
                    .expect("Zone ledger must always be accessible");
                let entry = ledger
                    .entry((camera_id, track.track_id()))
                    .or_insert(LedgerEntry {
                        zone_id: None,
                        zone_entered: timestamp,
                        first_seen: timestamp,
                    });

                let transition = if entry.zone_id != current_zone_id {
                    let duration = entry.zone_id.map(|_| seconds_between(entry.zone_entered, timestamp));
                    let t = ZoneTransition {
                        track_id: track.track_id(),
                        camera_id,
                        from_zone_id: entry.zone_id,
                        from_zone_name: entry
                            .zone_id
                            .and_then(|id| zones.iter().find(|z| z.zone_id == id))
                            .map(|z| z.name.clone()),
                        to_zone_id: current_zone_id,
                        to_zone_name: current.map(|z| z.name.clone()),
                        transition_time: timestamp,
                        duration_in_prev_zone: duration,
                    };
                    entry.zone_id = current_zone_id;
                    entry.zone_entered = timestamp;
                    Some(t)
                } else {
                    None
                };

                (entry.first_seen, transition)
            };

            if let Some(transition) = &transition {
                let observers = self
                    .transition_observers
                    .read()
                    .expect("Observer registry must always be accessible");
                for observer in observers.iter() {
                    if let Err(e) = observer.on_transition(transition) {
                        self.callback_errors.fetch_add(1, Ordering::Relaxed);
                        error!("Transition observer error: {:?}", e);
                    }
                }
            }

            let object = TrackedObject {
                track_id: track.track_id(),
                camera_id,
                class_id: track.class_id(),
                class_name: self.class_name(track.class_id()),
                bbox,
                confidence: track.score(),
                status: TrackStatus::from(track.state()),
                frame_id,
                age: track.tracklet_len(),
                center_x,
                center_y,
                zone_id: current_zone_id,
                zone_name: current.map(|z| z.name.clone()),
                first_seen,
                last_seen: timestamp,
            };

            {
                let observers = self
                    .track_observers
                    .read()
                    .expect("Observer registry must always be accessible");
                for observer in observers.iter() {
                    if let Err(e) = observer.on_track(&object) {
                        self.callback_errors.fetch_add(1, Ordering::Relaxed);
                        error!("Tracking observer error: {:?}", e);
                    }
                }
            }

            result.push(object);
        }

        result
    }

    /// Runs the batched frames concurrently, one worker per camera, and
    /// delivers each camera's snapshots through the batch result channel.
    ///
    pub fn update_batch(&self, request: &FrameBatchRequest) {
        std::thread::scope(|s| {
            for (&camera_id, (detections, timestamp)) in request.get_batch() {
                s.spawn(move || {
                    let objects = self.update(camera_id, detections, *timestamp);
                    request.send((camera_id, objects));
                });
            }
        });
    }

    fn class_name(&self, class_id: i64) -> String {
        self.labels
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }

    /// Clears one camera's tracker state and zone bookkeeping
    ///
    pub fn reset_camera(&self, camera_id: u64) {
        let tracker = {
            let trackers = self
                .trackers
                .read()
                .expect("Tracker registry must always be accessible");
            trackers.get(&camera_id).cloned()
        };
        if let Some(tracker) = tracker {
            tracker
                .lock()
                .expect("A camera tracker must always be lockable")
                .reset();
            self.ledger
                .lock()
                .expect("Zone ledger must always be accessible")
                .retain(|&(cam, _), _| cam != camera_id);
            info!("Reset tracker for camera {}", camera_id);
        }
    }

    /// Clears every camera
    ///
    pub fn reset_all(&self) {
        let trackers = self
            .trackers
            .read()
            .expect("Tracker registry must always be accessible");
        for tracker in trackers.values() {
            tracker
                .lock()
                .expect("A camera tracker must always be lockable")
                .reset();
        }
        self.ledger
            .lock()
            .expect("Zone ledger must always be accessible")
            .clear();
        info!("Reset all trackers");
    }

    /// Active (confirmed + unconfirmed) track counts, for one camera or all
    ///
    pub fn active_tracks(&self, camera_id: Option<u64>) -> HashMap<u64, usize> {
        let trackers = self
            .trackers
            .read()
            .expect("Tracker registry must always be accessible");
        match camera_id {
            Some(camera_id) => {
                let count = trackers
                    .get(&camera_id)
                    .map(|t| {
                        t.lock()
                            .expect("A camera tracker must always be lockable")
                            .tracked_count()
                    })
                    .unwrap_or(0);
                HashMap::from([(camera_id, count)])
            }
            None => trackers
                .iter()
                .map(|(&cam, t)| {
                    (
                        cam,
                        t.lock()
                            .expect("A camera tracker must always be lockable")
                            .tracked_count(),
                    )
                })
                .collect(),
        }
    }

    /// Health probe: per-camera counters plus the degraded-condition signals
    /// (selected assigner, accumulated observer failures)
    ///
    pub fn get_stats(&self) -> ManagerStats {
        let trackers = self
            .trackers
            .read()
            .expect("Tracker registry must always be accessible");
        let cameras = trackers
            .iter()
            .map(|(&cam, t)| {
                let t = t
                    .lock()
                    .expect("A camera tracker must always be lockable");
                (
                    cam,
                    CameraStats {
                        active_tracks: t.tracked_count(),
                        lost_tracks: t.lost_count(),
                        frame_id: t.frame_id(),
                    },
                )
            })
            .collect();

        ManagerStats {
            total_cameras: trackers.len(),
            assigner: self.config.get_assigner(),
            callback_errors: self.callback_errors.load(Ordering::Relaxed),
            cameras,
        }
    }
}

fn seconds_between(from: SystemTime, to: SystemTime) -> f64 {
    to.duration_since(from)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
