use crate::trackers::manager::output::TrackedObject;
use crate::trackers::Detection;
use crossbeam::channel::{Receiver, Sender};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

pub type BatchFrames = HashMap<u64, (Vec<Detection>, SystemTime)>;
pub type CameraTracks = (u64, Vec<TrackedObject>);

/// One frame per camera, processed concurrently by
/// `TrackingManager::update_batch`
///
#[derive(Debug, Clone)]
pub struct FrameBatchRequest {
    batch: BatchFrames,
    sender: Sender<CameraTracks>,
    batch_size: Arc<Mutex<usize>>,
}

/// Consumer side of a batch: one `CameraTracks` record arrives per camera
///
#[derive(Clone, Debug)]
pub struct FrameBatchResult {
    receiver: Receiver<CameraTracks>,
    batch_size: Arc<Mutex<usize>>,
}

impl FrameBatchResult {
    pub fn ready(&self) -> bool {
        !self.receiver.is_empty()
    }

    pub fn get(&self) -> CameraTracks {
        self.receiver
            .recv()
            .expect("Receiver must always receive batch computation result")
    }

    pub fn batch_size(&self) -> usize {
        *self.batch_size.lock().unwrap()
    }
}

impl FrameBatchRequest {
    pub fn new() -> (Self, FrameBatchResult) {
        let (sender, receiver) = crossbeam::channel::unbounded();
        let batch_size = Arc::new(Mutex::new(0));
        (
            Self {
                batch: BatchFrames::default(),
                sender,
                batch_size: batch_size.clone(),
            },
            FrameBatchResult {
                receiver,
                batch_size,
            },
        )
    }

    pub fn add(&mut self, camera_id: u64, detections: Vec<Detection>, timestamp: SystemTime) {
        self.batch.insert(camera_id, (detections, timestamp));
        let mut batch_size = self.batch_size.lock().unwrap();
        *batch_size = self.batch.len();
    }

    pub fn get_batch(&self) -> &BatchFrames {
        &self.batch
    }

    pub fn batch_size(&self) -> usize {
        *self.batch_size.lock().unwrap()
    }

    pub(crate) fn send(&self, res: CameraTracks) -> bool {
        let res = self.sender.send(res);
        if let Err(e) = res {
            debug!(
                "Error occurred when sending results to the batch result object. Error is: {:?}",
                e
            );
            false
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_stuff::{det, frame_time};
    use crate::trackers::batch::FrameBatchRequest;
    use crate::trackers::byte::ByteTrackerConfig;
    use crate::trackers::manager::TrackingManager;
    use crate::zones::StaticZones;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn request_accumulates_cameras() {
        let (mut request, result) = FrameBatchRequest::new();
        request.add(0, vec![det(0.0, 0.0, 10.0, 20.0, 0.9)], frame_time(1, 30));
        request.add(1, vec![], frame_time(1, 30));
        assert_eq!(result.batch_size(), 2);
        assert!(!result.ready());

        assert!(request.send((0, vec![])));
        assert!(result.ready());
        let (camera, tracks) = result.get();
        assert_eq!(camera, 0);
        assert!(tracks.is_empty());

        drop(result);
        assert!(!request.send((0, vec![])));
    }

    #[test]
    fn batch_update_covers_every_camera() {
        let manager =
            TrackingManager::new(Arc::new(StaticZones::default()), ByteTrackerConfig::default())
                .unwrap();

        let (mut request, result) = FrameBatchRequest::new();
        for camera in 0..4u64 {
            request.add(
                camera,
                vec![det(0.0, 0.0, 50.0, 100.0, 0.9)],
                frame_time(1, 30),
            );
        }
        manager.update_batch(&request);

        let mut seen = HashMap::new();
        for _ in 0..4 {
            let (camera, tracks) = result.get();
            seen.insert(camera, tracks.len());
        }
        assert_eq!(seen.len(), 4);
        assert!(seen.values().all(|&n| n == 1));
        assert!(!result.ready());
    }
}
