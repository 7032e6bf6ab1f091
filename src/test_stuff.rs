use crate::trackers::Detection;
use crate::utils::bbox::BoundingBox;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Captures log output of the test run; safe to call repeatedly
///
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Person-class detection from raw coordinates
///
pub fn det(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Detection {
    Detection::new(BoundingBox::new(x1, y1, x2, y2), confidence, 0)
}

/// Timestamp of the frame counted from the epoch at the given frame rate
///
pub fn frame_time(frame: u64, fps: u32) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs_f64(frame as f64 / fps as f64)
}

/// Linearly translated copy of the box, `steps` frames later
///
pub fn translated(bbox: &BoundingBox, steps: u64, dx: f32, dy: f32) -> BoundingBox {
    let shift_x = dx * steps as f32;
    let shift_y = dy * steps as f32;
    BoundingBox::new(
        bbox.x1() + shift_x,
        bbox.y1() + shift_y,
        bbox.x2() + shift_x,
        bbox.y2() + shift_y,
    )
}
