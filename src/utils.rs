/// Bounding boxes and IoU primitives
///
pub mod bbox;

/// Kalman filtering for bounding-box motion
///
pub mod kalman;

/// Bipartite assignment strategies used by the association step
///
pub mod assignment;
