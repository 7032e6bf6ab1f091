use nalgebra::{SMatrix, SVector};

/// Constant-velocity filter over the `Xyah` box representation
///
pub mod xyah_box;

/// Kalman filter state owned by a single track.
///
/// The filter itself is stateless; aliasing a state between tracks is
/// impossible because the state is a plain value.
///
#[derive(Copy, Clone, Debug)]
pub struct KalmanState<const X: usize> {
    pub mean: SVector<f32, X>,
    pub covariance: SMatrix<f32, X, X>,
}
