// Original source code idea from
// https://github.com/nwojke/deep_sort/blob/master/deep_sort/kalman_filter.py
//
use crate::utils::bbox::Xyah;
use crate::utils::kalman::KalmanState;
use nalgebra::{SMatrix, SVector};

pub const DIM_XYAH: usize = 4;
pub const DIM_XYAH_X2: usize = DIM_XYAH * 2;

const DT: u64 = 1;

/// Kalman filter
///
#[derive(Debug)]
pub struct XyahKalmanFilter {
    motion_matrix: SMatrix<f32, DIM_XYAH_X2, DIM_XYAH_X2>,
    update_matrix: SMatrix<f32, DIM_XYAH, DIM_XYAH_X2>,
    std_position_weight: f32,
    std_velocity_weight: f32,
}

/// Default initializer
impl Default for XyahKalmanFilter {
    fn default() -> Self {
        XyahKalmanFilter::new(1.0 / 20.0, 1.0 / 160.0)
    }
}

impl XyahKalmanFilter {
    /// Constructor with custom weights (shouldn't be used without the need)
    pub fn new(position_weight: f32, velocity_weight: f32) -> Self {
        let mut motion_matrix: SMatrix<f32, DIM_XYAH_X2, DIM_XYAH_X2> = SMatrix::identity();

        for i in 0..DIM_XYAH {
            motion_matrix[(i, DIM_XYAH + i)] = DT as f32;
        }

        XyahKalmanFilter {
            motion_matrix,
            update_matrix: SMatrix::identity(),
            std_position_weight: position_weight,
            std_velocity_weight: velocity_weight,
        }
    }

    // Noise stds scale with the current height estimate, so uncertainty
    // adapts to the object scale across near/far views. The aspect-ratio
    // component keeps a fixed small std.
    fn std_position(&self, k: f32, cnst: f32, h: f32) -> [f32; DIM_XYAH] {
        let pos_weight = k * self.std_position_weight * h;
        [pos_weight, pos_weight, cnst, pos_weight]
    }

    fn std_velocity(&self, k: f32, cnst: f32, h: f32) -> [f32; DIM_XYAH] {
        let vel_weight = k * self.std_velocity_weight * h;
        [vel_weight, vel_weight, cnst, vel_weight]
    }

    /// Initialize the filter with the first observation
    ///
    pub fn initiate(&self, measurement: &Xyah) -> KalmanState<DIM_XYAH_X2> {
        let mean: SVector<f32, DIM_XYAH_X2> = SVector::from_iterator([
            measurement.cx,
            measurement.cy,
            measurement.aspect,
            measurement.height,
            0.0,
            0.0,
            0.0,
            0.0,
        ]);

        let mut std: SVector<f32, DIM_XYAH_X2> = SVector::from_iterator(
            self.std_position(2.0, 1e-2, measurement.height)
                .into_iter()
                .chain(self.std_velocity(10.0, 1e-5, measurement.height)),
        );

        std = std.component_mul(&std);

        let covariance: SMatrix<f32, DIM_XYAH_X2, DIM_XYAH_X2> = SMatrix::from_diagonal(&std);
        KalmanState { mean, covariance }
    }

    /// Predicts the state from the last state
    ///
    pub fn predict(&self, state: &KalmanState<DIM_XYAH_X2>) -> KalmanState<DIM_XYAH_X2> {
        let (mean, covariance) = (state.mean, state.covariance);
        let std_pos = self.std_position(1.0, 1e-2, mean[3]);
        let std_vel = self.std_velocity(1.0, 1e-5, mean[3]);

        let mut std: SVector<f32, DIM_XYAH_X2> =
            SVector::from_iterator(std_pos.into_iter().chain(std_vel));

        std = std.component_mul(&std);

        let motion_cov: SMatrix<f32, DIM_XYAH_X2, DIM_XYAH_X2> = SMatrix::from_diagonal(&std);

        let mean = self.motion_matrix * mean;
        let covariance =
            self.motion_matrix * covariance * self.motion_matrix.transpose() + motion_cov;
        KalmanState { mean, covariance }
    }

    fn project(
        &self,
        mean: SVector<f32, DIM_XYAH_X2>,
        covariance: SMatrix<f32, DIM_XYAH_X2, DIM_XYAH_X2>,
    ) -> KalmanState<DIM_XYAH> {
        let mut std: SVector<f32, DIM_XYAH> =
            SVector::from_iterator(self.std_position(1.0, 1e-1, mean[3]));

        std = std.component_mul(&std);

        let innovation_cov: SMatrix<f32, DIM_XYAH, DIM_XYAH> = SMatrix::from_diagonal(&std);

        let mean = self.update_matrix * mean;
        let covariance =
            self.update_matrix * covariance * self.update_matrix.transpose() + innovation_cov;
        KalmanState { mean, covariance }
    }

    /// Updates the state with the current observation
    ///
    pub fn update(
        &self,
        state: &KalmanState<DIM_XYAH_X2>,
        measurement: &Xyah,
    ) -> KalmanState<DIM_XYAH_X2> {
        let (mean, covariance) = (state.mean, state.covariance);
        let projected_state = self.project(mean, covariance);
        let (projected_mean, projected_cov) = (projected_state.mean, projected_state.covariance);

        let choletsky = projected_cov
            .cholesky()
            .expect("Projected covariance must stay positive definite");
        // transposed gain: S^-1 * H * P
        let kalman_gain = choletsky.solve(&(self.update_matrix * covariance));

        let innovation = SVector::from_iterator([
            measurement.cx,
            measurement.cy,
            measurement.aspect,
            measurement.height,
        ]) - projected_mean;

        let innovation: SMatrix<f32, 1, DIM_XYAH> = innovation.transpose();

        let mean = mean + (innovation * kalman_gain).transpose();
        let covariance = covariance - kalman_gain.transpose() * projected_cov * kalman_gain;
        KalmanState { mean, covariance }
    }
}

/// The smoothed box kept in the first four state components
///
impl From<KalmanState<DIM_XYAH_X2>> for Xyah {
    fn from(s: KalmanState<DIM_XYAH_X2>) -> Self {
        Xyah::new(s.mean[0], s.mean[1], s.mean[2], s.mean[3])
    }
}
