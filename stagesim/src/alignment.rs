//! Rigid frame alignment between a stage's local frame and the world frame.
//!
//! `FrameAligner::fit` estimates the least-squares rotation about the point
//! centroids from paired correspondences (SVD of the cross-covariance
//! matrix, with reflection correction so that `det(R) = +1`). The resulting
//! [`RigidTransform`] maps
//!
//! ```text
//! world = R * (local - source_centroid) + target_centroid
//! local = R^T * (world - target_centroid) + source_centroid
//! ```

use nalgebra::{Matrix3, Point3, Rotation3, Vector3};
use stagesim_common::consts::DEGENERACY_TOLERANCE;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while fitting a calibration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignmentError {
    /// Fewer than two pairs, or mismatched set sizes.
    #[error("Insufficient correspondence: {local} local vs {world} world points (need >= 2 pairs)")]
    InsufficientCorrespondence { local: usize, world: usize },

    /// Cross-covariance rank below two: points coincide or are collinear.
    #[error("Degenerate calibration: singular value ratio {ratio:.3e}")]
    DegenerateCalibration { ratio: f64 },
}

/// Rotation plus centroid offsets mapping local coordinates to world coordinates.
///
/// Immutable once fitted.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidTransform {
    rotation: Rotation3<f64>,
    source_centroid: Point3<f64>,
    target_centroid: Point3<f64>,
    rms_residual: f64,
}

impl RigidTransform {
    /// Local frame coincides with the world frame.
    pub fn identity() -> Self {
        Self::from_parts(Rotation3::identity(), Point3::origin(), Point3::origin())
    }

    /// Build a transform from a known rotation and centroid pair.
    pub fn from_parts(
        rotation: Rotation3<f64>,
        source_centroid: Point3<f64>,
        target_centroid: Point3<f64>,
    ) -> Self {
        Self {
            rotation,
            source_centroid,
            target_centroid,
            rms_residual: 0.0,
        }
    }

    pub fn rotation(&self) -> &Rotation3<f64> {
        &self.rotation
    }

    pub fn rotation_matrix(&self) -> &Matrix3<f64> {
        self.rotation.matrix()
    }

    pub fn source_centroid(&self) -> Point3<f64> {
        self.source_centroid
    }

    pub fn target_centroid(&self) -> Point3<f64> {
        self.target_centroid
    }

    /// Root-mean-square distance between mapped local points and their world
    /// counterparts, as observed at fit time.
    pub fn rms_residual(&self) -> f64 {
        self.rms_residual
    }

    /// Map a local-frame point into the world frame.
    pub fn to_world(&self, local: &Point3<f64>) -> Point3<f64> {
        self.target_centroid + self.rotation * (local - self.source_centroid)
    }

    /// Map a world-frame point into the local frame.
    pub fn to_local(&self, world: &Point3<f64>) -> Point3<f64> {
        self.source_centroid + self.rotation.inverse_transform_vector(&(world - self.target_centroid))
    }

    /// Rotate a local displacement into the world frame.
    pub fn to_world_vector(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * local
    }

    /// Rotate a world displacement into the local frame.
    pub fn to_local_vector(&self, world: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.inverse_transform_vector(world)
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Least-squares rigid fit over point correspondences.
#[derive(Debug, Clone, Copy)]
pub struct FrameAligner {
    /// Relative threshold on the second singular value.
    tolerance: f64,
}

impl Default for FrameAligner {
    fn default() -> Self {
        Self {
            tolerance: DEGENERACY_TOLERANCE,
        }
    }
}

impl FrameAligner {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Fit the rotation and centroids mapping `local[i]` onto `world[i]`.
    ///
    /// # Errors
    ///
    /// - `InsufficientCorrespondence` unless both sets hold the same number
    ///   of points and at least two.
    /// - `DegenerateCalibration` when the centered sets span fewer than two
    ///   dimensions (coincident or collinear points). Coplanar sets are fine.
    ///   Two points are always collinear, so every two-point set fails here:
    ///   a usable calibration needs three non-collinear pairs.
    pub fn fit(
        &self,
        local: &[Point3<f64>],
        world: &[Point3<f64>],
    ) -> Result<RigidTransform, AlignmentError> {
        if local.len() != world.len() || local.len() < 2 {
            return Err(AlignmentError::InsufficientCorrespondence {
                local: local.len(),
                world: world.len(),
            });
        }

        let source_centroid = centroid(local);
        let target_centroid = centroid(world);

        // H = sum (l - cl)(w - cw)^T
        let mut h = Matrix3::zeros();
        for (l, w) in local.iter().zip(world) {
            h += (l - source_centroid) * (w - target_centroid).transpose();
        }

        let svd = h.svd(true, true);
        let sigma = svd.singular_values;
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| sigma[b].total_cmp(&sigma[a]));
        let largest = sigma[order[0]];
        let ratio = if largest > f64::EPSILON {
            sigma[order[1]] / largest
        } else {
            0.0
        };
        if !ratio.is_finite() || ratio <= self.tolerance {
            return Err(AlignmentError::DegenerateCalibration { ratio });
        }

        let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
            return Err(AlignmentError::DegenerateCalibration { ratio });
        };

        let mut v = v_t.transpose();
        if (v * u.transpose()).determinant() < 0.0 {
            // Flip the axis of least variance.
            let weakest = order[2];
            for row in 0..3 {
                v[(row, weakest)] = -v[(row, weakest)];
            }
        }
        let rotation = Rotation3::from_matrix_unchecked(v * u.transpose());

        let mut transform = RigidTransform::from_parts(rotation, source_centroid, target_centroid);
        transform.rms_residual = rms_residual(&transform, local, world);

        debug!(
            "Fitted {} correspondences, singular values {:?}",
            local.len(),
            sigma.as_slice()
        );
        info!(
            "Calibration fit: rms residual {:.4} over {} points",
            transform.rms_residual,
            local.len()
        );
        Ok(transform)
    }
}

fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as f64)
}

fn rms_residual(transform: &RigidTransform, local: &[Point3<f64>], world: &[Point3<f64>]) -> f64 {
    let squared: f64 = local
        .iter()
        .zip(world)
        .map(|(l, w)| (transform.to_world(l) - w).norm_squared())
        .sum();
    (squared / local.len() as f64).sqrt()
}
