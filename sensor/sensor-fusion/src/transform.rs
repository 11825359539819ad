//! Rigid transforms and the cloud frame transformer.

use nalgebra::{Isometry3, Matrix3, Matrix4, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
use sensor_types::{FrameId, PointCloud, Timestamp};
use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};

/// Tolerance used when validating a matrix as a rotation.
const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// A 3D rigid body transform (rotation + translation).
///
/// Always a proper rigid motion: constructors that accept arbitrary input
/// ([`RigidTransform::from_matrix`]) validate it.
///
/// # Example
///
/// ```
/// use sensor_fusion::RigidTransform;
/// use nalgebra::{Point3, Vector3};
///
/// let t = RigidTransform::from_translation(Vector3::new(10.0, 0.0, 0.0));
/// let p = t.apply_point(&Point3::origin());
/// assert!((p.x - 10.0).abs() < 1e-12);
///
/// let back = t.inverse().apply_point(&p);
/// assert!(back.coords.norm() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidTransform {
    isometry: Isometry3<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            isometry: Isometry3::identity(),
        }
    }

    /// Translation only.
    #[must_use]
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::from_parts(translation, UnitQuaternion::identity())
    }

    /// Rotation only.
    #[must_use]
    pub fn from_rotation(rotation: UnitQuaternion<f64>) -> Self {
        Self::from_parts(Vector3::zeros(), rotation)
    }

    /// Rotation followed by translation.
    #[must_use]
    pub fn from_parts(translation: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self {
            isometry: Isometry3::from_parts(Translation3::from(translation), rotation),
        }
    }

    /// Translation plus roll/pitch/yaw (radians, applied roll first about X,
    /// then pitch about Y, then yaw about Z).
    #[must_use]
    pub fn from_xyz_rpy(translation: Vector3<f64>, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self::from_parts(translation, UnitQuaternion::from_euler_angles(roll, pitch, yaw))
    }

    /// Builds a transform from a homogeneous 4x4 matrix.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidTransform`] if the matrix has non-finite
    /// entries, a bottom row other than `0 0 0 1`, or a 3x3 block that is not
    /// a proper rotation (orthonormal with determinant +1).
    pub fn from_matrix(matrix: &Matrix4<f64>) -> Result<Self> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(FusionError::invalid_transform("matrix has non-finite entries"));
        }

        let bottom = matrix.fixed_view::<1, 4>(3, 0);
        let expected_bottom = [0.0, 0.0, 0.0, 1.0];
        if bottom
            .iter()
            .zip(expected_bottom)
            .any(|(a, b)| (a - b).abs() > ORTHONORMAL_TOLERANCE)
        {
            return Err(FusionError::invalid_transform("bottom row must be 0 0 0 1"));
        }

        let rotation: Matrix3<f64> = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let gram = rotation.transpose() * rotation;
        if (gram - Matrix3::identity()).amax() > ORTHONORMAL_TOLERANCE {
            return Err(FusionError::invalid_transform("rotation block is not orthonormal"));
        }
        let det = rotation.determinant();
        if (det - 1.0).abs() > ORTHONORMAL_TOLERANCE {
            return Err(FusionError::invalid_transform(format!(
                "rotation determinant is {det}, expected 1"
            )));
        }

        let translation: Vector3<f64> = matrix.fixed_view::<3, 1>(0, 3).into_owned();
        let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation));
        Ok(Self::from_parts(translation, rotation))
    }

    /// The underlying isometry.
    #[must_use]
    pub const fn isometry(&self) -> &Isometry3<f64> {
        &self.isometry
    }

    /// Translation component.
    #[must_use]
    pub fn translation(&self) -> Vector3<f64> {
        self.isometry.translation.vector
    }

    /// Rotation component.
    #[must_use]
    pub const fn rotation(&self) -> UnitQuaternion<f64> {
        self.isometry.rotation
    }

    /// Applies the transform to a point.
    #[must_use]
    pub fn apply_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.isometry.transform_point(point)
    }

    /// Inverse transform.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            isometry: self.isometry.inverse(),
        }
    }

    /// Composes this transform with another (`self * other`): `other` is
    /// applied first.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            isometry: self.isometry * other.isometry,
        }
    }

    /// Interpolates towards `other`: linear in translation, spherical in
    /// rotation. `t` is clamped to `[0, 1]`.
    #[must_use]
    pub fn interpolate(&self, other: &Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let translation = self.translation().lerp(&other.translation(), t);
        let a = self.rotation();
        let b = other.rotation();
        // slerp is undefined for opposite rotations; fall back to nlerp there
        let rotation = a.try_slerp(&b, t, 1e-9).unwrap_or_else(|| a.nlerp(&b, t));
        Self::from_parts(translation, rotation)
    }

    /// Returns true if rotation angle and translation are both below `epsilon`.
    #[must_use]
    pub fn is_identity(&self, epsilon: f64) -> bool {
        self.rotation().angle() < epsilon && self.translation().norm() < epsilon
    }
}

/// A rigid transform tagged with the frames it connects and the time it is
/// valid at.
///
/// `transform` maps coordinates expressed in `source` into `target`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StampedTransform {
    /// Frame the transform maps into.
    pub target: FrameId,
    /// Frame the transform maps from.
    pub source: FrameId,
    /// Time the transform is valid at.
    pub stamp: Timestamp,
    /// The transform itself.
    pub transform: RigidTransform,
}

impl StampedTransform {
    /// Creates a stamped transform.
    #[must_use]
    pub fn new(
        target: impl Into<FrameId>,
        source: impl Into<FrameId>,
        stamp: Timestamp,
        transform: RigidTransform,
    ) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
            stamp,
            transform,
        }
    }

    /// The same relation in the opposite direction.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            target: self.source.clone(),
            source: self.target.clone(),
            stamp: self.stamp,
            transform: self.transform.inverse(),
        }
    }
}

/// Expresses a cloud in the transform's target frame.
///
/// Every point position is mapped by the transform; point count, order,
/// colors, intensities and the capture stamp are preserved, and the output
/// is labeled with `transform.target`.
///
/// # Errors
///
/// Returns [`FusionError::FrameMismatch`] if the cloud is not expressed in
/// `transform.source`.
///
/// # Example
///
/// ```
/// use sensor_fusion::{transform_cloud, RigidTransform, StampedTransform};
/// use sensor_types::{CloudHeader, PointCloud, Timestamp};
/// use nalgebra::Vector3;
///
/// let mut cloud = PointCloud::new(CloudHeader::new(Timestamp::from_nanos(3), "camera"));
/// cloud.push_coords(0.0, 0.0, 0.0);
///
/// let tf = StampedTransform::new(
///     "base_link",
///     "camera",
///     Timestamp::from_nanos(3),
///     RigidTransform::from_translation(Vector3::new(0.0, 0.0, 0.5)),
/// );
/// let moved = transform_cloud(&cloud, &tf).unwrap();
/// assert_eq!(moved.frame().as_str(), "base_link");
/// assert!((moved.points[0].position.z - 0.5).abs() < 1e-12);
/// ```
pub fn transform_cloud(cloud: &PointCloud, transform: &StampedTransform) -> Result<PointCloud> {
    if cloud.frame() != &transform.source {
        return Err(FusionError::FrameMismatch {
            expected: transform.source.clone(),
            actual: cloud.frame().clone(),
        });
    }

    trace!(
        points = cloud.len(),
        source = %transform.source,
        target = %transform.target,
        "transforming cloud"
    );

    let rigid = transform.transform;
    Ok(cloud.map_positions(transform.target.clone(), |p| rigid.apply_point(p)))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sensor_types::{CloudHeader, CloudPoint};
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn identity_is_default() {
        assert!(RigidTransform::default().is_identity(1e-12));
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(RigidTransform::identity().apply_point(&p), p);
    }

    #[test]
    fn rotation_about_z() {
        let t = RigidTransform::from_xyz_rpy(Vector3::zeros(), 0.0, 0.0, FRAC_PI_2);
        let p = t.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn inverse_and_compose() {
        let t = RigidTransform::from_xyz_rpy(Vector3::new(1.0, -2.0, 3.0), 0.3, -0.2, 1.1);
        assert!(t.compose(&t.inverse()).is_identity(1e-9));

        let a = RigidTransform::from_translation(Vector3::new(1.0, 0.0, 0.0));
        let b = RigidTransform::from_xyz_rpy(Vector3::zeros(), 0.0, 0.0, FRAC_PI_2);
        // b first, then a
        let p = a.compose(&b).apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn matrix_roundtrip() {
        let t = RigidTransform::from_xyz_rpy(Vector3::new(0.5, 0.25, -1.0), 0.1, 0.2, 0.3);
        let back = RigidTransform::from_matrix(&t.isometry().to_homogeneous()).unwrap();
        assert!(back.compose(&t.inverse()).is_identity(1e-9));
    }

    #[test]
    fn matrix_rejects_scale() {
        let m = Matrix4::new_scaling(2.0);
        let err = RigidTransform::from_matrix(&m).unwrap_err();
        assert!(matches!(err, FusionError::InvalidTransform(_)));
    }

    #[test]
    fn matrix_rejects_reflection() {
        let mut m = Matrix4::identity();
        m[(2, 2)] = -1.0;
        let err = RigidTransform::from_matrix(&m).unwrap_err();
        assert!(err.to_string().contains("determinant"));
    }

    #[test]
    fn matrix_rejects_projective_row() {
        let mut m = Matrix4::identity();
        m[(3, 0)] = 0.5;
        assert!(RigidTransform::from_matrix(&m).is_err());

        let mut m = Matrix4::identity();
        m[(0, 3)] = f64::NAN;
        assert!(RigidTransform::from_matrix(&m).is_err());
    }

    #[test]
    fn interpolate_halfway() {
        let a = RigidTransform::identity();
        let b = RigidTransform::from_xyz_rpy(Vector3::new(2.0, 0.0, 0.0), 0.0, 0.0, FRAC_PI_2);
        let mid = a.interpolate(&b, 0.5);
        assert_relative_eq!(mid.translation().x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(mid.rotation().angle(), FRAC_PI_2 / 2.0, epsilon = 1e-9);

        // clamped
        let end = a.interpolate(&b, 7.0);
        assert!(end.compose(&b.inverse()).is_identity(1e-9));
    }

    #[test]
    fn interpolate_opposite_rotations_does_not_panic() {
        let a = RigidTransform::identity();
        let b = RigidTransform::from_xyz_rpy(Vector3::zeros(), 0.0, 0.0, PI);
        let mid = a.interpolate(&b, 0.5);
        assert!(mid.translation().norm() < 1e-12);
    }

    #[test]
    fn stamped_inverse_swaps_frames() {
        let st = StampedTransform::new(
            "base_link",
            "camera",
            Timestamp::from_nanos(9),
            RigidTransform::from_translation(Vector3::new(0.0, 0.0, 1.0)),
        );
        let inv = st.inverse();
        assert_eq!(inv.target.as_str(), "camera");
        assert_eq!(inv.source.as_str(), "base_link");
        assert_relative_eq!(inv.transform.translation().z, -1.0);
    }

    #[test]
    fn transform_cloud_preserves_fields() {
        let mut cloud = PointCloud::new(CloudHeader::new(Timestamp::from_nanos(77), "camera"));
        cloud.push(CloudPoint::from_coords(1.0, 0.0, 0.0).with_intensity(0.5));
        cloud.push(CloudPoint::from_coords(0.0, 1.0, 0.0));

        let tf = StampedTransform::new(
            "base_link",
            "camera",
            Timestamp::from_nanos(77),
            RigidTransform::from_xyz_rpy(Vector3::new(0.0, 0.0, 1.0), 0.0, 0.0, FRAC_PI_2),
        );
        let out = transform_cloud(&cloud, &tf).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out.stamp(), Timestamp::from_nanos(77));
        assert_eq!(out.frame().as_str(), "base_link");
        assert_eq!(out.points[0].intensity, Some(0.5));
        assert_relative_eq!(out.points[0].position.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(out.points[0].position.z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(out.points[1].position.x, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn transform_cloud_frame_mismatch() {
        let cloud = PointCloud::new(CloudHeader::new(Timestamp::zero(), "lidar"));
        let tf = StampedTransform::new("base_link", "camera", Timestamp::zero(), RigidTransform::identity());
        let err = transform_cloud(&cloud, &tf).unwrap_err();
        assert!(matches!(err, FusionError::FrameMismatch { .. }));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn transform_serialization() {
        let t = RigidTransform::from_xyz_rpy(Vector3::new(1.0, 2.0, 3.0), 0.1, 0.0, 0.0);
        let json = serde_json::to_string(&t).unwrap();
        let parsed: RigidTransform = serde_json::from_str(&json).unwrap();
        assert!(parsed.compose(&t.inverse()).is_identity(1e-9));
    }
}
