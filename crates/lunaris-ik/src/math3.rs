//! 3D vector and rotation-basis extensions needed only by the solver.
//!
//! `Vec3` arithmetic (add/sub/scale/length/normalize/cross/dot) lives in
//! [`lunaris_core::math`]; this module adds the angle-measuring and
//! rotation operations the FABRIK algorithm and its joint constraints
//! need, plus the orthonormal basis used to carry a hinge axis from a
//! bone's local frame into world space.

use lunaris_core::Vec3;

/// Clamp an `acos`/`asin` argument into `[-1.0, 1.0]` so floating-point
/// drift never produces `NaN` out of a trig call.
#[must_use]
pub fn clamp_unit(value: f32) -> f32 {
    value.clamp(-1.0, 1.0)
}

/// Extension operations on [`Vec3`] specific to the FABRIK solver.
pub trait Vec3Ext: Sized {
    /// Dot product of normalised copies of `self` and `other`, clamped to
    /// `[-1, 1]`. This is the "cosine" form used everywhere an angle is
    /// measured; it deliberately differs from the raw scalar product.
    fn cosine_to(self, other: Self) -> f32;

    /// Unsigned angle between `self` and `other`, in degrees, in `[0, 180]`.
    fn unsigned_angle_degs(self, other: Self) -> f32;

    /// Signed angle from `self` to `other`, measured about `normal`, in
    /// degrees, in `(-180, 180]`.
    fn signed_angle_degs(self, other: Self, normal: Self) -> f32;

    /// Project `self` onto the plane through the origin with the given
    /// normal, returning a normalised result.
    ///
    /// # Errors
    ///
    /// Returns [`crate::IkError::InvalidArgument`] if `normal` is
    /// zero-magnitude.
    fn project_onto_plane(self, normal: Self) -> crate::Result<Self>;

    /// Rotate `self` by `angle_degs` about the (assumed unit) `axis`,
    /// using Rodrigues' rotation formula.
    fn rotate_about_axis(self, angle_degs: f32, axis: Self) -> Self;

    /// Return `self` normalised if the angle between `baseline` and `self`
    /// is within `max_angle_degs`; otherwise rotate `baseline` by exactly
    /// `max_angle_degs` toward `self`.
    fn limit(self, baseline: Self, max_angle_degs: f32) -> Self;
}

impl Vec3Ext for Vec3 {
    fn cosine_to(self, other: Self) -> f32 {
        clamp_unit(self.normalize().dot(other.normalize()))
    }

    fn unsigned_angle_degs(self, other: Self) -> f32 {
        self.cosine_to(other).acos().to_degrees()
    }

    fn signed_angle_degs(self, other: Self, normal: Self) -> f32 {
        let unsigned = self.unsigned_angle_degs(other);
        let sign = self.cross(other).dot(normal);
        if sign < 0.0 {
            -unsigned
        } else {
            unsigned
        }
    }

    fn project_onto_plane(self, normal: Self) -> crate::Result<Self> {
        if normal.length() <= f32::EPSILON {
            return Err(crate::IkError::InvalidArgument(
                "cannot project onto a plane with a zero-magnitude normal".into(),
            ));
        }
        let n = normal.normalize();
        let v = self.normalize();
        Ok((v - n * v.dot(n)).normalize())
    }

    fn rotate_about_axis(self, angle_degs: f32, axis: Self) -> Self {
        let axis = axis.normalize();
        let theta = angle_degs.to_radians();
        let (sin_t, cos_t) = theta.sin_cos();
        // Rodrigues' rotation formula.
        self * cos_t + axis.cross(self) * sin_t + axis * axis.dot(self) * (1.0 - cos_t)
    }

    fn limit(self, baseline: Self, max_angle_degs: f32) -> Self {
        let v = self.normalize();
        let b = baseline.normalize();
        if b.unsigned_angle_degs(v) <= max_angle_degs {
            return v;
        }
        let mut correction_axis = b.cross(v);
        if correction_axis.length() <= f32::EPSILON {
            // `baseline` and `v` are (anti-)parallel: pick any fixed axis
            // perpendicular to `baseline` as the correction axis.
            correction_axis = if b.x.abs() < 0.9 { Vec3::X.cross(b) } else { Vec3::Y.cross(b) };
        }
        b.rotate_about_axis(max_angle_degs, correction_axis.normalize())
    }
}

/// Orthonormal right-handed basis built by treating a unit direction as
/// the new +Z axis.
///
/// The singularity branch (`|d.y| > 0.9999`) must stay exactly as written:
/// it avoids a degenerate cross product with world-up, and its handedness
/// is depended on by local-hinge transforms downstream. Do not replace it
/// with a Pixar/Frisvad-style construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis3 {
    /// The basis' X axis.
    pub x: Vec3,
    /// The basis' Y axis.
    pub y: Vec3,
    /// The basis' Z axis (the input direction, normalised).
    pub z: Vec3,
}

impl Basis3 {
    /// Build a right-handed orthonormal basis with `+Z` aligned to `d`.
    #[must_use]
    pub fn align_z_to(d: Vec3) -> Self {
        let z = d.normalize();
        if z.y.abs() > 0.9999 {
            let x = Vec3::X;
            let y = x.cross(z).normalize();
            Self { x, y, z }
        } else {
            let x = z.cross(Vec3::Y).normalize();
            let y = x.cross(z).normalize();
            Self { x, y, z }
        }
    }

    /// Transform a vector expressed in this basis' local frame into world
    /// space.
    #[must_use]
    pub fn local_to_world(self, v: Vec3) -> Vec3 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_is_clamped() {
        let v = Vec3::new(1.0, 0.0, 0.0);
        assert!((v.cosine_to(v) - 1.0).abs() < 1e-6);
        assert!(((-v).cosine_to(v) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn unsigned_angle_perpendicular() {
        let a = Vec3::X;
        let b = Vec3::Y;
        assert!((a.unsigned_angle_degs(b) - 90.0).abs() < 1e-3);
    }

    #[test]
    fn signed_angle_sign_flips_with_direction() {
        let normal = Vec3::Z;
        let a = Vec3::X;
        let b = Vec3::Y;
        let fwd = a.signed_angle_degs(b, normal);
        let rev = b.signed_angle_degs(a, normal);
        assert!((fwd - 90.0).abs() < 1e-3);
        assert!((rev + 90.0).abs() < 1e-3);
    }

    #[test]
    fn project_onto_plane_rejects_zero_normal() {
        let v = Vec3::new(1.0, 1.0, 1.0);
        assert!(v.project_onto_plane(Vec3::ZERO).is_err());
    }

    #[test]
    fn project_onto_plane_removes_normal_component() {
        let v = Vec3::new(1.0, 1.0, 1.0);
        let projected = v.project_onto_plane(Vec3::Z).unwrap();
        assert!(projected.z.abs() < 1e-6);
    }

    #[test]
    fn rotate_about_axis_preserves_length() {
        let v = Vec3::new(1.0, 0.0, 0.0);
        let rotated = v.rotate_about_axis(90.0, Vec3::Z);
        assert!((rotated.length() - 1.0).abs() < 1e-5);
        assert!((rotated.x).abs() < 1e-4);
        assert!((rotated.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn limit_passes_through_within_range() {
        let baseline = Vec3::X;
        let v = baseline.rotate_about_axis(10.0, Vec3::Z);
        let limited = v.limit(baseline, 45.0);
        assert!(limited.approx_eq(v.normalize(), 1e-4));
    }

    #[test]
    fn limit_clamps_outside_range() {
        let baseline = Vec3::X;
        let v = baseline.rotate_about_axis(80.0, Vec3::Z);
        let limited = v.limit(baseline, 45.0);
        assert!((baseline.unsigned_angle_degs(limited) - 45.0).abs() < 1e-3);
    }

    #[test]
    fn limit_handles_antiparallel_baseline() {
        let baseline = Vec3::X;
        let v = -Vec3::X;
        let limited = v.limit(baseline, 30.0);
        assert!((baseline.unsigned_angle_degs(limited) - 30.0).abs() < 1e-3);
    }

    #[test]
    fn basis_singularity_branch_is_orthonormal() {
        let basis = Basis3::align_z_to(Vec3::Y);
        assert!((basis.x.length() - 1.0).abs() < 1e-5);
        assert!((basis.y.length() - 1.0).abs() < 1e-5);
        assert!(basis.x.dot(basis.y).abs() < 1e-4);
        assert!(basis.x.dot(basis.z).abs() < 1e-4);
    }

    #[test]
    fn basis_generic_branch_is_orthonormal() {
        let basis = Basis3::align_z_to(Vec3::new(1.0, 1.0, 1.0));
        assert!((basis.x.length() - 1.0).abs() < 1e-5);
        assert!((basis.y.length() - 1.0).abs() < 1e-5);
        assert!(basis.x.dot(basis.y).abs() < 1e-4);
        assert!(basis.y.dot(basis.z).abs() < 1e-4);
    }
}
