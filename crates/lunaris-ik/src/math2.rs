//! 2D angle and constraint helpers needed only by the solver.

use lunaris_core::Vec2;

/// Extension operations on [`Vec2`] specific to the FABRIK solver.
pub trait Vec2Ext: Sized {
    /// Signed angle (degrees, in `(-180, 180]`) from `self` to `other`,
    /// using the z-component sign of the planar cross product
    /// `self.x * other.y - other.x * self.y`. Positive is anticlockwise,
    /// matching this codebase's 2D convention.
    fn signed_angle_degs(self, other: Self) -> f32;
}

impl Vec2Ext for Vec2 {
    fn signed_angle_degs(self, other: Self) -> f32 {
        let a = self.normalize();
        let b = other.normalize();
        let cosine = (a.dot(b)).clamp(-1.0, 1.0);
        let unsigned = cosine.acos().to_degrees();
        let cross_z = a.x * b.y - b.x * a.y;
        if cross_z < 0.0 {
            -unsigned
        } else {
            unsigned
        }
    }
}

/// Constrain `dir` to lie within `[-cw_limit_degs, +acw_limit_degs]` of
/// `baseline`, both measured in the 2D plane (anticlockwise positive).
#[must_use]
pub fn constrain_uv(dir: Vec2, baseline: Vec2, cw_limit_degs: f32, acw_limit_degs: f32) -> Vec2 {
    let baseline = baseline.normalize();
    let dir = dir.normalize();
    let angle = baseline.signed_angle_degs(dir);
    if angle > acw_limit_degs {
        rotate(baseline, acw_limit_degs)
    } else if angle < -cw_limit_degs {
        rotate(baseline, -cw_limit_degs)
    } else {
        dir
    }
}

fn rotate(v: Vec2, angle_degs: f32) -> Vec2 {
    let theta = angle_degs.to_radians();
    let (sin_t, cos_t) = theta.sin_cos();
    Vec2::new(v.x * cos_t - v.y * sin_t, v.x * sin_t + v.y * cos_t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_angle_acw_is_positive() {
        let a = Vec2::new(1.0, 0.0);
        let b = Vec2::new(0.0, 1.0);
        assert!((a.signed_angle_degs(b) - 90.0).abs() < 1e-3);
        assert!((b.signed_angle_degs(a) + 90.0).abs() < 1e-3);
    }

    #[test]
    fn constrain_uv_passes_through_within_limits() {
        let baseline = Vec2::new(1.0, 0.0);
        let dir = rotate(baseline, 10.0);
        let constrained = constrain_uv(dir, baseline, 45.0, 45.0);
        assert!(constrained.approx_eq(dir, 1e-4));
    }

    #[test]
    fn constrain_uv_clamps_acw_overshoot() {
        let baseline = Vec2::new(1.0, 0.0);
        let dir = rotate(baseline, 80.0);
        let constrained = constrain_uv(dir, baseline, 45.0, 45.0);
        assert!((baseline.signed_angle_degs(constrained) - 45.0).abs() < 1e-3);
    }

    #[test]
    fn constrain_uv_clamps_cw_overshoot() {
        let baseline = Vec2::new(1.0, 0.0);
        let dir = rotate(baseline, -80.0);
        let constrained = constrain_uv(dir, baseline, 45.0, 45.0);
        assert!((baseline.signed_angle_degs(constrained) + 45.0).abs() < 1e-3);
    }
}
