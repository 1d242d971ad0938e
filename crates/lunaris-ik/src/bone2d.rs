//! A single rigid, oriented line segment in a 2D chain.

use lunaris_core::Vec2;
use serde::{Deserialize, Serialize};

use crate::common::Metadata;
use crate::error::IkError;
use crate::joint2d::Joint2D;
use crate::Result;

/// An oriented line segment with a fixed length and an attached joint.
///
/// `length` is fixed at construction from `|end - start|` (or supplied
/// directly via [`Bone2D::from_direction`]). Subsequent updates to `start`
/// or `end` do **not** update `length` and may violate it; the solver
/// relies on `length` as the authoritative constant and continually
/// re-enforces it every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone2D {
    start: Vec2,
    end: Vec2,
    length: f32,
    /// The joint governing this bone's rotation relative to its reference
    /// direction.
    pub joint: Joint2D,
    /// Cosmetic identity metadata; ignored by the solver.
    pub metadata: Metadata,
}

impl Bone2D {
    /// Construct a bone from two endpoints. `length` is fixed to
    /// `|end - start|`.
    ///
    /// # Errors
    ///
    /// [`IkError::InvalidArgument`] if `start == end` (zero length).
    pub fn new(start: Vec2, end: Vec2) -> Result<Self> {
        let length = end.distance(start);
        if length <= f32::EPSILON {
            return Err(IkError::InvalidArgument("bone length must be positive".into()));
        }
        Ok(Self {
            start,
            end,
            length,
            joint: Joint2D::default(),
            metadata: Metadata::default(),
        })
    }

    /// Construct a bone from a start point, a unit direction, and an
    /// explicit length: `end = start + direction_uv.normalize() * length`.
    ///
    /// # Errors
    ///
    /// [`IkError::InvalidArgument`] if `direction_uv` is zero-magnitude or
    /// `length` is not positive.
    pub fn from_direction(start: Vec2, direction_uv: Vec2, length: f32) -> Result<Self> {
        if direction_uv.length() <= f32::EPSILON {
            return Err(IkError::InvalidArgument("bone direction must be non-zero".into()));
        }
        if length <= 0.0 {
            return Err(IkError::InvalidArgument("bone length must be positive".into()));
        }
        let direction = direction_uv.normalize();
        Ok(Self {
            start,
            end: start + direction * length,
            length,
            joint: Joint2D::default(),
            metadata: Metadata::default(),
        })
    }

    /// With the given joint attached (builder style).
    #[must_use]
    pub fn with_joint(mut self, joint: Joint2D) -> Self {
        self.joint = joint;
        self
    }

    /// Start endpoint.
    #[must_use]
    pub fn start(&self) -> Vec2 {
        self.start
    }

    /// End endpoint.
    #[must_use]
    pub fn end(&self) -> Vec2 {
        self.end
    }

    /// Fixed, authoritative bone length.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Unit vector from `start` to `end`. Zero if the two points have
    /// coincided mid-solve (normalise leaves a zero vector unchanged).
    #[must_use]
    pub fn direction(&self) -> Vec2 {
        (self.end - self.start).normalize()
    }

    /// Overwrite `start`. Does not touch `length`.
    pub fn set_start(&mut self, start: Vec2) {
        self.start = start;
    }

    /// Overwrite `end`. Does not touch `length`.
    pub fn set_end(&mut self, end: Vec2) {
        self.end = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_bone_is_rejected() {
        assert!(Bone2D::new(Vec2::ZERO, Vec2::ZERO).is_err());
    }

    #[test]
    fn length_is_fixed_at_construction() {
        let mut bone = Bone2D::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, 10.0)).unwrap();
        assert!((bone.length() - 10.0).abs() < 1e-6);
        bone.set_end(Vec2::new(0.0, 3.0));
        // length is unchanged even though the endpoints no longer agree with it.
        assert!((bone.length() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn from_direction_rejects_zero_direction() {
        assert!(Bone2D::from_direction(Vec2::ZERO, Vec2::ZERO, 5.0).is_err());
    }

    #[test]
    fn from_direction_rejects_non_positive_length() {
        assert!(Bone2D::from_direction(Vec2::ZERO, Vec2::X, 0.0).is_err());
    }
}
