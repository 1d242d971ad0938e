//! A single rigid, oriented line segment in a 3D chain.

use lunaris_core::Vec3;
use serde::{Deserialize, Serialize};

use crate::common::{ConnectionPoint, Metadata};
use crate::error::IkError;
use crate::joint3d::Joint3D;
use crate::Result;

/// An oriented line segment with a fixed length, an attached joint, and a
/// bone-connection-point flag selecting which endpoint external sub-chains
/// attach to.
///
/// `length` is fixed at construction from `|end - start|` (or supplied
/// directly via [`Bone3D::from_direction`]). Subsequent updates to `start`
/// or `end` do **not** update `length` and may violate it; the solver
/// relies on `length` as the authoritative constant and continually
/// re-enforces it every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone3D {
    start: Vec3,
    end: Vec3,
    length: f32,
    /// The joint governing this bone's rotation relative to its reference
    /// direction.
    pub joint: Joint3D,
    /// Which endpoint a connected sub-chain attaches to.
    pub connection_point: ConnectionPoint,
    /// Cosmetic identity metadata; ignored by the solver.
    pub metadata: Metadata,
}

impl Bone3D {
    /// Construct a bone from two endpoints. `length` is fixed to
    /// `|end - start|`.
    ///
    /// # Errors
    ///
    /// [`IkError::InvalidArgument`] if `start == end` (zero length).
    pub fn new(start: Vec3, end: Vec3) -> Result<Self> {
        let length = end.distance(start);
        if length <= f32::EPSILON {
            return Err(IkError::InvalidArgument("bone length must be positive".into()));
        }
        Ok(Self {
            start,
            end,
            length,
            joint: Joint3D::default(),
            connection_point: ConnectionPoint::default(),
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
    pub fn from_direction(start: Vec3, direction_uv: Vec3, length: f32) -> Result<Self> {
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
            joint: Joint3D::default(),
            connection_point: ConnectionPoint::default(),
            metadata: Metadata::default(),
        })
    }

    /// With the given joint attached (builder style).
    #[must_use]
    pub fn with_joint(mut self, joint: Joint3D) -> Self {
        self.joint = joint;
        self
    }

    /// With the given connection point (builder style).
    #[must_use]
    pub fn with_connection_point(mut self, point: ConnectionPoint) -> Self {
        self.connection_point = point;
        self
    }

    /// Start endpoint.
    #[must_use]
    pub fn start(&self) -> Vec3 {
        self.start
    }

    /// End endpoint.
    #[must_use]
    pub fn end(&self) -> Vec3 {
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
    pub fn direction(&self) -> Vec3 {
        (self.end - self.start).normalize()
    }

    /// The endpoint a connected sub-chain should attach to.
    #[must_use]
    pub fn connection_location(&self) -> Vec3 {
        match self.connection_point {
            ConnectionPoint::Start => self.start,
            ConnectionPoint::End => self.end,
        }
    }

    /// Overwrite `start`. Does not touch `length`.
    pub fn set_start(&mut self, start: Vec3) {
        self.start = start;
    }

    /// Overwrite `end`. Does not touch `length`.
    pub fn set_end(&mut self, end: Vec3) {
        self.end = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_bone_is_rejected() {
        assert!(Bone3D::new(Vec3::ZERO, Vec3::ZERO).is_err());
    }

    #[test]
    fn length_is_fixed_at_construction() {
        let mut bone = Bone3D::new(Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0)).unwrap();
        assert!((bone.length() - 10.0).abs() < 1e-6);
        bone.set_end(Vec3::new(0.0, 3.0, 0.0));
        assert!((bone.length() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn connection_location_follows_flag() {
        let bone = Bone3D::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0))
            .unwrap()
            .with_connection_point(ConnectionPoint::Start);
        assert_eq!(bone.connection_location(), Vec3::ZERO);
    }
}
