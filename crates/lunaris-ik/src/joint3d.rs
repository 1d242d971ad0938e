//! Rotational-limit model for a 3D bone: ball joints and hinges.

use lunaris_core::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::IkError;
use crate::Result;

/// Dot-product tolerance used to validate that a hinge's reference axis is
/// perpendicular to its rotation axis.
const PERPENDICULARITY_TOLERANCE: f32 = 0.01;

/// Parameters shared by [`Joint3D::GlobalHinge`] and [`Joint3D::LocalHinge`].
///
/// For a global hinge, `axis` and `ref_axis` are world-space. For a local
/// hinge they are interpreted in the frame of the previous bone (or the
/// host bone, for a basebone).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HingeParams {
    /// Unit axis about which the hinge may rotate.
    pub axis: Vec3,
    /// Clockwise limit in degrees, in `[0, 180]`.
    pub cw_degs: f32,
    /// Anticlockwise limit in degrees, in `[0, 180]`.
    pub acw_degs: f32,
    /// Unit reference axis, perpendicular to `axis`, from which the
    /// clockwise/anticlockwise limits are measured.
    pub ref_axis: Vec3,
}

impl HingeParams {
    fn validated(axis: Vec3, cw_degs: f32, acw_degs: f32, ref_axis: Vec3) -> Result<Self> {
        if axis.length() <= f32::EPSILON {
            return Err(IkError::InvalidArgument("hinge axis must be non-zero".into()));
        }
        if ref_axis.length() <= f32::EPSILON {
            return Err(IkError::InvalidArgument("hinge reference axis must be non-zero".into()));
        }
        let axis = axis.normalize();
        let ref_axis = ref_axis.normalize();
        if axis.dot(ref_axis).abs() > PERPENDICULARITY_TOLERANCE {
            return Err(IkError::InvalidArgument(
                "hinge reference axis must be perpendicular to the hinge axis".into(),
            ));
        }
        Ok(Self {
            axis,
            cw_degs: cw_degs.clamp(0.0, 180.0),
            acw_degs: acw_degs.clamp(0.0, 180.0),
            ref_axis,
        })
    }

    /// True when both limits are the full 180 degrees (free about `ref_axis`).
    #[must_use]
    pub fn is_free(&self) -> bool {
        (self.cw_degs - 180.0).abs() < 0.001 && (self.acw_degs - 180.0).abs() < 0.001
    }
}

/// The rotational-limit variant of a 3D joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Joint3D {
    /// Free rotation up to `rotor_limit_degs` away from the reference
    /// direction (the previous bone's direction, or the basebone
    /// constraint direction).
    Ball {
        /// Maximum angular separation, in degrees, in `[0, 180]`.
        rotor_limit_degs: f32,
    },
    /// A hinge whose axis and reference axis are expressed in world space.
    GlobalHinge(HingeParams),
    /// A hinge whose axis and reference axis are expressed in the frame of
    /// the previous bone (or host bone, for a basebone).
    LocalHinge(HingeParams),
}

impl Joint3D {
    /// A fully unconstrained ball joint (180 degree rotor limit).
    #[must_use]
    pub fn unconstrained_ball() -> Self {
        Self::Ball { rotor_limit_degs: 180.0 }
    }

    /// Create a ball joint, clamping `rotor_limit_degs` into `[0, 180]`.
    #[must_use]
    pub fn ball(rotor_limit_degs: f32) -> Self {
        Self::Ball { rotor_limit_degs: rotor_limit_degs.clamp(0.0, 180.0) }
    }

    /// Create a world-space hinge.
    ///
    /// # Errors
    ///
    /// [`IkError::InvalidArgument`] if `axis` or `ref_axis` is
    /// zero-magnitude, or `ref_axis` is not perpendicular to `axis` within
    /// tolerance.
    pub fn global_hinge(axis: Vec3, cw_degs: f32, acw_degs: f32, ref_axis: Vec3) -> Result<Self> {
        Ok(Self::GlobalHinge(HingeParams::validated(axis, cw_degs, acw_degs, ref_axis)?))
    }

    /// Create a hinge expressed in the previous bone's local frame.
    ///
    /// # Errors
    ///
    /// Same as [`Joint3D::global_hinge`].
    pub fn local_hinge(axis: Vec3, cw_degs: f32, acw_degs: f32, ref_axis: Vec3) -> Result<Self> {
        Ok(Self::LocalHinge(HingeParams::validated(axis, cw_degs, acw_degs, ref_axis)?))
    }

    /// The ball joint's rotor limit.
    ///
    /// # Errors
    ///
    /// [`IkError::InvalidOperation`] if this joint is not a [`Joint3D::Ball`].
    pub fn rotor_limit_degs(&self) -> Result<f32> {
        match self {
            Self::Ball { rotor_limit_degs } => Ok(*rotor_limit_degs),
            _ => Err(IkError::InvalidOperation("joint is not a ball joint".into())),
        }
    }

    /// The hinge parameters, for either hinge variant.
    ///
    /// # Errors
    ///
    /// [`IkError::InvalidOperation`] if this joint is a [`Joint3D::Ball`].
    pub fn hinge_params(&self) -> Result<HingeParams> {
        match self {
            Self::GlobalHinge(params) | Self::LocalHinge(params) => Ok(*params),
            Self::Ball { .. } => Err(IkError::InvalidOperation("joint is not a hinge".into())),
        }
    }

    /// True if this is a [`Joint3D::Ball`].
    #[must_use]
    pub fn is_ball(&self) -> bool {
        matches!(self, Self::Ball { .. })
    }

    /// True if this is a [`Joint3D::GlobalHinge`] or [`Joint3D::LocalHinge`].
    #[must_use]
    pub fn is_hinge(&self) -> bool {
        matches!(self, Self::GlobalHinge(_) | Self::LocalHinge(_))
    }

    /// True if this is specifically a [`Joint3D::LocalHinge`].
    #[must_use]
    pub fn is_local_hinge(&self) -> bool {
        matches!(self, Self::LocalHinge(_))
    }
}

impl Default for Joint3D {
    fn default() -> Self {
        Self::unconstrained_ball()
    }
}
