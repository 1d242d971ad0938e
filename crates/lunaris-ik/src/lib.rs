//! # Lunaris IK
//!
//! A FABRIK (Forward And Backward Reaching Inverse Kinematics) solver for
//! articulated 2D and 3D skeletons.
//!
//! A [`chain2d::Chain2D`] or [`chain3d::Chain3D`] is an ordered sequence of
//! fixed-length [`bone2d::Bone2D`]s / [`bone3d::Bone3D`]s, each carrying a
//! rotational-limit [`joint2d::Joint2D`] / [`joint3d::Joint3D`] that
//! constrains it relative to its neighbour. Calling `solve_for_target`
//! repeatedly alternates a tip-to-base forward pass with a base-to-tip
//! backward pass, re-enforcing bone length and joint limits on every pass,
//! until the end effector is within tolerance of the target or the
//! iteration budget is spent, retaining whichever iteration got closest
//! since FABRIK is not guaranteed to improve monotonically.
//!
//! Multiple chains can be composed into a [`structure2d::Structure2D`] /
//! [`structure3d::Structure3D`], where later chains attach to a bone of an
//! earlier one and are re-based onto it every solve.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod bone2d;
pub mod bone3d;
pub mod chain2d;
pub mod chain3d;
pub mod common;
pub mod error;
pub mod joint2d;
pub mod joint3d;
pub mod math2;
pub mod math3;
pub mod structure2d;
pub mod structure3d;

pub use bone2d::Bone2D;
pub use bone3d::Bone3D;
pub use chain2d::{BaseboneConstraint2D, Chain2D};
pub use chain3d::{BaseboneConstraint3D, Chain3D};
pub use common::{ConnectionPoint, Metadata};
pub use error::{IkError, Result};
pub use joint2d::Joint2D;
pub use joint3d::{HingeParams, Joint3D};
pub use math2::{constrain_uv, Vec2Ext};
pub use math3::{Basis3, Vec3Ext};
pub use structure2d::Structure2D;
pub use structure3d::Structure3D;
