//! Small shared types used by both the 2D and 3D solver.

use lunaris_core::Color;
use serde::{Deserialize, Serialize};

/// Which endpoint of a bone a connected sub-chain attaches to.
///
/// Stored on the sub-chain itself for 2D structures (`Chain2D`) and on the
/// host bone for 3D structures (`Bone3D`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionPoint {
    /// Sub-chains attach at the bone's start.
    Start,
    /// Sub-chains attach at the bone's end (the default).
    #[default]
    End,
}

/// Cosmetic identity metadata a visualiser collaborator may read. The
/// solver itself never inspects these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Human-readable identifier.
    pub name: String,
    /// Display colour.
    pub color: Color,
    /// Display line width.
    pub line_width: f32,
}

impl Default for Metadata {
    fn default() -> Self {
        Self { name: String::new(), color: Color::WHITE, line_width: 1.0 }
    }
}
