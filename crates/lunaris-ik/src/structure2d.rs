//! A collection of connected 2D chains solved together.

use lunaris_core::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain2d::{BaseboneConstraint2D, Chain2D};
use crate::error::IkError;
use crate::math2::Vec2Ext;
use crate::Result;

/// An ordered collection of [`Chain2D`]s, some of which may be connected to
/// a bone of an earlier chain (its "host").
///
/// Chains are solved in insertion order every tick: a connected chain's
/// base location (and, for a local basebone constraint, its relative
/// constraint direction) is refreshed from its host immediately before it
/// is solved, so a host must always be inserted before the chains that
/// connect to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Structure2D {
    chains: Vec<Chain2D>,
}

impl Structure2D {
    /// An empty structure.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an unconnected chain.
    pub fn add_chain(&mut self, chain: Chain2D) {
        self.chains.push(chain);
    }

    /// Append `chain` connected to `host_chain_index`'s bone at
    /// `host_bone_index`: the new chain's base is translated to the host
    /// bone's end, and its fixed-base flag is forced on.
    ///
    /// # Errors
    ///
    /// - [`IkError::OutOfRange`] if `host_chain_index` does not refer to an
    ///   already-inserted chain, or `host_bone_index` is out of range for
    ///   it.
    /// - [`IkError::InvalidArgument`] if `host_chain_index` would refer to
    ///   the chain being connected itself (self-connection).
    pub fn connect_chain(
        &mut self,
        mut chain: Chain2D,
        host_chain_index: usize,
        host_bone_index: usize,
    ) -> Result<()> {
        let new_index = self.chains.len();
        if host_chain_index >= new_index {
            if host_chain_index == new_index {
                return Err(IkError::InvalidArgument(
                    "a chain cannot be connected to itself".into(),
                ));
            }
            return Err(IkError::OutOfRange {
                index: host_chain_index as i64,
                len: self.chains.len(),
            });
        }
        let host_chain = &self.chains[host_chain_index];
        let host_bone = host_chain.bone(host_bone_index)?;
        let connection_point = chain.bone_connection_point();
        let anchor = match connection_point {
            crate::common::ConnectionPoint::Start => host_bone.start(),
            crate::common::ConnectionPoint::End => host_bone.end(),
        };

        let offset = anchor - chain.base_location();
        for bone in chain_bones_mut(&mut chain) {
            bone.set_start(bone.start() + offset);
            bone.set_end(bone.end() + offset);
        }
        chain.set_base_location(anchor);
        chain.set_connection(host_chain_index as i32, host_bone_index as i32, connection_point);

        self.chains.push(chain);
        Ok(())
    }

    /// All chains, in insertion order.
    #[must_use]
    pub fn chains(&self) -> &[Chain2D] {
        &self.chains
    }

    /// The chain at `index`.
    ///
    /// # Errors
    ///
    /// [`IkError::OutOfRange`] if `index` is beyond the current chain count.
    pub fn chain(&self, index: usize) -> Result<&Chain2D> {
        self.chains.get(index).ok_or(IkError::OutOfRange { index: index as i64, len: self.chains.len() })
    }

    /// Number of chains in the structure.
    #[must_use]
    pub fn num_chains(&self) -> usize {
        self.chains.len()
    }

    /// Solve every chain in insertion order against `target`, propagating
    /// each connected chain's base location and relative basebone
    /// constraint direction from its host immediately beforehand.
    ///
    /// A chain with embedded-target mode enabled ignores `target` and
    /// solves for its own [`Chain2D::embedded_target`] instead; every other
    /// chain solves for `target` directly.
    ///
    /// Returns the post-solve effector-to-target distance of each chain, in
    /// insertion order.
    ///
    /// # Errors
    ///
    /// [`IkError::InvalidState`] only if an embedded-target chain's mode
    /// was disabled between being added and this call; unreachable through
    /// the public API in normal use.
    pub fn solve_for_target(&mut self, target: Vec2) -> Result<Vec<f32>> {
        let mut distances = Vec::with_capacity(self.chains.len());
        for i in 0..self.chains.len() {
            self.propagate_host(i);
            let distance = if self.chains[i].is_embedded_target_enabled() {
                self.chains[i].solve_for_embedded_target()?
            } else {
                self.chains[i].solve_for_target(target)
            };
            distances.push(distance);
        }
        debug!(num_chains = self.chains.len(), "structure2d: solve complete");
        Ok(distances)
    }

    fn propagate_host(&mut self, index: usize) {
        let (host_chain_index, host_bone_index) = self.chains[index].connection_indices();
        if host_chain_index < 0 {
            return;
        }
        let host_chain = &self.chains[host_chain_index as usize];
        let Ok(host_bone) = host_chain.bone(host_bone_index as usize) else {
            return;
        };
        let connection_point = self.chains[index].bone_connection_point();
        let anchor = match connection_point {
            crate::common::ConnectionPoint::Start => host_bone.start(),
            crate::common::ConnectionPoint::End => host_bone.end(),
        };
        let host_direction = host_bone.direction();

        let constraint = self.chains[index].basebone_constraint();
        let relative_dir = match constraint {
            BaseboneConstraint2D::LocalRelative => host_direction,
            BaseboneConstraint2D::LocalAbsolute => {
                let world_up = Vec2::Y;
                let rotation = world_up.signed_angle_degs(host_direction);
                rotate_by_degrees(self.chains[index].basebone_constraint_dir(), rotation)
            }
            BaseboneConstraint2D::None | BaseboneConstraint2D::GlobalAbsolute => {
                self.chains[index].basebone_relative_constraint_dir()
            }
        };

        self.chains[index].set_base_location(anchor);
        self.chains[index].set_basebone_relative_constraint_dir(relative_dir);
    }
}

fn rotate_by_degrees(v: Vec2, degrees: f32) -> Vec2 {
    let theta = degrees.to_radians();
    let (sin_t, cos_t) = theta.sin_cos();
    Vec2::new(v.x * cos_t - v.y * sin_t, v.x * sin_t + v.y * cos_t)
}

fn chain_bones_mut(chain: &mut Chain2D) -> impl Iterator<Item = &mut crate::bone2d::Bone2D> {
    chain.bones_mut().iter_mut()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bone2d::Bone2D;
    use crate::common::ConnectionPoint;

    fn simple_chain(base: Vec2) -> Chain2D {
        let mut chain = Chain2D::new();
        chain.add_bone(Bone2D::new(base, base + Vec2::new(10.0, 0.0)).unwrap());
        chain
    }

    #[test]
    fn connect_chain_translates_to_host_anchor() {
        let mut structure = Structure2D::new();
        structure.add_chain(simple_chain(Vec2::ZERO));
        let child = simple_chain(Vec2::new(999.0, 999.0));
        structure.connect_chain(child, 0, 0).unwrap();

        let connected = structure.chain(1).unwrap();
        assert_eq!(connected.base_location(), Vec2::new(10.0, 0.0));
        assert!(connected.is_fixed_base());
    }

    #[test]
    fn connect_chain_rejects_self_and_forward_reference() {
        let mut structure = Structure2D::new();
        let child = simple_chain(Vec2::ZERO);
        assert!(structure.connect_chain(child.clone(), 0, 0).is_err());

        structure.add_chain(simple_chain(Vec2::ZERO));
        assert!(structure.connect_chain(child, 1, 0).is_err());
    }

    #[test]
    fn connect_chain_rejects_bad_bone_index() {
        let mut structure = Structure2D::new();
        structure.add_chain(simple_chain(Vec2::ZERO));
        let child = simple_chain(Vec2::ZERO);
        assert!(matches!(structure.connect_chain(child, 0, 5), Err(IkError::OutOfRange { .. })));
    }

    #[test]
    fn solve_propagates_host_motion_to_connected_chain() {
        let mut structure = Structure2D::new();
        let mut host = simple_chain(Vec2::ZERO);
        host.set_embedded_target_mode(true);
        host.update_embedded_target(Vec2::new(0.0, 10.0)).unwrap();
        structure.add_chain(host);

        let mut child = simple_chain(Vec2::new(10.0, 0.0));
        child.set_embedded_target_mode(true);
        child.update_embedded_target(Vec2::new(20.0, 10.0)).unwrap();
        structure.connect_chain(child, 0, 0).unwrap();

        structure.solve_for_target(Vec2::ZERO).unwrap();

        let host_end = structure.chain(0).unwrap().effector_location().unwrap();
        let child_start = structure.chain(1).unwrap().bone(0).unwrap().start();
        assert!(host_end.approx_eq(child_start, 1e-3));
        assert_ne!(child_start, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn solve_for_target_forwards_to_non_embedded_chains() {
        let mut structure = Structure2D::new();
        structure.add_chain(simple_chain(Vec2::ZERO));

        let distances = structure.solve_for_target(Vec2::new(5.0, 5.0)).unwrap();
        assert_eq!(distances.len(), 1);
        let effector = structure.chain(0).unwrap().effector_location().unwrap();
        assert!(effector.approx_eq(Vec2::new(5.0, 5.0), 1.0));
    }

    #[test]
    fn connected_chain_refuses_non_fixed_base() {
        let mut structure = Structure2D::new();
        structure.add_chain(simple_chain(Vec2::ZERO));
        let child = simple_chain(Vec2::ZERO);
        structure.connect_chain(child, 0, 0).unwrap();
        let connected = &mut structure.chains[1];
        assert!(connected.set_fixed_base(false).is_err());
    }
}
