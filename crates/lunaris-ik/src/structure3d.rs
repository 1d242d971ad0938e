//! A collection of connected 3D chains solved together.

use lunaris_core::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain3d::{BaseboneConstraint3D, Chain3D};
use crate::error::IkError;
use crate::math3::Basis3;
use crate::Result;

/// An ordered collection of [`Chain3D`]s, some of which may be connected to
/// a bone of an earlier chain (its "host").
///
/// Chains are solved in insertion order every tick: a connected chain's
/// base location (and, for a local basebone constraint, its relative
/// constraint direction and reference axis) is refreshed from its host
/// immediately before it is solved, so a host must always be inserted
/// before the chains that connect to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Structure3D {
    chains: Vec<Chain3D>,
}

impl Structure3D {
    /// An empty structure.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an unconnected chain.
    pub fn add_chain(&mut self, chain: Chain3D) {
        self.chains.push(chain);
    }

    /// Append `chain` connected to `host_chain_index`'s bone at
    /// `host_bone_index`: the new chain's base is translated to the host
    /// bone's connection point, and its fixed-base flag is forced on.
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
        mut chain: Chain3D,
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
        let anchor = host_bone.connection_location();

        let offset = anchor - chain.base_location();
        for bone in chain.bones_mut() {
            bone.set_start(bone.start() + offset);
            bone.set_end(bone.end() + offset);
        }
        chain.set_base_location(anchor);
        chain.set_connection(host_chain_index as i32, host_bone_index as i32);

        self.chains.push(chain);
        Ok(())
    }

    /// All chains, in insertion order.
    #[must_use]
    pub fn chains(&self) -> &[Chain3D] {
        &self.chains
    }

    /// The chain at `index`.
    ///
    /// # Errors
    ///
    /// [`IkError::OutOfRange`] if `index` is beyond the current chain count.
    pub fn chain(&self, index: usize) -> Result<&Chain3D> {
        self.chains.get(index).ok_or(IkError::OutOfRange { index: index as i64, len: self.chains.len() })
    }

    /// Number of chains in the structure.
    #[must_use]
    pub fn num_chains(&self) -> usize {
        self.chains.len()
    }

    /// Solve every chain in insertion order against `target`, propagating
    /// each connected chain's base location and relative basebone
    /// constraint direction (and reference axis, for a local hinge) from
    /// its host immediately beforehand.
    ///
    /// A chain with embedded-target mode enabled ignores `target` and
    /// solves for its own [`Chain3D::embedded_target`] instead; every other
    /// chain solves for `target` directly.
    ///
    /// Returns the post-solve effector-to-target distance of each chain, in
    /// insertion order.
    ///
    /// # Errors
    ///
    /// [`IkError::InvalidState`] only if an embedded-target chain's mode
    /// was disabled between being added and this call; unreachable through
    /// the public API in normal use. [`IkError::Unsupported`] should never
    /// occur here since [`Chain3D::set_basebone_constraint`] already
    /// rejects a local-hinge basebone constraint at configuration time.
    pub fn solve_for_target(&mut self, target: Vec3) -> Result<Vec<f32>> {
        let mut distances = Vec::with_capacity(self.chains.len());
        for i in 0..self.chains.len() {
            self.propagate_host(i);
            let distance = if self.chains[i].is_embedded_target_enabled() {
                self.chains[i].solve_for_embedded_target()?
            } else {
                self.chains[i].solve_for_target(target)?
            };
            distances.push(distance);
        }
        debug!(num_chains = self.chains.len(), "structure3d: solve complete");
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
        let anchor = host_bone.connection_location();
        let host_direction = host_bone.direction();

        let constraint = self.chains[index].basebone_constraint();
        if matches!(constraint, BaseboneConstraint3D::LocalRotor | BaseboneConstraint3D::LocalHinge) {
            let basis = Basis3::align_z_to(host_direction);
            let relative_dir = basis.local_to_world(self.chains[index].basebone_constraint_dir());
            self.chains[index].set_basebone_relative_constraint_dir(relative_dir);
            if constraint == BaseboneConstraint3D::LocalHinge {
                // Unreachable in practice: `set_basebone_constraint` already
                // refuses to store this constraint type. The reference axis
                // is still computed here for structural completeness should
                // that guard ever be relaxed.
                let ref_axis = basis.local_to_world(Vec3::X);
                self.chains[index].set_basebone_relative_ref_constraint_dir(ref_axis);
            }
        }

        self.chains[index].set_base_location(anchor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bone3d::Bone3D;

    fn simple_chain(base: Vec3) -> Chain3D {
        let mut chain = Chain3D::new();
        chain.add_bone(Bone3D::new(base, base + Vec3::new(10.0, 0.0, 0.0)).unwrap());
        chain
    }

    #[test]
    fn connect_chain_translates_to_host_anchor() {
        let mut structure = Structure3D::new();
        structure.add_chain(simple_chain(Vec3::ZERO));
        let child = simple_chain(Vec3::new(999.0, 999.0, 999.0));
        structure.connect_chain(child, 0, 0).unwrap();

        let connected = structure.chain(1).unwrap();
        assert_eq!(connected.base_location(), Vec3::new(10.0, 0.0, 0.0));
        assert!(connected.is_fixed_base());
    }

    #[test]
    fn connect_chain_rejects_self_and_forward_reference() {
        let mut structure = Structure3D::new();
        let child = simple_chain(Vec3::ZERO);
        assert!(structure.connect_chain(child.clone(), 0, 0).is_err());

        structure.add_chain(simple_chain(Vec3::ZERO));
        assert!(structure.connect_chain(child, 1, 0).is_err());
    }

    #[test]
    fn connect_chain_rejects_bad_bone_index() {
        let mut structure = Structure3D::new();
        structure.add_chain(simple_chain(Vec3::ZERO));
        let child = simple_chain(Vec3::ZERO);
        assert!(matches!(structure.connect_chain(child, 0, 5), Err(IkError::OutOfRange { .. })));
    }

    #[test]
    fn solve_propagates_host_motion_to_connected_chain() {
        let mut structure = Structure3D::new();
        let mut host = simple_chain(Vec3::ZERO);
        host.set_embedded_target_mode(true);
        host.update_embedded_target(Vec3::new(0.0, 10.0, 0.0)).unwrap();
        structure.add_chain(host);

        let mut child = simple_chain(Vec3::new(10.0, 0.0, 0.0));
        child.set_embedded_target_mode(true);
        child.update_embedded_target(Vec3::new(20.0, 10.0, 0.0)).unwrap();
        structure.connect_chain(child, 0, 0).unwrap();

        structure.solve_for_target(Vec3::ZERO).unwrap();

        let host_end = structure.chain(0).unwrap().effector_location().unwrap();
        let child_start = structure.chain(1).unwrap().bone(0).unwrap().start();
        assert!(host_end.approx_eq(child_start, 1e-3));
        assert_ne!(child_start, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn solve_for_target_forwards_to_non_embedded_chains() {
        let mut structure = Structure3D::new();
        structure.add_chain(simple_chain(Vec3::ZERO));

        let distances = structure.solve_for_target(Vec3::new(5.0, 5.0, 0.0)).unwrap();
        assert_eq!(distances.len(), 1);
        let effector = structure.chain(0).unwrap().effector_location().unwrap();
        assert!(effector.approx_eq(Vec3::new(5.0, 5.0, 0.0), 1.0));
    }
}
