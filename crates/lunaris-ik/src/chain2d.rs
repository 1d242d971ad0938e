//! An ordered sequence of 2D bones and the FABRIK solver that positions them.

use lunaris_core::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::bone2d::Bone2D;
use crate::common::ConnectionPoint;
use crate::error::IkError;
use crate::joint2d::Joint2D;
use crate::math2::constrain_uv;
use crate::Result;

/// How the basebone (first bone) of a 2D chain is constrained during the
/// backward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BaseboneConstraint2D {
    /// No constraint; the basebone may point anywhere.
    #[default]
    None,
    /// Constrained to `basebone_constraint_dir`, a fixed world-space
    /// direction, using the basebone's own joint limits.
    GlobalAbsolute,
    /// Constrained relative to the direction of the host bone this chain
    /// is connected to, recomputed by the structure every tick.
    LocalRelative,
    /// Constrained to `basebone_constraint_dir` rotated by the signed
    /// angle between world-up and the host bone direction, recomputed by
    /// the structure every tick.
    LocalAbsolute,
}

/// An ordered sequence of bones sharing endpoints, solved with FABRIK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain2D {
    bones: Vec<Bone2D>,
    chain_length: f32,

    fixed_base: bool,
    base_location: Vec2,

    basebone_constraint: BaseboneConstraint2D,
    basebone_constraint_dir: Vec2,
    basebone_relative_constraint_dir: Vec2,

    solve_distance_threshold: f32,
    max_iteration_attempts: u32,
    min_iteration_change: f32,

    embedded_target_enabled: bool,
    embedded_target: Vec2,

    last_target_location: Option<Vec2>,
    last_base_location: Option<Vec2>,
    current_solve_distance: f32,

    connected_chain_index: i32,
    connected_bone_index: i32,
    bone_connection_point: ConnectionPoint,
}

impl Default for Chain2D {
    fn default() -> Self {
        Self {
            bones: Vec::new(),
            chain_length: 0.0,
            fixed_base: true,
            base_location: Vec2::ZERO,
            basebone_constraint: BaseboneConstraint2D::None,
            basebone_constraint_dir: Vec2::X,
            basebone_relative_constraint_dir: Vec2::X,
            solve_distance_threshold: 1.0,
            max_iteration_attempts: 15,
            min_iteration_change: 0.01,
            embedded_target_enabled: false,
            embedded_target: Vec2::ZERO,
            last_target_location: None,
            last_base_location: None,
            current_solve_distance: f32::INFINITY,
            connected_chain_index: -1,
            connected_bone_index: -1,
            bone_connection_point: ConnectionPoint::End,
        }
    }
}

impl Chain2D {
    /// An empty chain with default convergence parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- construction -----------------------------------------------------

    /// Append a bone. If this is the first bone, `base_location` and the
    /// provisional `basebone_constraint_dir` are taken from it.
    pub fn add_bone(&mut self, bone: Bone2D) {
        if self.bones.is_empty() {
            self.base_location = bone.start();
            self.basebone_constraint_dir = bone.direction();
        }
        self.chain_length += bone.length();
        self.bones.push(bone);
    }

    /// Append a bone whose start is the current last bone's end.
    ///
    /// # Errors
    ///
    /// - [`IkError::InvalidState`] if there is no basebone yet.
    /// - [`IkError::InvalidArgument`] if `direction_uv` is zero-magnitude
    ///   or `length` is not positive.
    pub fn add_consecutive_bone(
        &mut self,
        direction_uv: Vec2,
        length: f32,
        joint: Joint2D,
    ) -> Result<()> {
        let Some(prev) = self.bones.last() else {
            return Err(IkError::InvalidState(
                "cannot add a consecutive bone before any basebone exists".into(),
            ));
        };
        let bone = Bone2D::from_direction(prev.end(), direction_uv, length)?.with_joint(joint);
        self.chain_length += bone.length();
        self.bones.push(bone);
        Ok(())
    }

    /// Remove the bone at `index`. Does not re-link the endpoints of
    /// neighbouring bones; geometry is assumed to be re-solved on the next
    /// tick.
    ///
    /// # Errors
    ///
    /// [`IkError::OutOfRange`] if `index` is beyond the current bone count.
    pub fn remove_bone(&mut self, index: usize) -> Result<()> {
        if index >= self.bones.len() {
            return Err(IkError::OutOfRange { index: index as i64, len: self.bones.len() });
        }
        let removed = self.bones.remove(index);
        self.chain_length -= removed.length();
        Ok(())
    }

    // -- accessors ----------------------------------------------------------

    /// All bones, in order from base to tip.
    #[must_use]
    pub fn bones(&self) -> &[Bone2D] {
        &self.bones
    }

    /// Mutable access to every bone, used by the owning structure to
    /// translate a newly connected chain into its host's frame.
    pub(crate) fn bones_mut(&mut self) -> &mut Vec<Bone2D> {
        &mut self.bones
    }

    /// The bone at `index`.
    ///
    /// # Errors
    ///
    /// [`IkError::OutOfRange`] if `index` is beyond the current bone count.
    pub fn bone(&self, index: usize) -> Result<&Bone2D> {
        self.bones
            .get(index)
            .ok_or(IkError::OutOfRange { index: index as i64, len: self.bones.len() })
    }

    /// Number of bones in the chain.
    #[must_use]
    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    /// Sum of every bone's fixed length.
    #[must_use]
    pub fn chain_length(&self) -> f32 {
        self.chain_length
    }

    /// The end effector: the last bone's end. `None` if the chain has no
    /// bones.
    #[must_use]
    pub fn effector_location(&self) -> Option<Vec2> {
        self.bones.last().map(Bone2D::end)
    }

    /// Effector-to-target distance of the best solution seen by the most
    /// recent solve.
    #[must_use]
    pub fn current_solve_distance(&self) -> f32 {
        self.current_solve_distance
    }

    /// The target used by the most recent solve, if any.
    #[must_use]
    pub fn last_target_location(&self) -> Option<Vec2> {
        self.last_target_location
    }

    /// Whether the basebone start is snapped to `base_location` every
    /// backward pass.
    #[must_use]
    pub fn is_fixed_base(&self) -> bool {
        self.fixed_base
    }

    /// The chain's base location.
    #[must_use]
    pub fn base_location(&self) -> Vec2 {
        self.base_location
    }

    /// Set the chain's base location. A connected chain has this field
    /// overwritten by its structure every tick.
    pub fn set_base_location(&mut self, location: Vec2) {
        self.base_location = location;
    }

    /// Enable or disable fixed-base mode.
    ///
    /// # Errors
    ///
    /// [`IkError::InvalidState`] if disabling while the chain is connected
    /// to a host, or while the basebone constraint is
    /// [`BaseboneConstraint2D::GlobalAbsolute`].
    pub fn set_fixed_base(&mut self, enabled: bool) -> Result<()> {
        if !enabled {
            if self.connected_chain_index >= 0 {
                return Err(IkError::InvalidState(
                    "cannot disable fixed-base on a chain connected to a host".into(),
                ));
            }
            if self.basebone_constraint == BaseboneConstraint2D::GlobalAbsolute {
                return Err(IkError::InvalidState(
                    "cannot disable fixed-base while the basebone constraint is global-absolute"
                        .into(),
                ));
            }
        }
        self.fixed_base = enabled;
        Ok(())
    }

    /// The basebone constraint type.
    #[must_use]
    pub fn basebone_constraint(&self) -> BaseboneConstraint2D {
        self.basebone_constraint
    }

    /// Set the basebone constraint type.
    pub fn set_basebone_constraint(&mut self, constraint: BaseboneConstraint2D) {
        self.basebone_constraint = constraint;
    }

    /// The world-space basebone constraint reference direction.
    #[must_use]
    pub fn basebone_constraint_dir(&self) -> Vec2 {
        self.basebone_constraint_dir
    }

    /// Set the world-space basebone constraint reference direction.
    pub fn set_basebone_constraint_dir(&mut self, dir: Vec2) {
        self.basebone_constraint_dir = dir;
    }

    /// The relative basebone constraint direction, recomputed by the
    /// structure each tick for connected chains with a local basebone
    /// constraint. Read-only to external callers.
    #[must_use]
    pub fn basebone_relative_constraint_dir(&self) -> Vec2 {
        self.basebone_relative_constraint_dir
    }

    /// Written only by the owning structure, immediately before invoking
    /// the solver for this chain.
    pub(crate) fn set_basebone_relative_constraint_dir(&mut self, dir: Vec2) {
        self.basebone_relative_constraint_dir = dir;
    }

    /// The indices of the host chain/bone this chain is connected to, or
    /// `(-1, -1)` if unconnected.
    #[must_use]
    pub fn connection_indices(&self) -> (i32, i32) {
        (self.connected_chain_index, self.connected_bone_index)
    }

    /// Which endpoint of the host bone this chain's base snaps to.
    #[must_use]
    pub fn bone_connection_point(&self) -> ConnectionPoint {
        self.bone_connection_point
    }

    pub(crate) fn set_connection(
        &mut self,
        chain_index: i32,
        bone_index: i32,
        connection_point: ConnectionPoint,
    ) {
        self.connected_chain_index = chain_index;
        self.connected_bone_index = bone_index;
        self.bone_connection_point = connection_point;
        self.fixed_base = true;
    }

    /// Convergence tolerance: a solve stops as soon as the effector is
    /// within this distance of the target.
    #[must_use]
    pub fn solve_distance_threshold(&self) -> f32 {
        self.solve_distance_threshold
    }

    /// Set the convergence tolerance. Must be `>= 0`.
    pub fn set_solve_distance_threshold(&mut self, threshold: f32) {
        self.solve_distance_threshold = threshold.max(0.0);
    }

    /// Hard per-solve iteration cap.
    #[must_use]
    pub fn max_iteration_attempts(&self) -> u32 {
        self.max_iteration_attempts
    }

    /// Set the hard per-solve iteration cap. Must be `>= 1`.
    pub fn set_max_iteration_attempts(&mut self, attempts: u32) {
        self.max_iteration_attempts = attempts.max(1);
    }

    /// Early-stall threshold: a solve stops if the per-iteration distance
    /// improves by less than this between iterations.
    #[must_use]
    pub fn min_iteration_change(&self) -> f32 {
        self.min_iteration_change
    }

    /// Set the early-stall threshold. Must be `>= 0`.
    pub fn set_min_iteration_change(&mut self, change: f32) {
        self.min_iteration_change = change.max(0.0);
    }

    /// Whether this chain uses its embedded target instead of a
    /// structure-supplied one.
    #[must_use]
    pub fn is_embedded_target_enabled(&self) -> bool {
        self.embedded_target_enabled
    }

    /// Enable or disable embedded-target mode.
    pub fn set_embedded_target_mode(&mut self, enabled: bool) {
        self.embedded_target_enabled = enabled;
    }

    /// The embedded target location.
    #[must_use]
    pub fn embedded_target(&self) -> Vec2 {
        self.embedded_target
    }

    /// Overwrite the embedded target.
    ///
    /// # Errors
    ///
    /// [`IkError::InvalidState`] if embedded-target mode is disabled.
    pub fn update_embedded_target(&mut self, target: Vec2) -> Result<()> {
        if !self.embedded_target_enabled {
            return Err(IkError::InvalidState("embedded target mode is not enabled".into()));
        }
        self.embedded_target = target;
        Ok(())
    }

    // -- solving --------------------------------------------------------

    /// Solve using the embedded target.
    ///
    /// # Errors
    ///
    /// [`IkError::InvalidState`] if embedded-target mode is disabled.
    pub fn solve_for_embedded_target(&mut self) -> Result<f32> {
        if !self.embedded_target_enabled {
            return Err(IkError::InvalidState("embedded target mode is not enabled".into()));
        }
        Ok(self.solve_for_target(self.embedded_target))
    }

    /// Run FABRIK to bring the effector as close to `target` as the
    /// chain's constraints allow, committing only the best solution seen
    /// across up to `max_iteration_attempts` iterations.
    ///
    /// Never fails: an empty chain or a degenerate target simply returns
    /// the current (zero) solve distance without modifying anything.
    pub fn solve_for_target(&mut self, target: Vec2) -> f32 {
        if self.bones.is_empty() {
            return 0.0;
        }

        if let (Some(last_target), Some(last_base)) =
            (self.last_target_location, self.last_base_location)
        {
            if target.approx_eq(last_target, 0.001) && self.base_location.approx_eq(last_base, 0.001)
            {
                trace!("chain2d: target and base unchanged, skipping solve");
                return self.current_solve_distance;
            }
        }

        let mut best_solution = self.bones.clone();
        let mut best_distance = f32::INFINITY;
        let mut last_pass_distance = f32::INFINITY;
        let mut iterations_used = 0;

        for attempt in 0..self.max_iteration_attempts {
            let distance = self.run_iteration(target);
            iterations_used = attempt + 1;

            if distance < best_distance {
                best_distance = distance;
                best_solution = self.bones.clone();
                if distance <= self.solve_distance_threshold {
                    break;
                }
            } else if (distance - last_pass_distance).abs() < self.min_iteration_change {
                break;
            }
            last_pass_distance = distance;
        }

        if best_distance > self.solve_distance_threshold {
            warn!(
                iterations_used,
                best_distance, "chain2d: solve exhausted iteration budget without converging"
            );
        } else {
            debug!(iterations_used, best_distance, "chain2d: solve converged");
        }

        self.bones = best_solution;
        self.current_solve_distance = best_distance;
        self.last_target_location = Some(target);
        self.last_base_location = Some(self.base_location);
        self.current_solve_distance
    }

    fn run_iteration(&mut self, target: Vec2) -> f32 {
        let n = self.bones.len();

        // Forward pass: tip -> base.
        for i in (0..n).rev() {
            let length = self.bones[i].length();
            let u_this = if i == n - 1 {
                self.bones[i].set_end(target);
                (self.bones[i].start() - self.bones[i].end()).normalize()
            } else {
                let outer_joint = self.bones[i + 1].joint;
                let u_outer = (self.bones[i + 1].start() - self.bones[i + 1].end()).normalize();
                let raw = (self.bones[i].start() - self.bones[i].end()).normalize();
                constrain_uv(
                    raw,
                    u_outer,
                    outer_joint.clockwise_limit_degs(),
                    outer_joint.anticlockwise_limit_degs(),
                )
            };
            let new_start = self.bones[i].end() + u_this * length;
            self.bones[i].set_start(new_start);
            if i > 0 {
                self.bones[i - 1].set_end(new_start);
            }
        }

        // Backward pass: base -> tip.
        for i in 0..n {
            let length = self.bones[i].length();
            if i == 0 {
                if self.fixed_base {
                    self.bones[0].set_start(self.base_location);
                } else {
                    let u = (self.bones[0].end() - self.bones[0].start()).normalize();
                    self.bones[0].set_start(self.bones[0].end() - u * length);
                }
                let raw = (self.bones[0].end() - self.bones[0].start()).normalize();
                let u_new = self.apply_basebone_constraint(raw);
                self.bones[0].set_end(self.bones[0].start() + u_new * length);
                if n > 1 {
                    self.bones[1].set_start(self.bones[0].end());
                }
            } else {
                let u_prev = (self.bones[i - 1].end() - self.bones[i - 1].start()).normalize();
                let raw = (self.bones[i].end() - self.bones[i].start()).normalize();
                let joint = self.bones[i].joint;
                let u_this = constrain_uv(
                    raw,
                    u_prev,
                    joint.clockwise_limit_degs(),
                    joint.anticlockwise_limit_degs(),
                );
                self.bones[i].set_end(self.bones[i].start() + u_this * length);
                if i < n - 1 {
                    self.bones[i + 1].set_start(self.bones[i].end());
                }
            }
        }

        (self.bones[n - 1].end() - target).length()
    }

    fn apply_basebone_constraint(&self, u_new: Vec2) -> Vec2 {
        let joint = self.bones[0].joint;
        match self.basebone_constraint {
            BaseboneConstraint2D::None => u_new,
            BaseboneConstraint2D::GlobalAbsolute => constrain_uv(
                u_new,
                self.basebone_constraint_dir,
                joint.clockwise_limit_degs(),
                joint.anticlockwise_limit_degs(),
            ),
            BaseboneConstraint2D::LocalRelative | BaseboneConstraint2D::LocalAbsolute => {
                constrain_uv(
                    u_new,
                    self.basebone_relative_constraint_dir,
                    joint.clockwise_limit_degs(),
                    joint.anticlockwise_limit_degs(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bone_chain() -> Chain2D {
        let mut chain = Chain2D::new();
        chain.add_bone(Bone2D::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, 10.0)).unwrap());
        chain.add_bone(Bone2D::new(Vec2::new(0.0, 10.0), Vec2::new(0.0, 20.0)).unwrap());
        chain
    }

    #[test]
    fn two_bone_2d_reach() {
        let mut chain = two_bone_chain();
        let distance = chain.solve_for_target(Vec2::new(20.0, 0.0));
        assert!(distance <= 1.0, "distance was {distance}");
        assert!((chain.bone(0).unwrap().length() - 10.0).abs() < 1e-3);
        assert!((chain.bone(1).unwrap().length() - 10.0).abs() < 1e-3);
        assert_eq!(chain.bone(0).unwrap().start(), Vec2::new(0.0, 0.0));
    }

    #[test]
    fn chain_continuity_holds_after_solve() {
        let mut chain = two_bone_chain();
        chain.solve_for_target(Vec2::new(15.0, 5.0));
        for i in 1..chain.num_bones() {
            assert_eq!(chain.bone(i).unwrap().start(), chain.bone(i - 1).unwrap().end());
        }
    }

    #[test]
    fn fixed_base_is_honoured() {
        let mut chain = two_bone_chain();
        chain.solve_for_target(Vec2::new(5.0, 5.0));
        assert_eq!(chain.bone(0).unwrap().start(), chain.base_location());
    }

    #[test]
    fn early_exit_on_unchanged_target() {
        let mut chain = two_bone_chain();
        let first = chain.solve_for_target(Vec2::new(15.0, 3.0));
        let bone_before = chain.bones().to_vec();
        let second = chain.solve_for_target(Vec2::new(15.0, 3.0));
        assert_eq!(first, second);
        assert_eq!(bone_before, chain.bones().to_vec());
    }

    #[test]
    fn add_consecutive_bone_requires_basebone() {
        let mut chain = Chain2D::new();
        let err = chain.add_consecutive_bone(Vec2::X, 5.0, Joint2D::free());
        assert!(matches!(err, Err(IkError::InvalidState(_))));
    }

    #[test]
    fn add_consecutive_bone_rejects_bad_args() {
        let mut chain = two_bone_chain();
        assert!(chain.add_consecutive_bone(Vec2::ZERO, 5.0, Joint2D::free()).is_err());
        assert!(chain.add_consecutive_bone(Vec2::X, 0.0, Joint2D::free()).is_err());
    }

    #[test]
    fn remove_bone_out_of_range() {
        let mut chain = two_bone_chain();
        assert!(matches!(chain.remove_bone(5), Err(IkError::OutOfRange { .. })));
    }

    #[test]
    fn embedded_target_requires_mode_enabled() {
        let mut chain = two_bone_chain();
        assert!(chain.solve_for_embedded_target().is_err());
        assert!(chain.update_embedded_target(Vec2::ZERO).is_err());
        chain.set_embedded_target_mode(true);
        chain.update_embedded_target(Vec2::new(10.0, 10.0)).unwrap();
        assert!(chain.solve_for_embedded_target().is_ok());
    }

    #[test]
    fn set_fixed_base_refuses_when_connected() {
        let mut chain = two_bone_chain();
        chain.set_connection(0, 0, ConnectionPoint::End);
        assert!(matches!(chain.set_fixed_base(false), Err(IkError::InvalidState(_))));
    }

    #[test]
    fn best_solution_retention_tracks_minimum_distance() {
        let mut chain = two_bone_chain();
        chain.bone(0).unwrap();
        // Tight constraints on the second bone encourage oscillation across iterations.
        let mut tight = Joint2D::free();
        tight.set_clockwise_limit_degs(5.0);
        tight.set_anticlockwise_limit_degs(5.0);
        let bones = vec![
            Bone2D::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, 10.0)).unwrap(),
            Bone2D::new(Vec2::new(0.0, 10.0), Vec2::new(0.0, 20.0))
                .unwrap()
                .with_joint(tight),
        ];
        let mut constrained = Chain2D::new();
        for b in bones {
            constrained.add_bone(b);
        }
        let distance = constrained.solve_for_target(Vec2::new(25.0, 25.0));
        assert_eq!(distance, constrained.current_solve_distance());
    }
}
