//! An ordered sequence of 3D bones and the FABRIK solver that positions them.

use lunaris_core::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::bone3d::Bone3D;
use crate::common::ConnectionPoint;
use crate::error::IkError;
use crate::joint3d::{HingeParams, Joint3D};
use crate::math3::{Basis3, Vec3Ext};
use crate::Result;

/// How the basebone (first bone) of a 3D chain is constrained during the
/// backward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BaseboneConstraint3D {
    /// No constraint; the basebone may point anywhere.
    #[default]
    None,
    /// Constrained to `basebone_constraint_dir`, a fixed world-space
    /// direction, as a cone (rotor) using the basebone's own ball-joint
    /// rotor limit.
    GlobalRotor,
    /// Constrained relative to the host bone direction, recomputed by the
    /// structure every tick, as a cone (rotor).
    LocalRotor,
    /// Constrained to rotate only about `basebone_constraint_dir`,
    /// interpreted as a world-space hinge axis, using the basebone's own
    /// hinge cw/acw limits and reference axis.
    GlobalHinge,
    /// Constrained to rotate only about a hinge axis expressed in the host
    /// bone's frame.
    ///
    /// Not supported at the basebone: rejected eagerly by
    /// [`Chain3D::set_basebone_constraint`] rather than deep inside the
    /// solver, so the failure surfaces at the first API call that detects
    /// it (see `DESIGN.md`).
    LocalHinge,
}

/// An ordered sequence of bones sharing endpoints, solved with FABRIK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain3D {
    bones: Vec<Bone3D>,
    chain_length: f32,

    fixed_base: bool,
    base_location: Vec3,

    basebone_constraint: BaseboneConstraint3D,
    basebone_constraint_dir: Vec3,
    basebone_relative_constraint_dir: Vec3,
    basebone_relative_ref_constraint_dir: Vec3,

    solve_distance_threshold: f32,
    max_iteration_attempts: u32,
    min_iteration_change: f32,

    embedded_target_enabled: bool,
    embedded_target: Vec3,

    last_target_location: Option<Vec3>,
    last_base_location: Option<Vec3>,
    current_solve_distance: f32,

    connected_chain_index: i32,
    connected_bone_index: i32,
}

impl Default for Chain3D {
    fn default() -> Self {
        Self {
            bones: Vec::new(),
            chain_length: 0.0,
            fixed_base: true,
            base_location: Vec3::ZERO,
            basebone_constraint: BaseboneConstraint3D::None,
            basebone_constraint_dir: Vec3::X,
            basebone_relative_constraint_dir: Vec3::X,
            basebone_relative_ref_constraint_dir: Vec3::X,
            solve_distance_threshold: 0.1,
            max_iteration_attempts: 20,
            min_iteration_change: 0.01,
            embedded_target_enabled: false,
            embedded_target: Vec3::ZERO,
            last_target_location: None,
            last_base_location: None,
            current_solve_distance: f32::INFINITY,
            connected_chain_index: -1,
            connected_bone_index: -1,
        }
    }
}

impl Chain3D {
    /// An empty chain with default convergence parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- construction -----------------------------------------------------

    /// Append a bone. If this is the first bone, `base_location` and the
    /// provisional `basebone_constraint_dir` are taken from it.
    pub fn add_bone(&mut self, bone: Bone3D) {
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
        direction_uv: Vec3,
        length: f32,
        joint: Joint3D,
    ) -> Result<()> {
        let Some(prev) = self.bones.last() else {
            return Err(IkError::InvalidState(
                "cannot add a consecutive bone before any basebone exists".into(),
            ));
        };
        let bone = Bone3D::from_direction(prev.end(), direction_uv, length)?.with_joint(joint);
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
    pub fn bones(&self) -> &[Bone3D] {
        &self.bones
    }

    /// Mutable access to every bone, used by the owning structure to
    /// translate a newly connected chain into its host's frame.
    pub(crate) fn bones_mut(&mut self) -> &mut Vec<Bone3D> {
        &mut self.bones
    }

    /// The bone at `index`.
    ///
    /// # Errors
    ///
    /// [`IkError::OutOfRange`] if `index` is beyond the current bone count.
    pub fn bone(&self, index: usize) -> Result<&Bone3D> {
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
    pub fn effector_location(&self) -> Option<Vec3> {
        self.bones.last().map(Bone3D::end)
    }

    /// Effector-to-target distance of the best solution seen by the most
    /// recent solve.
    #[must_use]
    pub fn current_solve_distance(&self) -> f32 {
        self.current_solve_distance
    }

    /// The target used by the most recent solve, if any.
    #[must_use]
    pub fn last_target_location(&self) -> Option<Vec3> {
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
    pub fn base_location(&self) -> Vec3 {
        self.base_location
    }

    /// Set the chain's base location. A connected chain has this field
    /// overwritten by its structure every tick.
    pub fn set_base_location(&mut self, location: Vec3) {
        self.base_location = location;
    }

    /// Enable or disable fixed-base mode.
    ///
    /// # Errors
    ///
    /// [`IkError::InvalidState`] if disabling while the chain is connected
    /// to a host, or while the basebone constraint is
    /// [`BaseboneConstraint3D::GlobalRotor`].
    pub fn set_fixed_base(&mut self, enabled: bool) -> Result<()> {
        if !enabled {
            if self.connected_chain_index >= 0 {
                return Err(IkError::InvalidState(
                    "cannot disable fixed-base on a chain connected to a host".into(),
                ));
            }
            if self.basebone_constraint == BaseboneConstraint3D::GlobalRotor {
                return Err(IkError::InvalidState(
                    "cannot disable fixed-base while the basebone constraint is global-rotor"
                        .into(),
                ));
            }
        }
        self.fixed_base = enabled;
        Ok(())
    }

    /// The basebone constraint type.
    #[must_use]
    pub fn basebone_constraint(&self) -> BaseboneConstraint3D {
        self.basebone_constraint
    }

    /// Set the basebone constraint type and its world-space reference
    /// direction (a cone axis for rotor types, a hinge axis for hinge
    /// types).
    ///
    /// # Errors
    ///
    /// - [`IkError::Unsupported`] for [`BaseboneConstraint3D::LocalHinge`].
    /// - [`IkError::InvalidState`] if a rotor constraint is requested but
    ///   the basebone's own joint is not a [`Joint3D::Ball`], or a hinge
    ///   constraint is requested but it is not a hinge.
    /// - [`IkError::InvalidState`] if the chain has no basebone yet.
    pub fn set_basebone_constraint(
        &mut self,
        constraint: BaseboneConstraint3D,
        dir: Vec3,
    ) -> Result<()> {
        if constraint == BaseboneConstraint3D::LocalHinge {
            return Err(IkError::Unsupported(
                "a LocalHinge basebone constraint is not supported by the solver".into(),
            ));
        }
        if constraint != BaseboneConstraint3D::None {
            let Some(basebone) = self.bones.first() else {
                return Err(IkError::InvalidState(
                    "cannot set a basebone constraint before any basebone exists".into(),
                ));
            };
            let needs_ball = matches!(
                constraint,
                BaseboneConstraint3D::GlobalRotor | BaseboneConstraint3D::LocalRotor
            );
            if needs_ball && !basebone.joint.is_ball() {
                return Err(IkError::InvalidState(
                    "a rotor basebone constraint requires a ball-jointed basebone".into(),
                ));
            }
            if !needs_ball && !basebone.joint.is_hinge() {
                return Err(IkError::InvalidState(
                    "a hinge basebone constraint requires a hinge-jointed basebone".into(),
                ));
            }
        }
        self.basebone_constraint = constraint;
        self.basebone_constraint_dir = dir.normalize();
        Ok(())
    }

    /// The world-space basebone constraint reference direction.
    #[must_use]
    pub fn basebone_constraint_dir(&self) -> Vec3 {
        self.basebone_constraint_dir
    }

    /// The relative basebone constraint direction, recomputed by the
    /// structure each tick for connected chains with a local basebone
    /// constraint. Read-only to external callers.
    #[must_use]
    pub fn basebone_relative_constraint_dir(&self) -> Vec3 {
        self.basebone_relative_constraint_dir
    }

    /// The relative basebone reference-axis direction (local-hinge only).
    /// Read-only to external callers.
    #[must_use]
    pub fn basebone_relative_ref_constraint_dir(&self) -> Vec3 {
        self.basebone_relative_ref_constraint_dir
    }

    /// Written only by the owning structure, immediately before invoking
    /// the solver for this chain.
    pub(crate) fn set_basebone_relative_constraint_dir(&mut self, dir: Vec3) {
        self.basebone_relative_constraint_dir = dir;
    }

    /// Written only by the owning structure, immediately before invoking
    /// the solver for this chain.
    pub(crate) fn set_basebone_relative_ref_constraint_dir(&mut self, dir: Vec3) {
        self.basebone_relative_ref_constraint_dir = dir;
    }

    /// The indices of the host chain/bone this chain is connected to, or
    /// `(-1, -1)` if unconnected.
    #[must_use]
    pub fn connection_indices(&self) -> (i32, i32) {
        (self.connected_chain_index, self.connected_bone_index)
    }

    pub(crate) fn set_connection(&mut self, chain_index: i32, bone_index: i32) {
        self.connected_chain_index = chain_index;
        self.connected_bone_index = bone_index;
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
    pub fn embedded_target(&self) -> Vec3 {
        self.embedded_target
    }

    /// Overwrite the embedded target.
    ///
    /// # Errors
    ///
    /// [`IkError::InvalidState`] if embedded-target mode is disabled.
    pub fn update_embedded_target(&mut self, target: Vec3) -> Result<()> {
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
    /// [`IkError::InvalidState`] if embedded-target mode is disabled, or
    /// whatever [`Chain3D::solve_for_target`] returns.
    pub fn solve_for_embedded_target(&mut self) -> Result<f32> {
        if !self.embedded_target_enabled {
            return Err(IkError::InvalidState("embedded target mode is not enabled".into()));
        }
        self.solve_for_target(self.embedded_target)
    }

    /// Run FABRIK to bring the effector as close to `target` as the
    /// chain's constraints allow, committing only the best solution seen
    /// across up to `max_iteration_attempts` iterations.
    ///
    /// # Errors
    ///
    /// [`IkError::Unsupported`] if the basebone constraint is
    /// [`BaseboneConstraint3D::LocalHinge`] (unreachable via the public
    /// API since [`Chain3D::set_basebone_constraint`] already rejects it,
    /// kept here as defence in depth). Otherwise never fails: an empty
    /// chain simply returns a zero distance without modifying anything.
    pub fn solve_for_target(&mut self, target: Vec3) -> Result<f32> {
        if self.bones.is_empty() {
            return Ok(0.0);
        }
        if self.basebone_constraint == BaseboneConstraint3D::LocalHinge {
            return Err(IkError::Unsupported(
                "a LocalHinge basebone constraint is not supported during solve".into(),
            ));
        }

        if let (Some(last_target), Some(last_base)) =
            (self.last_target_location, self.last_base_location)
        {
            if target.approx_eq(last_target, 0.001) && self.base_location.approx_eq(last_base, 0.001)
            {
                trace!("chain3d: target and base unchanged, skipping solve");
                return Ok(self.current_solve_distance);
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
                best_distance, "chain3d: solve exhausted iteration budget without converging"
            );
        } else {
            debug!(iterations_used, best_distance, "chain3d: solve converged");
        }

        self.bones = best_solution;
        self.current_solve_distance = best_distance;
        self.last_target_location = Some(target);
        self.last_base_location = Some(self.base_location);
        Ok(self.current_solve_distance)
    }

    fn run_iteration(&mut self, target: Vec3) -> f32 {
        let n = self.bones.len();

        // Forward pass: tip -> base. Only the hinge-plane projection is
        // enforced on this pass; reference-axis cw/acw limits are
        // intentionally skipped here and applied on the backward pass instead.
        for i in (0..n).rev() {
            let length = self.bones[i].length();
            let u_this = if i == n - 1 {
                self.bones[i].set_end(target);
                let raw = (self.bones[i].start() - self.bones[i].end()).normalize();
                match self.bones[i].joint {
                    Joint3D::Ball { .. } => raw,
                    Joint3D::GlobalHinge(params) => project_hinge_plane(raw, params.axis),
                    Joint3D::LocalHinge(params) => {
                        // The tip's own predecessor (bone[i-1]) hasn't moved
                        // yet this sweep but its direction is still the best
                        // available frame estimate; a lone basebone-and-tip
                        // chain has no predecessor, so it falls back to its
                        // own about-to-be direction.
                        let frame_dir = if i > 0 {
                            (self.bones[i - 1].end() - self.bones[i - 1].start()).normalize()
                        } else {
                            raw
                        };
                        let basis = Basis3::align_z_to(frame_dir);
                        let axis_world = basis.local_to_world(params.axis);
                        project_hinge_plane(raw, axis_world)
                    }
                }
            } else {
                let u_outer = (self.bones[i + 1].start() - self.bones[i + 1].end()).normalize();
                let raw = (self.bones[i].start() - self.bones[i].end()).normalize();
                match self.bones[i + 1].joint {
                    Joint3D::Ball { rotor_limit_degs } => raw.limit(u_outer, rotor_limit_degs),
                    Joint3D::GlobalHinge(params) => project_hinge_plane(raw, params.axis),
                    Joint3D::LocalHinge(params) => {
                        // The hinge belongs to bone[i+1]; its natural local
                        // frame is defined by its own predecessor (bone[i]),
                        // which is not yet resolved in this sweep. Only the
                        // plane matters forward (ref-axis limits are
                        // deliberately skipped), so the axis is carried
                        // through the basis aligned to the outer bone's own
                        // current direction instead.
                        let basis = Basis3::align_z_to(u_outer);
                        let axis_world = basis.local_to_world(params.axis);
                        project_hinge_plane(raw, axis_world)
                    }
                }
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
                // Unsupported LocalHinge is already rejected before this
                // function ever runs; every remaining arm is infallible.
                let u_new = self.apply_basebone_constraint(raw);
                self.bones[0].set_end(self.bones[0].start() + u_new * length);
                if n > 1 {
                    self.bones[1].set_start(self.bones[0].end());
                }
            } else {
                let u_prev = (self.bones[i - 1].end() - self.bones[i - 1].start()).normalize();
                let raw = (self.bones[i].end() - self.bones[i].start()).normalize();
                let u_this = match self.bones[i].joint {
                    Joint3D::Ball { rotor_limit_degs } => raw.limit(u_prev, rotor_limit_degs),
                    Joint3D::GlobalHinge(params) => {
                        enforce_hinge(raw, params.axis, params.ref_axis, params.cw_degs, params.acw_degs)
                    }
                    Joint3D::LocalHinge(params) => {
                        let basis = Basis3::align_z_to(u_prev);
                        let axis_world = basis.local_to_world(params.axis);
                        let ref_world = basis.local_to_world(params.ref_axis);
                        enforce_hinge(raw, axis_world, ref_world, params.cw_degs, params.acw_degs)
                    }
                };
                self.bones[i].set_end(self.bones[i].start() + u_this * length);
                if i < n - 1 {
                    self.bones[i + 1].set_start(self.bones[i].end());
                }
            }
        }

        (self.bones[n - 1].end() - target).length()
    }

    fn apply_basebone_constraint(&self, raw: Vec3) -> Vec3 {
        match self.basebone_constraint {
            BaseboneConstraint3D::None => raw,
            BaseboneConstraint3D::GlobalRotor => {
                let rotor = self.bones[0].joint.rotor_limit_degs().unwrap_or(180.0);
                raw.limit(self.basebone_constraint_dir, rotor)
            }
            BaseboneConstraint3D::LocalRotor => {
                let rotor = self.bones[0].joint.rotor_limit_degs().unwrap_or(180.0);
                raw.limit(self.basebone_relative_constraint_dir, rotor)
            }
            BaseboneConstraint3D::GlobalHinge => {
                let axis = self.basebone_constraint_dir;
                match self.bones[0].joint.hinge_params() {
                    Ok(HingeParams { ref_axis, cw_degs, acw_degs, .. }) => {
                        enforce_hinge(raw, axis, ref_axis, cw_degs, acw_degs)
                    }
                    Err(_) => project_hinge_plane(raw, axis),
                }
            }
            BaseboneConstraint3D::LocalHinge => raw,
        }
    }
}

/// Project `v` onto the plane perpendicular to `axis`; falls back to `v`
/// normalised if `axis` degenerates to zero mid-solve rather than
/// propagating a `NaN`.
fn project_hinge_plane(v: Vec3, axis: Vec3) -> Vec3 {
    v.project_onto_plane(axis).unwrap_or_else(|_| v.normalize())
}

/// Full hinge enforcement: project onto the hinge plane, then clamp the
/// signed angle about `ref_axis` into `[-cw_degs, +acw_degs]` unless the
/// hinge is fully free.
fn enforce_hinge(v: Vec3, axis: Vec3, ref_axis: Vec3, cw_degs: f32, acw_degs: f32) -> Vec3 {
    let projected = project_hinge_plane(v, axis);
    if (cw_degs - 180.0).abs() < 0.001 && (acw_degs - 180.0).abs() < 0.001 {
        return projected;
    }
    let angle = ref_axis.signed_angle_degs(projected, axis);
    if angle > acw_degs {
        ref_axis.rotate_about_axis(acw_degs, axis)
    } else if angle < -cw_degs {
        ref_axis.rotate_about_axis(-cw_degs, axis)
    } else {
        projected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_chain(n: usize, bone_length: f32, joint: Joint3D) -> Chain3D {
        let mut chain = Chain3D::new();
        chain.add_bone(
            Bone3D::new(Vec3::ZERO, Vec3::new(bone_length, 0.0, 0.0)).unwrap().with_joint(joint),
        );
        for _ in 1..n {
            chain.add_consecutive_bone(Vec3::X, bone_length, joint).unwrap();
        }
        chain
    }

    #[test]
    fn three_bone_ball_joint_unreachable_target() {
        let mut chain = straight_chain(3, 10.0, Joint3D::ball(45.0));
        let distance = chain.solve_for_target(Vec3::new(100.0, 0.0, 0.0)).unwrap();
        let effector = chain.effector_location().unwrap();
        assert!(effector.approx_eq(Vec3::new(30.0, 0.0, 0.0), 0.5));
        assert!((distance - 70.0).abs() < 0.5);
    }

    #[test]
    fn chain_continuity_and_length_hold_after_solve() {
        let mut chain = straight_chain(3, 10.0, Joint3D::unconstrained_ball());
        chain.solve_for_target(Vec3::new(15.0, 10.0, 5.0)).unwrap();
        for i in 1..chain.num_bones() {
            assert_eq!(chain.bone(i).unwrap().start(), chain.bone(i - 1).unwrap().end());
        }
        for bone in chain.bones() {
            assert!((bone.end().distance(bone.start()) - bone.length()).abs() < 1e-2);
        }
    }

    #[test]
    fn local_hinge_elbow_respects_axis_and_limit() {
        let mut chain = Chain3D::new();
        chain.add_bone(Bone3D::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)).unwrap());
        let hinge = Joint3D::local_hinge(Vec3::Z, 90.0, 90.0, Vec3::X).unwrap();
        chain.add_consecutive_bone(Vec3::X, 10.0, hinge).unwrap();

        chain.solve_for_target(Vec3::new(14.0, 14.0, 0.0)).unwrap();

        let first_dir = chain.bone(0).unwrap().direction();
        let second_dir = chain.bone(1).unwrap().direction();
        // The hinge only rotates about the previous bone's local +Z; with
        // the chain kept in the XY plane that axis stays world +Z.
        assert!(second_dir.z.abs() < 0.2);
        assert!(first_dir.unsigned_angle_degs(second_dir) <= 90.5);
    }

    #[test]
    fn local_hinge_basebone_constraint_is_rejected() {
        let mut chain = Chain3D::new();
        let hinge = Joint3D::global_hinge(Vec3::Z, 90.0, 90.0, Vec3::X).unwrap();
        chain.add_bone(Bone3D::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)).unwrap().with_joint(hinge));
        let err = chain.set_basebone_constraint(BaseboneConstraint3D::LocalHinge, Vec3::Z);
        assert!(matches!(err, Err(IkError::Unsupported(_))));
    }

    #[test]
    fn rotor_basebone_constraint_requires_ball_joint() {
        let mut chain = Chain3D::new();
        let hinge = Joint3D::global_hinge(Vec3::Z, 90.0, 90.0, Vec3::X).unwrap();
        chain.add_bone(Bone3D::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)).unwrap().with_joint(hinge));
        let err = chain.set_basebone_constraint(BaseboneConstraint3D::GlobalRotor, Vec3::X);
        assert!(matches!(err, Err(IkError::InvalidState(_))));
    }

    #[test]
    fn early_exit_on_unchanged_target() {
        let mut chain = straight_chain(2, 10.0, Joint3D::unconstrained_ball());
        let first = chain.solve_for_target(Vec3::new(15.0, 3.0, 0.0)).unwrap();
        let bones_before = chain.bones().to_vec();
        let second = chain.solve_for_target(Vec3::new(15.0, 3.0, 0.0)).unwrap();
        assert_eq!(first, second);
        assert_eq!(bones_before, chain.bones().to_vec());
    }
}
