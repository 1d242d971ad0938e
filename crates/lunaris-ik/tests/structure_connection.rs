use lunaris_core::{Vec2, Vec3};
use lunaris_ik::{Bone2D, Bone3D, Chain2D, Chain3D, Structure2D, Structure3D};

#[test]
fn connected_2d_chain_is_rebased_onto_its_moving_host() {
    let mut structure = Structure2D::new();

    let mut host = Chain2D::new();
    host.add_bone(Bone2D::new(Vec2::ZERO, Vec2::new(10.0, 0.0)).unwrap());
    host.set_embedded_target_mode(true);
    host.update_embedded_target(Vec2::new(0.0, 10.0)).unwrap();
    structure.add_chain(host);

    let mut arm = Chain2D::new();
    arm.add_bone(Bone2D::new(Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0)).unwrap());
    arm.set_embedded_target_mode(true);
    arm.update_embedded_target(Vec2::new(15.0, 25.0)).unwrap();
    structure.connect_chain(arm, 0, 0).unwrap();

    structure.solve_for_target(Vec2::ZERO).unwrap();

    let host_effector = structure.chain(0).unwrap().effector_location().unwrap();
    let arm_base = structure.chain(1).unwrap().bone(0).unwrap().start();
    assert!(host_effector.approx_eq(arm_base, 1e-3));
}

#[test]
fn connected_3d_chain_is_rebased_onto_its_moving_host() {
    let mut structure = Structure3D::new();

    let mut host = Chain3D::new();
    host.add_bone(Bone3D::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)).unwrap());
    host.set_embedded_target_mode(true);
    host.update_embedded_target(Vec3::new(0.0, 10.0, 0.0)).unwrap();
    structure.add_chain(host);

    let mut arm = Chain3D::new();
    arm.add_bone(Bone3D::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(20.0, 0.0, 0.0)).unwrap());
    arm.set_embedded_target_mode(true);
    arm.update_embedded_target(Vec3::new(15.0, 0.0, 25.0)).unwrap();
    structure.connect_chain(arm, 0, 0).unwrap();

    structure.solve_for_target(Vec3::ZERO).unwrap();

    let host_effector = structure.chain(0).unwrap().effector_location().unwrap();
    let arm_base = structure.chain(1).unwrap().bone(0).unwrap().start();
    assert!(host_effector.approx_eq(arm_base, 1e-3));
}

#[test]
fn connecting_to_an_unknown_host_chain_is_rejected() {
    let mut structure = Structure2D::new();
    let mut chain = Chain2D::new();
    chain.add_bone(Bone2D::new(Vec2::ZERO, Vec2::new(1.0, 0.0)).unwrap());
    assert!(structure.connect_chain(chain, 0, 0).is_err());
}
