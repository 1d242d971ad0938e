use criterion::{criterion_group, criterion_main, Criterion};
use lunaris_core::{Vec2, Vec3};
use lunaris_ik::{Bone2D, Bone3D, Chain2D, Chain3D, Joint2D, Joint3D};

fn two_bone_2d_chain() -> Chain2D {
    let mut chain = Chain2D::new();
    chain.add_bone(Bone2D::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, 10.0)).unwrap());
    chain.add_bone(Bone2D::new(Vec2::new(0.0, 10.0), Vec2::new(0.0, 20.0)).unwrap());
    chain
}

fn ten_bone_3d_chain() -> Chain3D {
    let mut chain = Chain3D::new();
    chain.add_bone(Bone3D::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)).unwrap());
    for _ in 1..10 {
        chain.add_consecutive_bone(Vec3::X, 1.0, Joint3D::ball(90.0)).unwrap();
    }
    chain
}

fn bench_chain2d_solve(c: &mut Criterion) {
    c.bench_function("chain2d_two_bone_solve", |b| {
        b.iter(|| {
            let mut chain = two_bone_2d_chain();
            chain.solve_for_target(Vec2::new(15.0, 8.0))
        });
    });
}

fn bench_chain3d_solve(c: &mut Criterion) {
    c.bench_function("chain3d_ten_bone_ball_solve", |b| {
        b.iter(|| {
            let mut chain = ten_bone_3d_chain();
            chain.solve_for_target(Vec3::new(6.0, 4.0, 2.0)).unwrap()
        });
    });
}

fn bench_joint2d_constrain(c: &mut Criterion) {
    let joint = Joint2D::new(45.0, 45.0);
    c.bench_function("joint2d_is_unconstrained", |b| {
        b.iter(|| joint.is_unconstrained());
    });
}

criterion_group!(benches, bench_chain2d_solve, bench_chain3d_solve, bench_joint2d_constrain);
criterion_main!(benches);
