use approx::assert_relative_eq;
use phys2d_solver::math::{Matrix2, Matrix3, Rotation, Sweep, Transform, Vector2, Vector3};
use std::f32::consts::PI;

#[test]
fn test_vector_operations() {
    let a = Vector2::new(3.0, 4.0);
    let b = Vector2::new(-2.0, 1.0);

    assert_relative_eq!(a.length(), 5.0);
    assert_relative_eq!(a.dot(&b), -2.0);
    assert_relative_eq!(a.cross(&b), 11.0);

    // w x r is perpendicular to r and scales with w.
    let v = Vector2::scalar_cross(2.0, &a);
    assert_relative_eq!(v.dot(&a), 0.0);
    assert_relative_eq!(v.length(), 10.0);

    // v x s is the opposite rotation of s x v.
    let t = a.cross_scalar(1.0);
    assert_relative_eq!(t.x, -Vector2::scalar_cross(1.0, &a).x);
    assert_relative_eq!(t.y, -Vector2::scalar_cross(1.0, &a).y);

    let mut n = a;
    let length = n.normalize_mut();
    assert_relative_eq!(length, 5.0);
    assert_relative_eq!(n.length(), 1.0);
}

#[test]
fn test_rotation_composition() {
    let q = Rotation::new(0.3);
    let r = Rotation::new(0.5);

    assert_relative_eq!(q.mul(&r).get_angle(), 0.8, epsilon = 1e-6);
    assert_relative_eq!(q.mul_t(&r).get_angle(), 0.2, epsilon = 1e-6);

    let v = Vector2::new(1.0, 2.0);
    let back = q.inv_rotate(q.rotate(v));
    assert_relative_eq!(back.x, v.x, epsilon = 1e-6);
    assert_relative_eq!(back.y, v.y, epsilon = 1e-6);
}

#[test]
fn test_transform_round_trip() {
    let xf = Transform::from_position_angle(Vector2::new(1.0, -2.0), PI / 2.0);

    let p = xf.transform_point(Vector2::new(1.0, 0.0));
    assert_relative_eq!(p.x, 1.0, epsilon = 1e-6);
    assert_relative_eq!(p.y, -1.0, epsilon = 1e-6);

    let q = xf.inverse_transform_point(p);
    assert_relative_eq!(q.x, 1.0, epsilon = 1e-6);
    assert_relative_eq!(q.y, 0.0, epsilon = 1e-6);
}

#[test]
fn test_matrix_solves() {
    let k = Matrix2::new([[4.0, 1.0], [1.0, 3.0]]);
    let x = k.solve(Vector2::new(1.0, 2.0));
    let b = k.mul_vector(x);
    assert_relative_eq!(b.x, 1.0, epsilon = 1e-6);
    assert_relative_eq!(b.y, 2.0, epsilon = 1e-6);

    let inverse = k.inverse();
    let y = inverse.mul_vector(Vector2::new(1.0, 2.0));
    assert_relative_eq!(x.x, y.x, epsilon = 1e-6);
    assert_relative_eq!(x.y, y.y, epsilon = 1e-6);

    // A singular matrix solves to zero.
    assert!(Matrix2::new([[1.0, 2.0], [2.0, 4.0]]).solve(Vector2::new(1.0, 1.0)).is_zero());

    let m = Matrix3::new([[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]]);
    let z = m.solve33(Vector3::new(1.0, 2.0, 3.0));
    assert_relative_eq!(4.0 * z.x + z.y + 0.5 * z.z, 1.0, epsilon = 1e-5);
    assert_relative_eq!(z.x + 3.0 * z.y + 0.2 * z.z, 2.0, epsilon = 1e-5);
    assert_relative_eq!(0.5 * z.x + 0.2 * z.y + 2.0 * z.z, 3.0, epsilon = 1e-5);

    let w = m.solve22(Vector2::new(1.0, 2.0));
    assert_relative_eq!(w.x, x.x, epsilon = 1e-6);
    assert_relative_eq!(w.y, x.y, epsilon = 1e-6);
}

#[test]
fn test_sweep_interpolation() {
    let mut sweep = Sweep::new(Vector2::zero(), Vector2::zero(), 0.0);
    sweep.c = Vector2::new(2.0, 0.0);
    sweep.a = 1.0;

    let mid = sweep.get_transform(0.5);
    assert_relative_eq!(mid.position.x, 1.0);
    assert_relative_eq!(mid.rotation.get_angle(), 0.5, epsilon = 1e-6);

    sweep.advance(0.5);
    assert_relative_eq!(sweep.c0.x, 1.0);
    assert_relative_eq!(sweep.get_transform(1.0).position.x, 2.0);
}
