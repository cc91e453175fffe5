//! Math Primitive Tests
//!
//! Tests for:
//! - BoundingBox growing, union, center/size, transform, containment
//! - BoundingSphere containment and conservative line intersection
//! - Plane construction and signed distance
//! - Line parameterisation

use glam::{Mat4, Vec3};

use arbor::math::{BoundingBox, BoundingSphere, Line, Plane};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx(a.x, b.x) && approx(a.y, b.y) && approx(a.z, b.z)
}

// ============================================================================
// BoundingBox
// ============================================================================

#[test]
fn bbox_invalid_contains_nothing() {
    let bb = BoundingBox::invalid();
    assert!(!bb.is_valid());
    assert!(!bb.contains_point(Vec3::ZERO));
}

#[test]
fn bbox_grow_single_point_collapses_to_point() {
    let mut bb = BoundingBox::invalid();
    let p = Vec3::new(1.0, -2.0, 3.0);
    bb.grow_point(p);
    assert!(bb.is_valid());
    assert_eq!(bb.min, p);
    assert_eq!(bb.max, p);
}

#[test]
fn bbox_grow_two_points_spans_componentwise() {
    let mut bb = BoundingBox::invalid();
    let p = Vec3::new(1.0, -2.0, 3.0);
    let q = Vec3::new(-1.0, 4.0, 0.0);
    bb.grow_point(p);
    bb.grow_point(q);
    assert_eq!(bb.min, Vec3::new(-1.0, -2.0, 0.0));
    assert_eq!(bb.max, Vec3::new(1.0, 4.0, 3.0));
}

#[test]
fn bbox_center_and_size() {
    let bb = BoundingBox::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0));
    assert!(vec3_approx(bb.center(), Vec3::ZERO));
    assert!(vec3_approx(bb.size(), Vec3::new(2.0, 4.0, 6.0)));
}

#[test]
fn bbox_union() {
    let a = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
    let b = BoundingBox::new(Vec3::ZERO, Vec3::splat(3.0));
    let u = a.union(&b);
    assert_eq!(u.min, Vec3::splat(-1.0));
    assert_eq!(u.max, Vec3::splat(3.0));
}

#[test]
fn bbox_transform_translation() {
    let bb = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
    let moved = bb.transform(&Mat4::from_translation(Vec3::new(10.0, 20.0, 30.0)));
    assert!(vec3_approx(moved.min, Vec3::new(10.0, 20.0, 30.0)));
    assert!(vec3_approx(moved.max, Vec3::new(11.0, 21.0, 31.0)));
}

#[test]
fn bbox_transform_invalid_stays_invalid() {
    let bb = BoundingBox::invalid();
    let moved = bb.transform(&Mat4::from_translation(Vec3::ONE));
    assert!(!moved.is_valid());
}

#[test]
fn bbox_contains_boundary() {
    let bb = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
    assert!(bb.contains_point(Vec3::new(1.0, 1.0, 1.0)));
    assert!(bb.contains_point(Vec3::ZERO));
    assert!(!bb.contains_point(Vec3::new(1.0, 1.0, 1.1)));
}

// ============================================================================
// BoundingSphere
// ============================================================================

#[test]
fn sphere_contains_point_matches_distance() {
    let s = BoundingSphere::new(Vec3::ZERO, 1.0);
    assert!(s.contains_point(Vec3::new(0.5, 0.5, 0.5)));
    assert!(s.contains_point(Vec3::new(1.0, 0.0, 0.0)));
    assert!(!s.contains_point(Vec3::new(0.8, 0.8, 0.8)));

    let off = BoundingSphere::new(Vec3::new(2.0, 0.0, 0.0), 1.5);
    assert!(off.contains_point(Vec3::new(3.4, 0.0, 0.0)));
    assert!(!off.contains_point(Vec3::new(3.6, 0.0, 0.0)));
}

#[test]
fn sphere_from_box_roundtrip() {
    let bb = BoundingBox::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(3.0, 3.0, 3.0));
    let s = BoundingSphere::from_box(&bb);
    assert!(vec3_approx(s.center, Vec3::splat(2.0)));
    assert!(approx(s.radius, 3.0_f32.sqrt()));
}

#[test]
fn sphere_intersects_grazing_line() {
    let s = BoundingSphere::new(Vec3::ZERO, 1.0);
    let line = Line::new(Vec3::new(1.0, 1.0, -1.0), Vec3::new(1.0, 1.0, 3.0));
    assert!(s.intersects_line(&line));
}

#[test]
fn sphere_intersects_line_through_center() {
    let s = BoundingSphere::new(Vec3::ZERO, 1.0);
    let line = Line::new(Vec3::new(0.0, 0.0, -2.0), Vec3::new(0.0, 0.0, 2.0));
    assert!(s.intersects_line(&line));
}

#[test]
fn sphere_misses_distant_line() {
    let s = BoundingSphere::new(Vec3::ZERO, 1.0);
    let line = Line::new(Vec3::new(3.0, 3.0, -1.0), Vec3::new(3.0, 3.0, 3.0));
    assert!(!s.intersects_line(&line));
}

#[test]
fn sphere_misses_short_segment() {
    let s = BoundingSphere::new(Vec3::ZERO, 1.0);
    // Segment ends before reaching the sphere's bounds.
    let line = Line::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 3.0));
    assert!(!s.intersects_line(&line));
}

#[test]
fn sphere_invalid_intersects_nothing() {
    let s = BoundingSphere::invalid();
    let line = Line::new(Vec3::splat(-1.0), Vec3::splat(1.0));
    assert!(!s.intersects_line(&line));
    assert!(!s.contains_point(Vec3::ZERO));
}

// ============================================================================
// Plane
// ============================================================================

#[test]
fn plane_signed_distance() {
    let p = Plane::from_point_normal(Vec3::new(0.0, 2.0, 0.0), Vec3::Y);
    assert!(approx(p.distance_to_point(Vec3::new(0.0, 5.0, 0.0)), 3.0));
    assert!(approx(p.distance_to_point(Vec3::new(7.0, 2.0, -3.0)), 0.0));
    assert!(approx(p.distance_to_point(Vec3::ZERO), -2.0));
}

#[test]
fn plane_from_points_normal_direction() {
    let p = Plane::from_points(Vec3::ZERO, Vec3::X, Vec3::Y);
    assert!(vec3_approx(p.normal, Vec3::Z));
    assert!(approx(p.distance_to_point(Vec3::new(0.0, 0.0, 4.0)), 4.0));
}

// ============================================================================
// Line
// ============================================================================

#[test]
fn line_point_at_and_closest() {
    let line = Line::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
    assert!(vec3_approx(line.point_at(0.5), Vec3::new(5.0, 0.0, 0.0)));
    assert!(approx(line.closest_parameter(Vec3::new(3.0, 4.0, 0.0)), 0.3));
    assert!(approx(line.length(), 10.0));
}
