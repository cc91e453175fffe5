//! Sphere Generation Tests
//!
//! Tests for:
//! - Subdivision size estimation (60·4ⁿ)
//! - Unit sphere emission: counts, containment, vertex sharing
//! - SphereShape update: indexed triangle list, analytic bounds
//! - Parameter validation
//! - Triangle edge extraction

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;

use arbor::resources::buffer::{IndexArray, VertexArray};
use arbor::resources::geometry::{Primitives, make_triangle_edges};
use arbor::resources::sphere::{SphereShape, estimate_sphere_sizes, generate_unit_sphere};

// ============================================================================
// Sizes
// ============================================================================

#[test]
fn estimated_sizes_follow_powers_of_four() {
    for n in 0..4 {
        let sizes = estimate_sphere_sizes(n);
        let expected = 60 * 4usize.pow(n);
        assert_eq!(sizes.num_points, expected);
        assert_eq!(sizes.num_indices, expected);
    }
}

#[test]
fn generation_matches_estimate() {
    for n in 0..3 {
        let mut count = 0usize;
        generate_unit_sphere(n, &mut |_| count += 1);
        assert_eq!(count, estimate_sphere_sizes(n).num_points);
    }
}

// ============================================================================
// Emitted vertices
// ============================================================================

#[test]
fn emitted_vertices_lie_on_unit_sphere_within_unit_cube() {
    let mut checked = 0usize;
    generate_unit_sphere(1, &mut |v: Vec3| {
        assert!(v.x.abs() <= 1.0 + 1e-6);
        assert!(v.y.abs() <= 1.0 + 1e-6);
        assert!(v.z.abs() <= 1.0 + 1e-6);
        assert!((v.length() - 1.0).abs() < 1e-5);
        checked += 1;
    });
    assert_eq!(checked, 240);
}

#[test]
fn each_unique_vertex_shared_by_at_least_five_triangles() {
    let mut occurrences: HashMap<[i32; 3], u32> = HashMap::new();
    generate_unit_sphere(1, &mut |v: Vec3| {
        let key = [
            (v.x * 10_000.0).round() as i32,
            (v.y * 10_000.0).round() as i32,
            (v.z * 10_000.0).round() as i32,
        ];
        *occurrences.entry(key).or_insert(0) += 1;
    });

    // Depth 1: 12 original vertices plus 30 edge midpoints.
    assert_eq!(occurrences.len(), 42);
    for count in occurrences.values() {
        assert!(*count >= 5, "vertex shared by only {count} triangles");
    }
}

#[test]
fn emission_is_deterministic() {
    let mut first = Vec::new();
    generate_unit_sphere(1, &mut |v| first.push(v));
    let mut second = Vec::new();
    generate_unit_sphere(1, &mut |v| second.push(v));
    assert_eq!(first, second);
}

// ============================================================================
// SphereShape
// ============================================================================

#[test]
fn update_builds_indexed_triangle_list() {
    let mut shape = SphereShape::new(Vec3::ZERO, 1.0, 1).unwrap();
    shape.update().unwrap();

    let geometry = shape.geometry();
    let points = geometry.points().unwrap();
    assert_eq!(points.vertex_count(), 240);
    assert_eq!(points.len(), 720);
    assert_eq!(geometry.normals().unwrap().vertex_count(), 240);

    let sets = geometry.primitive_sets();
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].num_indices(), 240);
    match &sets[0].primitives {
        Primitives::Indexed(indices) => {
            let data = indices.data();
            for i in 0..indices.len() {
                let value = data.get(i).unwrap();
                assert!(value < 240, "index {value} out of range");
            }
        }
        Primitives::Array { .. } => panic!("expected an indexed primitive set"),
    }
}

#[test]
fn update_scales_and_translates_points() {
    let center = Vec3::new(5.0, 0.0, 0.0);
    let mut shape = SphereShape::new(center, 2.0, 0).unwrap();
    shape.update().unwrap();

    let data = shape.geometry().points().unwrap().data();
    for chunk in data.chunks_exact(3) {
        let p = Vec3::new(chunk[0], chunk[1], chunk[2]);
        assert!(((p - center).length() - 2.0).abs() < 1e-5);
    }
}

#[test]
fn update_is_idempotent_until_dirtied() {
    let mut shape = SphereShape::new(Vec3::ZERO, 1.0, 1).unwrap();
    shape.update().unwrap();
    let first = shape.geometry().points().unwrap().id();
    shape.update().unwrap();
    assert_eq!(shape.geometry().points().unwrap().id(), first);

    shape.set_radius(2.0).unwrap();
    assert!(shape.is_dirty());
    shape.update().unwrap();
    assert_ne!(shape.geometry().points().unwrap().id(), first);
}

#[test]
fn analytic_bounds_match_parameters() {
    let center = Vec3::new(1.0, 2.0, 3.0);
    let shape = SphereShape::new(center, 4.0, 1).unwrap();
    let bbox = shape.bounding_box();
    assert!((bbox.min - (center - Vec3::splat(4.0))).abs().max_element() < 1e-7);
    assert!((bbox.max - (center + Vec3::splat(4.0))).abs().max_element() < 1e-7);
}

#[test]
fn invalid_parameters_are_rejected() {
    assert!(SphereShape::new(Vec3::ZERO, 0.0, 1).is_err());
    assert!(SphereShape::new(Vec3::ZERO, -1.0, 1).is_err());
    assert!(SphereShape::new(Vec3::ZERO, f32::NAN, 1).is_err());
    assert!(SphereShape::new(Vec3::ZERO, f32::INFINITY, 1).is_err());
    assert!(SphereShape::new(Vec3::new(f32::NAN, 0.0, 0.0), 1.0, 1).is_err());

    let mut shape = SphereShape::new(Vec3::ZERO, 1.0, 1).unwrap();
    assert!(shape.set_radius(-2.0).is_err());
    assert!(shape.set_center(Vec3::splat(f32::INFINITY)).is_err());
}

// ============================================================================
// Edge extraction
// ============================================================================

fn quad_points() -> VertexArray {
    VertexArray::from_slice(
        &[
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ],
        wgpu::VertexFormat::Float32x3,
    )
}

#[test]
fn edges_of_quad_deduplicate_shared_diagonal() {
    let points = quad_points();
    let indices = IndexArray::from_u32(Arc::new(vec![0, 1, 2, 0, 2, 3]));

    let edges = make_triangle_edges(&points, &indices).unwrap();

    // Five unique undirected edges; the diagonal 0-2 appears once.
    assert_eq!(edges.len(), 10);
    let mut seen = std::collections::HashSet::new();
    for pair in edges.chunks_exact(2) {
        let key = (pair[0].min(pair[1]), pair[0].max(pair[1]));
        assert!(seen.insert(key), "edge {key:?} appears twice");
    }
}

#[test]
fn edges_of_tetrahedron() {
    let points = quad_points();
    let indices = IndexArray::from_u16(Arc::new(vec![0, 1, 2, 0, 1, 3, 0, 2, 3, 1, 2, 3]));

    let edges = make_triangle_edges(&points, &indices).unwrap();
    assert_eq!(edges.len(), 12);
}

#[test]
fn edges_reject_malformed_input() {
    let points = quad_points();
    let not_triangles = IndexArray::from_u32(Arc::new(vec![0, 1, 2, 3]));
    assert!(make_triangle_edges(&points, &not_triangles).is_err());

    let out_of_range = IndexArray::from_u32(Arc::new(vec![0, 1, 9]));
    assert!(make_triangle_edges(&points, &out_of_range).is_err());
}

#[test]
fn sphere_edges_cover_subdivided_icosahedron() {
    let mut shape = SphereShape::new(Vec3::ZERO, 1.0, 0).unwrap();
    shape.update().unwrap();
    let geometry = shape.geometry();
    let points = geometry.points().unwrap();
    let Primitives::Indexed(indices) = &geometry.primitive_sets()[0].primitives else {
        panic!("expected indexed sphere");
    };

    // Per-triangle emission shares no indices, so every triangle
    // contributes three unique edges.
    let edges = make_triangle_edges(points, indices).unwrap();
    assert_eq!(edges.len(), 20 * 3 * 2);
}
