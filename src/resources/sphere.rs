//! Parametric Sphere
//!
//! Unit-sphere generation by recursive icosahedron subdivision and the
//! [`SphereShape`] built on top of it. Subdivision depth *n* yields exactly
//! `20·4ⁿ` triangles, emitted as `60·4ⁿ` per-triangle vertices — shared
//! positions appear once per incident triangle, so the companion index list
//! is a plain sequence.

use std::sync::Arc;

use glam::Vec3;

use crate::errors::{ArborError, Result};
use crate::math::BoundingBox;
use crate::resources::buffer::{IndexArray, VertexArray};
use crate::resources::geometry::{Geometry, PrimitiveSet};

/// Point/index counts produced by [`generate_unit_sphere`] at a given depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SphereSizes {
    pub num_points: usize,
    pub num_indices: usize,
}

/// Exact output sizes for subdivision depth `subdivisions`: `60·4ⁿ` vertex
/// appearances and as many sequential indices.
#[must_use]
pub fn estimate_sphere_sizes(subdivisions: u32) -> SphereSizes {
    let count = 60 * 4usize.pow(subdivisions);
    SphereSizes {
        num_points: count,
        num_indices: count,
    }
}

// Icosahedron with vertices on the unit sphere; t is the golden ratio.
fn icosahedron_vertices() -> [Vec3; 12] {
    let t = (1.0 + 5.0_f32.sqrt()) * 0.5;
    [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
    .map(|v| v.normalize())
}

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

fn subdivide(a: Vec3, b: Vec3, c: Vec3, depth: u32, emit: &mut dyn FnMut(Vec3)) {
    if depth == 0 {
        emit(a);
        emit(b);
        emit(c);
        return;
    }

    // Edge midpoints pushed back onto the unit sphere.
    let ab = a.midpoint(b).normalize();
    let bc = b.midpoint(c).normalize();
    let ca = c.midpoint(a).normalize();

    subdivide(a, ab, ca, depth - 1, emit);
    subdivide(ab, b, bc, depth - 1, emit);
    subdivide(ca, bc, c, depth - 1, emit);
    subdivide(ab, bc, ca, depth - 1, emit);
}

/// Emits the unit sphere at the given subdivision depth, one call per
/// vertex appearance, three consecutive calls per triangle. Deterministic:
/// the emission order depends only on `subdivisions`.
pub fn generate_unit_sphere(subdivisions: u32, emit: &mut dyn FnMut(Vec3)) {
    let vertices = icosahedron_vertices();
    for face in ICOSAHEDRON_FACES {
        subdivide(
            vertices[face[0]],
            vertices[face[1]],
            vertices[face[2]],
            subdivisions,
            emit,
        );
    }
}

/// Sphere shape parameters plus the geometry generated from them.
///
/// `update` regenerates points, normals, and an indexed triangle list
/// deterministically from the parameters. Mutating any parameter marks the
/// shape dirty; the scene's update pass rebuilds it before the next cull.
#[derive(Debug)]
pub struct SphereShape {
    center: Vec3,
    radius: f32,
    subdivisions: u32,
    dirty: bool,
    geometry: Geometry,
}

impl SphereShape {
    /// Validates and creates the shape. The geometry is generated on the
    /// first [`update`](Self::update).
    pub fn new(center: Vec3, radius: f32, subdivisions: u32) -> Result<Self> {
        if !center.is_finite() {
            return Err(ArborError::InvalidInput(format!(
                "sphere center {center} is not finite"
            )));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ArborError::InvalidInput(format!(
                "sphere radius {radius} must be finite and positive"
            )));
        }
        Ok(Self {
            center,
            radius,
            subdivisions,
            dirty: true,
            geometry: Geometry::new(),
        })
    }

    /// Unit sphere at the origin, one subdivision.
    pub fn unit() -> Result<Self> {
        Self::new(Vec3::ZERO, 1.0, 1)
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        self.center
    }

    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[must_use]
    pub fn subdivisions(&self) -> u32 {
        self.subdivisions
    }

    pub fn set_center(&mut self, center: Vec3) -> Result<()> {
        if !center.is_finite() {
            return Err(ArborError::InvalidInput(format!(
                "sphere center {center} is not finite"
            )));
        }
        self.center = center;
        self.dirty = true;
        Ok(())
    }

    pub fn set_radius(&mut self, radius: f32) -> Result<()> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ArborError::InvalidInput(format!(
                "sphere radius {radius} must be finite and positive"
            )));
        }
        self.radius = radius;
        self.dirty = true;
        Ok(())
    }

    pub fn set_subdivisions(&mut self, subdivisions: u32) {
        self.subdivisions = subdivisions;
        self.dirty = true;
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Analytic bounds: `[center − radius, center + radius]` componentwise.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            self.center - Vec3::splat(self.radius),
            self.center + Vec3::splat(self.radius),
        )
    }

    /// Regenerates the geometry when dirty; no-op otherwise.
    pub fn update(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let sizes = estimate_sphere_sizes(self.subdivisions);
        let mut points: Vec<f32> = Vec::with_capacity(sizes.num_points * 3);
        let mut normals: Vec<f32> = Vec::with_capacity(sizes.num_points * 3);

        let center = self.center;
        let radius = self.radius;
        generate_unit_sphere(self.subdivisions, &mut |unit| {
            let p = center + unit * radius;
            points.extend_from_slice(&[p.x, p.y, p.z]);
            normals.extend_from_slice(&[unit.x, unit.y, unit.z]);
        });

        // Vertices are emitted per triangle, so the index list is a plain
        // sequence; 16-bit when it fits.
        let indices = if sizes.num_indices <= usize::from(u16::MAX) {
            IndexArray::from_u16(Arc::new((0..sizes.num_indices as u16).collect()))
        } else {
            IndexArray::from_u32(Arc::new((0..sizes.num_indices as u32).collect()))
        };

        let mut geometry = Geometry::new();
        geometry.set_points(Arc::new(VertexArray::new(
            Arc::new(points),
            wgpu::VertexFormat::Float32x3,
        )));
        geometry.set_normals(Some(Arc::new(VertexArray::new(
            Arc::new(normals),
            wgpu::VertexFormat::Float32x3,
        ))));
        geometry.add_primitive_set(PrimitiveSet::indexed(
            wgpu::PrimitiveTopology::TriangleList,
            Arc::new(indices),
        )?);

        self.geometry = geometry;
        self.dirty = false;
        Ok(())
    }
}
