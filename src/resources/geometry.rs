//! Geometry
//!
//! A [`Geometry`] is the payload of a shape leaf: vertex positions plus
//! optional normals, colours, and texture coordinates, drawn through one or
//! more [`PrimitiveSet`]s. Vertex and index arrays are `Arc`-shared, so
//! several geometries may reference the same numeric data.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::errors::{ArborError, Result};
use crate::math::BoundingBox;
use crate::resources::buffer::{IndexArray, VertexArray};

/// How a primitive set addresses vertices.
#[derive(Debug, Clone)]
pub enum Primitives {
    /// Contiguous range of vertices, no index buffer.
    Array { first: u32, count: u32 },
    /// Indexed access through a 16- or 32-bit index array.
    Indexed(Arc<IndexArray>),
}

/// One draw of a geometry: a topology plus the vertices it addresses.
#[derive(Debug, Clone)]
pub struct PrimitiveSet {
    pub topology: wgpu::PrimitiveTopology,
    pub primitives: Primitives,
}

impl PrimitiveSet {
    /// Indexed primitive set. Triangle lists must carry an index count
    /// divisible by three.
    pub fn indexed(
        topology: wgpu::PrimitiveTopology,
        indices: Arc<IndexArray>,
    ) -> Result<Self> {
        if topology == wgpu::PrimitiveTopology::TriangleList {
            let count = indices.len();
            if count % 3 != 0 {
                return Err(ArborError::InvalidInput(format!(
                    "triangle list index count {count} is not divisible by three"
                )));
            }
            if count / 3 < 1 {
                return Err(ArborError::InternalInvariant(
                    "triangle list resolved to zero triangles".to_string(),
                ));
            }
        }
        Ok(Self {
            topology,
            primitives: Primitives::Indexed(indices),
        })
    }

    /// Non-indexed primitive set over `[first, first + count)`.
    #[must_use]
    pub fn array(topology: wgpu::PrimitiveTopology, first: u32, count: u32) -> Self {
        Self {
            topology,
            primitives: Primitives::Array { first, count },
        }
    }

    /// Number of indices, zero for array sets.
    #[must_use]
    pub fn num_indices(&self) -> u32 {
        match &self.primitives {
            Primitives::Indexed(indices) => indices.len() as u32,
            Primitives::Array { .. } => 0,
        }
    }
}

/// Vertex data plus the primitive sets that draw it.
#[derive(Debug, Default)]
pub struct Geometry {
    points: Option<Arc<VertexArray>>,
    normals: Option<Arc<VertexArray>>,
    colors: Option<Arc<VertexArray>>,
    texcoords: Option<Arc<VertexArray>>,
    primitive_sets: Vec<PrimitiveSet>,
}

impl Geometry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Accessors

    #[must_use]
    pub fn points(&self) -> Option<&Arc<VertexArray>> {
        self.points.as_ref()
    }

    #[must_use]
    pub fn normals(&self) -> Option<&Arc<VertexArray>> {
        self.normals.as_ref()
    }

    #[must_use]
    pub fn colors(&self) -> Option<&Arc<VertexArray>> {
        self.colors.as_ref()
    }

    #[must_use]
    pub fn texcoords(&self) -> Option<&Arc<VertexArray>> {
        self.texcoords.as_ref()
    }

    #[must_use]
    pub fn primitive_sets(&self) -> &[PrimitiveSet] {
        &self.primitive_sets
    }

    // Mutators. Assigning an array drops the previous reference; the old
    // array keeps its GPU buffer for any other geometry still sharing it.

    pub fn set_points(&mut self, points: Arc<VertexArray>) {
        self.points = Some(points);
    }

    pub fn set_normals(&mut self, normals: Option<Arc<VertexArray>>) {
        self.normals = normals;
    }

    pub fn set_colors(&mut self, colors: Option<Arc<VertexArray>>) {
        self.colors = colors;
    }

    pub fn set_texcoords(&mut self, texcoords: Option<Arc<VertexArray>>) {
        self.texcoords = texcoords;
    }

    pub fn add_primitive_set(&mut self, set: PrimitiveSet) {
        self.primitive_sets.push(set);
    }

    pub fn clear_primitive_sets(&mut self) {
        self.primitive_sets.clear();
    }

    /// Folds the position array into an axis-aligned box. Invalid when the
    /// geometry has no points.
    #[must_use]
    pub fn compute_bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::invalid();
        let Some(points) = &self.points else {
            return bbox;
        };

        let data = points.data();
        for chunk in data.chunks_exact(3) {
            bbox.grow_point(glam::Vec3::new(chunk[0], chunk[1], chunk[2]));
        }
        bbox
    }
}

/// Builds a line-list index array containing each unique undirected edge of
/// the given triangle list exactly once, in order of first appearance.
///
/// The result length is twice the number of unique edges.
pub fn make_triangle_edges(points: &VertexArray, indices: &IndexArray) -> Result<Vec<u32>> {
    let count = indices.len();
    if count % 3 != 0 {
        return Err(ArborError::InvalidInput(format!(
            "triangle list index count {count} is not divisible by three"
        )));
    }

    let num_points = points.vertex_count() as u32;
    let data = indices.data();

    let mut seen: FxHashSet<(u32, u32)> = FxHashSet::default();
    let mut edges: Vec<u32> = Vec::new();

    let mut push_edge = |a: u32, b: u32| {
        let key = (a.min(b), a.max(b));
        if seen.insert(key) {
            edges.push(a);
            edges.push(b);
        }
    };

    for tri in 0..count / 3 {
        let mut corner = [0u32; 3];
        for (slot, value) in corner.iter_mut().enumerate() {
            let index = data.get(tri * 3 + slot).ok_or_else(|| {
                ArborError::InternalInvariant("index array shrank during edge extraction".into())
            })?;
            if index >= num_points {
                return Err(ArborError::InvalidInput(format!(
                    "index {index} out of range for {num_points} points"
                )));
            }
            *value = index;
        }
        push_edge(corner[0], corner[1]);
        push_edge(corner[1], corner[2]);
        push_edge(corner[2], corner[0]);
    }

    Ok(edges)
}
