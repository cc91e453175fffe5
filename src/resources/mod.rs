//! Shape Resources
//!
//! CPU-side vertex/index data, geometry containers, parametric shapes,
//! render-states, and shader handles. GPU buffers are materialised lazily
//! the first time a resource is drawn and invalidated on reassignment or
//! device loss.

pub mod buffer;
pub mod geometry;
pub mod shader;
pub mod sphere;
pub mod state;

pub use buffer::{IndexArray, VertexArray};
pub use geometry::{Geometry, PrimitiveSet, Primitives, make_triangle_edges};
pub use shader::Shader;
pub use sphere::{SphereShape, SphereSizes, estimate_sphere_sizes, generate_unit_sphere};
pub use state::{PipelineKey, State, StateDesc};
