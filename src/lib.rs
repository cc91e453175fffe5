#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod math;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod viewer;

pub use errors::{ArborError, Result};
pub use math::{BoundingBox, BoundingSphere, Line, Plane};
pub use renderer::{
    Cull, Draw, DrawOp, DynamicUniformBuffer, PipelineCache, RenderContext, RenderGraph,
};
pub use resources::{
    Geometry, IndexArray, PipelineKey, PrimitiveSet, Primitives, Shader, SphereShape, State,
    StateDesc, VertexArray, estimate_sphere_sizes, generate_unit_sphere, make_triangle_edges,
};
pub use scene::{MatrixStack, Node, NodeHandle, NodeKind, Scene, Visitor};
pub use viewer::{FrameScheduler, Orthographic, Perspective, Projection, Viewer, Viewport};
