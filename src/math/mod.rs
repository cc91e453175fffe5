//! Math Primitives
//!
//! Pure value types used by the scene graph: axis-aligned bounding boxes,
//! bounding spheres, planes, and line segments. Vectors and matrices come
//! from `glam`.

pub mod bounds;
pub mod line;
pub mod plane;

pub use bounds::{BoundingBox, BoundingSphere};
pub use line::Line;
pub use plane::Plane;
