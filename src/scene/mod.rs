//! Scene Graph
//!
//! The node model, the arena that owns it, and the visitor protocol used by
//! every traversal. Nodes form a tree: groups forward to their children,
//! transforms compose the model matrix, projection nodes replace the
//! projection matrix, and shapes terminate traversal and contribute draws.

pub mod node;
pub mod scene;
pub mod visitor;

pub use node::{Node, NodeHandle, NodeKind};
pub use scene::Scene;
pub use visitor::{MatrixStack, Visitor};
