//! Visitor Protocol & Matrix Stacks
//!
//! Traversals specialise per node kind by implementing [`Visitor`]; the
//! default methods share the child-walk so a visitor only overrides what it
//! cares about. [`MatrixStack`] supplies the model-matrix stack and the
//! single current projection matrix used by transform and projection
//! visits: transforms snapshot-then-compose, projections swap-and-restore.
//! Strictly single-threaded; there are no suspension points.

use glam::Mat4;

use crate::scene::node::NodeHandle;
use crate::scene::scene::Scene;

/// Per-kind traversal dispatch. `Scene::accept` routes each node to the
/// method matching its kind; defaults fall through so that groups walk
/// their children and shapes self-terminate.
pub trait Visitor {
    /// Fallback for any node; does nothing.
    fn visit_node(&mut self, _scene: &Scene, _node: NodeHandle) {}

    /// Groups forward traversal to their children in insertion order.
    fn visit_group(&mut self, scene: &Scene, node: NodeHandle)
    where
        Self: Sized,
    {
        scene.traverse_children(node, self);
    }

    /// Transforms behave like groups unless the visitor overrides them.
    fn visit_transform(&mut self, scene: &Scene, node: NodeHandle)
    where
        Self: Sized,
    {
        self.visit_group(scene, node);
    }

    /// Projection nodes behave like groups unless the visitor overrides
    /// them.
    fn visit_projection(&mut self, scene: &Scene, node: NodeHandle)
    where
        Self: Sized,
    {
        self.visit_group(scene, node);
    }

    /// Shapes are self-terminating.
    fn visit_shape(&mut self, scene: &Scene, node: NodeHandle) {
        self.visit_node(scene, node);
    }

    /// Geometry-bearing shapes; defaults to the shape handler.
    fn visit_geometry(&mut self, scene: &Scene, node: NodeHandle) {
        self.visit_shape(scene, node);
    }
}

/// Model-matrix stack plus the current projection matrix.
///
/// Every group-like visit pushes a snapshot of the current model matrix and
/// pops it on exit; transform visits compose their matrix on top of the
/// fresh copy. Projection visits swap the projection matrix in and restore
/// the previous one afterwards — nested projections replace, they never
/// accumulate. The push history is retained for the duration of one
/// traversal and inspectable through [`snapshots`](Self::snapshots).
#[derive(Debug)]
pub struct MatrixStack {
    model: Vec<Mat4>,
    projection: Mat4,
    snapshots: Vec<Mat4>,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixStack {
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: vec![Mat4::IDENTITY],
            projection: Mat4::IDENTITY,
            snapshots: Vec::new(),
        }
    }

    /// Clears back to identity and forgets the snapshot history.
    pub fn reset(&mut self) {
        self.model.clear();
        self.model.push(Mat4::IDENTITY);
        self.projection = Mat4::IDENTITY;
        self.snapshots.clear();
    }

    /// Current model matrix (top of stack).
    #[must_use]
    pub fn model(&self) -> Mat4 {
        self.model.last().copied().unwrap_or(Mat4::IDENTITY)
    }

    /// Current projection matrix.
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Pushes a copy of the current model matrix and records it in the
    /// snapshot history.
    pub fn push_model(&mut self) {
        let top = self.model();
        self.snapshots.push(top);
        self.model.push(top);
    }

    /// Replaces the top with `top × matrix` (the local matrix applies in
    /// the node's own space).
    pub fn compose_model(&mut self, matrix: &Mat4) {
        if let Some(top) = self.model.last_mut() {
            *top = *top * *matrix;
        }
    }

    /// Restores the matrix saved by the matching [`push_model`](Self::push_model).
    /// The identity base entry is never popped.
    pub fn pop_model(&mut self) {
        if self.model.len() > 1 {
            self.model.pop();
        }
    }

    /// Swaps in a new projection matrix, returning the previous one for
    /// restoration on subtree exit.
    pub fn swap_projection(&mut self, matrix: Mat4) -> Mat4 {
        std::mem::replace(&mut self.projection, matrix)
    }

    /// Model matrices recorded by pushes since the last reset, in push
    /// order.
    #[must_use]
    pub fn snapshots(&self) -> &[Mat4] {
        &self.snapshots
    }

    /// Current model stack depth, counting the identity base.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.model.len()
    }
}
