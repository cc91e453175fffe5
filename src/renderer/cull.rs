//! Cull Traversal
//!
//! "Cull" here is the traversal that *builds* the render graph: a single
//! depth-first walk that flattens an arbitrarily nested scene into the
//! bucket tree, maintaining the model-matrix stack and the current
//! projection matrix as it goes. Spatial rejection is a future extension
//! point, not part of this pass.

use std::sync::Arc;

use crate::renderer::graph::RenderGraph;
use crate::resources::state::State;
use crate::scene::node::{NodeHandle, NodeKind};
use crate::scene::scene::Scene;
use crate::scene::visitor::{MatrixStack, Visitor};

/// Surface format assumed for pipeline keys when no device has been
/// acquired yet (headless culling, tests). Bucketing is unaffected by the
/// concrete choice since the format is constant across a frame.
pub const FALLBACK_SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

/// The flattening visitor. Borrows the frame's render graph and fills it.
pub struct Cull<'a> {
    graph: &'a mut RenderGraph,
    stack: MatrixStack,
    default_state: Arc<State>,
    surface_format: wgpu::TextureFormat,
}

impl<'a> Cull<'a> {
    pub fn new(
        graph: &'a mut RenderGraph,
        default_state: Arc<State>,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            graph,
            stack: MatrixStack::new(),
            default_state,
            surface_format,
        }
    }

    /// Clears the graph and rebuilds it from the scene roots under an
    /// identity base projection.
    pub fn run(&mut self, scene: &Scene) {
        self.run_with(scene, glam::Mat4::IDENTITY);
    }

    /// Clears the graph and rebuilds it with the given base projection
    /// matrix (the viewer passes its own projection here).
    pub fn run_with(&mut self, scene: &Scene, base_projection: glam::Mat4) {
        self.graph.clear();
        self.stack.reset();
        self.stack.swap_projection(base_projection);
        scene.accept_roots(self);
    }

    /// The matrix stacks driven by this traversal.
    #[must_use]
    pub fn stack(&self) -> &MatrixStack {
        &self.stack
    }

    #[must_use]
    pub fn default_state(&self) -> &Arc<State> {
        &self.default_state
    }
}

impl Visitor for Cull<'_> {
    fn visit_group(&mut self, scene: &Scene, node: NodeHandle) {
        self.stack.push_model();
        scene.traverse_children(node, self);
        self.stack.pop_model();
    }

    fn visit_transform(&mut self, scene: &Scene, node: NodeHandle) {
        self.stack.push_model();
        if let Some(matrix) = scene.get_node(node).and_then(|n| n.matrix().copied()) {
            self.stack.compose_model(&matrix);
        }
        scene.traverse_children(node, self);
        self.stack.pop_model();
    }

    fn visit_projection(&mut self, scene: &Scene, node: NodeHandle) {
        self.stack.push_model();
        let matrix = scene
            .get_node(node)
            .and_then(|n| n.matrix().copied())
            .unwrap_or(glam::Mat4::IDENTITY);
        // Replace, never compose: the subtree sees exactly this projection.
        let previous = self.stack.swap_projection(matrix);
        scene.traverse_children(node, self);
        self.stack.swap_projection(previous);
        self.stack.pop_model();
    }

    fn visit_geometry(&mut self, scene: &Scene, node: NodeHandle) {
        let Some(shape) = scene.get_node(node) else {
            return;
        };
        debug_assert!(matches!(
            shape.kind(),
            NodeKind::Geometry(_) | NodeKind::Sphere(_)
        ));

        let state = shape.state().unwrap_or(&self.default_state).clone();
        let key = state.pipeline_key(self.surface_format);
        self.graph.insert(
            &state,
            key,
            self.stack.projection(),
            self.stack.model(),
            node,
        );
    }
}
