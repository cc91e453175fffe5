//! Scene Arena
//!
//! [`Scene`] owns every node of one scene graph in a slotmap arena and
//! maintains the hierarchy invariants: parents own their children, a child
//! has exactly one parent, and cycles are rejected. Bounds are recomputed
//! on demand when dirty and cached per node until the next mutation.

use std::sync::Arc;

use glam::Mat4;
use slotmap::SlotMap;

use crate::errors::{ArborError, Result};
use crate::math::{BoundingBox, BoundingSphere};
use crate::resources::geometry::Geometry;
use crate::resources::sphere::SphereShape;
use crate::resources::state::State;
use crate::scene::node::{Node, NodeHandle, NodeKind};
use crate::scene::visitor::Visitor;

/// Arena container for one scene graph.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<NodeHandle, Node>,
    /// Top-level nodes, traversed in insertion order.
    pub root_nodes: Vec<NodeHandle>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Creation & Removal
    // ========================================================================

    /// Inserts `node` as a root.
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    /// Inserts `node` and attaches it under `parent`.
    pub fn add_child(&mut self, parent: NodeHandle, node: Node) -> Result<NodeHandle> {
        let handle = self.nodes.insert(node);
        self.attach(handle, parent)?;
        Ok(handle)
    }

    /// Destroys a node and, recursively, all of its descendants.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        self.unlink(handle);
        self.root_nodes.retain(|h| *h != handle);
        self.destroy_subtree(handle);
    }

    /// Removes `child` from `parent` and destroys the child's subtree.
    /// No-op when `child` is not currently under `parent`.
    pub fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) {
        let Some(parent_node) = self.nodes.get(parent) else {
            return;
        };
        if !parent_node.children.contains(&child) {
            return;
        }
        self.mark_dirty(parent);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|h| *h != child);
        }
        self.destroy_subtree(child);
    }

    fn destroy_subtree(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes.remove(handle) else {
            return;
        };
        for child in node.children {
            self.destroy_subtree(child);
        }
    }

    /// Detaches `handle` from its current parent or the root list.
    fn unlink(&mut self, handle: NodeHandle) {
        let Some(parent) = self.nodes.get(handle).and_then(Node::parent) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|h| *h != handle);
        }
        if let Some(node) = self.nodes.get_mut(handle) {
            node.parent = None;
        }
        self.mark_dirty(parent);
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Attaches `child` under `parent`, unlinking it from any previous
    /// parent. Fails when the attachment would create a cycle.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) -> Result<()> {
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            return Err(ArborError::InvalidInput(
                "attach: unknown node handle".to_string(),
            ));
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(ArborError::InvalidInput(
                "attach: node is an ancestor of the prospective child".to_string(),
            ));
        }

        self.unlink(child);
        self.root_nodes.retain(|h| *h != child);

        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(child);
        }
        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = Some(parent);
        }
        self.mark_dirty(child);
        Ok(())
    }

    /// `true` when `ancestor` appears on the parent chain of `node`
    /// (inclusive of `node` itself).
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = Some(node);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.nodes.get(handle).and_then(Node::parent);
        }
        false
    }

    // ========================================================================
    // Access
    // ========================================================================

    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[must_use]
    pub fn children(&self, handle: NodeHandle) -> &[NodeHandle] {
        self.nodes
            .get(handle)
            .map_or(&[], |node| node.children.as_slice())
    }

    pub fn for_each_child(&self, handle: NodeHandle, mut callback: impl FnMut(NodeHandle)) {
        for child in self.children(handle) {
            callback(*child);
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// First node carrying the given name, in arena order.
    #[must_use]
    pub fn find_named(&self, name: &str) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name() == Some(name))
            .map(|(handle, _)| handle)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Raises the dirty flag on `handle` and invalidates cached bounds up
    /// the ancestor chain.
    pub fn mark_dirty(&mut self, handle: NodeHandle) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.needs_update = true;
        }
        let mut current = Some(handle);
        while let Some(h) = current {
            let Some(node) = self.nodes.get(h) else { break };
            node.invalidate_bounds();
            current = node.parent();
        }
    }

    /// Replaces the render-state reference of a node.
    pub fn set_state(&mut self, handle: NodeHandle, state: Option<Arc<State>>) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.set_state_internal(state);
        }
        self.mark_dirty(handle);
    }

    /// Replaces the matrix of a transform or projection node.
    pub fn set_matrix(&mut self, handle: NodeHandle, matrix: Mat4) -> Result<()> {
        let Some(node) = self.nodes.get_mut(handle) else {
            return Err(ArborError::InvalidInput(
                "set_matrix: unknown node handle".to_string(),
            ));
        };
        match node.kind_mut() {
            NodeKind::Transform(m) | NodeKind::Projection(m) => *m = matrix,
            kind => {
                return Err(ArborError::InvalidState(format!(
                    "set_matrix: node of type '{}' carries no matrix",
                    kind.type_name()
                )));
            }
        }
        self.mark_dirty(handle);
        Ok(())
    }

    /// Mutable access to the sphere parameters of a sphere node; marks the
    /// node dirty.
    pub fn sphere_mut(&mut self, handle: NodeHandle) -> Option<&mut SphereShape> {
        self.mark_dirty(handle);
        match self.nodes.get_mut(handle)?.kind_mut() {
            NodeKind::Sphere(shape) => Some(shape),
            _ => None,
        }
    }

    /// Mutable access to the geometry of a geometry node; marks the node
    /// dirty.
    pub fn geometry_mut(&mut self, handle: NodeHandle) -> Option<&mut Geometry> {
        self.mark_dirty(handle);
        match self.nodes.get_mut(handle)?.kind_mut() {
            NodeKind::Geometry(geometry) => Some(geometry),
            _ => None,
        }
    }

    // ========================================================================
    // Update Pass
    // ========================================================================

    /// Regenerates dirty parametric shapes, depth-first from the roots.
    /// Clean nodes are left untouched.
    pub fn update(&mut self) -> Result<()> {
        let roots = self.root_nodes.clone();
        for root in roots {
            self.update_node(root)?;
        }
        Ok(())
    }

    fn update_node(&mut self, handle: NodeHandle) -> Result<()> {
        let children = match self.nodes.get_mut(handle) {
            Some(node) => {
                if node.needs_update {
                    if let NodeKind::Sphere(shape) = node.kind_mut() {
                        shape.update()?;
                    }
                    node.needs_update = false;
                }
                node.children.clone()
            }
            None => return Ok(()),
        };
        for child in children {
            self.update_node(child)?;
        }
        Ok(())
    }

    // ========================================================================
    // Bounds
    // ========================================================================

    /// Bounding box of the subtree, recomputed when dirty and cached.
    /// Transform nodes report their children's bounds through their matrix;
    /// sphere shapes report analytic bounds.
    #[must_use]
    pub fn bounding_box(&self, handle: NodeHandle) -> BoundingBox {
        let Some(node) = self.nodes.get(handle) else {
            return BoundingBox::invalid();
        };
        if let Some(cached) = *node.bounding_box.read() {
            return cached;
        }

        let bbox = match node.kind() {
            NodeKind::Geometry(geometry) => geometry.compute_bounding_box(),
            NodeKind::Sphere(shape) => shape.bounding_box(),
            NodeKind::Group | NodeKind::Projection(_) => self.children_bounds(node),
            NodeKind::Transform(matrix) => self.children_bounds(node).transform(matrix),
        };

        *node.bounding_box.write() = Some(bbox);
        bbox
    }

    /// Bounding sphere of the subtree; exact for sphere shapes, derived
    /// from the box otherwise.
    #[must_use]
    pub fn bounding_sphere(&self, handle: NodeHandle) -> BoundingSphere {
        let Some(node) = self.nodes.get(handle) else {
            return BoundingSphere::invalid();
        };
        if let Some(cached) = *node.bounding_sphere.read() {
            return cached;
        }

        let sphere = match node.kind() {
            NodeKind::Sphere(shape) => BoundingSphere::new(shape.center(), shape.radius()),
            _ => BoundingSphere::from_box(&self.bounding_box(handle)),
        };

        *node.bounding_sphere.write() = Some(sphere);
        sphere
    }

    fn children_bounds(&self, node: &Node) -> BoundingBox {
        let mut bbox = BoundingBox::invalid();
        for child in &node.children {
            bbox.grow_box(&self.bounding_box(*child));
        }
        bbox
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Dispatches the visitor method matching the node's kind.
    pub fn accept<V: Visitor>(&self, handle: NodeHandle, visitor: &mut V) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };
        match node.kind() {
            NodeKind::Group => visitor.visit_group(self, handle),
            NodeKind::Transform(_) => visitor.visit_transform(self, handle),
            NodeKind::Projection(_) => visitor.visit_projection(self, handle),
            NodeKind::Geometry(_) | NodeKind::Sphere(_) => visitor.visit_geometry(self, handle),
        }
    }

    /// Walks the children of `handle` in insertion order.
    pub fn traverse_children<V: Visitor>(&self, handle: NodeHandle, visitor: &mut V) {
        for child in self.children(handle) {
            self.accept(*child, visitor);
        }
    }

    /// Accepts the visitor on every root, in insertion order.
    pub fn accept_roots<V: Visitor>(&self, visitor: &mut V) {
        for root in &self.root_nodes {
            self.accept(*root, visitor);
        }
    }
}
