//! Scene Nodes
//!
//! A [`Node`] is a tagged sum over the node kinds (group, transform,
//! projection, geometry, sphere) with a common header: a process-unique id,
//! an optional name, hierarchy handles, an optional render-state, lazily
//! cached bounds, and an update flag.
//!
//! Hierarchy invariants are maintained by [`Scene`](crate::scene::Scene):
//! a node is never its own ancestor, a child appears under exactly one
//! parent, and attaching a child unlinks it from any previous parent.

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Mat4;
use parking_lot::RwLock;
use slotmap::new_key_type;

use crate::math::{BoundingBox, BoundingSphere};
use crate::resources::geometry::Geometry;
use crate::resources::sphere::SphereShape;
use crate::resources::state::State;

new_key_type! {
    /// Arena handle to a [`Node`].
    pub struct NodeHandle;
}

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// The per-kind payload of a node.
#[derive(Debug)]
pub enum NodeKind {
    /// Ordered children, no payload of its own.
    Group,
    /// Group carrying a model-local 4×4 matrix, composed during traversal.
    Transform(Mat4),
    /// Group carrying a projection matrix that replaces the current one for
    /// its subtree.
    Projection(Mat4),
    /// Leaf shape with explicit vertex data.
    Geometry(Geometry),
    /// Leaf shape generated from sphere parameters.
    Sphere(SphereShape),
}

impl NodeKind {
    /// Stable type tag.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Transform(_) => "transform",
            Self::Projection(_) => "projection",
            Self::Geometry(_) => "geometry",
            Self::Sphere(_) => "sphere",
        }
    }

    /// Shapes are leaves that contribute draws.
    #[must_use]
    pub fn is_shape(&self) -> bool {
        matches!(self, Self::Geometry(_) | Self::Sphere(_))
    }
}

/// One element of the scene graph.
pub struct Node {
    id: u64,
    name: Option<Cow<'static, str>>,
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,
    state: Option<Arc<State>>,
    pub(crate) needs_update: bool,
    // Lazily recomputed; None means dirty.
    pub(crate) bounding_box: RwLock<Option<BoundingBox>>,
    pub(crate) bounding_sphere: RwLock<Option<BoundingSphere>>,
    kind: NodeKind,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type", &self.kind.type_name())
            .field("name", &self.name)
            .field("children", &self.children.len())
            .finish()
    }
}

impl Node {
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            name: None,
            parent: None,
            children: Vec::new(),
            state: None,
            needs_update: true,
            bounding_box: RwLock::new(None),
            bounding_sphere: RwLock::new(None),
            kind,
        }
    }

    #[must_use]
    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    #[must_use]
    pub fn transform(matrix: Mat4) -> Self {
        Self::new(NodeKind::Transform(matrix))
    }

    #[must_use]
    pub fn projection(matrix: Mat4) -> Self {
        Self::new(NodeKind::Projection(matrix))
    }

    #[must_use]
    pub fn geometry(geometry: Geometry) -> Self {
        Self::new(NodeKind::Geometry(geometry))
    }

    #[must_use]
    pub fn sphere(shape: SphereShape) -> Self {
        Self::new(NodeKind::Sphere(shape))
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: Arc<State>) -> Self {
        self.state = Some(state);
        self
    }

    /// Process-unique, positive identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<Cow<'static, str>>) {
        self.name = Some(name.into());
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> Option<&Arc<State>> {
        self.state.as_ref()
    }

    pub(crate) fn set_state_internal(&mut self, state: Option<Arc<State>>) {
        self.state = state;
    }

    /// The matrix carried by transform and projection nodes.
    #[must_use]
    pub fn matrix(&self) -> Option<&Mat4> {
        match &self.kind {
            NodeKind::Transform(m) | NodeKind::Projection(m) => Some(m),
            _ => None,
        }
    }

    /// `true` while any mutation since the last recomputation is pending.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.needs_update || self.bounding_box.read().is_none()
    }

    /// Drops the cached bounds of this node only; the scene propagates the
    /// invalidation up the ancestor chain.
    pub(crate) fn invalidate_bounds(&self) {
        *self.bounding_box.write() = None;
        *self.bounding_sphere.write() = None;
    }
}
