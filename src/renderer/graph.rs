//! Render Graph
//!
//! The flattened form of a culled scene: a six-level bucket tree keyed by
//! *(layer, clip-group, render-state, projection matrix, model matrix)*.
//!
//! | Level | Key | Order |
//! |---|---|---|
//! | root | — | layers ascending |
//! | layer | `i32` | bins ascending |
//! | bin | `i32` | pipelines, clipped before unclipped, first insertion |
//! | pipeline | pipeline key | projection groups, first insertion |
//! | projection group | matrix (by value) | model groups, first insertion |
//! | model group | matrix (by value) | state groups, first insertion |
//! | state group | state name | shapes in traversal order |
//!
//! Matrix keys compare by value (16 components). Iteration through the
//! `for_each_*`/slice accessors follows the canonical order above and is
//! deterministic for an unchanged scene.

use std::sync::Arc;

use glam::Mat4;

use crate::resources::state::{PipelineKey, State};
use crate::scene::node::NodeHandle;

/// Innermost bucket: the shapes sharing one render-state.
#[derive(Debug)]
pub struct StateGroup {
    state: Arc<State>,
    shapes: Vec<NodeHandle>,
}

impl StateGroup {
    #[must_use]
    pub fn state(&self) -> &Arc<State> {
        &self.state
    }

    #[must_use]
    pub fn num_shapes(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn shapes(&self) -> &[NodeHandle] {
        &self.shapes
    }

    pub fn for_each_shape(&self, mut callback: impl FnMut(NodeHandle)) {
        for shape in &self.shapes {
            callback(*shape);
        }
    }
}

/// Bucket of shapes sharing one model matrix.
#[derive(Debug)]
pub struct ModelGroup {
    matrix: Mat4,
    groups: Vec<StateGroup>,
}

impl ModelGroup {
    #[must_use]
    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    #[must_use]
    pub fn num_state_groups(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn state_groups(&self) -> &[StateGroup] {
        &self.groups
    }

    pub fn for_each_state_group(&self, mut callback: impl FnMut(&StateGroup)) {
        for group in &self.groups {
            callback(group);
        }
    }

    fn group_mut(&mut self, state: &Arc<State>) -> &mut StateGroup {
        if let Some(index) = self.groups.iter().position(|g| g.state.name() == state.name()) {
            return &mut self.groups[index];
        }
        self.groups.push(StateGroup {
            state: state.clone(),
            shapes: Vec::new(),
        });
        let index = self.groups.len() - 1;
        &mut self.groups[index]
    }
}

/// Bucket of model groups sharing one projection matrix.
#[derive(Debug)]
pub struct ProjectionGroup {
    matrix: Mat4,
    models: Vec<ModelGroup>,
}

impl ProjectionGroup {
    #[must_use]
    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    #[must_use]
    pub fn num_model_matrices(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn model_groups(&self) -> &[ModelGroup] {
        &self.models
    }

    pub fn for_each_model_group(&self, mut callback: impl FnMut(&ModelGroup)) {
        for model in &self.models {
            callback(model);
        }
    }

    fn model_mut(&mut self, matrix: Mat4) -> &mut ModelGroup {
        if let Some(index) = self.models.iter().position(|m| m.matrix == matrix) {
            return &mut self.models[index];
        }
        self.models.push(ModelGroup {
            matrix,
            groups: Vec::new(),
        });
        let index = self.models.len() - 1;
        &mut self.models[index]
    }
}

/// Facade over one cached GPU pipeline: the key that resolves it plus the
/// first state that produced it. Resolution happens at draw time through
/// the pipeline cache, so culling never touches the device.
#[derive(Debug)]
pub struct PipelineBucket {
    key: PipelineKey,
    state: Arc<State>,
    projections: Vec<ProjectionGroup>,
}

impl PipelineBucket {
    #[must_use]
    pub fn key(&self) -> &PipelineKey {
        &self.key
    }

    #[must_use]
    pub fn state(&self) -> &Arc<State> {
        &self.state
    }

    #[must_use]
    pub fn num_proj_matrices(&self) -> usize {
        self.projections.len()
    }

    #[must_use]
    pub fn projection_groups(&self) -> &[ProjectionGroup] {
        &self.projections
    }

    pub fn for_each_projection_group(&self, mut callback: impl FnMut(&ProjectionGroup)) {
        for projection in &self.projections {
            callback(projection);
        }
    }

    fn projection_mut(&mut self, matrix: Mat4) -> &mut ProjectionGroup {
        if let Some(index) = self.projections.iter().position(|p| p.matrix == matrix) {
            return &mut self.projections[index];
        }
        self.projections.push(ProjectionGroup {
            matrix,
            models: Vec::new(),
        });
        let index = self.projections.len() - 1;
        &mut self.projections[index]
    }
}

/// Secondary draw-order bucket inside a layer. Pipelines are partitioned
/// into clipped and unclipped groups; the draw path iterates clipped first
/// and otherwise treats both identically.
#[derive(Debug)]
pub struct Bin {
    bin: i32,
    clipped: Vec<PipelineBucket>,
    unclipped: Vec<PipelineBucket>,
}

impl Bin {
    #[must_use]
    pub fn bin(&self) -> i32 {
        self.bin
    }

    #[must_use]
    pub fn num_pipelines(&self) -> usize {
        self.clipped.len() + self.unclipped.len()
    }

    /// Pipelines in draw order: clipped groups first, each in first
    /// insertion order.
    pub fn pipelines(&self) -> impl Iterator<Item = &PipelineBucket> {
        self.clipped.iter().chain(self.unclipped.iter())
    }

    pub fn for_each_pipeline(&self, mut callback: impl FnMut(&PipelineBucket)) {
        for pipeline in self.pipelines() {
            callback(pipeline);
        }
    }

    fn pipeline_mut(&mut self, state: &Arc<State>, key: PipelineKey) -> &mut PipelineBucket {
        let list = if state.clipped() {
            &mut self.clipped
        } else {
            &mut self.unclipped
        };
        if let Some(index) = list.iter().position(|p| p.key == key) {
            return &mut list[index];
        }
        list.push(PipelineBucket {
            key,
            state: state.clone(),
            projections: Vec::new(),
        });
        let index = list.len() - 1;
        &mut list[index]
    }
}

/// Outermost draw-order bucket.
#[derive(Debug)]
pub struct Layer {
    layer: i32,
    bins: Vec<Bin>,
}

impl Layer {
    #[must_use]
    pub fn layer(&self) -> i32 {
        self.layer
    }

    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    #[must_use]
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn for_each_bin(&self, mut callback: impl FnMut(&Bin)) {
        for bin in &self.bins {
            callback(bin);
        }
    }

    fn bin_mut(&mut self, bin: i32) -> &mut Bin {
        let index = match self.bins.binary_search_by_key(&bin, Bin::bin) {
            Ok(index) => index,
            Err(index) => {
                self.bins.insert(
                    index,
                    Bin {
                        bin,
                        clipped: Vec::new(),
                        unclipped: Vec::new(),
                    },
                );
                index
            }
        };
        &mut self.bins[index]
    }
}

/// The root of the bucket tree. Cleared at the start of each cull.
#[derive(Debug, Default)]
pub struct RenderGraph {
    layers: Vec<Layer>,
}

impl RenderGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all buckets. Called before each frame's cull.
    pub fn clear(&mut self) {
        self.layers.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    #[must_use]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Layers in ascending `layer` order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn for_each_layer(&self, mut callback: impl FnMut(&Layer)) {
        for layer in &self.layers {
            callback(layer);
        }
    }

    /// Appends `shape` to the bucket addressed by the state's draw-order
    /// keys, the pipeline key, and the two matrices, creating missing
    /// levels along the path.
    pub fn insert(
        &mut self,
        state: &Arc<State>,
        key: PipelineKey,
        projection: Mat4,
        model: Mat4,
        shape: NodeHandle,
    ) {
        self.layer_mut(state.layer())
            .bin_mut(state.bin())
            .pipeline_mut(state, key)
            .projection_mut(projection)
            .model_mut(model)
            .group_mut(state)
            .shapes
            .push(shape);
    }

    fn layer_mut(&mut self, layer: i32) -> &mut Layer {
        let index = match self.layers.binary_search_by_key(&layer, Layer::layer) {
            Ok(index) => index,
            Err(index) => {
                self.layers.insert(
                    index,
                    Layer {
                        layer,
                        bins: Vec::new(),
                    },
                );
                index
            }
        };
        &mut self.layers[index]
    }
}
