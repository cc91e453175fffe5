//! Draw Traversal
//!
//! Walks the render graph in canonical order and turns it into GPU work,
//! in two phases:
//!
//! 1. **Record** — pure CPU: flatten the bucket tree into a [`DrawOp`]
//!    list (bind pipeline / set matrices / apply / draw / reset),
//!    validating buffers as it goes. Recording an unchanged graph twice
//!    yields identical op lists, which is what makes draw-order
//!    determinism directly testable.
//! 2. **Execute** — pack one uniform slot per draw into the dynamic
//!    uniform buffer, resolve pipelines through the cache, open exactly
//!    one render pass on the surface with the pre-multiplied clear
//!    colour, replay the ops, and submit the encoder once.
//!
//! Soft failures (missing mandatory buffers, zero indices, topology
//! mismatches) log a warning and skip the primitive, never crash.

use std::sync::Arc;

use glam::{Mat4, Vec4};
use smallvec::{SmallVec, smallvec};

use crate::errors::Result;
use crate::renderer::context::RenderContext;
use crate::renderer::dynamic_buffer::DynamicUniformBuffer;
use crate::renderer::graph::RenderGraph;
use crate::renderer::pipeline::{PipelineCache, RenderPipelineId};
use crate::resources::buffer::{IndexArray, VertexArray};
use crate::resources::geometry::{Geometry, Primitives};
use crate::resources::shader::AttributeSemantic;
use crate::resources::state::{PipelineKey, State};
use crate::scene::node::{NodeHandle, NodeKind};
use crate::scene::scene::Scene;
use crate::scene::visitor::Visitor;

/// One step of the canonical draw sequence.
#[derive(Debug)]
pub enum DrawOp {
    /// Bind the pipeline resolved from `key` on the pass.
    BindPipeline { key: PipelineKey, state: Arc<State> },
    /// All following draws use this projection matrix.
    SetProjection(Mat4),
    /// All following draws use this model matrix.
    SetModel(Mat4),
    /// Run the state's apply hook; invoked once per state group.
    Apply(Arc<State>),
    /// Run the state's reset hook after the group's draws.
    Reset(Arc<State>),
    /// One indexed draw of a primitive set.
    DrawIndexed {
        points: Arc<VertexArray>,
        normals: Option<Arc<VertexArray>>,
        colors: Option<Arc<VertexArray>>,
        texcoords: Option<Arc<VertexArray>>,
        indices: Arc<IndexArray>,
        num_indices: u32,
    },
    /// One non-indexed draw over a contiguous vertex range.
    DrawArrays {
        points: Arc<VertexArray>,
        normals: Option<Arc<VertexArray>>,
        colors: Option<Arc<VertexArray>>,
        texcoords: Option<Arc<VertexArray>>,
        first: u32,
        count: u32,
    },
}

fn id_of(array: Option<&Arc<VertexArray>>) -> Option<u64> {
    array.map(|a| a.id())
}

impl PartialEq for DrawOp {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::BindPipeline { key: a, state: sa },
                Self::BindPipeline { key: b, state: sb },
            ) => a == b && sa.name() == sb.name(),
            (Self::SetProjection(a), Self::SetProjection(b))
            | (Self::SetModel(a), Self::SetModel(b)) => a == b,
            (Self::Apply(a), Self::Apply(b)) | (Self::Reset(a), Self::Reset(b)) => {
                a.name() == b.name()
            }
            (
                Self::DrawIndexed {
                    points: pa,
                    normals: na,
                    colors: ca,
                    texcoords: ta,
                    indices: ia,
                    num_indices: nia,
                },
                Self::DrawIndexed {
                    points: pb,
                    normals: nb,
                    colors: cb,
                    texcoords: tb,
                    indices: ib,
                    num_indices: nib,
                },
            ) => {
                pa.id() == pb.id()
                    && id_of(na.as_ref()) == id_of(nb.as_ref())
                    && id_of(ca.as_ref()) == id_of(cb.as_ref())
                    && id_of(ta.as_ref()) == id_of(tb.as_ref())
                    && ia.id() == ib.id()
                    && nia == nib
            }
            (
                Self::DrawArrays {
                    points: pa,
                    normals: na,
                    colors: ca,
                    texcoords: ta,
                    first: fa,
                    count: cta,
                },
                Self::DrawArrays {
                    points: pb,
                    normals: nb,
                    colors: cb,
                    texcoords: tb,
                    first: fb,
                    count: ctb,
                },
            ) => {
                pa.id() == pb.id()
                    && id_of(na.as_ref()) == id_of(nb.as_ref())
                    && id_of(ca.as_ref()) == id_of(cb.as_ref())
                    && id_of(ta.as_ref()) == id_of(tb.as_ref())
                    && fa == fb
                    && cta == ctb
            }
            _ => false,
        }
    }
}

/// Records draw ops for the shapes of one state group.
struct CommandRecorder<'a> {
    ops: &'a mut Vec<DrawOp>,
    state: &'a Arc<State>,
}

impl CommandRecorder<'_> {
    fn record_geometry(&mut self, geometry: &Geometry, node_id: u64) {
        let Some(points) = geometry.points() else {
            log::warn!("shape {node_id}: no points array, skipping");
            return;
        };

        // Optional arrays are bound only when the pipeline's shader
        // declares the slot; a declared slot with no backing array makes
        // the shape undrawable with this pipeline.
        let mut normals = None;
        let mut colors = None;
        let mut texcoords = None;
        for slot in self.state.shader().attributes() {
            let (target, available): (&mut Option<Arc<VertexArray>>, _) = match slot.semantic {
                AttributeSemantic::Position => continue,
                AttributeSemantic::Normal => (&mut normals, geometry.normals()),
                AttributeSemantic::Color => (&mut colors, geometry.colors()),
                AttributeSemantic::TexCoord => (&mut texcoords, geometry.texcoords()),
            };
            match available {
                Some(array) => *target = Some(array.clone()),
                None => {
                    log::warn!(
                        "shape {node_id}: shader '{}' expects a {:?} array that is missing, skipping",
                        self.state.shader().name(),
                        slot.semantic
                    );
                    return;
                }
            }
        }

        for set in geometry.primitive_sets() {
            if set.topology != self.state.topology() {
                log::warn!(
                    "shape {node_id}: primitive topology {:?} does not match state '{}' ({:?}), skipping",
                    set.topology,
                    self.state.name(),
                    self.state.topology()
                );
                continue;
            }

            match &set.primitives {
                Primitives::Indexed(indices) => {
                    let num_indices = indices.len() as u32;
                    if num_indices == 0 {
                        log::warn!("shape {node_id}: empty index array, skipping");
                        continue;
                    }
                    self.ops.push(DrawOp::DrawIndexed {
                        points: points.clone(),
                        normals: normals.clone(),
                        colors: colors.clone(),
                        texcoords: texcoords.clone(),
                        indices: indices.clone(),
                        num_indices,
                    });
                }
                Primitives::Array { first, count } => {
                    if *count == 0 {
                        continue;
                    }
                    self.ops.push(DrawOp::DrawArrays {
                        points: points.clone(),
                        normals: normals.clone(),
                        colors: colors.clone(),
                        texcoords: texcoords.clone(),
                        first: *first,
                        count: *count,
                    });
                }
            }
        }
    }
}

impl Visitor for CommandRecorder<'_> {
    fn visit_geometry(&mut self, scene: &Scene, node: NodeHandle) {
        let Some(shape) = scene.get_node(node) else {
            return;
        };
        match shape.kind() {
            NodeKind::Geometry(geometry) => self.record_geometry(geometry, shape.id()),
            NodeKind::Sphere(sphere) => self.record_geometry(sphere.geometry(), shape.id()),
            _ => {}
        }
    }
}

/// Replay commands produced by the execute sweep; the pass encoder runs
/// these verbatim.
enum PassCmd {
    SetPipeline(RenderPipelineId),
    Draw {
        uniform_offset: u32,
        vertex_buffers: SmallVec<[(u32, wgpu::Buffer); 4]>,
        index: Option<(wgpu::Buffer, wgpu::IndexFormat, u32)>,
        vertices: Option<(u32, u32)>,
    },
}

fn pack_uniforms(projection: &Mat4, model: &Mat4, color: Vec4) -> [u8; 144] {
    let mut bytes = [0u8; 144];
    bytes[0..64].copy_from_slice(bytemuck::cast_slice(&projection.to_cols_array()));
    bytes[64..128].copy_from_slice(bytemuck::cast_slice(&model.to_cols_array()));
    bytes[128..144].copy_from_slice(bytemuck::cast_slice(&color.to_array()));
    bytes
}

/// The draw traversal: record the graph, then execute against a surface.
pub struct Draw {
    clear_color: [f32; 4],
}

impl Default for Draw {
    fn default() -> Self {
        Self::new()
    }
}

impl Draw {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clear_color: [0.5, 0.5, 0.5, 1.0],
        }
    }

    #[must_use]
    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    /// `(r·a, g·a, b·a, a)` — the form surfaces configured with
    /// pre-multiplied alpha expect as their clear value.
    #[must_use]
    pub fn pre_multiply(color: [f32; 4]) -> [f32; 4] {
        let [r, g, b, a] = color;
        [r * a, g * a, b * a, a]
    }

    /// The configured clear colour, pre-multiplied.
    #[must_use]
    pub fn pre_multiplied_clear_color(&self) -> [f32; 4] {
        Self::pre_multiply(self.clear_color)
    }

    /// Flattens the graph into the canonical op sequence. Deterministic:
    /// an unchanged graph records the same ops every time.
    #[must_use]
    pub fn record(&self, scene: &Scene, graph: &RenderGraph) -> Vec<DrawOp> {
        let mut ops = Vec::new();

        for layer in graph.layers() {
            for bin in layer.bins() {
                for pipeline in bin.pipelines() {
                    ops.push(DrawOp::BindPipeline {
                        key: pipeline.key().clone(),
                        state: pipeline.state().clone(),
                    });
                    for projection in pipeline.projection_groups() {
                        ops.push(DrawOp::SetProjection(*projection.matrix()));
                        for model in projection.model_groups() {
                            ops.push(DrawOp::SetModel(*model.matrix()));
                            for group in model.state_groups() {
                                ops.push(DrawOp::Apply(group.state().clone()));
                                let mut recorder = CommandRecorder {
                                    ops: &mut ops,
                                    state: group.state(),
                                };
                                for shape in group.shapes() {
                                    scene.accept(*shape, &mut recorder);
                                }
                                ops.push(DrawOp::Reset(group.state().clone()));
                            }
                        }
                    }
                }
            }
        }

        ops
    }

    /// Executes recorded ops: one render pass on `view`, one submit.
    /// Apply/reset hooks run during the sweep, before encoding, so colour
    /// mutations land in the uniform slots of their own state group.
    /// Fails with [`crate::errors::ArborError::PipelineBuildFailed`] when
    /// a pipeline cannot be built; the frame is aborted.
    pub fn execute(
        &self,
        ops: &[DrawOp],
        ctx: &RenderContext,
        pipelines: &mut PipelineCache,
        uniforms: &mut DynamicUniformBuffer,
        view: &wgpu::TextureView,
    ) -> Result<()> {
        let device = &ctx.device;
        let queue = &ctx.queue;

        uniforms.begin_frame();

        let mut projection = Mat4::IDENTITY;
        let mut model = Mat4::IDENTITY;
        let mut current_state: Option<Arc<State>> = None;
        let mut encoded: Vec<PassCmd> = Vec::with_capacity(ops.len());

        for op in ops {
            match op {
                DrawOp::BindPipeline { key, state } => {
                    let id = pipelines.get_or_create(device, key, state.shader())?;
                    encoded.push(PassCmd::SetPipeline(id));
                }
                DrawOp::SetProjection(matrix) => projection = *matrix,
                DrawOp::SetModel(matrix) => model = *matrix,
                DrawOp::Apply(state) => {
                    state.apply(&projection, &model);
                    current_state = Some(state.clone());
                }
                DrawOp::Reset(state) => state.reset(),
                DrawOp::DrawIndexed {
                    points,
                    normals,
                    colors,
                    texcoords,
                    indices,
                    num_indices,
                } => {
                    let color = current_state
                        .as_ref()
                        .map_or(Vec4::ONE, |s| s.shader().color());
                    let uniform_offset = uniforms.push(&pack_uniforms(&projection, &model, color));

                    let mut vertex_buffers: SmallVec<[(u32, wgpu::Buffer); 4]> =
                        smallvec![(0, points.gpu_buffer(device, queue))];
                    for (semantic, array) in [
                        (AttributeSemantic::Normal, normals),
                        (AttributeSemantic::Color, colors),
                        (AttributeSemantic::TexCoord, texcoords),
                    ] {
                        if let Some(array) = array {
                            vertex_buffers
                                .push((semantic.location(), array.gpu_buffer(device, queue)));
                        }
                    }

                    encoded.push(PassCmd::Draw {
                        uniform_offset,
                        vertex_buffers,
                        index: Some((
                            indices.gpu_buffer(device, queue),
                            indices.format(),
                            *num_indices,
                        )),
                        vertices: None,
                    });
                }
                DrawOp::DrawArrays {
                    points,
                    normals,
                    colors,
                    texcoords,
                    first,
                    count,
                } => {
                    let color = current_state
                        .as_ref()
                        .map_or(Vec4::ONE, |s| s.shader().color());
                    let uniform_offset = uniforms.push(&pack_uniforms(&projection, &model, color));

                    let mut vertex_buffers: SmallVec<[(u32, wgpu::Buffer); 4]> =
                        smallvec![(0, points.gpu_buffer(device, queue))];
                    for (semantic, array) in [
                        (AttributeSemantic::Normal, normals),
                        (AttributeSemantic::Color, colors),
                        (AttributeSemantic::TexCoord, texcoords),
                    ] {
                        if let Some(array) = array {
                            vertex_buffers
                                .push((semantic.location(), array.gpu_buffer(device, queue)));
                        }
                    }

                    encoded.push(PassCmd::Draw {
                        uniform_offset,
                        vertex_buffers,
                        index: None,
                        vertices: Some((*first, *count)),
                    });
                }
            }
        }

        let layout = pipelines.uniform_layout(device);
        uniforms.upload(device, queue, &layout);

        let clear = self.pre_multiplied_clear_color();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Surface Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(clear[0]),
                            g: f64::from(clear[1]),
                            b: f64::from(clear[2]),
                            a: f64::from(clear[3]),
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for cmd in &encoded {
                match cmd {
                    PassCmd::SetPipeline(id) => pass.set_pipeline(pipelines.get(*id)),
                    PassCmd::Draw {
                        uniform_offset,
                        vertex_buffers,
                        index,
                        vertices,
                    } => {
                        if let Some(bind_group) = uniforms.bind_group() {
                            pass.set_bind_group(0, bind_group, &[*uniform_offset]);
                        }
                        for (slot, buffer) in vertex_buffers {
                            pass.set_vertex_buffer(*slot, buffer.slice(..));
                        }
                        if let Some((buffer, format, count)) = index {
                            pass.set_index_buffer(buffer.slice(..), *format);
                            pass.draw_indexed(0..*count, 0, 0..1);
                        } else if let Some((first, count)) = vertices {
                            pass.draw(*first..first + count, 0..1);
                        }
                    }
                }
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}
