//! Pipeline & Shader Caches
//!
//! Central owner of all `wgpu::RenderPipeline` instances. Pipelines are
//! stored in a contiguous `Vec` and addressed through lightweight
//! [`RenderPipelineId`] handles; a lookup map keyed by the full
//! [`PipelineKey`] *(shader name, topology, surface format)* deduplicates
//! builds. Shader module caching lives in [`ShaderManager`], keyed by
//! shader name.
//!
//! Both caches live for the device context's lifetime: there is no
//! eviction, and [`PipelineCache::clear`] wipes everything when the device
//! is torn down or lost.

use std::num::NonZeroU64;

use rustc_hash::FxHashMap;

use crate::errors::{ArborError, Result};
use crate::resources::shader::{Shader, UNIFORM_BLOCK_SIZE};
use crate::resources::state::PipelineKey;

/// Handle into the pipeline cache's contiguous storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPipelineId(pub(crate) u32);

impl RenderPipelineId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Shader-name → compiled module cache.
#[derive(Default)]
pub struct ShaderManager {
    modules: FxHashMap<String, wgpu::ShaderModule>,
}

impl ShaderManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled module for `shader`, compiling on first use.
    pub fn get_or_compile(
        &mut self,
        device: &wgpu::Device,
        shader: &Shader,
    ) -> wgpu::ShaderModule {
        if let Some(module) = self.modules.get(shader.name()) {
            return module.clone();
        }
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(shader.name()),
            source: wgpu::ShaderSource::Wgsl(shader.source().into()),
        });
        self.modules.insert(shader.name().to_string(), module.clone());
        module
    }

    /// Evicts one compiled module, e.g. after its validation failed.
    pub fn remove(&mut self, name: &str) {
        self.modules.remove(name);
    }

    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn clear(&mut self) {
        self.modules.clear();
    }
}

/// Central pipeline storage and deduplication cache.
pub struct PipelineCache {
    pipelines: Vec<wgpu::RenderPipeline>,
    lookup: FxHashMap<PipelineKey, RenderPipelineId>,
    shaders: ShaderManager,
    uniform_layout: Option<wgpu::BindGroupLayout>,
}

impl Default for PipelineCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipelines: Vec::with_capacity(16),
            lookup: FxHashMap::default(),
            shaders: ShaderManager::new(),
            uniform_layout: None,
        }
    }

    /// Retrieve a pipeline by handle. **Panics** if the id is stale.
    #[inline]
    #[must_use]
    pub fn get(&self, id: RenderPipelineId) -> &wgpu::RenderPipeline {
        &self.pipelines[id.index()]
    }

    /// Number of cached pipelines.
    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    #[must_use]
    pub fn shader_count(&self) -> usize {
        self.shaders.module_count()
    }

    /// Wipes all cached pipelines, shader modules, and layouts. Called on
    /// device teardown and device loss; everything rebuilds lazily on the
    /// next frame.
    pub fn clear(&mut self) {
        self.pipelines.clear();
        self.lookup.clear();
        self.shaders.clear();
        self.uniform_layout = None;
    }

    /// The bind group layout shared by every pipeline: one uniform block
    /// (projection, model, colour) bound with a dynamic offset.
    pub fn uniform_layout(&mut self, device: &wgpu::Device) -> wgpu::BindGroupLayout {
        if let Some(layout) = &self.uniform_layout {
            return layout.clone();
        }
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(UNIFORM_BLOCK_SIZE),
                },
                count: None,
            }],
        });
        self.uniform_layout = Some(layout.clone());
        layout
    }

    /// Looks up the pipeline for `key`, building and caching it on first
    /// encounter. The vertex buffer layout comes from the shader's
    /// declared attribute slots.
    ///
    /// Shader compilation and pipeline assembly run inside a validation
    /// error scope; a failed build surfaces as
    /// [`ArborError::PipelineBuildFailed`] carrying the shader name and
    /// the backend's log, and nothing is cached.
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        key: &PipelineKey,
        shader: &Shader,
    ) -> Result<RenderPipelineId> {
        if let Some(&id) = self.lookup.get(key) {
            return Ok(id);
        }

        let error_scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self.shaders.get_or_compile(device, shader);
        let uniform_layout = self.uniform_layout(device);

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[Some(&uniform_layout)],
            immediate_size: 0,
        });

        let attributes: Vec<[wgpu::VertexAttribute; 1]> = shader
            .attributes()
            .iter()
            .map(|slot| {
                [wgpu::VertexAttribute {
                    format: slot.format,
                    offset: 0,
                    shader_location: slot.semantic.location(),
                }]
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = shader
            .attributes()
            .iter()
            .zip(&attributes)
            .map(|(slot, attrs)| wgpu::VertexBufferLayout {
                array_stride: slot.format.size(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(shader.name()),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some(shader.vertex_entry()),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some(shader.fragment_entry()),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: key.topology,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(error_scope.pop()) {
            // A failed build must not leave its module cached.
            self.shaders.remove(shader.name());
            return Err(ArborError::PipelineBuildFailed {
                shader: shader.name().to_string(),
                log: error.to_string(),
            });
        }

        let id = RenderPipelineId(self.pipelines.len() as u32);
        self.pipelines.push(pipeline);
        self.lookup.insert(key.clone(), id);
        Ok(id)
    }
}
