//! Viewer
//!
//! The surface owner: a [`Viewer`] holds the scene, the render graph, the
//! default render-state, the projection, the viewport, and — once a device
//! is installed — the GPU context with its pipeline cache. Each frame runs
//! strictly update → cull → draw → submit on the calling thread. Frames
//! are scheduled through the host's animation-frame hook behind the
//! [`FrameScheduler`] seam; `render()` can also be driven synchronously.

pub mod projection;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::{ArborError, Result};
use crate::renderer::context::RenderContext;
use crate::renderer::cull::{Cull, FALLBACK_SURFACE_FORMAT};
use crate::renderer::draw::{Draw, DrawOp};
use crate::renderer::dynamic_buffer::DynamicUniformBuffer;
use crate::renderer::graph::RenderGraph;
use crate::renderer::pipeline::PipelineCache;
use crate::resources::state::State;
use crate::scene::scene::Scene;

pub use projection::{Orthographic, Perspective, Projection};

/// Host hook for animation-frame scheduling. `request` hands out a token
/// for one future frame callback; `cancel` revokes it.
pub trait FrameScheduler {
    fn request(&mut self) -> u64;
    fn cancel(&mut self, token: u64);
}

/// Viewport rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }
}

impl Viewport {
    /// Rejects negative coordinates or dimensions and non-finite values.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ArborError::InvalidInput(format!(
                    "viewport {name} must be non-negative and finite, got {value}"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn aspect(&self) -> Option<f32> {
        (self.height > 0.0).then(|| self.width / self.height)
    }
}

/// Owns one presentation surface and the scene rendered onto it.
pub struct Viewer {
    scene: Option<Scene>,
    graph: RenderGraph,
    default_state: Arc<State>,
    projection: Box<dyn Projection>,
    viewport: Viewport,
    draw: Draw,

    context: Option<RenderContext>,
    pipelines: PipelineCache,
    uniforms: DynamicUniformBuffer,

    scheduler: Option<Box<dyn FrameScheduler>>,
    pending: Option<u64>,
    rendering: bool,

    frame_start: Option<Instant>,
    last_frame: Option<Duration>,
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewer {
    /// A viewer with no scene, no device, a perspective projection, and
    /// the solid-colour default state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scene: None,
            graph: RenderGraph::new(),
            default_state: State::solid_color("default"),
            projection: Box::new(Perspective::default()),
            viewport: Viewport::default(),
            draw: Draw::new(),
            context: None,
            pipelines: PipelineCache::new(),
            uniforms: DynamicUniformBuffer::new(),
            scheduler: None,
            pending: None,
            rendering: false,
            frame_start: None,
            last_frame: None,
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Replaces the scene. `None` renders clear-only frames.
    pub fn set_scene(&mut self, scene: Option<Scene>) {
        self.scene = scene;
        self.graph.clear();
    }

    #[must_use]
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    /// Replaces the projection; `None` restores the default perspective.
    pub fn set_projection(&mut self, projection: Option<Box<dyn Projection>>) {
        self.projection =
            projection.unwrap_or_else(|| Box::new(Perspective::default()));
        if let Some(aspect) = self.viewport.aspect() {
            self.projection.set_aspect(aspect);
        }
    }

    #[must_use]
    pub fn projection(&self) -> &dyn Projection {
        self.projection.as_ref()
    }

    /// Replaces the state used by shapes that carry none.
    pub fn set_default_state(&mut self, state: Arc<State>) {
        self.default_state = state;
    }

    #[must_use]
    pub fn default_state(&self) -> &Arc<State> {
        &self.default_state
    }

    /// Validates and applies the viewport, notifies the projection of the
    /// new aspect ratio, and reconfigures the surface.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        viewport.validate()?;
        self.viewport = viewport;
        if let Some(aspect) = viewport.aspect() {
            self.projection.set_aspect(aspect);
        }
        if let Some(context) = &mut self.context {
            context.resize(viewport.width as u32, viewport.height as u32);
        }
        Ok(())
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn clear_color(&self) -> [f32; 4] {
        self.draw.clear_color()
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.draw.set_clear_color(color);
    }

    /// The render graph built by the most recent cull.
    #[must_use]
    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    // ========================================================================
    // Device lifecycle
    // ========================================================================

    /// Installs (or replaces) the GPU context. Pipelines, shader modules,
    /// and per-frame GPU buffers from any previous device are dropped and
    /// rebuild lazily on the next frame.
    pub fn install_context(&mut self, context: RenderContext) {
        context.reset_lost();
        self.pipelines.clear();
        self.uniforms.invalidate();
        self.context = Some(context);
    }

    #[must_use]
    pub fn context(&self) -> Option<&RenderContext> {
        self.context.as_ref()
    }

    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.pipeline_count()
    }

    /// Tears the viewer down: scene, graph, context, and caches.
    pub fn destroy(&mut self) {
        self.cancel_render();
        self.scene = None;
        self.graph.clear();
        self.pipelines.clear();
        self.uniforms.invalidate();
        self.context = None;
    }

    // ========================================================================
    // Frame scheduling
    // ========================================================================

    /// Installs the host's animation-frame hook.
    pub fn set_scheduler(&mut self, scheduler: Option<Box<dyn FrameScheduler>>) {
        self.scheduler = scheduler;
        self.pending = None;
    }

    /// Requests one future frame callback; keeps at most one pending
    /// token.
    pub fn request_render(&mut self) {
        if self.pending.is_some() {
            return;
        }
        if let Some(scheduler) = &mut self.scheduler {
            self.pending = Some(scheduler.request());
        } else {
            log::debug!("request_render: no scheduler installed");
        }
    }

    /// Cancels the pending frame callback, if any.
    pub fn cancel_render(&mut self) {
        if let (Some(token), Some(scheduler)) = (self.pending.take(), self.scheduler.as_mut()) {
            scheduler.cancel(token);
        }
    }

    /// `true` while a frame callback is outstanding.
    #[must_use]
    pub fn has_pending_render(&self) -> bool {
        self.pending.is_some()
    }

    /// Host entry point when the scheduled frame fires.
    pub fn on_frame(&mut self) -> Result<()> {
        self.pending = None;
        self.render()
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Renders one frame synchronously: update → cull → draw → submit.
    /// Re-entrant calls fail; a lost device quiesces the frame without
    /// drawing.
    pub fn render(&mut self) -> Result<()> {
        if self.rendering {
            return Err(ArborError::RenderInProgress);
        }
        self.rendering = true;
        let result = self.render_frame();
        self.rendering = false;
        result
    }

    fn render_frame(&mut self) -> Result<()> {
        self.frame_start = Some(Instant::now());

        if let Some(context) = &self.context {
            if context.is_lost() {
                log::debug!("render: device lost, quiescing");
                self.finish_frame();
                return Ok(());
            }
        }

        let format = self
            .context
            .as_ref()
            .map_or(FALLBACK_SURFACE_FORMAT, RenderContext::color_format);

        // Update dirty nodes, then flatten into the render graph.
        if let Some(scene) = &mut self.scene {
            scene.update()?;
        }
        match &self.scene {
            Some(scene) => {
                let mut cull = Cull::new(&mut self.graph, self.default_state.clone(), format);
                cull.run_with(scene, self.projection.matrix());
            }
            None => self.graph.clear(),
        }

        let ops: Vec<DrawOp> = match &self.scene {
            Some(scene) => self.draw.record(scene, &self.graph),
            None => Vec::new(),
        };

        if let Some(context) = &self.context {
            let frame = match context.surface.get_current_texture() {
                wgpu::CurrentSurfaceTexture::Success(frame)
                | wgpu::CurrentSurfaceTexture::Suboptimal(frame) => frame,
                status => {
                    log::warn!("render: surface unavailable ({status:?}), skipping frame");
                    self.finish_frame();
                    return Ok(());
                }
            };
            let view = frame
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            self.draw.execute(
                &ops,
                context,
                &mut self.pipelines,
                &mut self.uniforms,
                &view,
            )?;
            frame.present();
        }

        self.finish_frame();
        Ok(())
    }

    fn finish_frame(&mut self) {
        self.last_frame = self.frame_start.take().map(|start| start.elapsed());
    }

    /// Duration of the most recently completed frame.
    #[must_use]
    pub fn last_frame_duration(&self) -> Option<Duration> {
        self.last_frame
    }
}
