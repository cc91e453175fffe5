//! Render-State
//!
//! A [`State`] is the bucket key and side-effect carrier describing how
//! shapes are drawn: draw-order keys (layer, bin), the clipped flag, the
//! shader handle, the topology, and the optional apply/reset hooks invoked
//! around the shapes that share the state. States are shared — many shapes
//! may reference one `Arc<State>`.
//!
//! Two states with the same *name* land in the same state-group bucket;
//! behaviour is undefined if two distinct states share a name within one
//! frame. Two states with the same *pipeline key* share one cached GPU
//! pipeline even under different names.

use std::borrow::Cow;
use std::sync::Arc;

use glam::Mat4;

use crate::resources::shader::Shader;

/// Hook invoked once before the draws of each model-matrix bucket sharing
/// this state. May mutate uniform-carrying shader fields (e.g. colour).
pub type ApplyHook = Box<dyn Fn(&State, &Mat4, &Mat4) + Send + Sync>;

/// Hook invoked once after the draws of the bucket.
pub type ResetHook = Box<dyn Fn(&State) + Send + Sync>;

/// Construction parameters for [`State`]. Only `name` and `shader` are
/// mandatory; the rest default per the render-state contract.
pub struct StateDesc {
    pub name: Cow<'static, str>,
    pub layer: i32,
    pub bin: i32,
    pub clipped: bool,
    pub shader: Arc<Shader>,
    pub topology: wgpu::PrimitiveTopology,
    pub apply: Option<ApplyHook>,
    pub reset: Option<ResetHook>,
}

impl StateDesc {
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, shader: Arc<Shader>) -> Self {
        Self {
            name: name.into(),
            layer: 0,
            bin: 0,
            clipped: false,
            shader,
            topology: wgpu::PrimitiveTopology::TriangleList,
            apply: None,
            reset: None,
        }
    }
}

/// Key used to look up or build a cached GPU pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub shader: String,
    pub topology: wgpu::PrimitiveTopology,
    pub format: wgpu::TextureFormat,
}

/// Immutable render-state value object, identified by its stable name.
pub struct State {
    name: Cow<'static, str>,
    layer: i32,
    bin: i32,
    clipped: bool,
    shader: Arc<Shader>,
    topology: wgpu::PrimitiveTopology,
    apply: Option<ApplyHook>,
    reset: Option<ResetHook>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name)
            .field("layer", &self.layer)
            .field("bin", &self.bin)
            .field("clipped", &self.clipped)
            .field("shader", &self.shader.name())
            .field("topology", &self.topology)
            .finish()
    }
}

impl State {
    #[must_use]
    pub fn new(desc: StateDesc) -> Self {
        Self {
            name: desc.name,
            layer: desc.layer,
            bin: desc.bin,
            clipped: desc.clipped,
            shader: desc.shader,
            topology: desc.topology,
            apply: desc.apply,
            reset: desc.reset,
        }
    }

    /// Shared state around the built-in solid-colour shader, all defaults.
    #[must_use]
    pub fn solid_color(name: impl Into<Cow<'static, str>>) -> Arc<Self> {
        Arc::new(Self::new(StateDesc::new(name, Shader::solid_color())))
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn layer(&self) -> i32 {
        self.layer
    }

    #[inline]
    #[must_use]
    pub fn bin(&self) -> i32 {
        self.bin
    }

    #[inline]
    #[must_use]
    pub fn clipped(&self) -> bool {
        self.clipped
    }

    #[inline]
    #[must_use]
    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    #[inline]
    #[must_use]
    pub fn topology(&self) -> wgpu::PrimitiveTopology {
        self.topology
    }

    /// Pipeline key for the given surface format.
    #[must_use]
    pub fn pipeline_key(&self, format: wgpu::TextureFormat) -> PipelineKey {
        PipelineKey {
            shader: self.shader.name().to_string(),
            topology: self.topology,
            format,
        }
    }

    /// Runs the apply hook, if any.
    pub fn apply(&self, projection: &Mat4, model: &Mat4) {
        if let Some(hook) = &self.apply {
            hook(self, projection, model);
        }
    }

    /// Runs the reset hook, if any.
    pub fn reset(&self) {
        if let Some(hook) = &self.reset {
            hook(self);
        }
    }
}
