//! Shader Handles
//!
//! A [`Shader`] is an opaque reference to WGSL source plus the metadata the
//! pipeline cache needs: entry points, declared vertex attribute slots, and
//! the uniform-carrying colour field that state `apply` hooks may mutate.
//! Compiled modules live in the pipeline cache, keyed by shader name.

use std::borrow::Cow;
use std::sync::Arc;

use glam::Vec4;
use parking_lot::RwLock;
use smallvec::SmallVec;

/// What a vertex attribute slot feeds; doubles as the buffer slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeSemantic {
    Position,
    Normal,
    Color,
    TexCoord,
}

impl AttributeSemantic {
    /// Buffer slot and shader location assigned to this semantic.
    #[must_use]
    pub fn location(self) -> u32 {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::Color => 2,
            Self::TexCoord => 3,
        }
    }
}

/// One vertex buffer slot a shader consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSlot {
    pub semantic: AttributeSemantic,
    pub format: wgpu::VertexFormat,
}

/// Uniform block shared by every pipeline: projection and model matrices
/// plus a colour, bound at group 0 with a dynamic offset.
pub const UNIFORM_BLOCK_SIZE: u64 = 144;

const SOLID_COLOR_WGSL: &str = r"
struct Uniforms {
    projection: mat4x4<f32>,
    model: mat4x4<f32>,
    color: vec4<f32>,
};
@group(0) @binding(0) var<uniform> uniforms: Uniforms;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return uniforms.projection * uniforms.model * vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return uniforms.color;
}
";

/// Shader source plus pipeline metadata. Shared via `Arc`; the colour is
/// the only mutable field and is uploaded lazily on the next draw.
pub struct Shader {
    name: Cow<'static, str>,
    source: Cow<'static, str>,
    vertex_entry: Cow<'static, str>,
    fragment_entry: Cow<'static, str>,
    attributes: SmallVec<[AttributeSlot; 4]>,
    color: RwLock<Vec4>,
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("name", &self.name)
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl Shader {
    #[must_use]
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        source: impl Into<Cow<'static, str>>,
        attributes: impl IntoIterator<Item = AttributeSlot>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            vertex_entry: Cow::Borrowed("vs_main"),
            fragment_entry: Cow::Borrowed("fs_main"),
            attributes: attributes.into_iter().collect(),
            color: RwLock::new(Vec4::ONE),
        }
    }

    /// The built-in fallback: position-only vertices, uniform colour.
    #[must_use]
    pub fn solid_color() -> Arc<Self> {
        Arc::new(Self::new(
            "solid-color",
            SOLID_COLOR_WGSL,
            [AttributeSlot {
                semantic: AttributeSemantic::Position,
                format: wgpu::VertexFormat::Float32x3,
            }],
        ))
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn vertex_entry(&self) -> &str {
        &self.vertex_entry
    }

    #[must_use]
    pub fn fragment_entry(&self) -> &str {
        &self.fragment_entry
    }

    /// Vertex buffer slots this shader consumes, in location order.
    #[must_use]
    pub fn attributes(&self) -> &[AttributeSlot] {
        &self.attributes
    }

    /// Current colour uniform.
    #[must_use]
    pub fn color(&self) -> Vec4 {
        *self.color.read()
    }

    /// Sets the colour uniform; picked up by the next draw.
    pub fn set_color(&self, color: Vec4) {
        *self.color.write() = color;
    }
}
