//! Renderer
//!
//! The cull→render-graph→draw pipeline plus the GPU-facing pieces it leans
//! on: the device context, the process-wide pipeline cache, and the
//! per-frame dynamic uniform buffer. Per-frame work is strictly
//! single-threaded and synchronous; the only suspension point in the whole
//! engine is device acquisition at startup.

pub mod context;
pub mod cull;
pub mod draw;
pub mod dynamic_buffer;
pub mod graph;
pub mod pipeline;

pub use context::{LostSignal, RenderContext};
pub use cull::{Cull, FALLBACK_SURFACE_FORMAT};
pub use draw::{Draw, DrawOp};
pub use dynamic_buffer::DynamicUniformBuffer;
pub use graph::RenderGraph;
pub use pipeline::{PipelineCache, RenderPipelineId, ShaderManager};
