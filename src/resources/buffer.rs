//! Typed Array Wrappers
//!
//! [`VertexArray`] and [`IndexArray`] own contiguous CPU-side numeric data
//! and lazily materialise a matching GPU buffer on first use. The CPU data
//! is shared via `Arc` and is *not* copied at construction, so one numeric
//! array may back several geometries. Reassigning the data invalidates the
//! cached GPU buffer; the next draw re-uploads.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

static NEXT_ARRAY_ID: AtomicU64 = AtomicU64::new(1);

fn next_array_id() -> u64 {
    NEXT_ARRAY_ID.fetch_add(1, Ordering::Relaxed)
}

/// Creates a GPU buffer sized for `bytes` (padded to the copy alignment)
/// and uploads the data through the queue.
fn upload(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    bytes: &[u8],
    usage: wgpu::BufferUsages,
    label: &str,
) -> wgpu::Buffer {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    let padded = bytes.len().div_ceil(align) * align;

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: padded as u64,
        usage,
        mapped_at_creation: false,
    });

    if bytes.len() == padded {
        queue.write_buffer(&buffer, 0, bytes);
    } else {
        let mut staged = bytes.to_vec();
        staged.resize(padded, 0);
        queue.write_buffer(&buffer, 0, &staged);
    }
    buffer
}

struct VertexState {
    data: Arc<Vec<f32>>,
    gpu: Option<wgpu::Buffer>,
}

/// Shared, lazily-uploaded vertex attribute array.
pub struct VertexArray {
    id: u64,
    format: wgpu::VertexFormat,
    inner: RwLock<VertexState>,
}

impl std::fmt::Debug for VertexArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexArray")
            .field("id", &self.id)
            .field("format", &self.format)
            .field("len", &self.len())
            .finish()
    }
}

impl VertexArray {
    /// Wraps `data` without copying. `format` describes one vertex element
    /// (e.g. `Float32x3` for positions and normals).
    #[must_use]
    pub fn new(data: Arc<Vec<f32>>, format: wgpu::VertexFormat) -> Self {
        Self {
            id: next_array_id(),
            format,
            inner: RwLock::new(VertexState { data, gpu: None }),
        }
    }

    /// Convenience constructor copying from a slice.
    #[must_use]
    pub fn from_slice(data: &[f32], format: wgpu::VertexFormat) -> Self {
        Self::new(Arc::new(data.to_vec()), format)
    }

    /// Process-unique identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> wgpu::VertexFormat {
        self.format
    }

    /// Number of scalars (not vertices).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scalars per vertex element.
    #[must_use]
    pub fn components(&self) -> usize {
        (self.format.size() / 4) as usize
    }

    /// Number of vertex elements.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        let components = self.components();
        if components == 0 { 0 } else { self.len() / components }
    }

    /// Shared handle to the CPU data.
    #[must_use]
    pub fn data(&self) -> Arc<Vec<f32>> {
        self.inner.read().data.clone()
    }

    /// Replaces the CPU data and invalidates the cached GPU buffer.
    pub fn set_data(&self, data: Arc<Vec<f32>>) {
        let mut state = self.inner.write();
        state.data = data;
        state.gpu = None;
    }

    /// Drops the cached GPU buffer (device loss, teardown). The next draw
    /// re-uploads.
    pub fn invalidate_gpu(&self) {
        self.inner.write().gpu = None;
    }

    /// Returns the GPU buffer, uploading the CPU data on first use.
    /// Idempotent until the data is reassigned.
    pub fn gpu_buffer(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::Buffer {
        if let Some(buffer) = &self.inner.read().gpu {
            return buffer.clone();
        }

        let mut state = self.inner.write();
        if let Some(buffer) = &state.gpu {
            return buffer.clone();
        }
        let buffer = upload(
            device,
            queue,
            bytemuck::cast_slice(state.data.as_slice()),
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            "VertexArray",
        );
        state.gpu = Some(buffer.clone());
        buffer
    }
}

/// CPU-side index data, 16- or 32-bit.
#[derive(Debug, Clone)]
pub enum IndexData {
    U16(Arc<Vec<u16>>),
    U32(Arc<Vec<u32>>),
}

impl IndexData {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn format(&self) -> wgpu::IndexFormat {
        match self {
            Self::U16(_) => wgpu::IndexFormat::Uint16,
            Self::U32(_) => wgpu::IndexFormat::Uint32,
        }
    }

    /// Index value at `i`, widened to u32.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            Self::U16(v) => v.get(i).map(|x| u32::from(*x)),
            Self::U32(v) => v.get(i).copied(),
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Self::U16(v) => bytemuck::cast_slice(v.as_slice()),
            Self::U32(v) => bytemuck::cast_slice(v.as_slice()),
        }
    }
}

struct IndexState {
    data: IndexData,
    gpu: Option<wgpu::Buffer>,
}

/// Shared, lazily-uploaded index array.
pub struct IndexArray {
    id: u64,
    inner: RwLock<IndexState>,
}

impl std::fmt::Debug for IndexArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexArray")
            .field("id", &self.id)
            .field("len", &self.len())
            .finish()
    }
}

impl IndexArray {
    #[must_use]
    pub fn new(data: IndexData) -> Self {
        Self {
            id: next_array_id(),
            inner: RwLock::new(IndexState { data, gpu: None }),
        }
    }

    /// Wraps shared 16-bit indices without copying.
    #[must_use]
    pub fn from_u16(data: Arc<Vec<u16>>) -> Self {
        Self::new(IndexData::U16(data))
    }

    /// Wraps shared 32-bit indices without copying.
    #[must_use]
    pub fn from_u32(data: Arc<Vec<u32>>) -> Self {
        Self::new(IndexData::U32(data))
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of indices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn format(&self) -> wgpu::IndexFormat {
        self.inner.read().data.format()
    }

    #[must_use]
    pub fn data(&self) -> IndexData {
        self.inner.read().data.clone()
    }

    /// Replaces the CPU data and invalidates the cached GPU buffer.
    pub fn set_data(&self, data: IndexData) {
        let mut state = self.inner.write();
        state.data = data;
        state.gpu = None;
    }

    /// Drops the cached GPU buffer (device loss, teardown).
    pub fn invalidate_gpu(&self) {
        self.inner.write().gpu = None;
    }

    /// Returns the GPU buffer, uploading the CPU data on first use.
    pub fn gpu_buffer(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::Buffer {
        if let Some(buffer) = &self.inner.read().gpu {
            return buffer.clone();
        }

        let mut state = self.inner.write();
        if let Some(buffer) = &state.gpu {
            return buffer.clone();
        }
        let buffer = upload(
            device,
            queue,
            state.data.bytes(),
            wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            "IndexArray",
        );
        state.gpu = Some(buffer.clone());
        buffer
    }
}
