//! Dynamic Uniform Buffer
//!
//! Per-frame uniform storage: every draw gets one 256-aligned slot holding
//! its projection matrix, model matrix, and colour, packed CPU-side during
//! command recording and uploaded with a single `queue.write_buffer` before
//! the pass begins. Draws bind the shared bind group with their slot's
//! dynamic offset. The buffer grows geometrically and is recreated (along
//! with its bind group) only on growth or device replacement.

use crate::resources::shader::UNIFORM_BLOCK_SIZE;

/// Dynamic-offset alignment required for uniform buffers.
const UNIFORM_ALIGNMENT: u64 = 256;

/// Grow-only per-frame uniform arena.
pub struct DynamicUniformBuffer {
    data: Vec<u8>,
    buffer: Option<wgpu::Buffer>,
    bind_group: Option<wgpu::BindGroup>,
    capacity: u64,
}

impl Default for DynamicUniformBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicUniformBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            buffer: None,
            bind_group: None,
            capacity: 0,
        }
    }

    /// Discards the previous frame's slots; GPU resources are retained.
    pub fn begin_frame(&mut self) {
        self.data.clear();
    }

    /// Appends one uniform slot and returns its dynamic offset. `bytes`
    /// must not exceed the uniform block size.
    pub fn push(&mut self, bytes: &[u8]) -> u32 {
        debug_assert!(bytes.len() as u64 <= UNIFORM_BLOCK_SIZE);
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(bytes);
        let padded = (self.data.len() as u64).div_ceil(UNIFORM_ALIGNMENT) * UNIFORM_ALIGNMENT;
        self.data.resize(padded as usize, 0);
        offset
    }

    /// Number of slots packed this frame.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.data.len() / UNIFORM_ALIGNMENT as usize
    }

    /// Uploads the packed slots, growing the buffer (doubling) when the
    /// frame outgrew it. The bind group is rebuilt whenever the buffer is.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) {
        if self.data.is_empty() {
            return;
        }

        let required = self.data.len() as u64;
        if self.buffer.is_none() || required > self.capacity {
            let capacity = (self.capacity * 2).max(required).max(UNIFORM_ALIGNMENT * 16);
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Frame Uniforms"),
                size: capacity,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.bind_group = Some(Self::create_bind_group(device, layout, &buffer));
            self.buffer = Some(buffer);
            self.capacity = capacity;
        }

        if let Some(buffer) = &self.buffer {
            queue.write_buffer(buffer, 0, &self.data);
        }
    }

    /// The bind group draws bind at group 0 with their slot offset.
    /// `None` until the first upload.
    #[must_use]
    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }

    /// Drops GPU resources (device loss or replacement); the next upload
    /// recreates them.
    pub fn invalidate(&mut self) {
        self.buffer = None;
        self.bind_group = None;
        self.capacity = 0;
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Uniforms BindGroup"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE),
                }),
            }],
        })
    }
}
