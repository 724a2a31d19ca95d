//! GPU-resident geometry
//!
//! A [`Model`] uploads its vertices (and optional indices) into device-local
//! buffers through a host-visible staging buffer and a one-shot copy, then
//! binds and draws them from recorded command buffers.

use ash::vk;

use crate::render::api::{DeviceMemory, GpuBuffer, RenderCommands};
use crate::render::backends::vulkan::{Buffer, VulkanError, VulkanResult};

/// Vertex with a 2D position and an RGB color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    /// Position in normalized device coordinates before the push transform
    pub position: [f32; 2],
    /// Per-vertex color
    pub color: [f32; 3],
}

// Safety: Vertex is repr(C), contains only f32 fields and has no padding
unsafe impl bytemuck::Pod for Vertex {}
unsafe impl bytemuck::Zeroable for Vertex {}

impl Vertex {
    /// Create a vertex
    pub fn new(position: [f32; 2], color: [f32; 3]) -> Self {
        Self { position, color }
    }
}

/// CPU-side geometry description handed to [`Model::new`]
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    /// Vertex data, at least three entries
    pub vertices: Vec<Vertex>,
    /// Optional 32-bit indices into `vertices`; empty means non-indexed
    pub indices: Vec<u32>,
}

impl ModelBuilder {
    /// Non-indexed geometry
    pub fn from_vertices(vertices: Vec<Vertex>) -> Self {
        Self {
            vertices,
            indices: Vec::new(),
        }
    }

    /// Indexed geometry
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }

    /// Check counts and index bounds without touching the GPU
    pub fn validate(&self) -> VulkanResult<()> {
        if self.vertices.len() < 3 {
            return Err(VulkanError::InvalidGeometry {
                reason: format!("vertex count must be at least 3, got {}", self.vertices.len()),
            });
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= self.vertices.len()) {
            return Err(VulkanError::InvalidGeometry {
                reason: format!("index {bad} out of range for {} vertices", self.vertices.len()),
            });
        }
        Ok(())
    }
}

/// Vertex and optional index buffers living in device-local memory
pub struct Model<B: GpuBuffer = Buffer> {
    vertex_buffer: B,
    vertex_count: u32,
    index_buffer: Option<B>,
    index_count: u32,
}

impl<B: GpuBuffer> Model<B> {
    /// Validate `builder` and upload its data
    ///
    /// Invalid geometry is rejected before any buffer is created.
    pub fn new<D>(device: &D, builder: &ModelBuilder) -> VulkanResult<Self>
    where
        D: DeviceMemory<Buffer = B>,
    {
        builder.validate()?;

        let vertex_count = count_u32(builder.vertices.len())?;
        let vertex_buffer = upload(
            device,
            bytemuck::cast_slice(&builder.vertices),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;

        let (index_buffer, index_count) = if builder.indices.is_empty() {
            (None, 0)
        } else {
            let buffer = upload(
                device,
                bytemuck::cast_slice(&builder.indices),
                vk::BufferUsageFlags::INDEX_BUFFER,
            )?;
            (Some(buffer), count_u32(builder.indices.len())?)
        };

        log::debug!(
            "Uploaded model: {} vertices, {} indices",
            vertex_count,
            index_count
        );

        Ok(Self {
            vertex_buffer,
            vertex_count,
            index_buffer,
            index_count,
        })
    }

    /// Bind vertex buffer 0 and, when present, the 32-bit index buffer
    pub fn bind(&self, commands: &impl RenderCommands, command_buffer: vk::CommandBuffer) {
        commands.bind_vertex_buffers(command_buffer, &[self.vertex_buffer.handle()]);
        if let Some(index_buffer) = &self.index_buffer {
            commands.bind_index_buffer(command_buffer, index_buffer.handle());
        }
    }

    /// Issue one draw covering the whole model
    pub fn draw(&self, commands: &impl RenderCommands, command_buffer: vk::CommandBuffer) {
        if self.index_buffer.is_some() {
            commands.draw_indexed(command_buffer, self.index_count);
        } else {
            commands.draw(command_buffer, self.vertex_count);
        }
    }

    /// Number of vertices uploaded
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Number of indices uploaded, zero for non-indexed models
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Whether draws use the index buffer
    pub fn has_index_buffer(&self) -> bool {
        self.index_buffer.is_some()
    }
}

fn count_u32(len: usize) -> VulkanResult<u32> {
    u32::try_from(len).map_err(|_| VulkanError::InvalidGeometry {
        reason: format!("element count {len} exceeds u32"),
    })
}

/// Stage `bytes` in host-visible memory and copy them into a new device-local buffer
fn upload<D: DeviceMemory>(device: &D, bytes: &[u8], usage: vk::BufferUsageFlags) -> VulkanResult<D::Buffer> {
    let size = bytes.len() as vk::DeviceSize;

    let staging = device.create_buffer(
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;
    staging.write_bytes(bytes)?;

    let buffer = device.create_buffer(
        size,
        usage | vk::BufferUsageFlags::TRANSFER_DST,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )?;
    device.copy_buffer(&staging, &buffer, size)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::mock::{MockBackend, MockCommands, RecordedCommand};

    fn triangle() -> Vec<Vertex> {
        vec![
            Vertex::new([0.0, -0.5], [1.0, 0.0, 0.0]),
            Vertex::new([0.5, 0.5], [0.0, 1.0, 0.0]),
            Vertex::new([-0.5, 0.5], [0.0, 0.0, 1.0]),
        ]
    }

    #[test]
    fn test_vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 20);
        assert_eq!(std::mem::align_of::<Vertex>(), 4);
    }

    #[test]
    fn test_three_vertices_upload_through_staging() {
        let backend = MockBackend::new();
        let model = Model::new(&backend, &ModelBuilder::from_vertices(triangle())).unwrap();

        assert_eq!(model.vertex_count(), 3);
        assert!(!model.has_index_buffer());
        // One staging buffer and one device-local buffer, joined by one copy
        assert_eq!(backend.buffers_created(), 2);
        assert_eq!(backend.copies(), vec![60]);
    }

    #[test]
    fn test_two_vertices_rejected_without_gpu_calls() {
        let backend = MockBackend::new();
        let mut vertices = triangle();
        vertices.pop();

        let result = Model::new(&backend, &ModelBuilder::from_vertices(vertices));
        assert!(matches!(result, Err(VulkanError::InvalidGeometry { .. })));
        assert_eq!(backend.buffers_created(), 0);
        assert!(backend.copies().is_empty());
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let backend = MockBackend::new();
        let builder = ModelBuilder::from_vertices(triangle()).with_indices(vec![0, 1, 3]);
        assert!(Model::new(&backend, &builder).is_err());
        assert_eq!(backend.buffers_created(), 0);
    }

    #[test]
    fn test_indexed_model_binds_and_draws_indexed() {
        let backend = MockBackend::new();
        let mut vertices = triangle();
        vertices.push(Vertex::new([0.5, -0.5], [1.0, 1.0, 1.0]));
        let builder = ModelBuilder::from_vertices(vertices).with_indices(vec![0, 1, 2, 2, 3, 0]);
        let model = Model::new(&backend, &builder).unwrap();
        assert_eq!(backend.buffers_created(), 4);

        let commands = MockCommands::default();
        let cb = vk::CommandBuffer::null();
        model.bind(&commands, cb);
        model.draw(&commands, cb);

        let log = commands.take();
        assert!(matches!(log[0], RecordedCommand::BindVertexBuffers(1)));
        assert!(matches!(log[1], RecordedCommand::BindIndexBuffer));
        assert_eq!(log[2], RecordedCommand::DrawIndexed(6));
    }
}
