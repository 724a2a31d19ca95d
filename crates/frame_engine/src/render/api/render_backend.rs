//! Backend abstraction traits for the rendering system
//!
//! These traits describe what the high-level renderer needs from the GPU
//! side: a presentation chain it can acquire from and submit to, a command
//! recording surface, buffer allocation with one-shot copies, and pipeline
//! construction. The Vulkan backend implements each of them over `ash`.

use ash::vk;

use crate::render::backends::vulkan::{ShaderSources, VulkanResult};
use crate::render::pipeline::PipelineConfigInfo;

/// Result of asking the chain for the next presentable image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is ready to be rendered into
    Acquired {
        /// Index of the acquired image within the chain
        image_index: u32,
        /// The surface still works but no longer matches exactly
        suboptimal: bool,
    },
    /// The surface changed and the chain must be rebuilt before rendering
    OutOfDate,
}

/// Result of submitting a frame and presenting it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// The image was queued for presentation
    Presented,
    /// The surface is out of date or suboptimal; rebuild the chain
    NeedsRecreate,
}

/// Parameters for beginning the swap chain render pass
#[derive(Debug, Clone, Copy)]
pub struct RenderPassBegin {
    /// Render pass to begin
    pub render_pass: vk::RenderPass,
    /// Framebuffer of the acquired image
    pub framebuffer: vk::Framebuffer,
    /// Render area, always the full swap extent
    pub extent: vk::Extent2D,
    /// Color attachment clear value
    pub clear_color: [f32; 4],
    /// Depth attachment clear value
    pub clear_depth: f32,
}

impl RenderPassBegin {
    /// Clear values in attachment order: color, then depth/stencil
    pub fn clear_values(&self) -> [vk::ClearValue; 2] {
        [
            vk::ClearValue {
                color: vk::ClearColorValue { float32: self.clear_color },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: self.clear_depth, stencil: 0 },
            },
        ]
    }
}

/// What a draw system needs to know about the current render pass
///
/// `epoch` increases whenever the chain was rebuilt with different image or
/// depth formats. Pipelines built for an older epoch must be rebuilt; an
/// unchanged epoch means existing pipelines stay compatible even if the
/// render pass handle itself was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassInfo {
    /// Current swap chain render pass
    pub render_pass: vk::RenderPass,
    /// Format generation of the render pass
    pub epoch: u64,
}

/// Command recording into a primary command buffer
pub trait RenderCommands {
    /// Begin recording
    fn begin(&self, command_buffer: vk::CommandBuffer) -> VulkanResult<()>;
    /// Finish recording
    fn end(&self, command_buffer: vk::CommandBuffer) -> VulkanResult<()>;
    /// Begin an inline render pass
    fn begin_render_pass(&self, command_buffer: vk::CommandBuffer, begin: &RenderPassBegin);
    /// End the current render pass
    fn end_render_pass(&self, command_buffer: vk::CommandBuffer);
    /// Set dynamic viewport 0
    fn set_viewport(&self, command_buffer: vk::CommandBuffer, viewport: &vk::Viewport);
    /// Set dynamic scissor 0
    fn set_scissor(&self, command_buffer: vk::CommandBuffer, scissor: &vk::Rect2D);
    /// Bind a graphics pipeline
    fn bind_pipeline(&self, command_buffer: vk::CommandBuffer, pipeline: vk::Pipeline);
    /// Push constants at offset 0
    fn push_constants(
        &self,
        command_buffer: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        data: &[u8],
    );
    /// Bind vertex buffers starting at binding 0 with zero offsets
    fn bind_vertex_buffers(&self, command_buffer: vk::CommandBuffer, buffers: &[vk::Buffer]);
    /// Bind a 32-bit index buffer at offset 0
    fn bind_index_buffer(&self, command_buffer: vk::CommandBuffer, buffer: vk::Buffer);
    /// Non-indexed draw of one instance
    fn draw(&self, command_buffer: vk::CommandBuffer, vertex_count: u32);
    /// Indexed draw of one instance
    fn draw_indexed(&self, command_buffer: vk::CommandBuffer, index_count: u32);
}

/// A chain of presentable images with its per-frame synchronization
pub trait SurfaceChain {
    /// Pixel size of the images
    fn extent(&self) -> vk::Extent2D;
    /// Color format of the images
    fn image_format(&self) -> vk::Format;
    /// Format of the depth attachments
    fn depth_format(&self) -> vk::Format;
    /// Number of presentable images
    fn image_count(&self) -> usize;
    /// Render pass compatible with the framebuffers
    fn render_pass(&self) -> vk::RenderPass;
    /// Framebuffer targeting the given image
    fn framebuffer(&self, image_index: u32) -> VulkanResult<vk::Framebuffer>;

    /// Wait for the current frame slot, then acquire the next image
    fn acquire_next_image(&mut self) -> VulkanResult<AcquireOutcome>;

    /// Submit recorded work for `image_index` and present it
    fn submit_command_buffers(
        &mut self,
        command_buffer: vk::CommandBuffer,
        image_index: u32,
    ) -> VulkanResult<PresentOutcome>;

    /// True when both chains use the same image and depth formats
    fn compare_swap_formats(&self, other: &Self) -> bool
    where
        Self: Sized,
    {
        self.image_format() == other.image_format() && self.depth_format() == other.depth_format()
    }

    /// Width over height of the extent
    #[allow(clippy::cast_precision_loss)]
    fn extent_aspect_ratio(&self) -> f32 {
        let extent = self.extent();
        extent.width as f32 / extent.height as f32
    }
}

/// Device services the frame orchestrator depends on
pub trait FrameBackend {
    /// Presentation chain type
    type Chain: SurfaceChain;
    /// Command recorder type
    type Commands: RenderCommands;

    /// Recorder for command buffers allocated by this backend
    fn commands(&self) -> &Self::Commands;

    /// Build a chain for `extent`, reusing `previous` as the retired chain
    fn create_swap_chain(
        &self,
        extent: vk::Extent2D,
        previous: Option<&Self::Chain>,
        frames_in_flight: usize,
    ) -> VulkanResult<Self::Chain>;

    /// Allocate primary command buffers
    fn allocate_command_buffers(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>>;

    /// Return command buffers to the pool; they must not be pending
    fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]);

    /// Block until all submitted GPU work has finished
    fn wait_idle(&self) -> VulkanResult<()>;
}

/// A GPU buffer the host can fill
pub trait GpuBuffer {
    /// Raw buffer handle
    fn handle(&self) -> vk::Buffer;
    /// Allocated size in bytes
    fn size(&self) -> vk::DeviceSize;
    /// Copy bytes into host-visible memory at offset 0
    fn write_bytes(&self, bytes: &[u8]) -> VulkanResult<()>;
}

/// Buffer allocation plus the one-shot transfer used for staging uploads
pub trait DeviceMemory {
    /// Buffer type handed out by this device
    type Buffer: GpuBuffer;

    /// Allocate and bind a buffer
    fn create_buffer(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self::Buffer>;

    /// Copy `size` bytes from `src` to `dst` and wait for completion
    fn copy_buffer(&self, src: &Self::Buffer, dst: &Self::Buffer, size: vk::DeviceSize) -> VulkanResult<()>;
}

/// Owner of a pipeline layout handle
pub trait LayoutHandle {
    /// Raw layout handle
    fn handle(&self) -> vk::PipelineLayout;
}

/// Owner of a pipeline handle
pub trait PipelineHandle {
    /// Raw pipeline handle
    fn handle(&self) -> vk::Pipeline;
}

/// Builds pipeline layouts and graphics pipelines
pub trait PipelineFactory {
    /// Layout type
    type Layout: LayoutHandle;
    /// Pipeline type
    type Pipeline: PipelineHandle;

    /// Create a layout with the given push constant ranges and no descriptor sets
    fn create_pipeline_layout(&self, push_constant_ranges: &[vk::PushConstantRange]) -> VulkanResult<Self::Layout>;

    /// Create a graphics pipeline from validated SPIR-V and a config
    fn create_graphics_pipeline(
        &self,
        shaders: &ShaderSources,
        config: &PipelineConfigInfo,
    ) -> VulkanResult<Self::Pipeline>;
}

/// The window as seen by the frame orchestrator
pub trait PresentationWindow {
    /// Current drawable size in pixels
    fn extent(&self) -> vk::Extent2D;
    /// True once the framebuffer was resized since the last reset
    fn was_resized(&self) -> bool;
    /// Clear the resized flag
    fn reset_resized_flag(&mut self);
    /// Block until at least one window event arrives
    fn wait_events(&mut self);
}
