//! Vulkan backend implementation
//!
//! Organized into initialization, resources, rendering and state modules.

/// Vulkan initialization types (context, window)
pub mod initialization;

/// Vulkan resource management (buffers)
pub mod resources;

/// Vulkan rendering operations (shaders, pipelines, render passes, commands)
pub mod rendering;

/// Vulkan state management (swap chain, frame slots, synchronization)
pub mod state;

// Re-export core initialization types
pub use initialization::context::{LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult};
pub use initialization::window::{ResizeListener, ResizeTracker, Window, WindowError, WindowResult};

// Re-export resource types
pub use resources::buffer::Buffer;

// Re-export rendering types
pub use rendering::commands::{CommandPool, CommandRecorder};
pub use rendering::pipeline::{GraphicsPipeline, PipelineLayout};
pub use rendering::render_pass::RenderPass;
pub use rendering::shader::{parse_spirv, ShaderModule, ShaderSources};
pub use rendering::vertex_layout::VulkanVertexLayout;

// Re-export state types
pub use state::frame_slots::FrameSlots;
pub use state::framebuffer::{DepthBuffer, Framebuffer};
pub use state::swap_chain::SwapChain;
pub use state::sync::{Fence, FrameSync, Semaphore};
