// Vulkan state management

pub mod frame_slots;
pub mod framebuffer;
pub mod swap_chain;
pub mod sync;
