// Vulkan resource management

pub mod buffer;
