//! Backend implementations for the render module

/// Vulkan rendering backend implementation
pub mod vulkan;
