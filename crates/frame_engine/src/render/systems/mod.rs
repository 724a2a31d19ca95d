//! Draw systems that record per-object commands into a frame

pub mod simple_render_system;

pub use simple_render_system::{SimplePushConstantData, SimpleRenderSystem};
