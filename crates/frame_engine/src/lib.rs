//! # Frame Engine
//!
//! A small Vulkan renderer: a window, a swap chain that survives resizes and
//! minimization, a bounded number of frames in flight, and a draw system for
//! flat-colored 2D geometry.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use frame_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::default();
//!     let mut window = Window::from_config(&config.window)?;
//!     let context = VulkanContext::new(&mut window, &config.renderer)?;
//!     let mut renderer = Renderer::new(&context, &mut window, &config.renderer)?;
//!
//!     while !window.should_close() {
//!         window.poll_events();
//!         if let Some(command_buffer) = renderer.begin_frame(&mut window)? {
//!             renderer.begin_swap_chain_render_pass(command_buffer)?;
//!             renderer.end_swap_chain_render_pass(command_buffer)?;
//!             renderer.end_frame(&mut window)?;
//!         }
//!     }
//!     context.wait_idle()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;

pub use ash::vk;
pub use glfw;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        core::config::{ApplicationConfig, EngineConfig, ShaderConfig, VulkanRendererConfig, WindowConfig},
        foundation::math::{Vec2, Vec3},
        render::{
            api::FrameBackend, backends::vulkan::ShaderSources, GameObject, GameObjectIdCounter, Model, ModelBuilder, Renderer,
            SimpleRenderSystem, Transform2d, Vertex, VulkanContext, VulkanError, Window,
        },
    };
}
