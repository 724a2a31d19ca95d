//! # Rendering
//!
//! Frame orchestration and 2D draw dispatch on top of a Vulkan backend.
//!
//! ## Layout
//!
//! - **api**: backend traits the renderer, geometry and draw systems are written against
//! - **backends**: the Vulkan implementation of those traits
//! - **renderer**: per-frame lifecycle and swap chain recreation
//! - **primitives** / **game_object**: geometry and the objects that reference it
//! - **systems**: draw systems that turn objects into recorded commands

pub mod api;

/// Graphics backend implementations
pub mod backends;

pub mod game_object;
pub mod pipeline;
pub mod primitives;
pub mod renderer;
pub mod systems;

pub use api::{PassInfo, PresentationWindow};
pub use backends::vulkan::{VulkanContext, VulkanError, VulkanResult, Window, WindowError};
pub use game_object::{GameObject, GameObjectId, GameObjectIdCounter, Transform2d};
pub use pipeline::{CullMode, PipelineConfigInfo};
pub use primitives::{Model, ModelBuilder, Vertex};
pub use renderer::{ChainState, RecreateOutcome, Renderer};
pub use systems::{SimplePushConstantData, SimpleRenderSystem};
