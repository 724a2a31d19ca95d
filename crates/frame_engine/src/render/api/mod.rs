//! Backend seams used by the renderer
//!
//! The frame orchestrator, geometry upload and draw dispatch are written
//! against these traits rather than against Vulkan wrappers directly. The
//! Vulkan context implements all of them; unit tests use the in-memory
//! backend from `mock`.

pub mod render_backend;

#[cfg(test)]
pub mod mock;

pub use render_backend::{
    AcquireOutcome, DeviceMemory, FrameBackend, GpuBuffer, LayoutHandle, PassInfo, PipelineFactory,
    PipelineHandle, PresentOutcome, PresentationWindow, RenderCommands, RenderPassBegin, SurfaceChain,
};
