//! Frame orchestration
//!
//! The [`Renderer`] drives the per-frame lifecycle on top of a
//! [`FrameBackend`]: acquire an image, hand out its command buffer, begin the
//! swap chain render pass with a full-extent viewport and scissor, then
//! submit and present. It also owns swap chain recreation.
//!
//! # Recreation
//!
//! The chain is rebuilt when acquisition or presentation reports that the
//! surface is out of date, or when the window was resized. While the window
//! is minimized (zero extent) recreation blocks on window events. After a
//! rebuild the old and new image and depth formats are compared; only a
//! format change bumps the pass epoch that draw systems use to decide whether
//! their pipelines must be rebuilt. An extent-only change leaves every
//! pipeline untouched because viewport and scissor are dynamic state.

use ash::vk;

use crate::core::config::VulkanRendererConfig;
use crate::render::api::{
    AcquireOutcome, FrameBackend, PassInfo, PresentOutcome, PresentationWindow, RenderCommands, RenderPassBegin,
    SurfaceChain,
};
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Lifecycle of the presentation chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// No chain was created yet
    Uninitialized,
    /// Frames can be rendered
    Ready,
    /// The surface changed; the chain must be rebuilt before the next frame
    Stale,
    /// The renderer was shut down
    Destroyed,
}

/// What a call to [`Renderer::recreate_swap_chain`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecreateOutcome {
    /// First chain for this renderer
    Initial,
    /// Rebuilt with the same formats; existing pipelines remain valid
    Compatible,
    /// Rebuilt with different formats; the pass epoch was bumped
    FormatsChanged,
}

/// Per-frame lifecycle and swap chain ownership
pub struct Renderer<'a, B: FrameBackend> {
    backend: &'a B,
    swap_chain: Option<B::Chain>,
    command_buffers: Vec<vk::CommandBuffer>,
    current_image_index: u32,
    is_frame_started: bool,
    state: ChainState,
    pass_epoch: u64,
    frames_in_flight: usize,
    clear_color: [f32; 4],
}

impl<'a, B: FrameBackend> Renderer<'a, B> {
    /// Create the renderer and its first swap chain
    ///
    /// The configuration is validated first; in particular fewer than
    /// [`VulkanRendererConfig::MIN_FRAMES_IN_FLIGHT`] frame slots is rejected.
    pub fn new(
        backend: &'a B,
        window: &mut impl PresentationWindow,
        config: &VulkanRendererConfig,
    ) -> VulkanResult<Self> {
        config
            .validate()
            .map_err(|reason| VulkanError::InvalidOperation { reason })?;

        let mut renderer = Self {
            backend,
            swap_chain: None,
            command_buffers: Vec::new(),
            current_image_index: 0,
            is_frame_started: false,
            state: ChainState::Uninitialized,
            pass_epoch: 0,
            frames_in_flight: config.max_frames_in_flight,
            clear_color: config.clear_color,
        };
        renderer.recreate_swap_chain(window)?;
        Ok(renderer)
    }

    /// Acquire the next image and begin recording its command buffer
    ///
    /// Returns `None` when the surface turned out to be out of date; the
    /// chain has then been rebuilt and the caller should skip this frame.
    pub fn begin_frame(
        &mut self,
        window: &mut impl PresentationWindow,
    ) -> VulkanResult<Option<vk::CommandBuffer>> {
        if self.is_frame_started {
            return Err(invalid("Can't call begin_frame while a frame is already in progress"));
        }
        if self.state == ChainState::Stale {
            self.recreate_swap_chain(window)?;
        }

        let image_index = match self.chain_mut()?.acquire_next_image()? {
            AcquireOutcome::Acquired { image_index, .. } => image_index,
            AcquireOutcome::OutOfDate => {
                log::debug!("Swap chain out of date on acquire");
                self.state = ChainState::Stale;
                self.recreate_swap_chain(window)?;
                return Ok(None);
            }
        };

        let command_buffer = self.command_buffer_for(image_index)?;
        self.backend.commands().begin(command_buffer)?;

        self.current_image_index = image_index;
        self.is_frame_started = true;
        Ok(Some(command_buffer))
    }

    /// Finish recording, submit and present
    ///
    /// Rebuilds the chain when presentation reports it stale or the window
    /// was resized during the frame.
    pub fn end_frame(&mut self, window: &mut impl PresentationWindow) -> VulkanResult<()> {
        if !self.is_frame_started {
            return Err(invalid("Can't call end_frame while no frame is in progress"));
        }
        self.is_frame_started = false;

        let image_index = self.current_image_index;
        let command_buffer = self.command_buffer_for(image_index)?;
        self.backend.commands().end(command_buffer)?;

        let outcome = self.chain_mut()?.submit_command_buffers(command_buffer, image_index)?;
        if outcome == PresentOutcome::NeedsRecreate || window.was_resized() {
            self.state = ChainState::Stale;
            self.recreate_swap_chain(window)?;
        }
        Ok(())
    }

    /// Begin the swap chain render pass with dynamic viewport and scissor
    pub fn begin_swap_chain_render_pass(&self, command_buffer: vk::CommandBuffer) -> VulkanResult<()> {
        self.check_frame_buffer(command_buffer)?;

        let chain = self.chain()?;
        let extent = chain.extent();
        let begin = RenderPassBegin {
            render_pass: chain.render_pass(),
            framebuffer: chain.framebuffer(self.current_image_index)?,
            extent,
            clear_color: self.clear_color,
            clear_depth: 1.0,
        };

        let commands = self.backend.commands();
        commands.begin_render_pass(command_buffer, &begin);
        commands.set_viewport(command_buffer, &full_viewport(extent));
        commands.set_scissor(
            command_buffer,
            &vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            },
        );
        Ok(())
    }

    /// End the swap chain render pass
    pub fn end_swap_chain_render_pass(&self, command_buffer: vk::CommandBuffer) -> VulkanResult<()> {
        self.check_frame_buffer(command_buffer)?;
        self.backend.commands().end_render_pass(command_buffer);
        Ok(())
    }

    /// Rebuild the swap chain for the window's current extent
    ///
    /// Blocks while the window has a zero-sized framebuffer. The previous
    /// chain is handed to the backend for reuse and released once the new one
    /// exists; if creation fails the previous chain is kept.
    pub fn recreate_swap_chain(&mut self, window: &mut impl PresentationWindow) -> VulkanResult<RecreateOutcome> {
        if self.state == ChainState::Destroyed {
            return Err(invalid("Renderer was shut down"));
        }

        let mut extent = window.extent();
        while extent.width == 0 || extent.height == 0 {
            log::debug!("Window minimized, waiting for events");
            window.wait_events();
            extent = window.extent();
        }

        self.backend.wait_idle()?;

        let previous = self.swap_chain.take();
        let chain = match self
            .backend
            .create_swap_chain(extent, previous.as_ref(), self.frames_in_flight)
        {
            Ok(chain) => chain,
            Err(e) => {
                log::error!("Swap chain creation failed: {}", e);
                if previous.is_some() {
                    self.state = ChainState::Stale;
                }
                self.swap_chain = previous;
                return Err(e);
            }
        };

        let outcome = match &previous {
            None => RecreateOutcome::Initial,
            Some(old) if old.compare_swap_formats(&chain) => RecreateOutcome::Compatible,
            Some(_) => {
                self.pass_epoch += 1;
                RecreateOutcome::FormatsChanged
            }
        };
        drop(previous);

        let image_count = chain.image_count();
        self.swap_chain = Some(chain);

        if image_count != self.command_buffers.len() {
            let old_buffers = std::mem::take(&mut self.command_buffers);
            self.backend.free_command_buffers(&old_buffers);
            let count = u32::try_from(image_count).map_err(|_| invalid("Swap chain image count exceeds u32"))?;
            self.command_buffers = self.backend.allocate_command_buffers(count)?;
        }

        self.state = ChainState::Ready;
        window.reset_resized_flag();

        log::info!(
            "Swap chain {:?} at {}x{} (pass epoch {})",
            outcome,
            extent.width,
            extent.height,
            self.pass_epoch
        );
        Ok(outcome)
    }

    /// Render pass and format epoch draw systems should build against
    pub fn pass_info(&self) -> VulkanResult<PassInfo> {
        Ok(PassInfo {
            render_pass: self.chain()?.render_pass(),
            epoch: self.pass_epoch,
        })
    }

    /// Width over height of the swap chain extent
    pub fn aspect_ratio(&self) -> VulkanResult<f32> {
        Ok(self.chain()?.extent_aspect_ratio())
    }

    /// Current swap chain extent
    pub fn extent(&self) -> VulkanResult<vk::Extent2D> {
        Ok(self.chain()?.extent())
    }

    /// Lifecycle state of the chain
    pub fn state(&self) -> ChainState {
        self.state
    }

    /// True between `begin_frame` and `end_frame`
    pub fn is_frame_in_progress(&self) -> bool {
        self.is_frame_started
    }

    /// Command buffer of the frame in progress
    pub fn current_command_buffer(&self) -> VulkanResult<vk::CommandBuffer> {
        if !self.is_frame_started {
            return Err(invalid("Cannot get command buffer when frame not in progress"));
        }
        self.command_buffer_for(self.current_image_index)
    }

    /// Recorder for the frame's command buffer
    pub fn commands(&self) -> &'a B::Commands {
        self.backend.commands()
    }

    /// Wait for the GPU and release the chain and command buffers
    ///
    /// Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        if self.state == ChainState::Destroyed {
            return;
        }
        if let Err(e) = self.backend.wait_idle() {
            log::warn!("wait_idle failed during renderer shutdown: {}", e);
        }
        let buffers = std::mem::take(&mut self.command_buffers);
        self.backend.free_command_buffers(&buffers);
        self.swap_chain = None;
        self.is_frame_started = false;
        self.state = ChainState::Destroyed;
        log::debug!("Renderer shut down");
    }

    fn chain(&self) -> VulkanResult<&B::Chain> {
        self.swap_chain.as_ref().ok_or_else(|| invalid("No swap chain"))
    }

    fn chain_mut(&mut self) -> VulkanResult<&mut B::Chain> {
        self.swap_chain.as_mut().ok_or_else(|| invalid("No swap chain"))
    }

    fn command_buffer_for(&self, image_index: u32) -> VulkanResult<vk::CommandBuffer> {
        self.command_buffers
            .get(image_index as usize)
            .copied()
            .ok_or_else(|| invalid("No command buffer for acquired image"))
    }

    fn check_frame_buffer(&self, command_buffer: vk::CommandBuffer) -> VulkanResult<()> {
        if self.current_command_buffer()? != command_buffer {
            return Err(invalid("Command buffer does not belong to the frame in progress"));
        }
        Ok(())
    }
}

impl<B: FrameBackend> Drop for Renderer<'_, B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[allow(clippy::cast_precision_loss)]
fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

fn invalid(reason: &str) -> VulkanError {
    VulkanError::InvalidOperation {
        reason: reason.to_string(),
    }
}
