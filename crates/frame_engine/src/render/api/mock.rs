//! In-memory backend for GPU-less tests
//!
//! Implements every backend trait with plain bookkeeping: handles are unique
//! counters, command recording appends to a log, and the chain runs the
//! shared [`FrameSlots`] sequencing with fences that signal as soon as they
//! are waited on.

#![allow(missing_docs)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use ash::vk::{self, Handle};

use crate::render::api::{
    AcquireOutcome, DeviceMemory, FrameBackend, GpuBuffer, LayoutHandle, PipelineFactory, PipelineHandle,
    PresentOutcome, PresentationWindow, RenderCommands, RenderPassBegin, SurfaceChain,
};
use crate::render::backends::vulkan::{FrameSlots, ShaderSources, VulkanError, VulkanResult};
use crate::render::pipeline::PipelineConfigInfo;

/// One recorded command
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    Begin,
    End,
    BeginRenderPass {
        clear_color: [f32; 4],
        width: u32,
        height: u32,
    },
    EndRenderPass,
    SetViewport {
        width: f32,
        height: f32,
    },
    SetScissor {
        width: u32,
        height: u32,
    },
    BindPipeline(vk::Pipeline),
    PushConstants(Vec<u8>),
    BindVertexBuffers(usize),
    BindIndexBuffer,
    Draw(u32),
    DrawIndexed(u32),
}

/// Command recorder that logs instead of recording
#[derive(Default)]
pub struct MockCommands {
    log: RefCell<Vec<RecordedCommand>>,
}

impl MockCommands {
    /// Drain the log
    pub fn take(&self) -> Vec<RecordedCommand> {
        self.log.take()
    }

    fn push(&self, command: RecordedCommand) {
        self.log.borrow_mut().push(command);
    }
}

impl RenderCommands for MockCommands {
    fn begin(&self, _: vk::CommandBuffer) -> VulkanResult<()> {
        self.push(RecordedCommand::Begin);
        Ok(())
    }

    fn end(&self, _: vk::CommandBuffer) -> VulkanResult<()> {
        self.push(RecordedCommand::End);
        Ok(())
    }

    fn begin_render_pass(&self, _: vk::CommandBuffer, begin: &RenderPassBegin) {
        self.push(RecordedCommand::BeginRenderPass {
            clear_color: begin.clear_color,
            width: begin.extent.width,
            height: begin.extent.height,
        });
    }

    fn end_render_pass(&self, _: vk::CommandBuffer) {
        self.push(RecordedCommand::EndRenderPass);
    }

    fn set_viewport(&self, _: vk::CommandBuffer, viewport: &vk::Viewport) {
        self.push(RecordedCommand::SetViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }

    fn set_scissor(&self, _: vk::CommandBuffer, scissor: &vk::Rect2D) {
        self.push(RecordedCommand::SetScissor {
            width: scissor.extent.width,
            height: scissor.extent.height,
        });
    }

    fn bind_pipeline(&self, _: vk::CommandBuffer, pipeline: vk::Pipeline) {
        self.push(RecordedCommand::BindPipeline(pipeline));
    }

    fn push_constants(&self, _: vk::CommandBuffer, _: vk::PipelineLayout, _: vk::ShaderStageFlags, data: &[u8]) {
        self.push(RecordedCommand::PushConstants(data.to_vec()));
    }

    fn bind_vertex_buffers(&self, _: vk::CommandBuffer, buffers: &[vk::Buffer]) {
        self.push(RecordedCommand::BindVertexBuffers(buffers.len()));
    }

    fn bind_index_buffer(&self, _: vk::CommandBuffer, _: vk::Buffer) {
        self.push(RecordedCommand::BindIndexBuffer);
    }

    fn draw(&self, _: vk::CommandBuffer, vertex_count: u32) {
        self.push(RecordedCommand::Draw(vertex_count));
    }

    fn draw_indexed(&self, _: vk::CommandBuffer, index_count: u32) {
        self.push(RecordedCommand::DrawIndexed(index_count));
    }
}

/// Counters and injected failures shared between the backend and its chains
#[derive(Default)]
struct MockStats {
    next_handle: Cell<u64>,
    chains_created: Cell<usize>,
    chains_destroyed: Cell<usize>,
    command_buffers_allocated: Cell<usize>,
    freed: RefCell<Vec<vk::CommandBuffer>>,
    submissions: Cell<usize>,
    max_in_flight: Cell<usize>,
    buffers_created: Cell<usize>,
    copies: RefCell<Vec<vk::DeviceSize>>,
    pipelines_created: Cell<usize>,
    layouts_created: Cell<usize>,
    fence_waits: Cell<usize>,
    skip_fence_waits: Cell<bool>,
    acquire_out_of_date: Cell<bool>,
    present_needs_recreate: Cell<bool>,
    fail_next_chain: Cell<bool>,
}

impl MockStats {
    fn handle(&self) -> u64 {
        let next = self.next_handle.get() + 1;
        self.next_handle.set(next);
        next
    }

    fn bump(counter: &Cell<usize>) {
        counter.set(counter.get() + 1);
    }
}

/// Presentation chain with simulated fences
pub struct MockChain {
    stats: Rc<MockStats>,
    extent: vk::Extent2D,
    image_format: vk::Format,
    depth_format: vk::Format,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
    slots: FrameSlots,
    next_image: u32,
}

impl SurfaceChain for MockChain {
    fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    fn image_format(&self) -> vk::Format {
        self.image_format
    }

    fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    fn image_count(&self) -> usize {
        self.framebuffers.len()
    }

    fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    fn framebuffer(&self, image_index: u32) -> VulkanResult<vk::Framebuffer> {
        self.framebuffers
            .get(image_index as usize)
            .copied()
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("No framebuffer for image {image_index}"),
            })
    }

    fn acquire_next_image(&mut self) -> VulkanResult<AcquireOutcome> {
        let stats = &self.stats;
        let wait = |_: usize| -> VulkanResult<()> {
            MockStats::bump(&stats.fence_waits);
            Ok(())
        };

        if !stats.skip_fence_waits.get() {
            self.slots.wait_current(wait)?;
        }

        if stats.acquire_out_of_date.take() {
            return Ok(AcquireOutcome::OutOfDate);
        }

        let image_index = self.next_image;
        self.next_image = (self.next_image + 1) % self.framebuffers.len() as u32;
        if !stats.skip_fence_waits.get() {
            self.slots.acquire_image(image_index as usize, wait)?;
        }

        Ok(AcquireOutcome::Acquired {
            image_index,
            suboptimal: false,
        })
    }

    fn submit_command_buffers(&mut self, _: vk::CommandBuffer, _: u32) -> VulkanResult<PresentOutcome> {
        self.slots.mark_submitted()?;
        MockStats::bump(&self.stats.submissions);
        let in_flight = self.slots.in_flight();
        if in_flight > self.stats.max_in_flight.get() {
            self.stats.max_in_flight.set(in_flight);
        }
        self.slots.advance();

        if self.stats.present_needs_recreate.take() {
            Ok(PresentOutcome::NeedsRecreate)
        } else {
            Ok(PresentOutcome::Presented)
        }
    }
}

impl Drop for MockChain {
    fn drop(&mut self) {
        MockStats::bump(&self.stats.chains_destroyed);
    }
}

/// Host memory standing in for a GPU buffer
pub struct MockBuffer {
    handle: vk::Buffer,
    size: vk::DeviceSize,
    data: RefCell<Vec<u8>>,
}

impl MockBuffer {
    /// Bytes currently held
    pub fn contents(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }
}

impl GpuBuffer for MockBuffer {
    fn handle(&self) -> vk::Buffer {
        self.handle
    }

    fn size(&self) -> vk::DeviceSize {
        self.size
    }

    fn write_bytes(&self, bytes: &[u8]) -> VulkanResult<()> {
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: "write exceeds buffer size".to_string(),
            });
        }
        self.data.borrow_mut()[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// Pipeline layout handle
pub struct MockLayout(vk::PipelineLayout);

impl LayoutHandle for MockLayout {
    fn handle(&self) -> vk::PipelineLayout {
        self.0
    }
}

/// Pipeline handle
pub struct MockPipeline(vk::Pipeline);

impl PipelineHandle for MockPipeline {
    fn handle(&self) -> vk::Pipeline {
        self.0
    }
}

/// Backend implementing every seam without a device
pub struct MockBackend {
    commands: MockCommands,
    stats: Rc<MockStats>,
    image_format: Cell<vk::Format>,
    depth_format: Cell<vk::Format>,
    image_count: Cell<usize>,
}

impl MockBackend {
    /// Three images, B8G8R8A8_SRGB color and D32_SFLOAT depth
    pub fn new() -> Self {
        Self {
            commands: MockCommands::default(),
            stats: Rc::new(MockStats::default()),
            image_format: Cell::new(vk::Format::B8G8R8A8_SRGB),
            depth_format: Cell::new(vk::Format::D32_SFLOAT),
            image_count: Cell::new(3),
        }
    }

    /// Formats used by chains created from now on
    pub fn set_formats(&self, image: vk::Format, depth: vk::Format) {
        self.image_format.set(image);
        self.depth_format.set(depth);
    }

    /// Image count used by chains created from now on
    pub fn set_image_count(&self, count: usize) {
        self.image_count.set(count);
    }

    /// Chains stop waiting on frame fences before reusing a slot
    pub fn skip_fence_waits(&self) {
        self.stats.skip_fence_waits.set(true);
    }

    /// The next acquire reports the surface out of date
    pub fn set_acquire_out_of_date(&self) {
        self.stats.acquire_out_of_date.set(true);
    }

    /// The next present reports the surface suboptimal
    pub fn set_present_needs_recreate(&self) {
        self.stats.present_needs_recreate.set(true);
    }

    /// The next chain creation fails
    pub fn fail_next_chain(&self) {
        self.stats.fail_next_chain.set(true);
    }

    /// Shader words that pass validation
    pub fn shaders(&self) -> ShaderSources {
        ShaderSources {
            vertex: vec![0x0723_0203, 0x0001_0000],
            fragment: vec![0x0723_0203, 0x0001_0000],
        }
    }

    pub fn chains_created(&self) -> usize {
        self.stats.chains_created.get()
    }

    pub fn chains_destroyed(&self) -> usize {
        self.stats.chains_destroyed.get()
    }

    pub fn command_buffers_allocated(&self) -> usize {
        self.stats.command_buffers_allocated.get()
    }

    pub fn freed_command_buffers(&self) -> Vec<vk::CommandBuffer> {
        self.stats.freed.borrow().clone()
    }

    pub fn fence_waits(&self) -> usize {
        self.stats.fence_waits.get()
    }

    pub fn submissions(&self) -> usize {
        self.stats.submissions.get()
    }

    pub fn max_in_flight(&self) -> usize {
        self.stats.max_in_flight.get()
    }

    pub fn buffers_created(&self) -> usize {
        self.stats.buffers_created.get()
    }

    pub fn copies(&self) -> Vec<vk::DeviceSize> {
        self.stats.copies.borrow().clone()
    }

    pub fn pipelines_created(&self) -> usize {
        self.stats.pipelines_created.get()
    }

    pub fn layouts_created(&self) -> usize {
        self.stats.layouts_created.get()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBackend for MockBackend {
    type Chain = MockChain;
    type Commands = MockCommands;

    fn commands(&self) -> &MockCommands {
        &self.commands
    }

    fn create_swap_chain(
        &self,
        extent: vk::Extent2D,
        _previous: Option<&MockChain>,
        frames_in_flight: usize,
    ) -> VulkanResult<MockChain> {
        if self.stats.fail_next_chain.take() {
            return Err(VulkanError::Api(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
        }

        let image_count = self.image_count.get();
        MockStats::bump(&self.stats.chains_created);
        Ok(MockChain {
            stats: Rc::clone(&self.stats),
            extent,
            image_format: self.image_format.get(),
            depth_format: self.depth_format.get(),
            render_pass: vk::RenderPass::from_raw(self.stats.handle()),
            framebuffers: (0..image_count)
                .map(|_| vk::Framebuffer::from_raw(self.stats.handle()))
                .collect(),
            slots: FrameSlots::new(frames_in_flight, image_count),
            next_image: 0,
        })
    }

    fn allocate_command_buffers(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let buffers: Vec<_> = (0..count)
            .map(|_| vk::CommandBuffer::from_raw(self.stats.handle()))
            .collect();
        let allocated = &self.stats.command_buffers_allocated;
        allocated.set(allocated.get() + buffers.len());
        Ok(buffers)
    }

    fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        self.stats.freed.borrow_mut().extend_from_slice(command_buffers);
    }

    fn wait_idle(&self) -> VulkanResult<()> {
        Ok(())
    }
}

impl DeviceMemory for MockBackend {
    type Buffer = MockBuffer;

    fn create_buffer(
        &self,
        size: vk::DeviceSize,
        _usage: vk::BufferUsageFlags,
        _properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<MockBuffer> {
        MockStats::bump(&self.stats.buffers_created);
        Ok(MockBuffer {
            handle: vk::Buffer::from_raw(self.stats.handle()),
            size,
            data: RefCell::new(vec![0; size as usize]),
        })
    }

    fn copy_buffer(&self, src: &MockBuffer, dst: &MockBuffer, size: vk::DeviceSize) -> VulkanResult<()> {
        self.stats.copies.borrow_mut().push(size);
        let len = size as usize;
        dst.data.borrow_mut()[..len].copy_from_slice(&src.data.borrow()[..len]);
        Ok(())
    }
}

impl PipelineFactory for MockBackend {
    type Layout = MockLayout;
    type Pipeline = MockPipeline;

    fn create_pipeline_layout(&self, _: &[vk::PushConstantRange]) -> VulkanResult<MockLayout> {
        MockStats::bump(&self.stats.layouts_created);
        Ok(MockLayout(vk::PipelineLayout::from_raw(self.stats.handle())))
    }

    fn create_graphics_pipeline(
        &self,
        _shaders: &ShaderSources,
        config: &PipelineConfigInfo,
    ) -> VulkanResult<MockPipeline> {
        config.validate()?;
        MockStats::bump(&self.stats.pipelines_created);
        Ok(MockPipeline(vk::Pipeline::from_raw(self.stats.handle())))
    }
}

/// Window whose size and events are scripted by the test
pub struct MockWindow {
    extent: vk::Extent2D,
    resized: bool,
    after_wait: VecDeque<vk::Extent2D>,
    waits: usize,
}

impl MockWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            extent: vk::Extent2D { width, height },
            resized: false,
            after_wait: VecDeque::new(),
            waits: 0,
        }
    }

    /// Resize immediately, as a framebuffer size event would
    pub fn resize(&mut self, width: u32, height: u32) {
        self.extent = vk::Extent2D { width, height };
        self.resized = true;
    }

    /// Size reported after the next `wait_events`
    pub fn queue_extent_after_wait(&mut self, width: u32, height: u32) {
        self.after_wait.push_back(vk::Extent2D { width, height });
    }

    pub fn waits(&self) -> usize {
        self.waits
    }
}

impl PresentationWindow for MockWindow {
    fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    fn was_resized(&self) -> bool {
        self.resized
    }

    fn reset_resized_flag(&mut self) {
        self.resized = false;
    }

    fn wait_events(&mut self) {
        self.waits += 1;
        if let Some(extent) = self.after_wait.pop_front() {
            self.resize(extent.width, extent.height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_moves_staged_bytes() {
        let backend = MockBackend::new();
        let staging = backend
            .create_buffer(4, vk::BufferUsageFlags::TRANSFER_SRC, vk::MemoryPropertyFlags::HOST_VISIBLE)
            .unwrap();
        let target = backend
            .create_buffer(4, vk::BufferUsageFlags::TRANSFER_DST, vk::MemoryPropertyFlags::DEVICE_LOCAL)
            .unwrap();

        staging.write_bytes(&[1, 2, 3, 4]).unwrap();
        backend.copy_buffer(&staging, &target, 4).unwrap();
        assert_eq!(target.contents(), vec![1, 2, 3, 4]);
        assert!(staging.write_bytes(&[0; 5]).is_err());
    }
}
