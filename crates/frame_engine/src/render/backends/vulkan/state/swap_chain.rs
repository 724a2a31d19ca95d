//! Swap chain management
//!
//! A [`SwapChain`] owns everything whose lifetime follows the surface: the
//! presentable images and their views, per-image depth attachments and
//! framebuffers, the render pass and the per-slot synchronization objects.
//! Rebuilding hands the previous chain in as `old_swapchain` so the driver
//! can recycle its resources; the caller drops the previous chain afterwards.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};

use crate::render::api::{AcquireOutcome, PresentOutcome, SurfaceChain};
use crate::render::backends::vulkan::{
    DepthBuffer, FrameSlots, FrameSync, Framebuffer, RenderPass, VulkanContext, VulkanError, VulkanResult,
};

const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Swapchain handle plus the image views created for it
struct SwapchainImages {
    device: Device,
    loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    views: Vec<vk::ImageView>,
}

impl SwapchainImages {
    fn new(
        device: Device,
        loader: SwapchainLoader,
        create_info: &vk::SwapchainCreateInfoKHR,
    ) -> VulkanResult<Self> {
        let swapchain = unsafe { loader.create_swapchain(create_info, None).map_err(VulkanError::Api)? };

        // From here on Drop cleans up whatever was created
        let mut images = Self {
            device,
            loader,
            swapchain,
            views: Vec::new(),
        };

        let raw_images = unsafe {
            images
                .loader
                .get_swapchain_images(swapchain)
                .map_err(VulkanError::Api)?
        };

        for image in raw_images {
            let view_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(create_info.image_format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = unsafe {
                images
                    .device
                    .create_image_view(&view_info, None)
                    .map_err(VulkanError::Api)?
            };
            images.views.push(view);
        }

        Ok(images)
    }
}

impl Drop for SwapchainImages {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.views {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

/// Presentation chain bound to the context's surface
///
/// Fields are declared in destruction order: synchronization objects and
/// framebuffers go before the render pass and attachments they reference,
/// and the swapchain itself is destroyed last.
pub struct SwapChain {
    frame_syncs: Vec<FrameSync>,
    framebuffers: Vec<Framebuffer>,
    render_pass: RenderPass,
    #[allow(dead_code)] // must outlive the framebuffers
    depth_buffers: Vec<DepthBuffer>,
    images: SwapchainImages,
    slots: FrameSlots,
    device: Device,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    image_format: vk::Format,
    depth_format: vk::Format,
    extent: vk::Extent2D,
}

impl SwapChain {
    /// Build a chain for `window_extent`, retiring `previous` if given
    pub fn new(
        context: &VulkanContext,
        window_extent: vk::Extent2D,
        previous: Option<&SwapChain>,
        frames_in_flight: usize,
    ) -> VulkanResult<Self> {
        if frames_in_flight == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: "A swap chain needs at least one frame slot".to_string(),
            });
        }

        let physical = context.physical_device().device;
        let surface = context.surface();
        let surface_loader = context.surface_loader();

        let capabilities = unsafe {
            surface_loader
                .get_physical_device_surface_capabilities(physical, surface)
                .map_err(VulkanError::Api)?
        };
        let formats = unsafe {
            surface_loader
                .get_physical_device_surface_formats(physical, surface)
                .map_err(VulkanError::Api)?
        };
        let present_modes = unsafe {
            surface_loader
                .get_physical_device_surface_present_modes(physical, surface)
                .map_err(VulkanError::Api)?
        };

        let surface_format = choose_surface_format(&formats)?;
        let present_mode = choose_present_mode(&present_modes);
        let extent = choose_extent(&capabilities, window_extent);
        let image_count = choose_image_count(&capabilities);

        let (graphics_family, present_family) = context.queue_family_indices();
        let family_indices = [graphics_family, present_family];

        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(previous.map_or(vk::SwapchainKHR::null(), |chain| chain.images.swapchain));

        create_info = if graphics_family == present_family {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        } else {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices)
        };

        let device = context.raw_device();
        let images = SwapchainImages::new(device.clone(), context.swapchain_loader().clone(), &create_info)?;

        let depth_format = context.find_supported_format(
            &DEPTH_FORMAT_CANDIDATES,
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
        )?;

        let depth_buffers = images
            .views
            .iter()
            .map(|_| DepthBuffer::new(device.clone(), context.instance(), physical, extent, depth_format))
            .collect::<VulkanResult<Vec<_>>>()?;

        let render_pass = RenderPass::new_forward_pass(device.clone(), surface_format.format, depth_format)?;

        let framebuffers = images
            .views
            .iter()
            .zip(&depth_buffers)
            .map(|(&color_view, depth)| {
                Framebuffer::new(
                    device.clone(),
                    render_pass.handle(),
                    &[color_view, depth.image_view()],
                    extent,
                )
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        let frame_syncs = (0..frames_in_flight)
            .map(|_| FrameSync::new(device.clone()))
            .collect::<VulkanResult<Vec<_>>>()?;

        log::info!(
            "Swap chain ready: {}x{}, {} images, color {:?}, depth {:?}, {:?}",
            extent.width,
            extent.height,
            images.views.len(),
            surface_format.format,
            depth_format,
            present_mode
        );

        Ok(Self {
            slots: FrameSlots::new(frames_in_flight, images.views.len()),
            frame_syncs,
            framebuffers,
            render_pass,
            depth_buffers,
            images,
            device,
            graphics_queue: context.graphics_queue(),
            present_queue: context.present_queue(),
            image_format: surface_format.format,
            depth_format,
            extent,
        })
    }
}

impl SurfaceChain for SwapChain {
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
        self.images.views.len()
    }

    fn render_pass(&self) -> vk::RenderPass {
        self.render_pass.handle()
    }

    fn framebuffer(&self, image_index: u32) -> VulkanResult<vk::Framebuffer> {
        self.framebuffers
            .get(image_index as usize)
            .map(Framebuffer::handle)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("No framebuffer for image {image_index}"),
            })
    }

    fn acquire_next_image(&mut self) -> VulkanResult<AcquireOutcome> {
        let frame_syncs = &self.frame_syncs;
        let slot = self
            .slots
            .wait_current(|slot| frame_syncs[slot].in_flight.wait(u64::MAX))?;

        let acquired = unsafe {
            self.images.loader.acquire_next_image(
                self.images.swapchain,
                u64::MAX,
                frame_syncs[slot].image_available.handle(),
                vk::Fence::null(),
            )
        };

        let (image_index, suboptimal) = match acquired.map_err(VulkanError::Api) {
            Ok(result) => result,
            Err(e) if e.is_out_of_date() => return Ok(AcquireOutcome::OutOfDate),
            Err(e) => return Err(e),
        };

        // Another slot may still be rendering into this image
        self.slots
            .acquire_image(image_index as usize, |owner| frame_syncs[owner].in_flight.wait(u64::MAX))?;

        Ok(AcquireOutcome::Acquired { image_index, suboptimal })
    }

    fn submit_command_buffers(
        &mut self,
        command_buffer: vk::CommandBuffer,
        image_index: u32,
    ) -> VulkanResult<PresentOutcome> {
        let sync = &self.frame_syncs[self.slots.current()];
        self.slots.mark_submitted()?;
        sync.in_flight.reset()?;

        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [sync.render_finished.handle()];
        let command_buffers = [command_buffer];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .queue_submit(self.graphics_queue, &[submit_info.build()], sync.in_flight.handle())
                .map_err(VulkanError::Api)?;
        }

        let swapchains = [self.images.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let presented = unsafe { self.images.loader.queue_present(self.present_queue, &present_info) };
        self.slots.advance();

        match presented.map_err(VulkanError::Api) {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::NeedsRecreate),
            Err(e) if e.is_out_of_date() => Ok(PresentOutcome::NeedsRecreate),
            Err(e) => Err(e),
        }
    }
}

/// Prefer B8G8R8A8_SRGB with sRGB non-linear, else the first reported format
fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> VulkanResult<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|sf| sf.format == vk::Format::B8G8R8A8_SRGB && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| formats.first().copied())
        .ok_or_else(|| VulkanError::InitializationFailed("Surface reports no formats".to_string()))
}

/// Mailbox when available, otherwise FIFO which is always supported
fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, window_extent: vk::Extent2D) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: window_extent
            .width
            .clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
        height: window_extent
            .height
            .clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
    }
}

fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    #[test]
    fn test_prefers_srgb_bgra() {
        let formats = [
            surface_format(vk::Format::R8G8B8A8_UNORM),
            surface_format(vk::Format::B8G8R8A8_SRGB),
        ];
        assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::B8G8R8A8_SRGB);

        let fallback = [surface_format(vk::Format::R8G8B8A8_UNORM)];
        assert_eq!(choose_surface_format(&fallback).unwrap().format, vk::Format::R8G8B8A8_UNORM);

        assert!(choose_surface_format(&[]).is_err());
    }

    #[test]
    fn test_present_mode_fallback() {
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX]),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::IMMEDIATE]),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn test_extent_uses_surface_or_clamps_window() {
        let mut caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: 640, height: 480 },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 1920, height: 1080 },
            ..Default::default()
        };
        let window = vk::Extent2D { width: 4000, height: 300 };
        let extent = choose_extent(&caps, window);
        assert_eq!((extent.width, extent.height), (640, 480));

        caps.current_extent.width = u32::MAX;
        let extent = choose_extent(&caps, window);
        assert_eq!((extent.width, extent.height), (1920, 300));
    }

    #[test]
    fn test_image_count_respects_maximum() {
        let mut caps = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&caps), 3);

        caps.max_image_count = 2;
        assert_eq!(choose_image_count(&caps), 2);
    }
}
