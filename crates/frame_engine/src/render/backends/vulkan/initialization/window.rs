//! Window management using GLFW
//!
//! Provides window creation, event pumping and Vulkan surface creation.
//! Framebuffer resizes are observed while pumping events and forwarded to
//! typed listeners registered with [`Window::on_framebuffer_resize`].

use std::collections::VecDeque;

use ash::vk;
use thiserror::Error;

use crate::core::config::WindowConfig;
use crate::render::api::PresentationWindow;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// The native window could not be created
    #[error("Window creation failed")]
    CreationFailed,

    /// Any other GLFW failure
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// Callback invoked with the new framebuffer width and height
pub type ResizeListener = Box<dyn FnMut(u32, u32)>;

/// Resize bookkeeping shared by the window and its listeners
#[derive(Default)]
pub struct ResizeTracker {
    resized: bool,
    last_size: Option<(u32, u32)>,
    listeners: Vec<ResizeListener>,
}

impl ResizeTracker {
    /// Create a tracker with no pending resize
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for future resizes
    pub fn subscribe(&mut self, listener: impl FnMut(u32, u32) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Record a framebuffer resize and notify listeners
    pub fn notify(&mut self, width: u32, height: u32) {
        log::debug!("Framebuffer resized to {}x{}", width, height);
        self.resized = true;
        self.last_size = Some((width, height));
        for listener in &mut self.listeners {
            listener(width, height);
        }
    }

    /// True when a resize happened since the last reset
    pub fn was_resized(&self) -> bool {
        self.resized
    }

    /// Clear the resized flag
    pub fn reset(&mut self) {
        self.resized = false;
    }

    /// Size reported by the most recent resize
    pub fn last_size(&self) -> Option<(u32, u32)> {
        self.last_size
    }
}

/// GLFW window wrapper configured for Vulkan rendering
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    resize: ResizeTracker,
    pending: VecDeque<glfw::WindowEvent>,
}

impl Window {
    /// Create a resizable window without a client API
    pub fn new(title: &str, width: u32, height: u32) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        if !glfw.vulkan_supported() {
            return Err(WindowError::GlfwError("Vulkan loader not found".to_string()));
        }

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        log::info!("Created window '{}' ({}x{})", title, width, height);

        Ok(Self {
            glfw,
            window,
            events,
            resize: ResizeTracker::new(),
            pending: VecDeque::new(),
        })
    }

    /// Create a window from configuration
    pub fn from_config(config: &WindowConfig) -> WindowResult<Self> {
        Self::new(&config.title, config.width, config.height)
    }

    /// Register a typed framebuffer resize listener
    pub fn on_framebuffer_resize(&mut self, listener: impl FnMut(u32, u32) + 'static) {
        self.resize.subscribe(listener);
    }

    /// Whether the user asked to close the window
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Request or cancel window closure
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Process pending events and return those not consumed by the window
    ///
    /// Framebuffer resizes are recorded before being handed back.
    pub fn poll_events(&mut self) -> Vec<glfw::WindowEvent> {
        self.glfw.poll_events();
        self.drain_events();
        self.pending.drain(..).collect()
    }

    fn drain_events(&mut self) {
        let events: Vec<_> = glfw::flush_messages(&self.events).map(|(_, event)| event).collect();
        for event in events {
            if let glfw::WindowEvent::FramebufferSize(width, height) = event {
                self.resize.notify(to_pixels(width), to_pixels(height));
            }
            self.pending.push_back(event);
        }
    }

    /// Current framebuffer size in pixels
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (to_pixels(width), to_pixels(height))
    }

    /// Get required Vulkan instance extensions from GLFW
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Failed to get required extensions".to_string()))
    }

    /// Create a Vulkan surface for this window
    pub fn create_vulkan_surface(&mut self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {result:?}")))
        }
    }
}

impl PresentationWindow for Window {
    fn extent(&self) -> vk::Extent2D {
        let (width, height) = self.framebuffer_size();
        vk::Extent2D { width, height }
    }

    fn was_resized(&self) -> bool {
        self.resize.was_resized()
    }

    fn reset_resized_flag(&mut self) {
        self.resize.reset();
    }

    fn wait_events(&mut self) {
        self.glfw.wait_events();
        self.drain_events();
    }
}

fn to_pixels(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}
