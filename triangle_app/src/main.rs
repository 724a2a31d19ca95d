//! Triangle demo
//!
//! Opens a window and draws a single flat-colored triangle every frame.
//! Settings are read from `frame_engine.toml` in the working directory when
//! it exists. Press Escape to quit.

mod scene;

use std::{env, process};

use env_logger::Env;
use frame_engine::prelude::*;
use frame_engine::render::{WindowError, VulkanResult};
use glfw::{Action, Key, WindowEvent};
use log::LevelFilter;

const CONFIG_PATH: &str = "frame_engine.toml";

/// Errors that end the demo
#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),
}

fn main() {
    let level_from_env = init_logging();

    let result = ApplicationConfig::load_or_default(CONFIG_PATH)
        .map_err(AppError::from)
        .and_then(|config| {
            if !level_from_env {
                apply_log_level(&config.engine.log_level);
            }
            run(config)
        });

    if let Err(e) = result {
        match &e {
            AppError::Vulkan(vulkan) if vulkan.is_device_lost() => {
                log::error!("GPU device lost, cannot recover: {e}");
            }
            _ => log::error!("{e}"),
        }
        process::exit(1);
    }
}

/// Start logging before the config is read; returns true when `RUST_LOG` set the filter
fn init_logging() -> bool {
    let level_from_env = env::var_os("RUST_LOG").is_some();
    env_logger::Builder::from_env(Env::default().default_filter_or("trace")).init();
    if !level_from_env {
        log::set_max_level(LevelFilter::Info);
    }
    level_from_env
}

fn apply_log_level(level: &str) {
    match level.parse::<LevelFilter>() {
        Ok(filter) => log::set_max_level(filter),
        Err(_) => log::warn!("Unknown log level {level:?} in config, keeping the current level"),
    }
}

fn run(config: ApplicationConfig) -> Result<(), AppError> {
    config.validate()?;

    let mut window = Window::from_config(&config.window)?;
    window.on_framebuffer_resize(|width, height| log::info!("Window resized to {width}x{height}"));

    let context = VulkanContext::new(&mut window, &config.renderer)?;
    let mut renderer = Renderer::new(&context, &mut window, &config.renderer)?;

    let shaders = ShaderSources::load(&config.renderer.shaders)?;
    let mut render_system = SimpleRenderSystem::new(&context, shaders, renderer.pass_info()?)?;

    let mut ids = GameObjectIdCounter::new();
    let game_objects = scene::load_game_objects(&context, &mut ids)?;
    log::info!("Scene ready with {} object(s)", game_objects.len());

    let result = run_loop(&mut window, &mut renderer, &mut render_system, &game_objects);

    // GPU work must drain before buffers and pipelines go out of scope
    context.wait_idle()?;
    result.map_err(AppError::from)
}

fn run_loop(
    window: &mut Window,
    renderer: &mut Renderer<'_, VulkanContext>,
    render_system: &mut SimpleRenderSystem<'_, VulkanContext>,
    game_objects: &[GameObject],
) -> VulkanResult<()> {
    while !window.should_close() {
        for event in window.poll_events() {
            if let WindowEvent::Key(Key::Escape, _, Action::Press, _) = event {
                window.set_should_close(true);
            }
        }

        let Some(command_buffer) = renderer.begin_frame(window)? else {
            continue;
        };
        renderer.begin_swap_chain_render_pass(command_buffer)?;
        render_system.render_game_objects(renderer.commands(), command_buffer, renderer.pass_info()?, game_objects)?;
        renderer.end_swap_chain_render_pass(command_buffer)?;
        renderer.end_frame(window)?;
    }

    log::info!("Window closed, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_level_caps_logging() {
        apply_log_level("warn");
        assert_eq!(log::max_level(), LevelFilter::Warn);

        // Unknown names leave the previous cap in place
        apply_log_level("loud");
        assert_eq!(log::max_level(), LevelFilter::Warn);

        apply_log_level("debug");
        assert_eq!(log::max_level(), LevelFilter::Debug);
    }
}
