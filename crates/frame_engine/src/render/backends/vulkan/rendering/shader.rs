//! Shader management
//!
//! SPIR-V loading and validation plus RAII shader modules

use std::io::Cursor;
use std::path::Path;

use ash::{vk, Device};

use crate::core::config::ShaderConfig;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Validate SPIR-V bytecode and convert it to words
///
/// The byte length must be a non-zero multiple of four and the first word
/// must be the SPIR-V magic number in either byte order.
pub fn parse_spirv(bytes: &[u8]) -> VulkanResult<Vec<u32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(VulkanError::InvalidShader {
            reason: format!("byte length {} is not a non-zero multiple of 4", bytes.len()),
        });
    }

    let words = ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|e| VulkanError::InvalidShader {
        reason: e.to_string(),
    })?;

    match words.first() {
        Some(&SPIRV_MAGIC) => Ok(words),
        Some(&other) if other.swap_bytes() == SPIRV_MAGIC => Ok(words),
        _ => Err(VulkanError::InvalidShader {
            reason: "missing SPIR-V magic number".to_string(),
        }),
    }
}

/// Validated vertex and fragment bytecode for one pipeline
#[derive(Debug, Clone)]
pub struct ShaderSources {
    /// Vertex stage words
    pub vertex: Vec<u32>,
    /// Fragment stage words
    pub fragment: Vec<u32>,
}

impl ShaderSources {
    /// Validate in-memory bytecode for both stages
    pub fn from_bytes(vertex: &[u8], fragment: &[u8]) -> VulkanResult<Self> {
        Ok(Self {
            vertex: parse_spirv(vertex)?,
            fragment: parse_spirv(fragment)?,
        })
    }

    /// Read and validate the files named by the shader configuration
    pub fn load(config: &ShaderConfig) -> VulkanResult<Self> {
        let vertex = read_file(&config.vertex_shader_path)?;
        let fragment = read_file(&config.fragment_shader_path)?;
        log::debug!(
            "Loaded shaders {} ({} bytes) and {} ({} bytes)",
            config.vertex_shader_path,
            vertex.len(),
            config.fragment_shader_path,
            fragment.len()
        );
        Self::from_bytes(&vertex, &fragment)
    }
}

fn read_file(path: impl AsRef<Path>) -> VulkanResult<Vec<u8>> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|source| VulkanError::ShaderLoad {
        path: path.display().to_string(),
        source,
    })
}

/// Shader module wrapper with RAII cleanup
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create shader module from validated SPIR-V words
    pub fn new(device: Device, code: &[u32]) -> VulkanResult<Self> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(code);

        let module = unsafe {
            device
                .create_shader_module(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, module })
    }

    /// Get shader module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// Create shader stage create info
    pub fn stage_info(
        &self,
        stage: vk::ShaderStageFlags,
        entry_point: &std::ffi::CStr,
    ) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(entry_point)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
