//! Pipeline configuration
//!
//! A plain record of fixed-function state with a default builder. The render
//! pass and layout handles are filled in by the draw system that owns them.

use ash::vk;

use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Face culling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    /// No culling
    #[default]
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    Back,
}

impl CullMode {
    /// Convert to Vulkan flags
    pub fn to_vk(self) -> vk::CullModeFlags {
        match self {
            CullMode::None => vk::CullModeFlags::NONE,
            CullMode::Front => vk::CullModeFlags::FRONT,
            CullMode::Back => vk::CullModeFlags::BACK,
        }
    }
}

/// Fixed-function state for one graphics pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfigInfo {
    /// Primitive topology
    pub topology: vk::PrimitiveTopology,
    /// Enable primitive restart
    pub primitive_restart: bool,
    /// Polygon fill mode
    pub polygon_mode: vk::PolygonMode,
    /// Face culling
    pub cull_mode: CullMode,
    /// Winding order of front faces
    pub front_face: vk::FrontFace,
    /// Rasterized line width
    pub line_width: f32,
    /// Samples per pixel
    pub rasterization_samples: vk::SampleCountFlags,
    /// Enable depth testing
    pub depth_test: bool,
    /// Enable depth writing
    pub depth_write: bool,
    /// Depth comparison
    pub depth_compare_op: vk::CompareOp,
    /// Enable color blending on the single attachment
    pub blend_enable: bool,
    /// Source color blend factor
    pub src_color_blend_factor: vk::BlendFactor,
    /// Destination color blend factor
    pub dst_color_blend_factor: vk::BlendFactor,
    /// Color blend operation
    pub color_blend_op: vk::BlendOp,
    /// States supplied at record time
    pub dynamic_states: Vec<vk::DynamicState>,
    /// Render pass the pipeline is compatible with
    pub render_pass: vk::RenderPass,
    /// Subpass index within the render pass
    pub subpass: u32,
    /// Layout describing push constants and descriptor sets
    pub pipeline_layout: vk::PipelineLayout,
}

impl PipelineConfigInfo {
    /// Triangle lists, no culling, depth test LESS, no blending, dynamic viewport and scissor
    pub fn default_config() -> Self {
        Self {
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            primitive_restart: false,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: CullMode::None,
            front_face: vk::FrontFace::CLOCKWISE,
            line_width: 1.0,
            rasterization_samples: vk::SampleCountFlags::TYPE_1,
            depth_test: true,
            depth_write: true,
            depth_compare_op: vk::CompareOp::LESS,
            blend_enable: false,
            src_color_blend_factor: vk::BlendFactor::ONE,
            dst_color_blend_factor: vk::BlendFactor::ZERO,
            color_blend_op: vk::BlendOp::ADD,
            dynamic_states: vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR],
            render_pass: vk::RenderPass::null(),
            subpass: 0,
            pipeline_layout: vk::PipelineLayout::null(),
        }
    }

    /// Target a render pass
    pub fn with_render_pass(mut self, render_pass: vk::RenderPass) -> Self {
        self.render_pass = render_pass;
        self
    }

    /// Use a pipeline layout
    pub fn with_layout(mut self, layout: vk::PipelineLayout) -> Self {
        self.pipeline_layout = layout;
        self
    }

    /// Set face culling
    pub fn with_cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    /// Standard source-alpha blending
    pub fn with_alpha_blending(mut self) -> Self {
        self.blend_enable = true;
        self.src_color_blend_factor = vk::BlendFactor::SRC_ALPHA;
        self.dst_color_blend_factor = vk::BlendFactor::ONE_MINUS_SRC_ALPHA;
        self.color_blend_op = vk::BlendOp::ADD;
        self
    }

    /// Check that the handles a pipeline needs were provided
    pub fn validate(&self) -> VulkanResult<()> {
        if self.render_pass == vk::RenderPass::null() {
            return Err(VulkanError::InvalidOperation {
                reason: "Cannot create pipeline: no render pass provided in config".to_string(),
            });
        }
        if self.pipeline_layout == vk::PipelineLayout::null() {
            return Err(VulkanError::InvalidOperation {
                reason: "Cannot create pipeline: no pipeline layout provided in config".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for PipelineConfigInfo {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_default_config_values() {
        let config = PipelineConfigInfo::default_config();
        assert_eq!(config.topology, vk::PrimitiveTopology::TRIANGLE_LIST);
        assert_eq!(config.cull_mode.to_vk(), vk::CullModeFlags::NONE);
        assert_eq!(config.depth_compare_op, vk::CompareOp::LESS);
        assert!(!config.blend_enable);
        assert_eq!(
            config.dynamic_states,
            vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR]
        );
    }

    #[test]
    fn test_missing_handles_rejected() {
        let config = PipelineConfigInfo::default_config();
        assert!(matches!(config.validate(), Err(VulkanError::InvalidOperation { .. })));

        let config = config.with_render_pass(vk::RenderPass::from_raw(1));
        assert!(config.validate().is_err());

        let config = config.with_layout(vk::PipelineLayout::from_raw(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_alpha_blending_builder() {
        let config = PipelineConfigInfo::default_config()
            .with_alpha_blending()
            .with_cull_mode(CullMode::Back);
        assert!(config.blend_enable);
        assert_eq!(config.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
        assert_eq!(config.cull_mode.to_vk(), vk::CullModeFlags::BACK);
    }
}
