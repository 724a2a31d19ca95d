//! Graphics pipeline configuration

pub mod pipeline_config;

pub use pipeline_config::{CullMode, PipelineConfigInfo};
