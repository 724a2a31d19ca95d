//! Flat-colored 2D draw system
//!
//! Owns one pipeline layout with a single push constant range and one
//! graphics pipeline built against the current swap chain render pass. For
//! each object with a model it pushes the object's transform and color, then
//! binds and draws the model.

use ash::vk;

use crate::foundation::math::mat2_to_cols;
use crate::render::api::{GpuBuffer, LayoutHandle, PassInfo, PipelineFactory, PipelineHandle, RenderCommands};
use crate::render::backends::vulkan::{ShaderSources, VulkanResult};
use crate::render::game_object::GameObject;
use crate::render::pipeline::PipelineConfigInfo;

/// Per-draw data matching the shaders' push constant block
///
/// `color` is a `vec3` and therefore starts on a 16 byte boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimplePushConstantData {
    /// Column-major rotation and scale
    pub transform: [[f32; 2]; 2],
    /// Translation
    pub offset: [f32; 2],
    _pad0: [f32; 2],
    /// Flat color
    pub color: [f32; 3],
    _pad1: f32,
}

unsafe impl bytemuck::Pod for SimplePushConstantData {}
unsafe impl bytemuck::Zeroable for SimplePushConstantData {}

impl SimplePushConstantData {
    /// Stages that read the block
    pub const STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
        vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw(),
    );

    /// Gather the push data for one object
    pub fn from_object<B: GpuBuffer>(object: &GameObject<B>) -> Self {
        let transform = &object.transform_2d;
        Self {
            transform: mat2_to_cols(&transform.mat2()),
            offset: [transform.translation.x, transform.translation.y],
            color: [object.color.x, object.color.y, object.color.z],
            ..Default::default()
        }
    }

    /// Push constant range covering the whole block
    pub fn range() -> vk::PushConstantRange {
        vk::PushConstantRange {
            stage_flags: Self::STAGES,
            offset: 0,
            size: std::mem::size_of::<Self>() as u32,
        }
    }
}

/// Draws [`GameObject`]s with the simple shader pair
///
/// The pipeline is tagged with the render pass epoch it was built for and is
/// rebuilt lazily when a frame reports a newer epoch.
pub struct SimpleRenderSystem<'a, F: PipelineFactory> {
    factory: &'a F,
    shaders: ShaderSources,
    pipeline: F::Pipeline,
    pipeline_layout: F::Layout,
    pipeline_epoch: u64,
}

impl<'a, F: PipelineFactory> SimpleRenderSystem<'a, F> {
    /// Create the layout and a pipeline for `pass`
    pub fn new(factory: &'a F, shaders: ShaderSources, pass: PassInfo) -> VulkanResult<Self> {
        let pipeline_layout = factory.create_pipeline_layout(&[SimplePushConstantData::range()])?;
        let pipeline = build_pipeline(factory, &shaders, pass.render_pass, pipeline_layout.handle())?;

        Ok(Self {
            factory,
            shaders,
            pipeline,
            pipeline_layout,
            pipeline_epoch: pass.epoch,
        })
    }

    /// Current pipeline handle
    pub fn pipeline_handle(&self) -> vk::Pipeline {
        self.pipeline.handle()
    }

    /// Render pass epoch the pipeline was built for
    pub fn pipeline_epoch(&self) -> u64 {
        self.pipeline_epoch
    }

    fn ensure_pipeline(&mut self, pass: PassInfo) -> VulkanResult<()> {
        if pass.epoch == self.pipeline_epoch {
            return Ok(());
        }

        log::info!(
            "Render pass formats changed (epoch {} -> {}), rebuilding pipeline",
            self.pipeline_epoch,
            pass.epoch
        );
        self.pipeline = build_pipeline(self.factory, &self.shaders, pass.render_pass, self.pipeline_layout.handle())?;
        self.pipeline_epoch = pass.epoch;
        Ok(())
    }

    /// Record draws for every object that has a model
    pub fn render_game_objects<C, B>(
        &mut self,
        commands: &C,
        command_buffer: vk::CommandBuffer,
        pass: PassInfo,
        objects: &[GameObject<B>],
    ) -> VulkanResult<()>
    where
        C: RenderCommands,
        B: GpuBuffer,
    {
        self.ensure_pipeline(pass)?;
        commands.bind_pipeline(command_buffer, self.pipeline.handle());

        for object in objects {
            let Some(model) = &object.model else {
                continue;
            };

            let push = SimplePushConstantData::from_object(object);
            commands.push_constants(
                command_buffer,
                self.pipeline_layout.handle(),
                SimplePushConstantData::STAGES,
                bytemuck::bytes_of(&push),
            );
            model.bind(commands, command_buffer);
            model.draw(commands, command_buffer);
        }

        Ok(())
    }
}

fn build_pipeline<F: PipelineFactory>(
    factory: &F,
    shaders: &ShaderSources,
    render_pass: vk::RenderPass,
    layout: vk::PipelineLayout,
) -> VulkanResult<F::Pipeline> {
    let config = PipelineConfigInfo::default_config()
        .with_render_pass(render_pass)
        .with_layout(layout);
    factory.create_graphics_pipeline(shaders, &config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants::TWO_PI;
    use crate::foundation::math::{Vec2, Vec3};
    use crate::render::api::mock::{MockBackend, MockBuffer, MockCommands, RecordedCommand};
    use crate::render::game_object::{GameObjectIdCounter, Transform2d};
    use crate::render::primitives::{Model, ModelBuilder, Vertex};
    use approx::assert_relative_eq;
    use ash::vk::Handle;
    use std::rc::Rc;

    const EPSILON: f32 = 1e-6;

    fn pass(epoch: u64) -> PassInfo {
        PassInfo {
            render_pass: vk::RenderPass::from_raw(7),
            epoch,
        }
    }

    fn triangle_object(backend: &MockBackend, ids: &mut GameObjectIdCounter) -> GameObject<MockBuffer> {
        let vertices = vec![
            Vertex::new([0.0, -0.5], [1.0, 0.0, 0.0]),
            Vertex::new([0.5, 0.5], [0.0, 1.0, 0.0]),
            Vertex::new([-0.5, 0.5], [0.0, 0.0, 1.0]),
        ];
        let model = Model::new(backend, &ModelBuilder::from_vertices(vertices)).unwrap();

        let mut object = GameObject::new(ids).unwrap();
        object.model = Some(Rc::new(model));
        object.color = Vec3::new(0.1, 0.8, 0.1);
        object.transform_2d = Transform2d {
            translation: Vec2::new(0.2, 0.0),
            scale: Vec2::new(1.5, 1.0),
            rotation: 0.25 * TWO_PI,
        };
        object
    }

    #[test]
    fn test_push_constant_layout() {
        assert_eq!(std::mem::size_of::<SimplePushConstantData>(), 48);
        assert_eq!(SimplePushConstantData::range().size, 48);
        assert_eq!(std::mem::offset_of!(SimplePushConstantData, offset), 16);
        assert_eq!(std::mem::offset_of!(SimplePushConstantData, color), 32);
    }

    #[test]
    fn test_triangle_scenario_records_one_draw() {
        let backend = MockBackend::new();
        let mut ids = GameObjectIdCounter::new();
        let object = triangle_object(&backend, &mut ids);

        let mut system = SimpleRenderSystem::new(&backend, backend.shaders(), pass(0)).unwrap();
        let commands = MockCommands::default();
        system
            .render_game_objects(&commands, vk::CommandBuffer::null(), pass(0), &[object])
            .unwrap();

        let log = commands.take();
        let draws: Vec<_> = log
            .iter()
            .filter(|c| matches!(c, RecordedCommand::Draw(_) | RecordedCommand::DrawIndexed(_)))
            .collect();
        assert_eq!(draws, vec![&RecordedCommand::Draw(3)]);

        let push = log
            .iter()
            .find_map(|c| match c {
                RecordedCommand::PushConstants(bytes) => Some(bytemuck::pod_read_unaligned::<SimplePushConstantData>(bytes)),
                _ => None,
            })
            .unwrap();
        assert_relative_eq!(push.transform[0][0], 0.0, epsilon = EPSILON);
        assert_relative_eq!(push.transform[0][1], 1.5, epsilon = EPSILON);
        assert_relative_eq!(push.transform[1][0], -1.0, epsilon = EPSILON);
        assert_relative_eq!(push.transform[1][1], 0.0, epsilon = EPSILON);
        assert_relative_eq!(push.offset[0], 0.2, epsilon = EPSILON);
        assert_relative_eq!(push.offset[1], 0.0, epsilon = EPSILON);
        assert_relative_eq!(push.color[1], 0.8, epsilon = EPSILON);
    }

    #[test]
    fn test_objects_without_model_are_skipped() {
        let backend = MockBackend::new();
        let mut ids = GameObjectIdCounter::new();
        let empty: GameObject<MockBuffer> = GameObject::new(&mut ids).unwrap();

        let mut system = SimpleRenderSystem::new(&backend, backend.shaders(), pass(0)).unwrap();
        let commands = MockCommands::default();
        system
            .render_game_objects(&commands, vk::CommandBuffer::null(), pass(0), &[empty])
            .unwrap();

        let log = commands.take();
        assert!(matches!(log.as_slice(), [RecordedCommand::BindPipeline(_)]));
    }

    #[test]
    fn test_pipeline_rebuilt_only_on_new_epoch() {
        let backend = MockBackend::new();
        let mut system = SimpleRenderSystem::new(&backend, backend.shaders(), pass(0)).unwrap();
        let original = system.pipeline_handle();
        let commands = MockCommands::default();
        let objects: [GameObject<MockBuffer>; 0] = [];

        system
            .render_game_objects(&commands, vk::CommandBuffer::null(), pass(0), &objects)
            .unwrap();
        assert_eq!(system.pipeline_handle(), original);
        assert_eq!(backend.pipelines_created(), 1);

        system
            .render_game_objects(&commands, vk::CommandBuffer::null(), pass(1), &objects)
            .unwrap();
        assert_ne!(system.pipeline_handle(), original);
        assert_eq!(system.pipeline_epoch(), 1);
        assert_eq!(backend.pipelines_created(), 2);
        assert_eq!(backend.layouts_created(), 1);
    }
}
