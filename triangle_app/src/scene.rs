//! Demo scene: one flat-colored Sierpinski triangle

use std::rc::Rc;

use frame_engine::foundation::math::constants::TWO_PI;
use frame_engine::prelude::*;
use frame_engine::render::api::DeviceMemory;
use frame_engine::render::VulkanResult;

const RED: [f32; 3] = [1.0, 0.0, 0.0];
const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
const BLUE: [f32; 3] = [0.0, 0.0, 1.0];

/// Subdivide a triangle `depth` times and return the corner triangles
///
/// Corner triangles are emitted top first, then right, then left. Each leaf
/// is emitted as its top, right, left vertices with red, green and blue
/// colors, so depth 0 yields the plain RGB triangle.
pub fn sierpinski(depth: u32, left: Vec2, right: Vec2, top: Vec2) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity(3 * 3usize.pow(depth));
    subdivide(&mut vertices, depth, left, right, top);
    vertices
}

fn subdivide(out: &mut Vec<Vertex>, depth: u32, left: Vec2, right: Vec2, top: Vec2) {
    if depth == 0 {
        out.push(Vertex::new([top.x, top.y], RED));
        out.push(Vertex::new([right.x, right.y], GREEN));
        out.push(Vertex::new([left.x, left.y], BLUE));
        return;
    }

    let left_top = (left + top) * 0.5;
    let right_top = (right + top) * 0.5;
    let left_right = (left + right) * 0.5;
    subdivide(out, depth - 1, left_top, right_top, top);
    subdivide(out, depth - 1, left_right, right, right_top);
    subdivide(out, depth - 1, left, left_top, left_right);
}

/// Transform of the demo triangle: stretched along x, then a quarter turn
pub fn triangle_transform() -> Transform2d {
    Transform2d {
        translation: Vec2::new(0.2, 0.0),
        scale: Vec2::new(1.5, 1.0),
        rotation: 0.25 * TWO_PI,
    }
}

/// Upload the demo geometry and build the scene's objects
pub fn load_game_objects<D: DeviceMemory>(
    device: &D,
    ids: &mut GameObjectIdCounter,
) -> VulkanResult<Vec<GameObject<D::Buffer>>> {
    let vertices = sierpinski(0, Vec2::new(-0.5, 0.5), Vec2::new(0.5, 0.5), Vec2::new(0.0, -0.5));
    let model = Rc::new(Model::new(device, &ModelBuilder::from_vertices(vertices))?);

    let mut triangle = GameObject::new(ids).ok_or_else(|| VulkanError::InvalidOperation {
        reason: "Game object ids exhausted".to_string(),
    })?;
    triangle.model = Some(model);
    triangle.color = Vec3::new(0.1, 0.8, 0.1);
    triangle.transform_2d = triangle_transform();

    Ok(vec![triangle])
}
