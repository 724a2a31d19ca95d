//! Drawable objects
//!
//! A [`GameObject`] pairs an optional shared [`Model`] with a color and a 2D
//! transform. Ids come from a caller-owned [`GameObjectIdCounter`] so that
//! independent scenes never share an id space through global state.

use std::rc::Rc;

use crate::foundation::math::{Mat2, Vec2, Vec3};
use crate::render::api::GpuBuffer;
use crate::render::backends::vulkan::Buffer;
use crate::render::primitives::Model;

/// Translation, per-axis scale and rotation in the plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2d {
    /// Offset added after rotation and scale
    pub translation: Vec2,
    /// Per-axis scale, applied first
    pub scale: Vec2,
    /// Counter-clockwise rotation in radians, applied after scale
    pub rotation: f32,
}

impl Transform2d {
    /// Linear part of the transform: rotation composed with scale
    pub fn mat2(&self) -> Mat2 {
        let (s, c) = self.rotation.sin_cos();
        let rotation = Mat2::new(c, -s, s, c);
        let scale = Mat2::new(self.scale.x, 0.0, 0.0, self.scale.y);
        rotation * scale
    }
}

impl Default for Transform2d {
    fn default() -> Self {
        Self {
            translation: Vec2::zeros(),
            scale: Vec2::new(1.0, 1.0),
            rotation: 0.0,
        }
    }
}

/// Identifier of a [`GameObject`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameObjectId(pub u64);

/// Monotonic id source owned by whoever creates objects
///
/// Ids are never handed out twice; once `u64::MAX` has been issued the
/// counter is exhausted and returns `None`.
#[derive(Debug)]
pub struct GameObjectIdCounter {
    next: Option<u64>,
}

impl GameObjectIdCounter {
    /// Start counting from zero
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Start counting from `first`
    pub const fn starting_at(first: u64) -> Self {
        Self { next: Some(first) }
    }

    /// Hand out the next id, or `None` once every id was used
    pub fn next_id(&mut self) -> Option<GameObjectId> {
        let id = self.next?;
        self.next = id.checked_add(1);
        Some(GameObjectId(id))
    }
}

impl Default for GameObjectIdCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Something the simple render system can draw
pub struct GameObject<B: GpuBuffer = Buffer> {
    id: GameObjectId,
    /// Shared geometry; objects without a model are skipped when drawing
    pub model: Option<Rc<Model<B>>>,
    /// Flat color pushed to the fragment shader
    pub color: Vec3,
    /// Placement in normalized device coordinates
    pub transform_2d: Transform2d,
}

impl<B: GpuBuffer> GameObject<B> {
    /// Create an empty object with the next id from `ids`
    ///
    /// Returns `None` when `ids` is exhausted.
    pub fn new(ids: &mut GameObjectIdCounter) -> Option<Self> {
        Some(Self {
            id: ids.next_id()?,
            model: None,
            color: Vec3::zeros(),
            transform_2d: Transform2d::default(),
        })
    }

    /// Stable identifier
    pub fn id(&self) -> GameObjectId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants::TWO_PI;
    use crate::render::api::mock::MockBuffer;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_identity_transform() {
        let m = Transform2d::default().mat2();
        assert_relative_eq!(m, Mat2::identity(), epsilon = EPSILON);
    }

    #[test]
    fn test_quarter_turn_after_scale() {
        let transform = Transform2d {
            translation: Vec2::new(0.2, 0.0),
            scale: Vec2::new(1.5, 1.0),
            rotation: 0.25 * TWO_PI,
        };
        let m = transform.mat2();

        // Column 0 is the image of x: scaled by 1.5, then rotated onto +y
        assert_relative_eq!(m[(0, 0)], 0.0, epsilon = EPSILON);
        assert_relative_eq!(m[(1, 0)], 1.5, epsilon = EPSILON);
        assert_relative_eq!(m[(0, 1)], -1.0, epsilon = EPSILON);
        assert_relative_eq!(m[(1, 1)], 0.0, epsilon = EPSILON);
    }

    #[test]
    fn test_ids_come_from_counter() {
        let mut ids = GameObjectIdCounter::new();
        let a: GameObject<MockBuffer> = GameObject::new(&mut ids).unwrap();
        let b: GameObject<MockBuffer> = GameObject::new(&mut ids).unwrap();
        assert_eq!(a.id(), GameObjectId(0));
        assert_eq!(b.id(), GameObjectId(1));
        assert!(a.model.is_none());

        let mut other_scene = GameObjectIdCounter::new();
        let c: GameObject<MockBuffer> = GameObject::new(&mut other_scene).unwrap();
        assert_eq!(c.id(), GameObjectId(0));
    }

    #[test]
    fn test_counter_never_wraps() {
        let mut ids = GameObjectIdCounter::starting_at(u64::MAX - 1);
        let a = ids.next_id().unwrap();
        let b = ids.next_id().unwrap();
        assert!(b > a);
        assert_eq!(b, GameObjectId(u64::MAX));

        assert_eq!(ids.next_id(), None);
        assert_eq!(ids.next_id(), None);
        let late: Option<GameObject<MockBuffer>> = GameObject::new(&mut ids);
        assert!(late.is_none());
    }
}
