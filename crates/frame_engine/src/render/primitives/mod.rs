//! Renderable geometry

pub mod model;

pub use model::{Model, ModelBuilder, Vertex};
