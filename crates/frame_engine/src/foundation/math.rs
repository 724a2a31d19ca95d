//! Math utilities and types
//!
//! The renderer works in 2D normalized device coordinates, so only the
//! small vector and matrix types are needed.

pub use nalgebra::{Matrix2, Vector2, Vector3};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type, also used for RGB colors
pub type Vec3 = Vector3<f32>;

/// 2x2 matrix type
pub type Mat2 = Matrix2<f32>;

/// Math constants
pub mod constants {
    /// Pi
    pub const PI: f32 = std::f32::consts::PI;
    /// Two Pi, one full turn in radians
    pub const TWO_PI: f32 = std::f32::consts::TAU;
}

/// Column-major array layout of a 2x2 matrix, matching GLSL `mat2`
pub fn mat2_to_cols(m: &Mat2) -> [[f32; 2]; 2] {
    [[m[(0, 0)], m[(1, 0)]], [m[(0, 1)], m[(1, 1)]]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mat2_to_cols_is_column_major() {
        // rows: [1 2; 3 4]
        let m = Mat2::new(1.0, 2.0, 3.0, 4.0);
        let cols = mat2_to_cols(&m);
        assert_relative_eq!(cols[0][0], 1.0);
        assert_relative_eq!(cols[0][1], 3.0);
        assert_relative_eq!(cols[1][0], 2.0);
        assert_relative_eq!(cols[1][1], 4.0);
    }
}
