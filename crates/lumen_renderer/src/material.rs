//! Surface reflectance for shaded renders.

use lumen_math::Vec3;
use serde::{Deserialize, Serialize};

/// Color type alias (RGB values typically 0-1)
pub type Color = Vec3;

/// A simple Lambertian material with an ambient term.
///
/// Applies to the whole attached mesh. Values outside `[0, 1]` are allowed;
/// they clamp when the shaded color is quantized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
}

impl Material {
    /// Create a material from ambient and diffuse reflectance.
    pub fn new(ambient: Color, diffuse: Color) -> Self {
        Self {
            ambient: ambient.to_array(),
            diffuse: diffuse.to_array(),
        }
    }

    /// Color of a surface point lit by a point light.
    ///
    /// `normal` must face the viewer and `to_light` must be unit length.
    #[inline]
    pub fn shade(&self, normal: Vec3, to_light: Vec3) -> Color {
        let lambert = normal.dot(to_light).max(0.0);
        Color::from(self.ambient) + Color::from(self.diffuse) * lambert
    }
}

impl Default for Material {
    /// Neutral gray.
    fn default() -> Self {
        Self {
            ambient: [0.2; 3],
            diffuse: [0.7; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shade_head_on_is_ambient_plus_diffuse() {
        let m = Material::default();
        let c = m.shade(Vec3::Z, Vec3::Z);
        assert!((c - Color::splat(0.9)).length() < 1e-6);
    }

    #[test]
    fn test_shade_grazing_or_behind_is_ambient_only() {
        let m = Material::new(Color::new(0.2, 0.0, 0.0), Color::new(0.7, 0.0, 0.0));

        assert_eq!(m.shade(Vec3::Z, Vec3::X), Color::new(0.2, 0.0, 0.0));
        assert_eq!(m.shade(Vec3::Z, Vec3::NEG_Z), Color::new(0.2, 0.0, 0.0));
    }

    #[test]
    fn test_out_of_range_values_are_kept() {
        let m = Material::new(Color::splat(-0.5), Color::splat(3.0));
        assert_eq!(m.ambient, [-0.5; 3]);
        assert_eq!(m.diffuse, [3.0; 3]);
    }
}
