//! Plain lighting values handed to shaders as uniforms.

use cgmath::Vector3;

/// Phong surface response.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub shininess: f32,
}

impl Default for Material {
    /// White, fully lit, moderately glossy.
    fn default() -> Self {
        Self {
            ambient: Vector3::new(1.0, 1.0, 1.0),
            diffuse: Vector3::new(1.0, 1.0, 1.0),
            specular: Vector3::new(0.5, 0.5, 0.5),
            shininess: 32.0,
        }
    }
}

/// A point light with separate colour channels per Phong term.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub position: Vector3<f32>,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vector3::new(5.0, -0.3, 5.0),
            ambient: Vector3::new(0.2, 0.2, 0.2),
            diffuse: Vector3::new(1.0, 1.0, 1.0),
            specular: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}
