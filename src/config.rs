//! Start-up configuration.
//!
//! Plain values with defaults; nothing here is global. Paths are relative to
//! the `assets` directory (see [`crate::resources`]).

use cgmath::{Deg, Point3, Vector3};

use crate::data_structures::{
    material::{Light, Material},
    texture::TextureRole,
};

/// Parameters of the terrain grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeneratorParams {
    /// Vertices per side. At least 2.
    pub resolution: u32,
    /// Edge length of the square terrain in world units.
    pub world_size: f32,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            resolution: 128,
            world_size: 200.0,
        }
    }
}

/// What the terrain is built from. An empty path skips that texture slot.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainParams {
    pub albedo_texture_path: String,
    pub normal_map_texture_path: String,
    pub roughness_map_texture_path: String,
    pub emission_map_texture_path: String,
    /// WGSL override; the built-in terrain shader is used when `None`.
    pub shader_path: Option<String>,
    pub generator: GeneratorParams,
    /// Initial translation of the terrain.
    pub offset: Vector3<f32>,
}

impl TerrainParams {
    pub fn texture_path(&self, role: TextureRole) -> &str {
        match role {
            TextureRole::Albedo => &self.albedo_texture_path,
            TextureRole::NormalMap => &self.normal_map_texture_path,
            TextureRole::RoughnessMap => &self.roughness_map_texture_path,
            TextureRole::EmissionMap => &self.emission_map_texture_path,
        }
    }

    /// Units an override shader has to declare: one past the last configured
    /// slot, at least one.
    pub fn texture_units(&self) -> u32 {
        TextureRole::ALL
            .iter()
            .enumerate()
            .filter(|(_, role)| !self.texture_path(**role).is_empty())
            .map(|(i, _)| i as u32 + 1)
            .max()
            .unwrap_or(1)
    }
}

impl Default for TerrainParams {
    fn default() -> Self {
        let generator = GeneratorParams::default();
        let half = generator.world_size / 2.0;
        Self {
            albedo_texture_path: "textures/grass.png".to_string(),
            normal_map_texture_path: String::new(),
            roughness_map_texture_path: String::new(),
            emission_map_texture_path: String::new(),
            shader_path: None,
            generator,
            // centre the grid under the model, just below its feet
            offset: Vector3::new(-half, -1.0, -half),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionConfig {
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            fovy: Deg(45.0),
            znear: 0.1,
            zfar: 1000.0,
        }
    }
}

/// Everything the demo needs before the first frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DemoConfig {
    pub window_title: String,
    pub model_path: String,
    pub model_texture_path: String,
    /// WGSL override for the model; the built-in lit shader when `None`.
    pub model_shader_path: Option<String>,
    pub camera_position: Point3<f32>,
    pub camera_target: Point3<f32>,
    pub projection: ProjectionConfig,
    pub light: Light,
    pub material: Material,
    pub terrain: TerrainParams,
    pub clear_colour: wgpu::Color,
    /// Radians per second the model spins about its Y axis.
    pub model_spin: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            window_title: "terra-ngin".to_string(),
            model_path: "models/model.obj".to_string(),
            model_texture_path: "textures/model.png".to_string(),
            model_shader_path: None,
            camera_position: Point3::new(0.0, -0.3, 7.0),
            camera_target: Point3::new(0.0, -0.3, 0.0),
            projection: ProjectionConfig::default(),
            light: Light::default(),
            material: Material {
                ambient: Vector3::new(1.0, 1.0, 1.0),
                diffuse: Vector3::new(1.0, 1.0, 1.0),
                specular: Vector3::new(1.0, 1.0, 1.0),
                shininess: 100.0,
            },
            terrain: TerrainParams::default(),
            clear_colour: wgpu::Color::BLACK,
            model_spin: 1.0,
        }
    }
}
