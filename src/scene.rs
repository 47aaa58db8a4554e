//! The demo scene: one lit model spinning above a textured terrain.

use anyhow::Context;

use crate::{
    camera::{Camera, Projection},
    config::DemoConfig,
    data_structures::{
        material::{Light, Material},
        model::Model,
        shader::Shader,
        terrain::Terrain,
        texture::{Texture, TextureConfig, TextureRole},
    },
    gpu::{Backend, Commands},
    render::Renderer,
    resources,
};

pub struct Scene<B: Backend> {
    pub camera: Camera,
    pub light: Light,
    pub material: Material,
    pub model: Model<B>,
    pub terrain: Terrain<B>,
    shader: Shader<B>,
    texture: Texture<B>,
    spin: f32,
}

impl<B: Backend> Scene<B> {
    /// Load every resource the scene needs. The first failure aborts loading.
    pub async fn load(
        backend: &B,
        config: &DemoConfig,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        let shader = match &config.model_shader_path {
            Some(path) => Shader::load(backend, path, 1).await?,
            None => Shader::lit_model(backend)?,
        };
        let texture = resources::load_texture(
            backend,
            &config.model_texture_path,
            TextureRole::Albedo,
            TextureConfig::for_role(TextureRole::Albedo),
        )
        .await
        .with_context(|| format!("unable to load model texture {}", config.model_texture_path))?;
        let model = resources::load_model(backend, &config.model_path)
            .await
            .with_context(|| format!("unable to load model {}", config.model_path))?;
        let terrain = Terrain::load(backend, &config.terrain)
            .await
            .context("unable to build the terrain")?;

        let projection = Projection::from_config(width, height, &config.projection);
        let mut camera = Camera::new(config.camera_position, projection);
        camera.look_at(config.camera_target);

        log::info!(
            "scene ready: model {} ({} triangles), terrain {} triangles",
            config.model_path,
            model.mesh.num_triangles(),
            terrain.mesh().num_triangles()
        );
        Ok(Self {
            camera,
            light: config.light,
            material: config.material,
            model,
            terrain,
            shader,
            texture,
            spin: config.model_spin,
        })
    }

    /// Advance by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.model.rotate_y(self.spin * dt);
    }

    pub fn draw(&self, renderer: &mut Renderer, commands: &mut impl Commands<B>) {
        renderer.render_terrain(commands, &self.terrain, &self.camera, &self.light);
        renderer.render(
            commands,
            &self.shader,
            &self.texture,
            &self.camera,
            &self.light,
            &self.material,
            &self.model,
        );
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.resize(width, height);
    }
}
