//! Per-frame draw orchestration.
//!
//! [`Renderer`] turns a shader, a texture, the camera, a light, a material and
//! a model into a fixed sequence of commands. Nothing in here can fail: every
//! resource it touches was validated when it was loaded.

use crate::{
    camera::Camera,
    data_structures::{
        material::{Light, Material},
        model::Model,
        shader::{Shader, names},
        terrain::Terrain,
        texture::Texture,
        transform::Transform,
    },
    gpu::{Backend, Commands},
};

/// How many per-second samples [`FpsTracker`] keeps.
pub const FPS_HISTORY: usize = 64;

/// Counters for the frame being recorded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: u32,
    pub triangles: u32,
}

#[derive(Debug, Default)]
pub struct Renderer {
    stats: FrameStats,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the counters. Call once before the first draw of a frame.
    pub fn begin_frame(&mut self) {
        self.stats = FrameStats::default();
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Draw `model` with `shader` and `texture`.
    ///
    /// Binds shader, texture, uploads the uniforms, binds the mesh and draws,
    /// then unbinds mesh, texture and shader. A texture on a unit the shader
    /// does not sample is left out.
    #[allow(clippy::too_many_arguments)]
    pub fn render<B: Backend>(
        &mut self,
        commands: &mut impl Commands<B>,
        shader: &Shader<B>,
        texture: &Texture<B>,
        camera: &Camera,
        light: &Light,
        material: &Material,
        model: &Model<B>,
    ) {
        // a unit the program does not sample has no bind group slot
        let sampled = shader.samples(texture.unit());
        if !sampled {
            log::warn!(
                "shader {} does not sample unit {}, drawing without texture {}",
                shader.label(),
                texture.unit(),
                texture.name
            );
        }

        shader.bind(commands);
        if sampled {
            texture.bind(commands);
        }
        upload_uniforms(commands, shader, camera, light, material, &model.transform);
        model.mesh.bind(commands);
        model.mesh.draw(commands);
        self.count(model.mesh.num_triangles());
        model.mesh.unbind(commands);
        if sampled {
            texture.unbind(commands);
        }
        shader.unbind(commands);
    }

    /// Draw the terrain with its own shader, textures and material.
    pub fn render_terrain<B: Backend>(
        &mut self,
        commands: &mut impl Commands<B>,
        terrain: &Terrain<B>,
        camera: &Camera,
        light: &Light,
    ) {
        terrain.bind(commands);
        upload_uniforms(
            commands,
            terrain.shader(),
            camera,
            light,
            terrain.material(),
            terrain.transform(),
        );
        terrain.mesh().draw(commands);
        self.count(terrain.mesh().num_triangles());
        terrain.unbind(commands);
    }

    fn count(&mut self, triangles: u32) {
        self.stats.draws += 1;
        self.stats.triangles += triangles;
    }
}

fn upload_uniforms<B: Backend>(
    commands: &mut impl Commands<B>,
    shader: &Shader<B>,
    camera: &Camera,
    light: &Light,
    material: &Material,
    transform: &Transform,
) {
    shader.set_uniform(commands, names::VIEW_PROJECTION, camera.view_projection());
    shader.set_uniform(commands, names::MODEL, transform.matrix());
    shader.set_uniform(commands, names::CAMERA_POSITION, camera.position);

    shader.set_uniform(commands, names::LIGHT_POSITION, light.position);
    shader.set_uniform(commands, names::LIGHT_AMBIENT, light.ambient);
    shader.set_uniform(commands, names::LIGHT_DIFFUSE, light.diffuse);
    shader.set_uniform(commands, names::LIGHT_SPECULAR, light.specular);

    shader.set_uniform(commands, names::MATERIAL_AMBIENT, material.ambient);
    shader.set_uniform(commands, names::MATERIAL_DIFFUSE, material.diffuse);
    shader.set_uniform(commands, names::MATERIAL_SPECULAR, material.specular);
    shader.set_uniform(commands, names::MATERIAL_SHININESS, material.shininess);
}

/// Frames-per-second bookkeeping.
///
/// Frames are counted until a full second has passed; the count is then
/// pushed into a ring of the last [`FPS_HISTORY`] seconds.
#[derive(Debug)]
pub struct FpsTracker {
    history: [u32; FPS_HISTORY],
    len: usize,
    next: usize,
    frames: u32,
    elapsed: f32,
    highest: u32,
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self {
            history: [0; FPS_HISTORY],
            len: 0,
            next: 0,
            frames: 0,
            elapsed: 0.0,
            highest: 0,
        }
    }
}

impl FpsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one frame that took `dt` seconds.
    ///
    /// Returns the frame count of the second that just completed, if any.
    pub fn tick(&mut self, dt: f32) -> Option<u32> {
        self.frames += 1;
        self.elapsed += dt;
        if self.elapsed < 1.0 {
            return None;
        }
        let fps = self.frames;
        self.history[self.next] = fps;
        self.next = (self.next + 1) % FPS_HISTORY;
        self.len = (self.len + 1).min(FPS_HISTORY);
        self.highest = self.highest.max(fps);
        self.frames = 0;
        // a long stall counts as one slow second, not many empty ones
        self.elapsed %= 1.0;
        Some(fps)
    }

    /// Samples from oldest to newest.
    pub fn history(&self) -> impl Iterator<Item = u32> + '_ {
        let start = (self.next + FPS_HISTORY - self.len) % FPS_HISTORY;
        (0..self.len).map(move |i| self.history[(start + i) % FPS_HISTORY])
    }

    pub fn latest(&self) -> Option<u32> {
        self.history().last()
    }

    /// Highest per-second count seen so far, 0 before the first second.
    pub fn highest(&self) -> u32 {
        self.highest
    }
}
