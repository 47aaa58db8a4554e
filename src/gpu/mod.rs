//! GPU backend seam.
//!
//! Everything above this module (meshes, textures, shaders, terrain, renderer)
//! is written against two traits:
//!
//! - [`Backend`] creates GPU resources and names their handle types
//! - [`Commands`] is the per-frame command sink the bind protocol talks to
//!
//! [`wgpu_backend`] implements both on top of a `wgpu::RenderPass`;
//! [`headless`] records the commands instead of executing them.

pub mod headless;
pub mod wgpu_backend;

use crate::data_structures::{
    mesh::MeshVertex,
    shader::{UniformSlot, UniformValue},
    texture::TextureConfig,
};

/// Everything needed to compile a program on a backend.
pub struct ProgramDescriptor<'a> {
    pub label: &'a str,
    /// WGSL source with `vs_main` and `fs_main` entry points.
    pub source: &'a str,
    /// Size in bytes of the uniform block at group 0.
    pub uniform_size: u64,
    /// Number of texture units the program samples, bound at groups `1..=n`.
    pub texture_units: u32,
}

/// Resource factory of a rendering backend.
///
/// Handles returned from here are exclusively owned by the value that asked for
/// them and release their GPU memory on drop.
pub trait Backend {
    /// A vertex/index buffer pair.
    type Mesh;
    /// A sampled image with its sampler.
    type Image;
    /// A compiled program together with its uniform storage.
    type Program;

    fn create_mesh(&self, label: &str, vertices: &[MeshVertex], indices: &[u32]) -> Self::Mesh;

    fn create_image(
        &self,
        label: &str,
        image: &image::RgbaImage,
        config: &TextureConfig,
    ) -> Self::Image;

    fn create_program(&self, desc: &ProgramDescriptor) -> anyhow::Result<Self::Program>;
}

/// Command sink for one frame.
///
/// Implementations must not fail: everything they touch was validated when the
/// resources were created.
pub trait Commands<B: Backend> {
    fn bind_mesh(&mut self, mesh: &B::Mesh);
    fn unbind_mesh(&mut self);
    /// Activate `program`. `fallbacks[n]` goes on unit `n` until an image is
    /// bound there.
    fn bind_program(&mut self, program: &B::Program, fallbacks: &[B::Image]);
    fn unbind_program(&mut self);
    fn bind_image(&mut self, unit: u32, image: &B::Image);
    fn unbind_image(&mut self, unit: u32);
    fn write_uniform(&mut self, program: &B::Program, slot: &UniformSlot, value: &UniformValue);
    fn draw_indexed(&mut self, index_count: u32);
}

/// What is currently bound on a command sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BindState {
    pub mesh: bool,
    pub program: bool,
    units: u32,
}

impl BindState {
    pub fn bind_unit(&mut self, unit: u32) {
        self.units |= 1 << unit;
    }

    pub fn unbind_unit(&mut self, unit: u32) {
        self.units &= !(1 << unit);
    }

    pub fn is_unit_bound(&self, unit: u32) -> bool {
        self.units & (1 << unit) != 0
    }

    /// A draw needs geometry and a program.
    pub fn can_draw(&self) -> bool {
        self.mesh && self.program
    }

    /// True once every bind has been matched by an unbind.
    pub fn is_clear(&self) -> bool {
        !self.mesh && !self.program && self.units == 0
    }
}

#[cfg(test)]
mod tests {
    use super::BindState;

    #[test]
    fn tracks_units_independently() {
        let mut state = BindState::default();
        state.bind_unit(0);
        state.bind_unit(3);
        assert!(state.is_unit_bound(0));
        assert!(!state.is_unit_bound(1));
        assert!(state.is_unit_bound(3));

        state.unbind_unit(0);
        assert!(!state.is_unit_bound(0));
        assert!(state.is_unit_bound(3));
        assert!(!state.is_clear());

        state.unbind_unit(3);
        assert!(state.is_clear());
    }

    #[test]
    fn draw_requires_mesh_and_program() {
        let mut state = BindState::default();
        assert!(!state.can_draw());
        state.mesh = true;
        assert!(!state.can_draw());
        state.program = true;
        assert!(state.can_draw());
    }
}
