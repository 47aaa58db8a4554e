//! A backend without a GPU.
//!
//! [`HeadlessBackend`] keeps resource data in memory and [`CommandRecorder`]
//! logs every command it receives. Useful wherever the order and content of
//! bind calls matter more than pixels, e.g. in tests.

use anyhow::bail;

use crate::{
    data_structures::{
        mesh::MeshVertex,
        shader::{UniformSlot, UniformValue},
        texture::{MAX_TEXTURE_UNITS, TextureConfig},
    },
    gpu::{Backend, BindState, Commands, ProgramDescriptor},
};

#[derive(Debug, Default)]
pub struct HeadlessBackend;

#[derive(Debug)]
pub struct HeadlessMesh {
    pub label: String,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

#[derive(Debug)]
pub struct HeadlessImage {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub config: TextureConfig,
}

#[derive(Debug)]
pub struct HeadlessProgram {
    pub label: String,
    pub uniform_size: u64,
    pub texture_units: u32,
}

impl Backend for HeadlessBackend {
    type Mesh = HeadlessMesh;
    type Image = HeadlessImage;
    type Program = HeadlessProgram;

    fn create_mesh(&self, label: &str, vertices: &[MeshVertex], indices: &[u32]) -> HeadlessMesh {
        HeadlessMesh {
            label: label.to_string(),
            vertices: vertices.to_vec(),
            indices: indices.to_vec(),
        }
    }

    fn create_image(
        &self,
        label: &str,
        image: &image::RgbaImage,
        config: &TextureConfig,
    ) -> HeadlessImage {
        HeadlessImage {
            label: label.to_string(),
            width: image.width(),
            height: image.height(),
            config: *config,
        }
    }

    /// Checks only that both entry points exist.
    fn create_program(&self, desc: &ProgramDescriptor) -> anyhow::Result<HeadlessProgram> {
        for entry_point in ["fn vs_main", "fn fs_main"] {
            if !desc.source.contains(entry_point) {
                bail!("{} has no `{}` entry point", desc.label, entry_point);
            }
        }
        Ok(HeadlessProgram {
            label: desc.label.to_string(),
            uniform_size: desc.uniform_size,
            texture_units: desc.texture_units,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    BindMesh(String),
    UnbindMesh,
    BindProgram(String),
    UnbindProgram,
    BindImage { unit: u32, label: String },
    UnbindImage { unit: u32 },
    WriteUniform { name: String, value: UniformValue },
    DrawIndexed(u32),
}

/// Records commands and checks them the way a GPU would.
///
/// A draw panics unless a mesh and a program are bound, every unit the
/// program samples has an image, and no unit outside the program is bound.
#[derive(Debug, Default)]
pub struct CommandRecorder {
    commands: Vec<Command>,
    state: BindState,
    /// Units the bound program samples, 0 without a program.
    declared: u32,
    fallbacks: Vec<String>,
    sampled: [Option<String>; MAX_TEXTURE_UNITS as usize],
    draws: Vec<Vec<String>>,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Hand out everything recorded so far and start over.
    pub fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn state(&self) -> BindState {
        self.state
    }

    /// The last value written to `name`, if any.
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.commands.iter().rev().find_map(|command| match command {
            Command::WriteUniform { name: n, value } if n == name => Some(*value),
            _ => None,
        })
    }

    pub fn draw_calls(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, Command::DrawIndexed(_)))
            .count()
    }

    /// For every draw so far, the image labels it sampled by unit.
    pub fn sampled_images(&self) -> &[Vec<String>] {
        &self.draws
    }
}

impl Commands<HeadlessBackend> for CommandRecorder {
    fn bind_mesh(&mut self, mesh: &HeadlessMesh) {
        self.commands.push(Command::BindMesh(mesh.label.clone()));
        self.state.mesh = true;
    }

    fn unbind_mesh(&mut self) {
        self.commands.push(Command::UnbindMesh);
        self.state.mesh = false;
    }

    fn bind_program(&mut self, program: &HeadlessProgram, fallbacks: &[HeadlessImage]) {
        self.commands.push(Command::BindProgram(program.label.clone()));
        self.state.program = true;
        self.declared = program.texture_units;
        self.fallbacks = fallbacks.iter().map(|image| image.label.clone()).collect();
        self.sampled = Default::default();
        for (slot, label) in self.sampled.iter_mut().zip(&self.fallbacks) {
            *slot = Some(label.clone());
        }
    }

    fn unbind_program(&mut self) {
        self.commands.push(Command::UnbindProgram);
        self.state.program = false;
        self.declared = 0;
        self.fallbacks.clear();
        self.sampled = Default::default();
    }

    fn bind_image(&mut self, unit: u32, image: &HeadlessImage) {
        self.commands.push(Command::BindImage {
            unit,
            label: image.label.clone(),
        });
        self.state.bind_unit(unit);
        if let Some(slot) = self.sampled.get_mut(unit as usize) {
            *slot = Some(image.label.clone());
        }
    }

    fn unbind_image(&mut self, unit: u32) {
        self.commands.push(Command::UnbindImage { unit });
        self.state.unbind_unit(unit);
        if let Some(slot) = self.sampled.get_mut(unit as usize) {
            *slot = self.fallbacks.get(unit as usize).cloned();
        }
    }

    fn write_uniform(&mut self, _: &HeadlessProgram, slot: &UniformSlot, value: &UniformValue) {
        self.commands.push(Command::WriteUniform {
            name: slot.name.clone(),
            value: *value,
        });
    }

    fn draw_indexed(&mut self, index_count: u32) {
        assert!(self.state.can_draw(), "draw without a bound mesh and program");
        for unit in self.declared..MAX_TEXTURE_UNITS {
            assert!(
                !self.state.is_unit_bound(unit),
                "unit {unit} is bound but the program samples {} unit(s)",
                self.declared
            );
        }
        let sampled = &self.sampled[..self.declared as usize];
        let images: Vec<String> = sampled
            .iter()
            .enumerate()
            .map(|(unit, image)| match image {
                Some(label) => label.clone(),
                None => panic!("draw with nothing on texture unit {unit}"),
            })
            .collect();
        self.draws.push(images);
        self.commands.push(Command::DrawIndexed(index_count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::texture::TextureRole;

    fn program(texture_units: u32) -> HeadlessProgram {
        HeadlessProgram {
            label: "program".to_string(),
            uniform_size: 16,
            texture_units,
        }
    }

    fn image(label: &str) -> HeadlessImage {
        HeadlessImage {
            label: label.to_string(),
            width: 1,
            height: 1,
            config: TextureConfig::for_role(TextureRole::Albedo),
        }
    }

    fn mesh() -> HeadlessMesh {
        HeadlessMesh {
            label: "mesh".to_string(),
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    #[test]
    fn bound_images_replace_fallbacks_until_unbound() {
        let mut recorder = CommandRecorder::new();
        recorder.bind_mesh(&mesh());
        recorder.bind_program(&program(2), &[image("default 0"), image("default 1")]);
        recorder.bind_image(1, &image("normal"));
        recorder.draw_indexed(3);
        recorder.unbind_image(1);
        recorder.draw_indexed(3);

        assert_eq!(
            recorder.sampled_images(),
            &[
                vec!["default 0".to_string(), "normal".to_string()],
                vec!["default 0".to_string(), "default 1".to_string()],
            ]
        );
    }

    #[test]
    #[should_panic(expected = "nothing on texture unit 1")]
    fn draw_with_an_empty_declared_unit_panics() {
        let mut recorder = CommandRecorder::new();
        recorder.bind_mesh(&mesh());
        recorder.bind_program(&program(2), &[image("default 0")]);
        recorder.draw_indexed(3);
    }

    #[test]
    #[should_panic(expected = "unit 1 is bound")]
    fn draw_with_an_undeclared_unit_bound_panics() {
        let mut recorder = CommandRecorder::new();
        recorder.bind_mesh(&mesh());
        recorder.bind_program(&program(1), &[image("default 0")]);
        recorder.bind_image(1, &image("normal"));
        recorder.draw_indexed(3);
    }
}
