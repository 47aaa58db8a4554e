//! GPU meshes built from raw vertex/UV/normal/index arrays.

use thiserror::Error;

use crate::gpu::{Backend, Commands};

/// Describes how a vertex type is laid out in a vertex buffer.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// Interleaved vertex as stored on the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for MeshVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Parallel attribute arrays as produced by a loader or generator.
///
/// `vertices` and `normals` hold three floats per element, `uvs` two.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawMesh {
    pub vertices: Vec<f32>,
    pub uvs: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

impl RawMesh {
    pub fn element_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Append another mesh, rebasing its indices.
    pub fn append(&mut self, other: RawMesh) {
        let base = self.element_count() as u32;
        self.vertices.extend(other.vertices);
        self.uvs.extend(other.uvs);
        self.normals.extend(other.normals);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
    }

    /// Check the arrays against `element_count` and interleave them.
    pub fn interleave(&self, element_count: usize) -> Result<Vec<MeshVertex>, MeshError> {
        check_len("vertex", self.vertices.len(), element_count * 3)?;
        check_len("uv", self.uvs.len(), element_count * 2)?;
        check_len("normal", self.normals.len(), element_count * 3)?;
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::PartialTriangle(self.indices.len()));
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= element_count) {
            return Err(MeshError::IndexOutOfRange {
                index,
                element_count,
            });
        }

        Ok((0..element_count)
            .map(|i| MeshVertex {
                position: [
                    self.vertices[i * 3],
                    self.vertices[i * 3 + 1],
                    self.vertices[i * 3 + 2],
                ],
                tex_coords: [self.uvs[i * 2], self.uvs[i * 2 + 1]],
                normal: [
                    self.normals[i * 3],
                    self.normals[i * 3 + 1],
                    self.normals[i * 3 + 2],
                ],
            })
            .collect())
    }
}

fn check_len(attribute: &'static str, actual: usize, expected: usize) -> Result<(), MeshError> {
    if actual != expected {
        return Err(MeshError::LengthMismatch {
            attribute,
            expected,
            actual,
        });
    }
    Ok(())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("{attribute} array has {actual} floats, expected {expected}")]
    LengthMismatch {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("index {index} is out of range for {element_count} vertices")]
    IndexOutOfRange { index: u32, element_count: usize },
    #[error("{0} indices do not form whole triangles")]
    PartialTriangle(usize),
}

/// A vertex/index buffer pair on the GPU. Immutable once created.
pub struct Mesh<B: Backend> {
    pub name: String,
    buffers: B::Mesh,
    num_elements: u32,
    num_indices: u32,
}

impl<B: Backend> Mesh<B> {
    pub fn create(
        backend: &B,
        name: &str,
        element_count: usize,
        raw: &RawMesh,
    ) -> Result<Self, MeshError> {
        let vertices = raw.interleave(element_count)?;
        let buffers = backend.create_mesh(name, &vertices, &raw.indices);
        Ok(Self {
            name: name.to_string(),
            buffers,
            num_elements: element_count as u32,
            num_indices: raw.indices.len() as u32,
        })
    }

    pub fn bind(&self, commands: &mut impl Commands<B>) {
        commands.bind_mesh(&self.buffers);
    }

    pub fn unbind(&self, commands: &mut impl Commands<B>) {
        commands.unbind_mesh();
    }

    /// Indexed draw over every stored index. The mesh must be bound.
    pub fn draw(&self, commands: &mut impl Commands<B>) {
        commands.draw_indexed(self.num_indices);
    }

    pub fn num_elements(&self) -> u32 {
        self.num_elements
    }

    pub fn num_indices(&self) -> u32 {
        self.num_indices
    }

    pub fn num_triangles(&self) -> u32 {
        self.num_indices / 3
    }

    pub fn buffers(&self) -> &B::Mesh {
        &self.buffers
    }
}
