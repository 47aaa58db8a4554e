//! The wgpu backend.
//!
//! Group 0 of every program is its uniform block, texture unit `n` is bound at
//! group `n + 1` as a texture/sampler pair. Binding a resource records the
//! matching `set_*` call on the render pass; unbinding only updates the
//! [`BindState`] since a render pass has no notion of releasing a binding.
//!
//! Uniform blocks live in one arena buffer shared by all programs. Each draw
//! of a frame gets its own [`UNIFORM_BLOCK_SIZE`] slice, selected with a
//! dynamic offset, so draws sharing a program keep their own values.

use anyhow::bail;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        mesh::{MeshVertex, Vertex},
        shader::{UniformSlot, UniformValue},
        texture::TextureConfig,
    },
    gpu::{Backend, BindState, Commands, ProgramDescriptor},
};

pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
}

pub struct GpuImage {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub bind_group: wgpu::BindGroup,
}

/// Bytes of the uniform arena reserved per draw, which is also the largest
/// uniform block a program may declare. 256 satisfies every adapter's
/// uniform offset alignment.
pub const UNIFORM_BLOCK_SIZE: u64 = 256;

/// Draws per frame the uniform arena has room for.
pub const MAX_DRAWS_PER_FRAME: u64 = 1024;

pub struct GpuProgram {
    pub pipeline: wgpu::RenderPipeline,
}

/// Device, queue and the layouts shared by every program.
#[derive(Debug)]
pub struct WgpuBackend {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    uniform_arena: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

impl WgpuBackend {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let uniform_layout = uniform_layout(&device);
        let texture_layout = texture_layout(&device);
        let uniform_arena = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform arena"),
            size: UNIFORM_BLOCK_SIZE * MAX_DRAWS_PER_FRAME,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_arena,
                    offset: 0,
                    size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE),
                }),
            }],
            label: Some("uniform_bind_group"),
        });
        Self {
            device,
            queue,
            color_format,
            depth_format,
            uniform_layout,
            texture_layout,
            uniform_arena,
            uniform_bind_group,
        }
    }
}

pub fn uniform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE),
            },
            count: None,
        }],
        label: Some("uniform_bind_group_layout"),
    })
}

pub fn texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("texture_bind_group_layout"),
    })
}

impl Backend for WgpuBackend {
    type Mesh = GpuMesh;
    type Image = GpuImage;
    type Program = GpuProgram;

    fn create_mesh(&self, label: &str, vertices: &[MeshVertex], indices: &[u32]) -> GpuMesh {
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Vertex Buffer", label)),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Index Buffer", label)),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        GpuMesh {
            vertex_buffer,
            index_buffer,
        }
    }

    fn create_image(
        &self,
        label: &str,
        image: &image::RgbaImage,
        config: &TextureConfig,
    ) -> GpuImage {
        let dimensions = image.dimensions();
        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let format = if config.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            image,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let wrap = config.wrap.into();
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wrap,
            address_mode_v: wrap,
            address_mode_w: wrap,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some(label),
        });

        GpuImage {
            texture,
            view,
            sampler,
            bind_group,
        }
    }

    fn create_program(&self, desc: &ProgramDescriptor) -> anyhow::Result<GpuProgram> {
        if desc.uniform_size > UNIFORM_BLOCK_SIZE {
            bail!(
                "uniform block of {} bytes exceeds the {} bytes reserved per draw",
                desc.uniform_size,
                UNIFORM_BLOCK_SIZE
            );
        }
        let max_groups = self.device.limits().max_bind_groups;
        if 1 + desc.texture_units > max_groups {
            bail!(
                "{} texture units need {} bind groups, the device supports {}",
                desc.texture_units,
                1 + desc.texture_units,
                max_groups
            );
        }

        let mut bind_group_layouts = vec![&self.uniform_layout];
        bind_group_layouts.extend((0..desc.texture_units).map(|_| &self.texture_layout));
        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &[],
            });

        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.label),
                source: wgpu::ShaderSource::Wgsl(desc.source.into()),
            });
        let info = futures::executor::block_on(module.get_compilation_info());
        if let Some(error) = info
            .messages
            .iter()
            .find(|message| message.message_type == wgpu::CompilationMessageType::Error)
        {
            bail!("{}", error.message);
        }
        let pipeline = mk_render_pipeline(
            &self.device,
            &layout,
            self.color_format,
            Some(wgpu::BlendState {
                alpha: wgpu::BlendComponent::REPLACE,
                color: wgpu::BlendComponent::REPLACE,
            }),
            self.depth_format,
            &[MeshVertex::desc()],
            &module,
        );

        Ok(GpuProgram { pipeline })
    }
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            // the terrain winds (top-left, bottom-left, top-right), which is
            // counter-clockwise seen from above
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

/// Depth attachment matching the surface size.
#[derive(Debug)]
pub struct DepthTexture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl DepthTexture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::FORMAT],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Records bind commands into an open render pass.
///
/// Uniform writes are staged per draw and uploaded by [`finish`](Self::finish),
/// which must run before the encoder is submitted.
pub struct WgpuPass<'a, 'enc> {
    pass: &'a mut wgpu::RenderPass<'enc>,
    backend: &'a WgpuBackend,
    state: BindState,
    uniforms: UniformStaging,
}

impl<'a, 'enc> WgpuPass<'a, 'enc> {
    pub fn new(pass: &'a mut wgpu::RenderPass<'enc>, backend: &'a WgpuBackend) -> Self {
        Self {
            pass,
            backend,
            state: BindState::default(),
            uniforms: UniformStaging::new(),
        }
    }

    pub fn state(&self) -> BindState {
        self.state
    }

    /// Upload the staged uniform blocks. Queue writes land before the next
    /// submit, so the pass reads them.
    pub fn finish(self) -> BindState {
        let used = self.uniforms.committed();
        if !used.is_empty() {
            self.backend
                .queue
                .write_buffer(&self.backend.uniform_arena, 0, used);
        }
        self.state
    }
}

/// CPU copy of the uniform arena for one frame: one block per committed draw
/// plus the block collecting the next draw's values.
#[derive(Debug)]
struct UniformStaging {
    bytes: Vec<u8>,
    draws: u64,
}

impl UniformStaging {
    fn new() -> Self {
        Self {
            bytes: vec![0; UNIFORM_BLOCK_SIZE as usize],
            draws: 0,
        }
    }

    fn next_block(&mut self) -> &mut [u8] {
        let start = self.bytes.len() - UNIFORM_BLOCK_SIZE as usize;
        &mut self.bytes[start..]
    }

    /// Seal the next block for a draw and return its arena offset, `None`
    /// once the arena is full. The following block starts as a copy.
    fn commit(&mut self) -> Option<u32> {
        if self.draws == MAX_DRAWS_PER_FRAME {
            return None;
        }
        let offset = self.draws * UNIFORM_BLOCK_SIZE;
        self.draws += 1;
        self.bytes.extend_from_within(offset as usize..);
        Some(offset as u32)
    }

    fn committed(&self) -> &[u8] {
        &self.bytes[..(self.draws * UNIFORM_BLOCK_SIZE) as usize]
    }
}

impl Commands<WgpuBackend> for WgpuPass<'_, '_> {
    fn bind_mesh(&mut self, mesh: &GpuMesh) {
        self.pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.pass
            .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.state.mesh = true;
    }

    fn unbind_mesh(&mut self) {
        self.state.mesh = false;
    }

    fn bind_program(&mut self, program: &GpuProgram, fallbacks: &[GpuImage]) {
        self.pass.set_pipeline(&program.pipeline);
        for (unit, image) in (0u32..).zip(fallbacks) {
            self.pass.set_bind_group(unit + 1, &image.bind_group, &[]);
        }
        // another program's layout may have left values here
        self.uniforms.next_block().fill(0);
        self.state.program = true;
    }

    fn unbind_program(&mut self) {
        self.state.program = false;
    }

    fn bind_image(&mut self, unit: u32, image: &GpuImage) {
        self.pass.set_bind_group(unit + 1, &image.bind_group, &[]);
        self.state.bind_unit(unit);
    }

    fn unbind_image(&mut self, unit: u32) {
        self.state.unbind_unit(unit);
    }

    fn write_uniform(&mut self, _: &GpuProgram, slot: &UniformSlot, value: &UniformValue) {
        let bytes = value.as_bytes();
        let start = slot.offset as usize;
        self.uniforms.next_block()[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn draw_indexed(&mut self, index_count: u32) {
        debug_assert!(self.state.can_draw(), "draw without a bound mesh and program");
        let Some(offset) = self.uniforms.commit() else {
            log::warn!("more than {MAX_DRAWS_PER_FRAME} draws in one frame, dropping the rest");
            return;
        };
        self.pass
            .set_bind_group(0, &self.backend.uniform_bind_group, &[offset]);
        self.pass.draw_indexed(0..index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_draw_keeps_its_own_block() {
        let mut staging = UniformStaging::new();
        staging.next_block()[..4].copy_from_slice(&1.0f32.to_ne_bytes());
        assert_eq!(staging.commit(), Some(0));
        staging.next_block()[..4].copy_from_slice(&2.0f32.to_ne_bytes());
        assert_eq!(staging.commit(), Some(UNIFORM_BLOCK_SIZE as u32));

        let committed = staging.committed();
        let block = UNIFORM_BLOCK_SIZE as usize;
        assert_eq!(committed.len(), 2 * block);
        assert_eq!(&committed[..4], &1.0f32.to_ne_bytes());
        assert_eq!(&committed[block..block + 4], &2.0f32.to_ne_bytes());
    }

    #[test]
    fn next_block_starts_from_the_last_draw() {
        let mut staging = UniformStaging::new();
        staging.next_block()[8..12].copy_from_slice(&7i32.to_ne_bytes());
        staging.commit();
        assert_eq!(&staging.next_block()[8..12], &7i32.to_ne_bytes());
        assert_eq!(staging.committed().len(), UNIFORM_BLOCK_SIZE as usize);
    }

    #[test]
    fn arena_holds_a_bounded_number_of_draws() {
        let mut staging = UniformStaging::new();
        for _ in 0..MAX_DRAWS_PER_FRAME {
            assert!(staging.commit().is_some());
        }
        assert_eq!(staging.commit(), None);
    }
}
