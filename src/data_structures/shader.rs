//! Compiled shader programs and name-based uniform upload.
//!
//! A [`Shader`] owns one backend program plus a [`UniformLayout`] that maps
//! uniform names to byte offsets inside the program's uniform block. Offsets
//! follow WGSL's alignment rules so the layout matches a plain WGSL struct
//! declared in the same field order.

use anyhow::{Context, bail};

use crate::{
    data_structures::texture::{MAX_TEXTURE_UNITS, TextureConfig, TextureRole},
    gpu::{Backend, Commands, ProgramDescriptor},
    resources,
};

/// Names of the uniforms the [`Renderer`](crate::render::Renderer) offers.
///
/// A program is free to declare only a subset; uploads to names it does not
/// declare are dropped.
pub mod names {
    pub const VIEW_PROJECTION: &str = "view_projection";
    pub const MODEL: &str = "model";
    pub const CAMERA_POSITION: &str = "camera_position";
    pub const LIGHT_POSITION: &str = "light_position";
    pub const LIGHT_AMBIENT: &str = "light_ambient";
    pub const LIGHT_DIFFUSE: &str = "light_diffuse";
    pub const LIGHT_SPECULAR: &str = "light_specular";
    pub const MATERIAL_AMBIENT: &str = "material_ambient";
    pub const MATERIAL_DIFFUSE: &str = "material_diffuse";
    pub const MATERIAL_SPECULAR: &str = "material_specular";
    pub const MATERIAL_SHININESS: &str = "material_shininess";
}

/// The uniform block of the built-in lit shaders, in declaration order.
pub const LIT_UNIFORMS: &[(&str, UniformKind)] = &[
    (names::VIEW_PROJECTION, UniformKind::Mat4),
    (names::MODEL, UniformKind::Mat4),
    (names::CAMERA_POSITION, UniformKind::Vec3),
    (names::LIGHT_POSITION, UniformKind::Vec3),
    (names::LIGHT_AMBIENT, UniformKind::Vec3),
    (names::LIGHT_DIFFUSE, UniformKind::Vec3),
    (names::LIGHT_SPECULAR, UniformKind::Vec3),
    (names::MATERIAL_AMBIENT, UniformKind::Vec3),
    (names::MATERIAL_DIFFUSE, UniformKind::Vec3),
    (names::MATERIAL_SPECULAR, UniformKind::Vec3),
    (names::MATERIAL_SHININESS, UniformKind::F32),
];

const MODEL_WGSL: &str = include_str!("../shaders/model.wgsl");
const TERRAIN_WGSL: &str = include_str!("../shaders/terrain.wgsl");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Mat4,
    Vec4,
    Vec3,
    Vec2,
    F32,
    I32,
}

impl UniformKind {
    /// (alignment, size) in bytes under WGSL's host-shareable layout.
    fn align_and_size(self) -> (u64, u64) {
        match self {
            UniformKind::Mat4 => (16, 64),
            UniformKind::Vec4 => (16, 16),
            UniformKind::Vec3 => (16, 12),
            UniformKind::Vec2 => (8, 8),
            UniformKind::F32 | UniformKind::I32 => (4, 4),
        }
    }
}

/// A value ready to be copied into a uniform block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Mat4([[f32; 4]; 4]),
    Vec4([f32; 4]),
    Vec3([f32; 3]),
    Vec2([f32; 2]),
    F32(f32),
    I32(i32),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::F32(_) => UniformKind::F32,
            UniformValue::I32(_) => UniformKind::I32,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UniformValue::Mat4(m) => bytemuck::cast_slice(m),
            UniformValue::Vec4(v) => bytemuck::cast_slice(v),
            UniformValue::Vec3(v) => bytemuck::cast_slice(v),
            UniformValue::Vec2(v) => bytemuck::cast_slice(v),
            UniformValue::F32(f) => bytemuck::bytes_of(f),
            UniformValue::I32(i) => bytemuck::bytes_of(i),
        }
    }
}

impl From<cgmath::Matrix4<f32>> for UniformValue {
    fn from(m: cgmath::Matrix4<f32>) -> Self {
        UniformValue::Mat4(m.into())
    }
}

impl From<cgmath::Vector3<f32>> for UniformValue {
    fn from(v: cgmath::Vector3<f32>) -> Self {
        UniformValue::Vec3(v.into())
    }
}

impl From<cgmath::Point3<f32>> for UniformValue {
    fn from(p: cgmath::Point3<f32>) -> Self {
        UniformValue::Vec3(p.into())
    }
}

impl From<f32> for UniformValue {
    fn from(f: f32) -> Self {
        UniformValue::F32(f)
    }
}

/// Where a named uniform lives inside the uniform block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformSlot {
    pub name: String,
    pub kind: UniformKind,
    pub offset: u64,
}

#[derive(Clone, Debug, Default)]
pub struct UniformLayout {
    slots: Vec<UniformSlot>,
    size: u64,
}

impl UniformLayout {
    pub fn new(uniforms: &[(&str, UniformKind)]) -> anyhow::Result<Self> {
        let mut slots: Vec<UniformSlot> = Vec::with_capacity(uniforms.len());
        let mut cursor: u64 = 0;
        let mut struct_align: u64 = 16;
        for &(name, kind) in uniforms {
            if slots.iter().any(|slot| slot.name == name) {
                bail!("uniform `{name}` is declared twice");
            }
            let (align, size) = kind.align_and_size();
            struct_align = struct_align.max(align);
            let offset = cursor.next_multiple_of(align);
            slots.push(UniformSlot {
                name: name.to_string(),
                kind,
                offset,
            });
            cursor = offset + size;
        }
        Ok(Self {
            slots,
            // wgpu rejects zero-sized uniform buffers
            size: cursor.next_multiple_of(struct_align).max(16),
        })
    }

    pub fn slot(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    /// Size of the whole block in bytes, padded to the struct alignment.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn slots(&self) -> &[UniformSlot] {
        &self.slots
    }
}

pub struct ShaderDescriptor<'a> {
    pub label: &'a str,
    pub source: &'a str,
    pub uniforms: &'a [(&'a str, UniformKind)],
    pub texture_units: u32,
}

/// A compiled program.
///
/// Every texture unit the program samples gets a 1x1 fallback image that is
/// bound together with the program, so a unit whose texture is absent still
/// samples something neutral.
pub struct Shader<B: Backend> {
    label: String,
    program: B::Program,
    fallbacks: Vec<B::Image>,
    layout: UniformLayout,
    texture_units: u32,
}

impl<B: Backend> Shader<B> {
    /// Compile a program. Compilation and layout errors are load-time errors.
    pub fn new(backend: &B, desc: &ShaderDescriptor) -> anyhow::Result<Self> {
        if desc.texture_units > MAX_TEXTURE_UNITS {
            bail!(
                "shader {} samples {} texture units, at most {} are supported",
                desc.label,
                desc.texture_units,
                MAX_TEXTURE_UNITS
            );
        }
        let layout = UniformLayout::new(desc.uniforms)
            .with_context(|| format!("invalid uniform block for shader {}", desc.label))?;
        let program = backend
            .create_program(&ProgramDescriptor {
                label: desc.label,
                source: desc.source,
                uniform_size: layout.size(),
                texture_units: desc.texture_units,
            })
            .with_context(|| format!("unable to compile shader {}", desc.label))?;
        log::info!(
            "compiled shader {} ({} uniforms, {} texture units)",
            desc.label,
            layout.slots().len(),
            desc.texture_units
        );
        let fallbacks = (0..desc.texture_units)
            .filter_map(TextureRole::for_unit)
            .map(|role| {
                let config = TextureConfig::for_role(role);
                let texel = image::RgbaImage::from_pixel(1, 1, image::Rgba(role.fallback_texel()));
                let label = format!("{} default {}", desc.label, config.unit);
                backend.create_image(&label, &texel, &config)
            })
            .collect();
        Ok(Self {
            label: desc.label.to_string(),
            program,
            fallbacks,
            layout,
            texture_units: desc.texture_units,
        })
    }

    /// Compile a WGSL file from the asset directory that declares the lit
    /// uniform block.
    pub async fn load(backend: &B, file_name: &str, texture_units: u32) -> anyhow::Result<Self> {
        let source = resources::load_string(file_name)
            .await
            .with_context(|| format!("unable to read shader {file_name}"))?;
        Self::new(
            backend,
            &ShaderDescriptor {
                label: file_name,
                source: &source,
                uniforms: LIT_UNIFORMS,
                texture_units,
            },
        )
    }

    /// The built-in lit shader for textured models (one albedo unit).
    pub fn lit_model(backend: &B) -> anyhow::Result<Self> {
        Self::new(
            backend,
            &ShaderDescriptor {
                label: "model shader",
                source: MODEL_WGSL,
                uniforms: LIT_UNIFORMS,
                texture_units: 1,
            },
        )
    }

    /// The built-in terrain shader. It samples the albedo unit only.
    pub fn lit_terrain(backend: &B) -> anyhow::Result<Self> {
        Self::new(
            backend,
            &ShaderDescriptor {
                label: "terrain shader",
                source: TERRAIN_WGSL,
                uniforms: LIT_UNIFORMS,
                texture_units: 1,
            },
        )
    }

    /// Activate the program and put its fallback images on every unit it
    /// samples. Textures bound afterwards replace them.
    pub fn bind(&self, commands: &mut impl Commands<B>) {
        commands.bind_program(&self.program, &self.fallbacks);
    }

    pub fn unbind(&self, commands: &mut impl Commands<B>) {
        commands.unbind_program();
    }

    /// Upload a uniform by name.
    ///
    /// Names the program does not declare are ignored, so callers can offer
    /// every uniform they know about.
    pub fn set_uniform(
        &self,
        commands: &mut impl Commands<B>,
        name: &str,
        value: impl Into<UniformValue>,
    ) {
        let value = value.into();
        let Some(slot) = self.layout.slot(name) else {
            log::trace!("shader {} has no uniform `{}`", self.label, name);
            return;
        };
        if slot.kind != value.kind() {
            log::warn!(
                "shader {}: uniform `{}` is {:?}, got {:?}",
                self.label,
                name,
                slot.kind,
                value.kind()
            );
            return;
        }
        commands.write_uniform(&self.program, slot, &value);
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.layout.slot(name).is_some()
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn texture_units(&self) -> u32 {
        self.texture_units
    }

    /// Whether the program samples texture unit `unit`.
    pub fn samples(&self, unit: u32) -> bool {
        unit < self.texture_units
    }

    pub fn program(&self) -> &B::Program {
        &self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lit_block_matches_wgsl_struct_layout() {
        let layout = UniformLayout::new(LIT_UNIFORMS).unwrap();
        let offset = |name| layout.slot(name).unwrap().offset;

        assert_eq!(offset(names::VIEW_PROJECTION), 0);
        assert_eq!(offset(names::MODEL), 64);
        assert_eq!(offset(names::CAMERA_POSITION), 128);
        assert_eq!(offset(names::LIGHT_POSITION), 144);
        assert_eq!(offset(names::LIGHT_SPECULAR), 192);
        assert_eq!(offset(names::MATERIAL_SPECULAR), 240);
        // packs into the tail of the preceding vec3
        assert_eq!(offset(names::MATERIAL_SHININESS), 252);
        assert_eq!(layout.size(), 256);
    }

    #[test]
    fn scalars_and_vec2_respect_alignment() {
        let layout = UniformLayout::new(&[
            ("a", UniformKind::F32),
            ("b", UniformKind::Vec2),
            ("c", UniformKind::I32),
            ("d", UniformKind::Vec4),
        ])
        .unwrap();
        let offsets: Vec<u64> = layout.slots().iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16, 32]);
        assert_eq!(layout.size(), 48);
    }

    #[test]
    fn rejects_duplicate_names() {
        let layout = UniformLayout::new(&[("a", UniformKind::F32), ("a", UniformKind::Vec3)]);
        assert!(layout.is_err());
    }

    #[test]
    fn empty_block_is_not_zero_sized() {
        assert_eq!(UniformLayout::new(&[]).unwrap().size(), 16);
    }

    #[test]
    fn value_bytes_have_kind_size() {
        let m: UniformValue = cgmath::Matrix4::<f32>::from_scale(2.0).into();
        assert_eq!(m.as_bytes().len(), 64);
        assert_eq!(UniformValue::Vec3([1.0, 2.0, 3.0]).as_bytes().len(), 12);
        assert_eq!(UniformValue::F32(1.0).as_bytes(), &1.0f32.to_ne_bytes());
    }
}
