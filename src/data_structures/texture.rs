//! Role-tagged GPU textures.
//!
//! A [`Texture`] owns one backend image and the [`TextureConfig`] it was
//! created with. The config carries the texture unit and the sampler wrap
//! mode, so nothing about binding lives in module-level state.

use anyhow::{Context, Result, bail};
use image::{ImageFormat, load_from_memory_with_format};

use crate::gpu::{Backend, Commands};

/// Units are bound at groups `1..=MAX_TEXTURE_UNITS`; group 0 holds uniforms.
pub const MAX_TEXTURE_UNITS: u32 = 4;

/// What a texture is used for. Selects the default unit and colour space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureRole {
    Albedo,
    NormalMap,
    RoughnessMap,
    EmissionMap,
}

impl TextureRole {
    /// Fixed bind order of the optional terrain slots.
    pub const ALL: [TextureRole; 4] = [
        TextureRole::Albedo,
        TextureRole::NormalMap,
        TextureRole::RoughnessMap,
        TextureRole::EmissionMap,
    ];

    /// Colour data is stored sRGB, everything else is linear.
    pub fn is_color(self) -> bool {
        matches!(self, TextureRole::Albedo | TextureRole::EmissionMap)
    }

    /// The role whose default unit is `unit`.
    pub fn for_unit(unit: u32) -> Option<TextureRole> {
        Self::ALL
            .into_iter()
            .find(|&role| TextureConfig::for_role(role).unit == unit)
    }

    /// What a unit samples while no texture of this role is bound: white
    /// albedo, a flat normal, full roughness, no emission.
    pub fn fallback_texel(self) -> [u8; 4] {
        match self {
            TextureRole::Albedo | TextureRole::RoughnessMap => [255, 255, 255, 255],
            TextureRole::NormalMap => [128, 128, 255, 255],
            TextureRole::EmissionMap => [0, 0, 0, 255],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

impl From<WrapMode> for wgpu::AddressMode {
    fn from(wrap: WrapMode) -> Self {
        match wrap {
            WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
            WrapMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

/// How a texture is sampled and where it is bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureConfig {
    pub unit: u32,
    pub wrap: WrapMode,
    pub srgb: bool,
}

impl TextureConfig {
    /// Albedo 0, normal 1, roughness 2, emission 3; clamped.
    pub fn for_role(role: TextureRole) -> Self {
        let unit = match role {
            TextureRole::Albedo => 0,
            TextureRole::NormalMap => 1,
            TextureRole::RoughnessMap => 2,
            TextureRole::EmissionMap => 3,
        };
        Self {
            unit,
            wrap: WrapMode::ClampToEdge,
            srgb: role.is_color(),
        }
    }

    pub fn with_wrap(self, wrap: WrapMode) -> Self {
        Self { wrap, ..self }
    }

    pub fn with_unit(self, unit: u32) -> Self {
        Self { unit, ..self }
    }
}

/// A GPU image tagged with its role.
pub struct Texture<B: Backend> {
    pub name: String,
    role: TextureRole,
    config: TextureConfig,
    dimensions: (u32, u32),
    image: B::Image,
}

impl<B: Backend> Texture<B> {
    /// Decode image file contents (PNG, JPEG, ...) and upload them.
    ///
    /// `format` is an optional extension hint such as `"png"`; without it the
    /// format is guessed from the bytes.
    pub fn from_bytes(
        backend: &B,
        role: TextureRole,
        config: TextureConfig,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
    ) -> Result<Self> {
        let img = match format {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => {
                let Some(fmt) = ImageFormat::from_extension(fmt) else {
                    bail!("unknown image format {fmt} for texture {label}");
                };
                load_from_memory_with_format(bytes, fmt)?
            }
        };
        Self::from_image(backend, role, config, &img, label)
            .with_context(|| format!("unable to create texture {label}"))
    }

    pub fn from_image(
        backend: &B,
        role: TextureRole,
        config: TextureConfig,
        img: &image::DynamicImage,
        label: &str,
    ) -> Result<Self> {
        if config.unit >= MAX_TEXTURE_UNITS {
            bail!(
                "texture unit {} is out of range (max {})",
                config.unit,
                MAX_TEXTURE_UNITS - 1
            );
        }
        let rgba = img.to_rgba8();
        if rgba.width() == 0 || rgba.height() == 0 {
            bail!("texture {label} has no pixels");
        }
        let dimensions = rgba.dimensions();
        let image = backend.create_image(label, &rgba, &config);
        log::info!(
            "loaded {:?} texture {} ({}x{}, unit {})",
            role,
            label,
            dimensions.0,
            dimensions.1,
            config.unit
        );
        Ok(Self {
            name: label.to_string(),
            role,
            config,
            dimensions,
            image,
        })
    }

    /// Bind to the unit from the texture's config.
    pub fn bind(&self, commands: &mut impl Commands<B>) {
        commands.bind_image(self.config.unit, &self.image);
    }

    pub fn unbind(&self, commands: &mut impl Commands<B>) {
        commands.unbind_image(self.config.unit);
    }

    pub fn role(&self) -> TextureRole {
        self.role
    }

    pub fn unit(&self) -> u32 {
        self.config.unit
    }

    pub fn config(&self) -> &TextureConfig {
        &self.config
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }
}
