//! The terrain: a generated mesh plus up to four role textures, a shader, a
//! material and a transform, bound and unbound as one unit.

use anyhow::Context;
use cgmath::Vector3;

use crate::{
    config::TerrainParams,
    data_structures::{
        material::Material,
        mesh::Mesh,
        shader::Shader,
        texture::{Texture, TextureConfig, TextureRole, WrapMode},
        transform::Transform,
    },
    gpu::{Backend, Commands},
    procedural::generate_terrain,
    resources,
};

/// The optional texture slots of a terrain.
///
/// Kept as four named fields so the bind order is fixed:
/// albedo, normal, roughness, emission.
pub struct TerrainTextures<B: Backend> {
    pub albedo: Option<Texture<B>>,
    pub normal_map: Option<Texture<B>>,
    pub roughness_map: Option<Texture<B>>,
    pub emission_map: Option<Texture<B>>,
}

impl<B: Backend> TerrainTextures<B> {
    pub fn none() -> Self {
        Self {
            albedo: None,
            normal_map: None,
            roughness_map: None,
            emission_map: None,
        }
    }

    pub fn get(&self, role: TextureRole) -> Option<&Texture<B>> {
        match role {
            TextureRole::Albedo => self.albedo.as_ref(),
            TextureRole::NormalMap => self.normal_map.as_ref(),
            TextureRole::RoughnessMap => self.roughness_map.as_ref(),
            TextureRole::EmissionMap => self.emission_map.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: TextureRole) -> &mut Option<Texture<B>> {
        match role {
            TextureRole::Albedo => &mut self.albedo,
            TextureRole::NormalMap => &mut self.normal_map,
            TextureRole::RoughnessMap => &mut self.roughness_map,
            TextureRole::EmissionMap => &mut self.emission_map,
        }
    }

    /// Present textures in bind order.
    pub fn iter(&self) -> impl Iterator<Item = &Texture<B>> {
        TextureRole::ALL.into_iter().filter_map(|role| self.get(role))
    }

    /// Load every slot whose path is non-empty.
    ///
    /// The albedo sampler repeats so the tiled UVs of the generated grid wrap
    /// instead of clamping; the other slots keep their role defaults.
    pub async fn load(backend: &B, params: &TerrainParams) -> anyhow::Result<Self> {
        let mut textures = Self::none();
        for role in TextureRole::ALL {
            let path = params.texture_path(role);
            if path.is_empty() {
                continue;
            }
            let mut config = TextureConfig::for_role(role);
            if role == TextureRole::Albedo {
                config = config.with_wrap(WrapMode::Repeat);
            }
            let texture = resources::load_texture(backend, path, role, config)
                .await
                .with_context(|| format!("unable to load terrain {role:?} texture {path}"))?;
            *textures.slot_mut(role) = Some(texture);
        }
        Ok(textures)
    }
}

pub struct Terrain<B: Backend> {
    mesh: Mesh<B>,
    textures: TerrainTextures<B>,
    shader: Shader<B>,
    material: Material,
    transform: Transform,
}

impl<B: Backend> Terrain<B> {
    /// Compose a terrain from already created resources.
    ///
    /// Fails if a texture sits on a unit the shader does not declare.
    pub fn new(
        mesh: Mesh<B>,
        textures: TerrainTextures<B>,
        shader: Shader<B>,
        material: Material,
    ) -> anyhow::Result<Self> {
        for texture in textures.iter() {
            if texture.unit() >= shader.texture_units() {
                anyhow::bail!(
                    "terrain texture {} uses unit {} but shader {} samples {} unit(s)",
                    texture.name,
                    texture.unit(),
                    shader.label(),
                    shader.texture_units()
                );
            }
        }
        Ok(Self {
            mesh,
            textures,
            shader,
            material,
            transform: Transform::identity(),
        })
    }

    /// Generate the grid, load the configured textures and compile the
    /// terrain shader (the override from `shader_path`, or the built-in one).
    /// Any failure aborts with a descriptive error.
    pub async fn load(backend: &B, params: &TerrainParams) -> anyhow::Result<Self> {
        let generator = params.generator;
        let raw = generate_terrain(generator.resolution, generator.world_size)?;
        let element_count = raw.element_count();
        let mesh = Mesh::create(backend, "terrain", element_count, &raw)?;
        log::info!(
            "generated terrain: {} vertices, {} triangles over {} units",
            mesh.num_elements(),
            mesh.num_triangles(),
            generator.world_size
        );

        let textures = TerrainTextures::load(backend, params).await?;
        let shader = match &params.shader_path {
            Some(path) => Shader::load(backend, path, params.texture_units()).await?,
            None => Shader::lit_terrain(backend)?,
        };

        let mut terrain = Self::new(mesh, textures, shader, Material::default())?;
        terrain.translate(params.offset);
        Ok(terrain)
    }

    /// Bind mesh, shader and every present texture, in that order.
    pub fn bind(&self, commands: &mut impl Commands<B>) {
        self.mesh.bind(commands);
        self.shader.bind(commands);
        for texture in self.textures.iter() {
            texture.bind(commands);
        }
    }

    /// Unbind in the same order as [`bind`](Self::bind).
    pub fn unbind(&self, commands: &mut impl Commands<B>) {
        self.mesh.unbind(commands);
        self.shader.unbind(commands);
        for texture in self.textures.iter() {
            texture.unbind(commands);
        }
    }

    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.transform.translate(delta);
    }

    pub fn mesh(&self) -> &Mesh<B> {
        &self.mesh
    }

    pub fn textures(&self) -> &TerrainTextures<B> {
        &self.textures
    }

    pub fn shader(&self) -> &Shader<B> {
        &self.shader
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }
}
