use cgmath::{Deg, Point3};
use terra_ngin::{
    camera::{Camera, Projection},
    data_structures::{
        material::Material,
        mesh::Mesh,
        shader::{LIT_UNIFORMS, Shader, ShaderDescriptor},
        terrain::{Terrain, TerrainTextures},
        texture::{Texture, TextureConfig, TextureRole},
    },
    gpu::headless::HeadlessBackend,
    procedural::generate_terrain,
};

pub const STUB_WGSL: &str = "fn vs_main() {} fn fs_main() {}";

pub fn texture(backend: &HeadlessBackend, role: TextureRole, label: &str) -> Texture<HeadlessBackend> {
    let img = image::DynamicImage::new_rgba8(2, 2);
    Texture::from_image(backend, role, TextureConfig::for_role(role), &img, label).unwrap()
}

pub fn shader(backend: &HeadlessBackend, label: &str, texture_units: u32) -> Shader<HeadlessBackend> {
    Shader::new(
        backend,
        &ShaderDescriptor {
            label,
            source: STUB_WGSL,
            uniforms: LIT_UNIFORMS,
            texture_units,
        },
    )
    .unwrap()
}

pub fn terrain_mesh(backend: &HeadlessBackend) -> Mesh<HeadlessBackend> {
    let raw = generate_terrain(3, 2.0).unwrap();
    Mesh::create(backend, "terrain", raw.element_count(), &raw).unwrap()
}

/// Terrain over a 3x3 grid with a texture in every slot listed in `roles`.
pub fn terrain(backend: &HeadlessBackend, roles: &[TextureRole]) -> Terrain<HeadlessBackend> {
    let mut textures = TerrainTextures::none();
    for &role in roles {
        let label = format!("{role:?}");
        let t = Some(texture(backend, role, &label));
        match role {
            TextureRole::Albedo => textures.albedo = t,
            TextureRole::NormalMap => textures.normal_map = t,
            TextureRole::RoughnessMap => textures.roughness_map = t,
            TextureRole::EmissionMap => textures.emission_map = t,
        }
    }
    let shader = shader(backend, "terrain shader", 4);
    Terrain::new(terrain_mesh(backend), textures, shader, Material::default()).unwrap()
}

pub fn camera() -> Camera {
    let mut camera = Camera::new(
        Point3::new(0.0, -0.3, 7.0),
        Projection::new(800, 600, Deg(45.0), 0.1, 1000.0),
    );
    camera.look_at(Point3::new(0.0, -0.3, 0.0));
    camera
}
