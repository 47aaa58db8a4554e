use cgmath::{Matrix4, Vector3};
use terra_ngin::{
    data_structures::{
        material::{Light, Material},
        mesh::Mesh,
        model::Model,
        shader::{LIT_UNIFORMS, Shader, ShaderDescriptor, UniformKind, UniformValue, names},
        terrain::{Terrain, TerrainTextures},
        texture::TextureRole,
    },
    gpu::headless::{Command, CommandRecorder, HeadlessBackend},
    procedural::generate_terrain,
    render::Renderer,
};

use crate::common::test_utils::{STUB_WGSL, camera, shader, terrain, terrain_mesh, texture};

mod common;

fn bind_image(unit: u32, label: &str) -> Command {
    Command::BindImage {
        unit,
        label: label.to_string(),
    }
}

fn is_uniform(command: &Command) -> bool {
    matches!(command, Command::WriteUniform { .. })
}

#[test]
fn terrain_binds_mesh_shader_then_textures_in_role_order() {
    let backend = HeadlessBackend;
    // inserted out of order on purpose
    let terrain = terrain(
        &backend,
        &[
            TextureRole::EmissionMap,
            TextureRole::Albedo,
            TextureRole::RoughnessMap,
            TextureRole::NormalMap,
        ],
    );
    let mut recorder = CommandRecorder::new();

    terrain.bind(&mut recorder);
    assert_eq!(
        recorder.take(),
        vec![
            Command::BindMesh("terrain".to_string()),
            Command::BindProgram("terrain shader".to_string()),
            bind_image(0, "Albedo"),
            bind_image(1, "NormalMap"),
            bind_image(2, "RoughnessMap"),
            bind_image(3, "EmissionMap"),
        ]
    );

    terrain.unbind(&mut recorder);
    assert_eq!(
        recorder.take(),
        vec![
            Command::UnbindMesh,
            Command::UnbindProgram,
            Command::UnbindImage { unit: 0 },
            Command::UnbindImage { unit: 1 },
            Command::UnbindImage { unit: 2 },
            Command::UnbindImage { unit: 3 },
        ]
    );
    assert!(recorder.state().is_clear());
}

#[test]
fn albedo_only_terrain_touches_no_other_unit() {
    let backend = HeadlessBackend;
    let terrain = terrain(&backend, &[TextureRole::Albedo]);
    let mut recorder = CommandRecorder::new();

    terrain.bind(&mut recorder);
    terrain.unbind(&mut recorder);

    let units: Vec<u32> = recorder
        .commands()
        .iter()
        .filter_map(|command| match command {
            Command::BindImage { unit, .. } | Command::UnbindImage { unit } => Some(*unit),
            _ => None,
        })
        .collect();
    assert_eq!(units, vec![0, 0]);
    assert_eq!(recorder.commands().len(), 6);
}

#[test]
fn terrain_without_textures_binds_mesh_and_shader_only() {
    let backend = HeadlessBackend;
    let terrain = terrain(&backend, &[]);
    let mut recorder = CommandRecorder::new();

    terrain.bind(&mut recorder);
    assert_eq!(recorder.commands().len(), 2);
    assert!(recorder.state().can_draw());
    terrain.unbind(&mut recorder);
    assert!(recorder.state().is_clear());
}

#[test]
fn gaps_between_slots_are_skipped() {
    let backend = HeadlessBackend;
    let terrain = terrain(&backend, &[TextureRole::Albedo, TextureRole::EmissionMap]);
    let mut recorder = CommandRecorder::new();

    terrain.bind(&mut recorder);
    assert_eq!(
        &recorder.commands()[2..],
        &[bind_image(0, "Albedo"), bind_image(3, "EmissionMap")]
    );

    terrain.mesh().draw(&mut recorder);
    assert_eq!(
        recorder.sampled_images(),
        &[vec![
            "Albedo".to_string(),
            "terrain shader default 1".to_string(),
            "terrain shader default 2".to_string(),
            "EmissionMap".to_string(),
        ]]
    );
}

#[test]
fn texture_on_undeclared_unit_is_a_load_error() {
    let backend = HeadlessBackend;
    let mut textures = TerrainTextures::none();
    textures.normal_map = Some(texture(&backend, TextureRole::NormalMap, "normal"));
    let result = Terrain::new(
        terrain_mesh(&backend),
        textures,
        Shader::lit_terrain(&backend).unwrap(),
        Material::default(),
    );
    let message = format!("{:#}", result.err().unwrap());
    assert!(message.contains("unit 1"), "{message}");
}

#[test]
fn renderer_binds_then_unbinds_in_reverse() {
    let backend = HeadlessBackend;
    let shader = Shader::lit_model(&backend).unwrap();
    let texture = texture(&backend, TextureRole::Albedo, "model.png");
    let raw = generate_terrain(2, 1.0).unwrap();
    let model = Model::new(Mesh::create(&backend, "quad", raw.element_count(), &raw).unwrap());
    let mut renderer = Renderer::new();
    let mut recorder = CommandRecorder::new();

    renderer.render(
        &mut recorder,
        &shader,
        &texture,
        &camera(),
        &Light::default(),
        &Material::default(),
        &model,
    );

    let commands = recorder.commands();
    assert_eq!(commands[0], Command::BindProgram("model shader".to_string()));
    assert_eq!(commands[1], bind_image(0, "model.png"));
    let uniforms = commands[2..].iter().take_while(|c| is_uniform(c)).count();
    assert_eq!(uniforms, LIT_UNIFORMS.len());
    assert_eq!(
        &commands[2 + uniforms..],
        &[
            Command::BindMesh("quad".to_string()),
            Command::DrawIndexed(6),
            Command::UnbindMesh,
            Command::UnbindImage { unit: 0 },
            Command::UnbindProgram,
        ]
    );
    assert!(recorder.state().is_clear());
    assert_eq!(recorder.sampled_images(), &[vec!["model.png".to_string()]]);
    assert_eq!(renderer.stats().draws, 1);
    assert_eq!(renderer.stats().triangles, 2);
}

#[test]
fn renderer_leaves_out_a_texture_the_shader_does_not_sample() {
    let backend = HeadlessBackend;
    let shader = shader(&backend, "lit", 1);
    let texture = texture(&backend, TextureRole::NormalMap, "normal");
    let raw = generate_terrain(2, 1.0).unwrap();
    let model = Model::new(Mesh::create(&backend, "quad", raw.element_count(), &raw).unwrap());
    let mut recorder = CommandRecorder::new();

    Renderer::new().render(
        &mut recorder,
        &shader,
        &texture,
        &camera(),
        &Light::default(),
        &Material::default(),
        &model,
    );

    assert_eq!(recorder.draw_calls(), 1);
    assert!(!recorder.commands().iter().any(|command| matches!(
        command,
        Command::BindImage { .. } | Command::UnbindImage { .. }
    )));
    assert_eq!(recorder.sampled_images(), &[vec!["lit default 0".to_string()]]);
    assert!(recorder.state().is_clear());
}

#[test]
fn shader_beyond_the_unit_limit_is_rejected() {
    let result = Shader::new(
        &HeadlessBackend,
        &ShaderDescriptor {
            label: "wide",
            source: STUB_WGSL,
            uniforms: LIT_UNIFORMS,
            texture_units: 5,
        },
    );
    let message = format!("{:#}", result.err().unwrap());
    assert!(message.contains("5 texture units"), "{message}");
}

#[test]
fn renderer_uploads_camera_light_and_material() {
    let backend = HeadlessBackend;
    let shader = Shader::lit_model(&backend).unwrap();
    let texture = texture(&backend, TextureRole::Albedo, "model.png");
    let raw = generate_terrain(2, 1.0).unwrap();
    let mut model = Model::new(Mesh::create(&backend, "quad", raw.element_count(), &raw).unwrap());
    model.translate(Vector3::new(1.0, 2.0, 3.0));
    let camera = camera();
    let light = Light::default();
    let material = Material {
        shininess: 100.0,
        ..Material::default()
    };
    let mut recorder = CommandRecorder::new();

    Renderer::new().render(
        &mut recorder,
        &shader,
        &texture,
        &camera,
        &light,
        &material,
        &model,
    );

    assert_eq!(
        recorder.uniform(names::VIEW_PROJECTION),
        Some(UniformValue::from(camera.view_projection()))
    );
    assert_eq!(
        recorder.uniform(names::MODEL),
        Some(UniformValue::from(Matrix4::from_translation(Vector3::new(
            1.0, 2.0, 3.0
        ))))
    );
    assert_eq!(
        recorder.uniform(names::CAMERA_POSITION),
        Some(UniformValue::from(camera.position))
    );
    assert_eq!(
        recorder.uniform(names::LIGHT_POSITION),
        Some(UniformValue::from(light.position))
    );
    assert_eq!(
        recorder.uniform(names::LIGHT_AMBIENT),
        Some(UniformValue::Vec3([0.2, 0.2, 0.2]))
    );
    assert_eq!(
        recorder.uniform(names::MATERIAL_SHININESS),
        Some(UniformValue::F32(100.0))
    );
}

#[test]
fn uniforms_the_shader_does_not_declare_are_dropped() {
    let backend = HeadlessBackend;
    let shader = Shader::new(
        &backend,
        &ShaderDescriptor {
            label: "unlit",
            source: STUB_WGSL,
            uniforms: &[
                (names::VIEW_PROJECTION, UniformKind::Mat4),
                (names::MODEL, UniformKind::Mat4),
            ],
            texture_units: 1,
        },
    )
    .unwrap();
    let texture = texture(&backend, TextureRole::Albedo, "model.png");
    let raw = generate_terrain(2, 1.0).unwrap();
    let model = Model::new(Mesh::create(&backend, "quad", raw.element_count(), &raw).unwrap());
    let mut recorder = CommandRecorder::new();

    Renderer::new().render(
        &mut recorder,
        &shader,
        &texture,
        &camera(),
        &Light::default(),
        &Material::default(),
        &model,
    );

    let written: Vec<&str> = recorder
        .commands()
        .iter()
        .filter_map(|command| match command {
            Command::WriteUniform { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(written, vec![names::VIEW_PROJECTION, names::MODEL]);
    assert_eq!(recorder.draw_calls(), 1);
}

#[test]
fn uniform_of_the_wrong_kind_is_skipped() {
    let backend = HeadlessBackend;
    let shader = shader(&backend, "lit", 1);
    let mut recorder = CommandRecorder::new();

    shader.set_uniform(&mut recorder, names::MATERIAL_SHININESS, Vector3::new(1.0, 2.0, 3.0));
    shader.set_uniform(&mut recorder, "no_such_uniform", 1.0f32);
    assert!(recorder.commands().is_empty());

    shader.set_uniform(&mut recorder, names::MATERIAL_SHININESS, 8.0f32);
    assert_eq!(recorder.commands().len(), 1);
}

#[test]
fn render_terrain_follows_terrain_bind_protocol() {
    let backend = HeadlessBackend;
    let mut terrain = terrain(&backend, &[TextureRole::Albedo, TextureRole::NormalMap]);
    terrain.translate(Vector3::new(-1.0, -1.0, -1.0));
    let mut renderer = Renderer::new();
    let mut recorder = CommandRecorder::new();

    renderer.render_terrain(&mut recorder, &terrain, &camera(), &Light::default());

    let commands: Vec<Command> = recorder
        .take()
        .into_iter()
        .filter(|c| !is_uniform(c))
        .collect();
    assert_eq!(
        commands,
        vec![
            Command::BindMesh("terrain".to_string()),
            Command::BindProgram("terrain shader".to_string()),
            bind_image(0, "Albedo"),
            bind_image(1, "NormalMap"),
            Command::DrawIndexed(24),
            Command::UnbindMesh,
            Command::UnbindProgram,
            Command::UnbindImage { unit: 0 },
            Command::UnbindImage { unit: 1 },
        ]
    );
    assert_eq!(renderer.stats().triangles, 8);
}

#[test]
fn render_terrain_uploads_terrain_transform_and_material() {
    let backend = HeadlessBackend;
    let mut terrain = terrain(&backend, &[TextureRole::Albedo]);
    terrain.translate(Vector3::new(-100.0, -1.0, -100.0));
    terrain.set_material(Material {
        shininess: 4.0,
        ..Material::default()
    });
    let mut recorder = CommandRecorder::new();

    Renderer::new().render_terrain(&mut recorder, &terrain, &camera(), &Light::default());

    assert_eq!(
        recorder.uniform(names::MODEL),
        Some(UniformValue::from(Matrix4::from_translation(Vector3::new(
            -100.0, -1.0, -100.0
        ))))
    );
    assert_eq!(
        recorder.uniform(names::MATERIAL_SHININESS),
        Some(UniformValue::F32(4.0))
    );
}

#[test]
fn stats_reset_per_frame() {
    let backend = HeadlessBackend;
    let terrain = terrain(&backend, &[]);
    let mut renderer = Renderer::new();
    let mut recorder = CommandRecorder::new();

    renderer.render_terrain(&mut recorder, &terrain, &camera(), &Light::default());
    renderer.render_terrain(&mut recorder, &terrain, &camera(), &Light::default());
    assert_eq!(renderer.stats().draws, 2);

    renderer.begin_frame();
    assert_eq!(renderer.stats().draws, 0);
    assert_eq!(renderer.stats().triangles, 0);
}
