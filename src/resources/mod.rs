//! Loading of asset files into engine resources.
//!
//! Every path is relative to the `assets` directory next to the working
//! directory.

use std::io::{BufReader, Cursor};

use anyhow::Context;

use crate::{
    data_structures::{
        mesh::{Mesh, RawMesh},
        model::Model,
        texture::{Texture, TextureConfig, TextureRole},
    },
    gpu::Backend,
};

fn asset_path(file_name: &str) -> std::path::PathBuf {
    std::path::Path::new("./").join("assets").join(file_name)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    let path = asset_path(file_name);
    let txt = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("unable to read {}", path.display()))?;
    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(file_name);
    let data = tokio::fs::read(&path)
        .await
        .with_context(|| format!("unable to read {}", path.display()))?;
    Ok(data)
}

/// Read and decode an image file. The extension, when there is one, is used as
/// the format hint.
pub async fn load_texture<B: Backend>(
    backend: &B,
    file_name: &str,
    role: TextureRole,
    config: TextureConfig,
) -> anyhow::Result<Texture<B>> {
    let data = load_binary(file_name).await?;
    let format = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str());
    Texture::from_bytes(backend, role, config, &data, file_name, format)
}

/// Parse an OBJ file into one [`RawMesh`].
///
/// Faces are triangulated and every sub-mesh (`o`/`g` block) is merged into
/// the result. Missing UVs or normals read as zero. Material libraries are not
/// read.
pub async fn load_raw_mesh(file_name: &str) -> anyhow::Result<RawMesh> {
    let obj_text = load_string(file_name).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, _) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| async { Ok(Default::default()) },
    )
    .await
    .with_context(|| format!("unable to parse {file_name}"))?;

    if models.is_empty() {
        anyhow::bail!("{file_name} contains no geometry");
    }

    let mut raw = RawMesh::default();
    for m in &models {
        let count = m.mesh.positions.len() / 3;
        let mut uvs = Vec::with_capacity(count * 2);
        let mut normals = Vec::with_capacity(count * 3);
        for i in 0..count {
            uvs.push(m.mesh.texcoords.get(i * 2).map_or(0.0, |f| *f));
            // OBJ puts v = 0 at the bottom of the image, wgpu at the top
            uvs.push(1.0 - m.mesh.texcoords.get(i * 2 + 1).map_or(1.0, |f| *f));
            for axis in 0..3 {
                normals.push(m.mesh.normals.get(i * 3 + axis).map_or(0.0, |f| *f));
            }
        }
        raw.append(RawMesh {
            vertices: m.mesh.positions.clone(),
            uvs,
            normals,
            indices: m.mesh.indices.clone(),
        });
    }
    log::info!(
        "parsed {}: {} sub-mesh(es), {} vertices, {} triangles",
        file_name,
        models.len(),
        raw.element_count(),
        raw.indices.len() / 3
    );
    Ok(raw)
}

/// Load an OBJ file and upload it as a [`Model`] with an identity transform.
pub async fn load_model<B: Backend>(backend: &B, file_name: &str) -> anyhow::Result<Model<B>> {
    let raw = load_raw_mesh(file_name).await?;
    let mesh = Mesh::create(backend, file_name, raw.element_count(), &raw)
        .with_context(|| format!("invalid mesh data in {file_name}"))?;
    Ok(Model::new(mesh))
}
