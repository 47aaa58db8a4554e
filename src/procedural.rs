//! Procedural terrain geometry.
//!
//! [`generate_terrain`] lays out a flat, regular grid in the XZ plane and
//! triangulates it. Output depends on nothing but its two parameters.

use thiserror::Error;

use crate::data_structures::mesh::RawMesh;

/// How often the albedo texture repeats across the whole terrain.
pub const TERRAIN_TILING: f32 = 40.0;

#[derive(Debug, Error, PartialEq)]
pub enum GenerateError {
    #[error("terrain resolution must be at least 2 vertices per side, got {0}")]
    Resolution(u32),
    #[error("terrain world size must be positive and finite, got {0}")]
    WorldSize(f32),
    #[error("terrain resolution {0} needs more vertices than 32-bit indices can address")]
    TooLarge(u32),
}

/// Build a `resolution x resolution` vertex grid spanning `[0, world_size]`
/// in X and Z at `y = 0`.
///
/// Vertices are row-major with rows along Z and columns along X. UVs run from
/// 0 to [`TERRAIN_TILING`] across the grid. Normals are all `(0, 1, 0)`; any
/// height displacement must recompute them from the faces.
///
/// Each cell emits `(top-left, bottom-left, top-right)` and
/// `(top-right, bottom-left, bottom-right)`, which faces +Y.
pub fn generate_terrain(resolution: u32, world_size: f32) -> Result<RawMesh, GenerateError> {
    if resolution < 2 {
        return Err(GenerateError::Resolution(resolution));
    }
    if !(world_size.is_finite() && world_size > 0.0) {
        return Err(GenerateError::WorldSize(world_size));
    }
    if (resolution as u64).pow(2) > u32::MAX as u64 {
        return Err(GenerateError::TooLarge(resolution));
    }

    let n = resolution as usize;
    let cells = n - 1;
    let last = (resolution - 1) as f32;

    let mut vertices = Vec::with_capacity(n * n * 3);
    let mut uvs = Vec::with_capacity(n * n * 2);
    let mut normals = Vec::with_capacity(n * n * 3);
    let mut indices = Vec::with_capacity(6 * cells * cells);

    for row in 0..resolution {
        for column in 0..resolution {
            let u = column as f32 / last;
            let v = row as f32 / last;

            vertices.extend_from_slice(&[u * world_size, 0.0, v * world_size]);
            uvs.extend_from_slice(&[u * TERRAIN_TILING, v * TERRAIN_TILING]);
            normals.extend_from_slice(&[0.0, 1.0, 0.0]);
        }
    }

    for z in 0..resolution - 1 {
        for x in 0..resolution - 1 {
            let top_left = z * resolution + x;
            let top_right = top_left + 1;
            let bottom_left = (z + 1) * resolution + x;
            let bottom_right = bottom_left + 1;

            indices.extend_from_slice(&[
                top_left,
                bottom_left,
                top_right,
                top_right,
                bottom_left,
                bottom_right,
            ]);
        }
    }

    Ok(RawMesh {
        vertices,
        uvs,
        normals,
        indices,
    })
}
