//! Engine data structures.
//!
//! - `mesh` holds vertex data, its validation and the GPU mesh
//! - `texture` wraps a backend image together with its role and unit
//! - `shader` compiles programs and uploads uniforms by name
//! - `material` and `transform` are plain values fed to shaders
//! - `model` pairs a mesh with a transform
//! - `terrain` bundles a generated mesh with its textures and shader

pub mod material;
pub mod mesh;
pub mod model;
pub mod shader;
pub mod terrain;
pub mod texture;
pub mod transform;
