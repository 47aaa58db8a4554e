//! terra-ngin
//!
//! A small wgpu renderer: a textured, lit model spins above a procedurally
//! generated terrain. Resources are written against the [`gpu::Backend`] and
//! [`gpu::Commands`] traits, so everything except the window loop also runs on
//! the headless backend.
//!
//! High-level modules
//! - `procedural`: the terrain grid generator
//! - `data_structures`: meshes, textures, shaders, materials, models, terrain
//! - `render`: per-frame draw orchestration and frame statistics
//! - `camera`: quaternion camera and perspective projection
//! - `resources`: asset loading (OBJ models, images, WGSL)
//! - `gpu`: backend traits, the wgpu implementation and a headless recorder
//! - `context`, `scene`, `app`: window, demo scene and event loop
//! - `config`: start-up parameters with defaults
//!

pub mod app;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod gpu;
pub mod procedural;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use wgpu::Color;
