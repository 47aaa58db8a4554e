use cgmath::Vector3;

use crate::{
    data_structures::{mesh::Mesh, transform::Transform},
    gpu::Backend,
};

/// A loaded mesh with its own model transform.
pub struct Model<B: Backend> {
    pub mesh: Mesh<B>,
    pub transform: Transform,
}

impl<B: Backend> Model<B> {
    pub fn new(mesh: Mesh<B>) -> Self {
        Self {
            mesh,
            transform: Transform::identity(),
        }
    }

    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.transform.translate(delta);
    }

    pub fn rotate_y(&mut self, angle: f32) {
        self.transform.rotate_y(angle);
    }
}
