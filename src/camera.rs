//! Camera and perspective projection.
//!
//! The camera looks down its local -Z axis with +Y up. Its orientation is a
//! quaternion that maps camera-local axes into world space; every mutator
//! composes onto the current state.

use cgmath::{
    EuclideanSpace, InnerSpace, Matrix3, Matrix4, Point3, Quaternion, Rad, Rotation, Rotation3,
    Vector3, perspective,
};

use crate::config::ProjectionConfig;

/// wgpu's clip space has depth in [0, 1] where cgmath produces [-1, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn from_config(width: u32, height: u32, config: &ProjectionConfig) -> Self {
        Self::new(width, height, config.fovy, config.znear, config.zfar)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    orientation: Quaternion<f32>,
    pub projection: Projection,
}

impl Camera {
    pub fn new(position: Point3<f32>, projection: Projection) -> Self {
        Self {
            position,
            orientation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            projection,
        }
    }

    /// Move by a world-space offset.
    pub fn move_by(&mut self, delta: Vector3<f32>) {
        self.position += delta;
    }

    /// Turn towards `target`, keeping world +Y as up.
    ///
    /// A target at the camera position, or straight above or below it, leaves
    /// the orientation unchanged.
    pub fn look_at(&mut self, target: Point3<f32>) {
        let to_target = target - self.position;
        if to_target.magnitude2() <= f32::EPSILON {
            return;
        }
        let forward = to_target.normalize();
        let right = forward.cross(Vector3::unit_y());
        if right.magnitude2() <= f32::EPSILON {
            return;
        }
        let right = right.normalize();
        let up = right.cross(forward);
        self.orientation = Quaternion::from(Matrix3::from_cols(right, up, -forward)).normalize();
    }

    /// Roll about the viewing axis by `angle` radians.
    pub fn rotate_z(&mut self, angle: f32) {
        self.orientation = (self.orientation * Quaternion::from_angle_z(Rad(angle))).normalize();
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.orientation.rotate_vector(-Vector3::unit_z())
    }

    pub fn up(&self) -> Vector3<f32> {
        self.orientation.rotate_vector(Vector3::unit_y())
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::from(self.orientation.invert()) * Matrix4::from_translation(-self.position.to_vec())
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection.calc_matrix()
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.projection.resize(width, height);
    }
}
