//! Accumulating model transforms.

use cgmath::{Matrix4, Rad, SquareMatrix, Vector3};

/// A 4x4 affine model matrix.
///
/// Every mutation right-multiplies the current matrix, so translations and
/// rotations are applied in the object's local frame and accumulate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    matrix: Matrix4<f32>,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.matrix = self.matrix * Matrix4::from_translation(delta);
    }

    /// Rotate about the local Y axis by `angle` radians.
    pub fn rotate_y(&mut self, angle: f32) {
        self.matrix = self.matrix * Matrix4::from_angle_y(Rad(angle));
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        self.matrix
    }

    /// World-space position of the local origin.
    pub fn origin(&self) -> Vector3<f32> {
        self.matrix.w.truncate()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Matrix4<f32>> for Transform {
    fn from(matrix: Matrix4<f32>) -> Self {
        Self { matrix }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Matrix4<f32>, b: Matrix4<f32>) {
        let a: [[f32; 4]; 4] = a.into();
        let b: [[f32; 4]; 4] = b.into();
        for (col_a, col_b) in a.iter().zip(b.iter()) {
            for (x, y) in col_a.iter().zip(col_b.iter()) {
                assert!((x - y).abs() < 1e-5, "{a:?} != {b:?}");
            }
        }
    }

    #[test]
    fn translations_accumulate() {
        let mut stepwise = Transform::identity();
        stepwise.translate(Vector3::new(1.0, 2.0, 3.0));
        stepwise.translate(Vector3::new(-4.0, 0.5, 1.0));

        let mut once = Transform::identity();
        once.translate(Vector3::new(-3.0, 2.5, 4.0));

        assert_close(stepwise.matrix(), once.matrix());
        assert_eq!(stepwise.origin(), Vector3::new(-3.0, 2.5, 4.0));
    }

    #[test]
    fn rotations_accumulate() {
        let mut stepwise = Transform::identity();
        stepwise.rotate_y(0.3);
        stepwise.rotate_y(1.1);

        let mut once = Transform::identity();
        once.rotate_y(1.4);

        assert_close(stepwise.matrix(), once.matrix());
    }

    #[test]
    fn translation_after_rotation_is_local() {
        let mut transform = Transform::identity();
        transform.rotate_y(std::f32::consts::FRAC_PI_2);
        transform.translate(Vector3::new(1.0, 0.0, 0.0));

        // local +X points along world -Z after a quarter turn
        let origin = transform.origin();
        assert!(origin.x.abs() < 1e-5);
        assert!((origin.z + 1.0).abs() < 1e-5);

        let mut plain = Transform::identity();
        plain.translate(Vector3::new(1.0, 0.0, 0.0));
        assert_ne!(transform.origin(), plain.origin());
    }
}
