//! Math utilities and types
//!
//! Provides the vector, matrix and transform types shared by the scene graph
//! and the terrain. The world is effectively 2-D; Z is carried for depth
//! ordering of layers.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position, rotation and scale
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    /// Convert to a transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Create a transform from a transformation matrix
    ///
    /// Assumes the matrix was built as translation * rotation * scale with
    /// non-negative scale factors.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let position = Vec3::new(matrix.m14, matrix.m24, matrix.m34);

        let scale_x = Vec3::new(matrix.m11, matrix.m21, matrix.m31).magnitude();
        let scale_y = Vec3::new(matrix.m12, matrix.m22, matrix.m32).magnitude();
        let scale_z = Vec3::new(matrix.m13, matrix.m23, matrix.m33).magnitude();
        let scale = Vec3::new(scale_x, scale_y, scale_z);

        let rotation_matrix = Mat3::new(
            safe_div(matrix.m11, scale_x), safe_div(matrix.m12, scale_y), safe_div(matrix.m13, scale_z),
            safe_div(matrix.m21, scale_x), safe_div(matrix.m22, scale_y), safe_div(matrix.m23, scale_z),
            safe_div(matrix.m31, scale_x), safe_div(matrix.m32, scale_y), safe_div(matrix.m33, scale_z),
        );
        let rotation = Quat::from_matrix(&rotation_matrix);

        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Compose a child transform expressed in this frame: `self ⊗ local`
    pub fn combine(&self, local: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * self.scale.component_mul(&local.position),
            rotation: self.rotation * local.rotation,
            scale: self.scale.component_mul(&local.scale),
        }
    }

    /// Express `global` relative to this frame, the exact inverse of [`Transform::combine`]
    pub fn relative_to(&self, global: &Transform) -> Transform {
        let inv_rotation = self.rotation.inverse();
        let unrotated = inv_rotation * (global.position - self.position);

        Transform {
            position: component_div(&unrotated, &self.scale),
            rotation: inv_rotation * global.rotation,
            scale: component_div(&global.scale, &self.scale),
        }
    }
}

/// Rotation about the Z axis, the only rotation the 2-D world uses
pub fn rotation_z(angle: f32) -> Quat {
    Quat::from_axis_angle(&Vec3::z_axis(), angle)
}

/// Extract the angle about Z from a rotation
pub fn angle_z(rotation: &Quat) -> f32 {
    let (_, _, yaw) = rotation.euler_angles();
    yaw
}

fn safe_div(a: f32, b: f32) -> f32 {
    if b == 0.0 { 0.0 } else { a / b }
}

fn component_div(a: &Vec3, b: &Vec3) -> Vec3 {
    Vec3::new(safe_div(a.x, b.x), safe_div(a.y, b.y), safe_div(a.z, b.z))
}

/// Orthographic projection helpers
pub trait Mat4Ext {
    /// Off-center orthographic projection mapping depth to [0, 1]
    fn orthographic_off_center(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn orthographic_off_center(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        let mut result = Mat4::identity();
        result[(0, 0)] = 2.0 / (right - left);
        result[(1, 1)] = 2.0 / (top - bottom);
        result[(2, 2)] = 1.0 / (near - far);
        result[(0, 3)] = (left + right) / (left - right);
        result[(1, 3)] = (top + bottom) / (bottom - top);
        result[(2, 3)] = near / (near - far);
        result
    }
}
