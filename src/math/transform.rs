#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::mat3::Mat3;
use super::mat4::Mat4;
use super::quat::Quat;
use super::vec3::Vec3;

/// A rigid frame: position plus rotation.
///
/// Compound children and joint frames are expressed with this type.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    #[inline]
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    #[inline]
    pub const fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    #[inline]
    pub fn rotation_matrix(self) -> Mat3 {
        Mat3::from_quat(self.rotation)
    }

    /// Local point to parent space
    #[inline]
    pub fn transform_point(self, point: Vec3) -> Vec3 {
        self.rotation.rotate_vec(point) + self.position
    }

    /// Local direction to parent space (no translation)
    #[inline]
    pub fn transform_vector(self, vector: Vec3) -> Vec3 {
        self.rotation.rotate_vec(vector)
    }

    #[inline]
    pub fn inverse_transform_point(self, point: Vec3) -> Vec3 {
        self.rotation.inverse_rotate_vec(point - self.position)
    }

    #[inline]
    pub fn inverse_transform_vector(self, vector: Vec3) -> Vec3 {
        self.rotation.inverse_rotate_vec(vector)
    }

    #[inline]
    pub fn inverse(self) -> Self {
        let rotation = self.rotation.conjugate();
        Self::new(rotation.rotate_vec(-self.position), rotation)
    }

    /// `self * other`: maps `other`'s local space through `self`
    #[inline]
    pub fn compose(self, other: Self) -> Self {
        Self::new(
            self.transform_point(other.position),
            (self.rotation * other.rotation).normalize(),
        )
    }

    /// Unscaled 4x4 matrix of this frame
    #[inline]
    pub fn to_mat4(self) -> Mat4 {
        Mat4::from_translation_rotation(self.position, self.rotation)
    }
}

impl From<Mat4> for Transform {
    /// Drops any scale carried by the matrix
    fn from(m: Mat4) -> Self {
        Self::new(m.translation(), m.rotation())
    }
}
