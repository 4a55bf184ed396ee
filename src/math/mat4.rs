use std::ops::Mul;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::mat3::Mat3;
use super::quat::Quat;
use super::vec3::Vec3;

/// A 4x4 affine matrix in column-major order.
///
/// Collision objects store their world transform as this type, so a
/// renderer can read it back directly. Elements 12..15 hold the
/// translation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Mat4 {
    pub elements: [f32; 16],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        elements: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Composes `T * R * S`
    pub fn from_translation_rotation_scale(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        let r = Mat3::from_quat(rotation.normalize());
        let c0 = r.cols[0] * scale.x;
        let c1 = r.cols[1] * scale.y;
        let c2 = r.cols[2] * scale.z;
        Self {
            elements: [
                c0.x, c0.y, c0.z, 0.0, //
                c1.x, c1.y, c1.z, 0.0, //
                c2.x, c2.y, c2.z, 0.0, //
                translation.x, translation.y, translation.z, 1.0,
            ],
        }
    }

    #[inline]
    pub fn from_translation_rotation(translation: Vec3, rotation: Quat) -> Self {
        Self::from_translation_rotation_scale(translation, rotation, Vec3::ONE)
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self::from_translation_rotation_scale(translation, Quat::IDENTITY, Vec3::ONE)
    }

    #[inline]
    fn column(&self, i: usize) -> Vec3 {
        let e = &self.elements;
        Vec3::new(e[i * 4], e[i * 4 + 1], e[i * 4 + 2])
    }

    #[inline]
    pub fn translation(&self) -> Vec3 {
        self.column(3)
    }

    pub fn set_translation(&mut self, t: Vec3) {
        self.elements[12] = t.x;
        self.elements[13] = t.y;
        self.elements[14] = t.z;
    }

    /// Per-axis scale, taken as the length of each basis column
    #[inline]
    pub fn scale(&self) -> Vec3 {
        Vec3::new(
            self.column(0).length(),
            self.column(1).length(),
            self.column(2).length(),
        )
    }

    /// Rotation with scale divided out. A zero scale axis yields the identity.
    pub fn rotation(&self) -> Quat {
        let s = self.scale();
        if s.min_element() <= f32::EPSILON {
            return Quat::IDENTITY;
        }
        Mat3::from_cols(self.column(0) / s.x, self.column(1) / s.y, self.column(2) / s.z).to_quat()
    }

    /// Upper-left 3x3 block (rotation times scale)
    #[inline]
    pub fn basis(&self) -> Mat3 {
        Mat3::from_cols(self.column(0), self.column(1), self.column(2))
    }

    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.basis().mul_vec(p) + self.translation()
    }

    #[inline]
    pub fn transform_direction(&self, d: Vec3) -> Vec3 {
        self.basis().mul_vec(d)
    }

    /// Inverse of an affine matrix; `None` when the basis is singular
    pub fn inverse(&self) -> Option<Self> {
        let inv = self.basis().try_inverse()?;
        let t = -inv.mul_vec(self.translation());
        let [c0, c1, c2] = inv.cols;
        Some(Self {
            elements: [
                c0.x, c0.y, c0.z, 0.0, //
                c1.x, c1.y, c1.z, 0.0, //
                c2.x, c2.y, c2.z, 0.0, //
                t.x, t.y, t.z, 1.0,
            ],
        })
    }
}

impl Mul for Mat4 {
    type Output = Self;

    fn mul(self, o: Self) -> Self {
        let a = &self.elements;
        let b = &o.elements;
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
            }
        }
        Self { elements: out }
    }
}
