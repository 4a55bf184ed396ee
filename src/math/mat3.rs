use std::ops::{Add, AddAssign, Mul};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::quat::Quat;
use super::vec3::Vec3;

/// A 3x3 matrix stored in column-major order.
///
/// Used for rotation matrices and inertia tensors.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(C)]
pub struct Mat3 {
    pub cols: [Vec3; 3],
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat3 {
    pub const ZERO: Self = Self {
        cols: [Vec3::ZERO, Vec3::ZERO, Vec3::ZERO],
    };

    pub const IDENTITY: Self = Self {
        cols: [Vec3::X, Vec3::Y, Vec3::Z],
    };

    #[inline]
    pub const fn from_cols(c0: Vec3, c1: Vec3, c2: Vec3) -> Self {
        Self { cols: [c0, c1, c2] }
    }

    #[inline]
    pub fn from_diagonal(diag: Vec3) -> Self {
        Self::from_cols(
            Vec3::new(diag.x, 0.0, 0.0),
            Vec3::new(0.0, diag.y, 0.0),
            Vec3::new(0.0, 0.0, diag.z),
        )
    }

    /// Rotation matrix of a unit quaternion
    pub fn from_quat(q: Quat) -> Self {
        let (x2, y2, z2) = (q.x + q.x, q.y + q.y, q.z + q.z);
        let (xx, xy, xz) = (q.x * x2, q.x * y2, q.x * z2);
        let (yy, yz, zz) = (q.y * y2, q.y * z2, q.z * z2);
        let (wx, wy, wz) = (q.w * x2, q.w * y2, q.w * z2);

        Self::from_cols(
            Vec3::new(1.0 - (yy + zz), xy + wz, xz - wy),
            Vec3::new(xy - wz, 1.0 - (xx + zz), yz + wx),
            Vec3::new(xz + wy, yz - wx, 1.0 - (xx + yy)),
        )
    }

    /// Quaternion of a pure rotation matrix (trace method)
    pub fn to_quat(self) -> Quat {
        let [c0, c1, c2] = self.cols;
        let trace = c0.x + c1.y + c2.z;

        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Quat::new((c1.z - c2.y) / s, (c2.x - c0.z) / s, (c0.y - c1.x) / s, 0.25 * s)
        } else if c0.x > c1.y && c0.x > c2.z {
            let s = (1.0 + c0.x - c1.y - c2.z).sqrt() * 2.0;
            Quat::new(0.25 * s, (c0.y + c1.x) / s, (c2.x + c0.z) / s, (c1.z - c2.y) / s)
        } else if c1.y > c2.z {
            let s = (1.0 + c1.y - c0.x - c2.z).sqrt() * 2.0;
            Quat::new((c0.y + c1.x) / s, 0.25 * s, (c1.z + c2.y) / s, (c2.x - c0.z) / s)
        } else {
            let s = (1.0 + c2.z - c0.x - c1.y).sqrt() * 2.0;
            Quat::new((c2.x + c0.z) / s, (c1.z + c2.y) / s, 0.25 * s, (c0.y - c1.x) / s)
        };
        q.normalize()
    }

    #[inline]
    pub fn transpose(self) -> Self {
        let [c0, c1, c2] = self.cols;
        Self::from_cols(
            Vec3::new(c0.x, c1.x, c2.x),
            Vec3::new(c0.y, c1.y, c2.y),
            Vec3::new(c0.z, c1.z, c2.z),
        )
    }

    #[inline]
    pub fn determinant(self) -> f32 {
        self.cols[0].dot(self.cols[1].cross(self.cols[2]))
    }

    /// Returns the inverse, or `None` for a singular matrix
    pub fn try_inverse(self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let r0 = self.cols[1].cross(self.cols[2]) * inv_det;
        let r1 = self.cols[2].cross(self.cols[0]) * inv_det;
        let r2 = self.cols[0].cross(self.cols[1]) * inv_det;
        // r0..r2 are the rows of the inverse
        Some(Self::from_cols(r0, r1, r2).transpose())
    }

    /// Matrix-vector product
    #[inline]
    pub fn mul_vec(self, v: Vec3) -> Vec3 {
        self.cols[0] * v.x + self.cols[1] * v.y + self.cols[2] * v.z
    }

    #[inline]
    pub fn diagonal(self) -> Vec3 {
        Vec3::new(self.cols[0].x, self.cols[1].y, self.cols[2].z)
    }

    #[inline]
    pub fn scale(self, s: f32) -> Self {
        Self::from_cols(self.cols[0] * s, self.cols[1] * s, self.cols[2] * s)
    }

    /// True if every element is exactly zero
    #[inline]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    /// Rotates a tensor into another frame: `R * self * Rᵀ`
    #[inline]
    pub fn rotated(self, rotation: Mat3) -> Self {
        rotation * self * rotation.transpose()
    }
}

impl Mul for Mat3 {
    type Output = Self;

    #[inline]
    fn mul(self, o: Self) -> Self {
        Self::from_cols(
            self.mul_vec(o.cols[0]),
            self.mul_vec(o.cols[1]),
            self.mul_vec(o.cols[2]),
        )
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;

    #[inline]
    fn mul(self, v: Vec3) -> Vec3 {
        self.mul_vec(v)
    }
}

impl Add for Mat3 {
    type Output = Self;

    #[inline]
    fn add(self, o: Self) -> Self {
        Self::from_cols(
            self.cols[0] + o.cols[0],
            self.cols[1] + o.cols[1],
            self.cols[2] + o.cols[2],
        )
    }
}

impl AddAssign for Mat3 {
    #[inline]
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn mat_approx_eq(a: Mat3, b: Mat3) -> bool {
        (0..3).all(|i| (a.cols[i] - b.cols[i]).length() < EPSILON)
    }

    #[test]
    fn test_quat_round_trip() {
        let q = Quat::from_axis_angle(Vec3::new(1.0, 2.0, 0.5), 2.5);
        let back = Mat3::from_quat(q).to_quat();
        assert!(q.dot(back).abs() > 1.0 - EPSILON);
    }

    #[test]
    fn test_inverse() {
        let m = Mat3::from_cols(
            Vec3::new(2.0, 0.0, 1.0),
            Vec3::new(1.0, 3.0, 0.0),
            Vec3::new(0.0, 1.0, 4.0),
        );
        let inv = m.try_inverse().unwrap();
        assert!(mat_approx_eq(m * inv, Mat3::IDENTITY));
        assert!(Mat3::ZERO.try_inverse().is_none());
    }

    #[test]
    fn test_rotated_diagonal_tensor() {
        let inertia = Mat3::from_diagonal(Vec3::new(1.0, 2.0, 3.0));
        let r = Mat3::from_quat(Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2));
        let rotated = inertia.rotated(r);
        // X and Y swap under a quarter turn about Z
        assert!((rotated.diagonal() - Vec3::new(2.0, 1.0, 3.0)).length() < EPSILON);
    }
}
