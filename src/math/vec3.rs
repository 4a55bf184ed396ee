use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 3D vector with f32 components.
///
/// Positions, velocities, forces, half-extents and scaling factors all use this type.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(C)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// Zero vector (0, 0, 0)
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// One vector (1, 1, 1)
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Unit vector along X axis
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// Unit vector along Y axis
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Unit vector along Z axis
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Creates a Vec3 with all components set to `v`
    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// Unit vector for axis index 0 (X), 1 (Y) or 2 (Z). Other indices map to Y.
    #[inline]
    pub const fn unit_axis(axis: usize) -> Self {
        match axis {
            0 => Self::X,
            2 => Self::Z,
            _ => Self::Y,
        }
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Returns a unit-length copy, or zero if the vector is degenerate
    #[inline]
    pub fn normalize(self) -> Self {
        self.try_normalize().unwrap_or(Self::ZERO)
    }

    /// Returns a unit-length copy, or `None` if the vector is degenerate
    #[inline]
    pub fn try_normalize(self) -> Option<Self> {
        let len_sq = self.length_squared();
        if len_sq > 1e-12 && len_sq.is_finite() {
            Some(self / len_sq.sqrt())
        } else {
            None
        }
    }

    #[inline]
    pub fn is_near_zero(self, epsilon: f32) -> bool {
        self.length_squared() < epsilon * epsilon
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    /// Component-wise minimum
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    #[inline]
    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs(), self.z.abs())
    }

    /// Largest of the three components
    #[inline]
    pub fn max_element(self) -> f32 {
        self.x.max(self.y).max(self.z)
    }

    /// Smallest of the three components
    #[inline]
    pub fn min_element(self) -> f32 {
        self.x.min(self.y).min(self.z)
    }

    /// Component-wise multiplication
    #[inline]
    pub fn component_mul(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    /// Component-wise division
    #[inline]
    pub fn component_div(self, other: Self) -> Self {
        Self::new(self.x / other.x, self.y / other.y, self.z / other.z)
    }

    /// Picks `+v` or `-v` per component following the sign of `direction`.
    /// Zero counts as positive.
    #[inline]
    pub fn signed_by(self, direction: Self) -> Self {
        let pick = |v: f32, d: f32| if d >= 0.0 { v } else { -v };
        Self::new(
            pick(self.x, direction.x),
            pick(self.y, direction.y),
            pick(self.z, direction.z),
        )
    }

    #[inline]
    pub fn project_onto(self, other: Self) -> Self {
        let other_len_sq = other.length_squared();
        if other_len_sq > 1e-12 {
            other * (self.dot(other) / other_len_sq)
        } else {
            Self::ZERO
        }
    }

    /// Removes the component along `normal` (assumed unit length)
    #[inline]
    pub fn project_on_plane(self, normal: Self) -> Self {
        self - normal * self.dot(normal)
    }

    #[inline]
    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Returns a unit vector perpendicular to this one
    #[inline]
    pub fn any_perpendicular(self) -> Self {
        let a = self.abs();
        let other = if a.x <= a.y && a.x <= a.z {
            Self::X
        } else if a.y <= a.z {
            Self::Y
        } else {
            Self::Z
        };
        self.cross(other).normalize()
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, o: Self) -> Self {
        Self::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, o: Self) -> Self {
        Self::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl SubAssign for Vec3 {
    #[inline]
    fn sub_assign(&mut self, o: Self) {
        *self = *self - o;
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Mul<Vec3> for f32 {
    type Output = Vec3;

    #[inline]
    fn mul(self, v: Vec3) -> Vec3 {
        v * self
    }
}

impl MulAssign<f32> for Vec3 {
    #[inline]
    fn mul_assign(&mut self, s: f32) {
        *self = *self * s;
    }
}

impl Div<f32> for Vec3 {
    type Output = Self;

    #[inline]
    fn div(self, s: f32) -> Self {
        self * (1.0 / s)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Index<usize> for Vec3 {
    type Output = f32;

    #[inline]
    fn index(&self, index: usize) -> &f32 {
        match index {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vec3 index out of bounds: {}", index),
        }
    }
}

impl IndexMut<usize> for Vec3 {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("Vec3 index out of bounds: {}", index),
        }
    }
}

impl From<[f32; 3]> for Vec3 {
    #[inline]
    fn from(a: [f32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn vec3_approx_eq(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPSILON
    }

    #[test]
    fn test_cross_is_right_handed() {
        assert!(vec3_approx_eq(Vec3::X.cross(Vec3::Y), Vec3::Z));
        assert!(vec3_approx_eq(Vec3::Y.cross(Vec3::X), -Vec3::Z));
    }

    #[test]
    fn test_normalize_degenerate() {
        assert_eq!(Vec3::ZERO.normalize(), Vec3::ZERO);
        assert!(Vec3::ZERO.try_normalize().is_none());
        let n = Vec3::new(3.0, 4.0, 0.0).normalize();
        assert!(vec3_approx_eq(n, Vec3::new(0.6, 0.8, 0.0)));
    }

    #[test]
    fn test_signed_by() {
        let he = Vec3::new(1.0, 2.0, 3.0);
        let s = he.signed_by(Vec3::new(-0.5, 0.0, 2.0));
        assert_eq!(s, Vec3::new(-1.0, 2.0, 3.0));
    }

    #[test]
    fn test_project_on_plane() {
        let v = Vec3::new(1.0, -2.0, 3.0);
        let p = v.project_on_plane(Vec3::Y);
        assert!(vec3_approx_eq(p, Vec3::new(1.0, 0.0, 3.0)));
    }

    #[test]
    fn test_any_perpendicular() {
        for v in [Vec3::X, Vec3::Y, Vec3::new(1.0, 2.0, -3.0)] {
            let p = v.any_perpendicular();
            assert!(p.dot(v).abs() < 1e-5);
            assert!((p.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_unit_axis_and_index() {
        let mut v = Vec3::unit_axis(2);
        assert_eq!(v, Vec3::Z);
        v[0] = 4.0;
        assert_eq!(v[0], 4.0);
        assert_eq!(Vec3::unit_axis(7), Vec3::Y);
    }
}
