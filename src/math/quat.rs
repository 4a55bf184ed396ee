use std::ops::{Mul, MulAssign, Neg};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::vec3::Vec3;

/// A unit quaternion representing a rotation in 3D space.
///
/// Stored as (x, y, z, w) where w is the scalar part.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(C)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    /// Identity quaternion (no rotation)
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Creates a quaternion from a rotation axis and angle (radians).
    /// The axis is normalized; a zero axis yields the identity.
    #[inline]
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        match axis.try_normalize() {
            Some(axis) => {
                let (s, c) = (angle * 0.5).sin_cos();
                Self::new(axis.x * s, axis.y * s, axis.z * s, c)
            }
            None => Self::IDENTITY,
        }
    }

    /// Creates a quaternion from Euler angles in radians.
    ///
    /// The rotation is applied about X first, then Y, then Z
    /// (`R = Rz * Ry * Rx`). Inverse of [`Quat::to_euler`].
    #[inline]
    pub fn from_euler(x: f32, y: f32, z: f32) -> Self {
        let (sx, cx) = (x * 0.5).sin_cos();
        let (sy, cy) = (y * 0.5).sin_cos();
        let (sz, cz) = (z * 0.5).sin_cos();

        Self::new(
            sx * cy * cz - cx * sy * sz,
            cx * sy * cz + sx * cy * sz,
            cx * cy * sz - sx * sy * cz,
            cx * cy * cz + sx * sy * sz,
        )
    }

    /// Returns the Euler angles (about X, Y, Z) matching [`Quat::from_euler`].
    /// The Y angle is clamped to ±π/2 at the gimbal-lock singularity.
    #[inline]
    pub fn to_euler(self) -> Vec3 {
        let sinx = 2.0 * (self.w * self.x + self.y * self.z);
        let cosx = 1.0 - 2.0 * (self.x * self.x + self.y * self.y);

        let siny = 2.0 * (self.w * self.y - self.z * self.x);
        let y = if siny.abs() >= 1.0 {
            std::f32::consts::FRAC_PI_2.copysign(siny)
        } else {
            siny.asin()
        };

        let sinz = 2.0 * (self.w * self.z + self.x * self.y);
        let cosz = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);

        Vec3::new(sinx.atan2(cosx), y, sinz.atan2(cosz))
    }

    /// Shortest-arc rotation taking `from` onto `to`
    pub fn from_rotation_arc(from: Vec3, to: Vec3) -> Self {
        let from = from.normalize();
        let to = to.normalize();
        let dot = from.dot(to);

        if dot > 0.9999 {
            return Self::IDENTITY;
        }
        if dot < -0.9999 {
            return Self::from_axis_angle(from.any_perpendicular(), std::f32::consts::PI);
        }

        let c = from.cross(to);
        Self::new(c.x, c.y, c.z, 1.0 + dot).normalize()
    }

    /// Returns the rotation axis and angle (radians). Identity maps to (X, 0).
    #[inline]
    pub fn to_axis_angle(self) -> (Vec3, f32) {
        let q = if self.w < 0.0 { -self } else { self };
        let angle = 2.0 * q.w.clamp(-1.0, 1.0).acos();
        let s = (1.0 - q.w * q.w).max(0.0).sqrt();
        if s < 1e-4 {
            (Vec3::X, angle)
        } else {
            (Vec3::new(q.x / s, q.y / s, q.z / s), angle)
        }
    }

    /// Rotation angle in [0, π]
    #[inline]
    pub fn angle(self) -> f32 {
        2.0 * self.w.abs().min(1.0).acos()
    }

    /// Vector (imaginary) part
    #[inline]
    pub fn xyz(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Returns a unit quaternion, or the identity if degenerate
    #[inline]
    pub fn normalize(self) -> Self {
        let len_sq = self.length_squared();
        if len_sq > 1e-12 && len_sq.is_finite() {
            let inv = 1.0 / len_sq.sqrt();
            Self::new(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
        } else {
            Self::IDENTITY
        }
    }

    /// Inverse rotation for unit quaternions
    #[inline]
    pub fn conjugate(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Angle of the rotation taking `self` to `other`
    #[inline]
    pub fn angle_between(self, other: Self) -> f32 {
        (self.conjugate() * other).angle()
    }

    #[inline]
    pub fn rotate_vec(self, v: Vec3) -> Vec3 {
        let qv = self.xyz();
        let uv = qv.cross(v);
        let uuv = qv.cross(uv);
        v + (uv * self.w + uuv) * 2.0
    }

    #[inline]
    pub fn inverse_rotate_vec(self, v: Vec3) -> Vec3 {
        self.conjugate().rotate_vec(v)
    }

    /// Splits the rotation into `(swing, twist)` with `self = swing * twist`,
    /// where `twist` rotates purely about `axis` (unit length).
    pub fn swing_twist(self, axis: Vec3) -> (Self, Self) {
        let projected = axis * self.xyz().dot(axis);
        let twist = Self::new(projected.x, projected.y, projected.z, self.w);
        if twist.length_squared() < 1e-12 {
            // 180 degree swing: twist is undefined
            return (self, Self::IDENTITY);
        }
        let twist = twist.normalize();
        (self * twist.conjugate(), twist)
    }

    /// Signed angle of a pure rotation about `axis`, in (-π, π]
    #[inline]
    pub fn signed_angle_about(self, axis: Vec3) -> f32 {
        let s = self.xyz().dot(axis);
        super::utils::normalize_angle(2.0 * s.atan2(self.w))
    }

    pub fn slerp(self, other: Self, t: f32) -> Self {
        let mut dot = self.dot(other);
        let other = if dot < 0.0 {
            dot = -dot;
            -other
        } else {
            other
        };

        if dot > 0.9995 {
            return Self::new(
                self.x + t * (other.x - self.x),
                self.y + t * (other.y - self.y),
                self.z + t * (other.z - self.z),
                self.w + t * (other.w - self.w),
            )
            .normalize();
        }

        let theta = dot.clamp(-1.0, 1.0).acos();
        let sin_theta = theta.sin();
        let s0 = ((1.0 - t) * theta).sin() / sin_theta;
        let s1 = (t * theta).sin() / sin_theta;
        Self::new(
            s0 * self.x + s1 * other.x,
            s0 * self.y + s1 * other.y,
            s0 * self.z + s1 * other.z,
            s0 * self.w + s1 * other.w,
        )
    }

    /// Advances the orientation by `angular_velocity` over `dt`.
    ///
    /// The delta is built from axis = normalize(ω) and angle = |ω|·dt and
    /// composed as `self * delta`.
    #[inline]
    pub fn integrate(self, angular_velocity: Vec3, dt: f32) -> Self {
        let speed = angular_velocity.length();
        if speed < 1e-10 {
            return self;
        }
        let delta = Self::from_axis_angle(angular_velocity / speed, speed * dt);
        (self * delta).normalize()
    }
}

impl Mul for Quat {
    type Output = Self;

    /// Hamilton product; `a * b` applies `b` first
    #[inline]
    fn mul(self, o: Self) -> Self {
        Self::new(
            self.w * o.x + self.x * o.w + self.y * o.z - self.z * o.y,
            self.w * o.y - self.x * o.z + self.y * o.w + self.z * o.x,
            self.w * o.z + self.x * o.y - self.y * o.x + self.z * o.w,
            self.w * o.w - self.x * o.x - self.y * o.y - self.z * o.z,
        )
    }
}

impl Mul<Vec3> for Quat {
    type Output = Vec3;

    #[inline]
    fn mul(self, v: Vec3) -> Vec3 {
        self.rotate_vec(v)
    }
}

impl MulAssign for Quat {
    #[inline]
    fn mul_assign(&mut self, other: Self) {
        *self = *self * other;
    }
}

impl Neg for Quat {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, -self.w)
    }
}
