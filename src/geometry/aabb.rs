use crate::math::{Mat4, Transform, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box defined by minimum and maximum points.
///
/// Shapes cache their local box; collision objects derive a world box from it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Entry of a ray into a box: parameter along the ray and the face normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlabHit {
    pub t: f32,
    pub normal: Vec3,
}

impl Aabb {
    /// Contains no points; the identity for [`Aabb::union`]
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Symmetric box around the origin
    #[inline]
    pub fn symmetric(half_extents: Vec3) -> Self {
        Self::new(-half_extents, half_extents)
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points
            .into_iter()
            .fold(Self::EMPTY, |aabb, p| aabb.expand_to_include(p))
    }

    #[inline]
    pub fn center(self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn half_extents(self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    #[inline]
    pub fn size(self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn volume(self) -> f32 {
        let s = self.size();
        s.x * s.y * s.z
    }

    #[inline]
    pub fn surface_area(self) -> f32 {
        let s = self.size();
        2.0 * (s.x * s.y + s.y * s.z + s.z * s.x)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    #[inline]
    pub fn contains_point(self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Overlap test; touching boxes count as intersecting
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    #[inline]
    pub fn expand_to_include(self, p: Vec3) -> Self {
        Self::new(self.min.min(p), self.max.max(p))
    }

    /// Grows the box by `margin` on every side
    #[inline]
    pub fn expand(self, margin: f32) -> Self {
        let m = Vec3::splat(margin);
        Self::new(self.min - m, self.max + m)
    }

    /// Component-wise scale of both corners, re-sorted for negative factors
    #[inline]
    pub fn scaled(self, scale: Vec3) -> Self {
        let a = self.min.component_mul(scale);
        let b = self.max.component_mul(scale);
        Self::new(a.min(b), a.max(b))
    }

    #[inline]
    pub fn closest_point(self, p: Vec3) -> Vec3 {
        p.max(self.min).min(self.max)
    }

    pub fn corners(self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of the eight corners after an affine transform
    pub fn transformed(self, m: &Mat4) -> Self {
        if self.is_empty() {
            return self;
        }
        Self::from_points(self.corners().into_iter().map(|c| m.transform_point(c)))
    }

    /// Bounds of the eight corners after a rigid transform
    pub fn transformed_rigid(self, t: Transform) -> Self {
        if self.is_empty() {
            return self;
        }
        Self::from_points(self.corners().into_iter().map(|c| t.transform_point(c)))
    }

    /// 0 = x, 1 = y, 2 = z
    #[inline]
    pub fn longest_axis(self) -> usize {
        let s = self.size();
        if s.x >= s.y && s.x >= s.z {
            0
        } else if s.y >= s.z {
            1
        } else {
            2
        }
    }

    /// Slab test for the segment `origin + t * dir`, `t` in `[0, max_t]`.
    ///
    /// Returns the entry parameter and the outward normal of the entry
    /// face. A ray starting inside reports `t = 0` and a zero normal.
    pub fn ray_entry(self, origin: Vec3, dir: Vec3, max_t: f32) -> Option<SlabHit> {
        let mut t_enter = 0.0f32;
        let mut t_exit = max_t;
        let mut normal = Vec3::ZERO;

        for axis in 0..3 {
            let (o, d) = (origin[axis], dir[axis]);
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if d.abs() < 1e-12 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
            let mut face = -Vec3::unit_axis(axis);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
                face = Vec3::unit_axis(axis);
            }
            if t0 > t_enter {
                t_enter = t0;
                normal = face;
            }
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }
        Some(SlabHit { t: t_enter, normal })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quat;

    #[test]
    fn test_center_and_extents() {
        let aabb = Aabb::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.center(), Vec3::ZERO);
        assert_eq!(aabb.half_extents(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.volume(), 48.0);
    }

    #[test]
    fn test_intersects_touching() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let c = Aabb::new(Vec3::new(2.5, 0.0, 0.0), Vec3::new(3.0, 1.0, 1.0));
        assert!(a.intersects(b));
        assert!(!a.intersects(c));
    }

    #[test]
    fn test_empty_union_identity() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(Aabb::EMPTY.union(a), a);
        assert!(Aabb::EMPTY.is_empty());
    }

    #[test]
    fn test_transformed_rotated_box() {
        let aabb = Aabb::symmetric(Vec3::new(2.0, 1.0, 1.0));
        let m = Mat4::from_translation_rotation(
            Vec3::new(0.0, 10.0, 0.0),
            Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2),
        );
        let t = aabb.transformed(&m);
        assert!((t.min - Vec3::new(-1.0, 8.0, -1.0)).length() < 1e-5);
        assert!((t.max - Vec3::new(1.0, 12.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_ray_entry_face_normal() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let hit = aabb
            .ray_entry(Vec3::new(0.5, 3.0, 0.5), -Vec3::Y, 10.0)
            .unwrap();
        assert!((hit.t - 2.0).abs() < 1e-6);
        assert_eq!(hit.normal, Vec3::Y);

        assert!(aabb.ray_entry(Vec3::new(-1.0, 2.0, 0.5), Vec3::X, 10.0).is_none());
        assert!(aabb.ray_entry(Vec3::new(0.5, 3.0, 0.5), -Vec3::Y, 1.0).is_none());
    }

    #[test]
    fn test_scaled_negative() {
        let aabb = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 3.0));
        let s = aabb.scaled(Vec3::new(-1.0, 2.0, 1.0));
        assert_eq!(s.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(s.max, Vec3::new(0.0, 4.0, 3.0));
    }
}
