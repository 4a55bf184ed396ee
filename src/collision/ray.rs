//! Ray tests against placed shapes.
//!
//! Rays are `origin + t * dir` with `t` in `[0, max_t]`. The world-space
//! ray is mapped into shape space by the inverse transform, which keeps
//! the parameter `t` unchanged, so hits compare across objects directly.

use crate::geometry::{Aabb, CollisionShape, Shape};
use crate::math::{Mat4, Vec3};

/// Nearest ray hit on a single shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Ray parameter; equals distance when `dir` is unit length
    pub t: f32,
    /// World-space unit normal at the hit
    pub normal: Vec3,
}

/// Casts a world-space ray against `shape` placed by `transform`
pub fn ray_test(
    shape: &CollisionShape,
    transform: &Mat4,
    origin: Vec3,
    dir: Vec3,
    max_t: f32,
) -> Option<RayHit> {
    let inverse = transform.inverse()?;
    let local_origin = inverse.transform_point(origin);
    let local_dir = inverse.transform_direction(dir);
    let (t, local_normal) = local_ray_test(shape, local_origin, local_dir, max_t)?;

    // Normals map by the inverse transpose
    let normal = inverse
        .basis()
        .transpose()
        .mul_vec(local_normal)
        .try_normalize()
        .unwrap_or(-dir.normalize());
    Some(RayHit { t, normal })
}

/// Ray test in the shape's own frame: `(t, local normal)`
pub fn local_ray_test(
    shape: &CollisionShape,
    origin: Vec3,
    dir: Vec3,
    max_t: f32,
) -> Option<(f32, Vec3)> {
    match shape {
        CollisionShape::Sphere(s) => ray_sphere(origin, dir, s.radius_with_margin(), max_t),
        CollisionShape::Box(b) => ray_aabb(Aabb::symmetric(b.half_extents_with_margin()), origin, dir, max_t),
        CollisionShape::TriangleMesh(m) => m.ray_test(origin, dir, max_t),
        CollisionShape::Heightfield(h) => h.ray_test(origin, dir, max_t),
        CollisionShape::Compound(c) => {
            let scale = c.local_scaling();
            let o = origin.component_div(scale);
            let d = dir.component_div(scale);
            let mut best: Option<(f32, Vec3)> = None;
            for child in c.child_shapes() {
                let co = child.transform.inverse_transform_point(o);
                let cd = child.transform.inverse_transform_vector(d);
                let limit = best.map_or(max_t, |b| b.0);
                if let Some((t, n)) = local_ray_test(&child.shape, co, cd, limit) {
                    let n = child.transform.transform_vector(n).component_div(scale);
                    best = Some((t, n.normalize()));
                }
            }
            best
        }
        _ => ray_aabb(shape.bounding_box(), origin, dir, max_t),
    }
}

fn ray_sphere(origin: Vec3, dir: Vec3, radius: f32, max_t: f32) -> Option<(f32, Vec3)> {
    let a = dir.length_squared();
    if a < 1e-12 {
        return None;
    }
    let b = origin.dot(dir);
    let c = origin.length_squared() - radius * radius;
    if c <= 0.0 {
        // Starting inside
        return Some((0.0, (-dir).normalize()));
    }
    let disc = b * b - a * c;
    if disc < 0.0 || b > 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / a;
    if t > max_t {
        return None;
    }
    let t = t.max(0.0);
    Some((t, (origin + dir * t).normalize()))
}

fn ray_aabb(aabb: Aabb, origin: Vec3, dir: Vec3, max_t: f32) -> Option<(f32, Vec3)> {
    let hit = aabb.ray_entry(origin, dir, max_t)?;
    let normal = if hit.normal == Vec3::ZERO {
        (-dir).normalize()
    } else {
        hit.normal
    };
    Some((hit.t, normal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{CompoundShape, DEFAULT_MARGIN};
    use crate::math::{Quat, Transform};

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_ray_sphere_translated() {
        let shape = CollisionShape::sphere(1.0).unwrap();
        let m = Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0));
        let hit = ray_test(&shape, &m, Vec3::ZERO, Vec3::Z, 100.0).unwrap();
        assert!(approx_eq(hit.t, 9.0 - DEFAULT_MARGIN));
        assert!(approx_eq(hit.normal.z, -1.0));
        assert!(ray_test(&shape, &m, Vec3::ZERO, -Vec3::Z, 100.0).is_none());
        assert!(ray_test(&shape, &m, Vec3::ZERO, Vec3::Z, 5.0).is_none());
    }

    #[test]
    fn test_ray_rotated_box_normal() {
        let shape = CollisionShape::cuboid(Vec3::ONE).unwrap();
        let m = Mat4::from_translation_rotation(
            Vec3::new(5.0, 0.0, 0.0),
            Quat::from_axis_angle(Vec3::Y, std::f32::consts::FRAC_PI_2),
        );
        let hit = ray_test(&shape, &m, Vec3::ZERO, Vec3::X, 100.0).unwrap();
        assert!(approx_eq(hit.t, 4.0 - DEFAULT_MARGIN));
        assert!(approx_eq(hit.normal.x, -1.0));
    }

    #[test]
    fn test_ray_scaled_box() {
        let shape = CollisionShape::cuboid(Vec3::splat(0.5)).unwrap();
        let m = Mat4::from_translation_rotation_scale(Vec3::ZERO, Quat::IDENTITY, Vec3::new(4.0, 1.0, 1.0));
        let hit = ray_test(&shape, &m, Vec3::new(-10.0, 0.0, 0.0), Vec3::X, 100.0).unwrap();
        assert!(approx_eq(hit.t, 10.0 - 4.0 * (0.5 + DEFAULT_MARGIN)));
    }

    #[test]
    fn test_ray_compound_children() {
        let ball = CollisionShape::sphere(0.5).unwrap().into_shared();
        let mut c = CompoundShape::new();
        c.add_child_shape(Transform::from_position(Vec3::new(0.0, 0.0, 3.0)), ball.clone())
            .unwrap();
        c.add_child_shape(Transform::from_position(Vec3::new(0.0, 0.0, 6.0)), ball)
            .unwrap();
        let shape = CollisionShape::Compound(c);
        let (t, n) = local_ray_test(&shape, Vec3::ZERO, Vec3::Z, 100.0).unwrap();
        assert!(approx_eq(t, 2.5 - DEFAULT_MARGIN));
        assert!(approx_eq(n.z, -1.0));
    }

    #[test]
    fn test_ray_starting_inside() {
        let shape = CollisionShape::cuboid(Vec3::ONE).unwrap();
        let hit = ray_test(&shape, &Mat4::IDENTITY, Vec3::ZERO, Vec3::X, 10.0).unwrap();
        assert_eq!(hit.t, 0.0);
    }
}
