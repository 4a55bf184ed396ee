//! The support-mapping contract shared by every collision shape.

use std::sync::{Arc, OnceLock};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Mat3, Vec3};

use super::aabb::Aabb;
use super::compound::CompoundShape;
use super::convex_hull::ConvexHullShape;
use super::heightfield::HeightfieldShape;
use super::primitives::{BoxShape, CapsuleShape, ConeShape, CylinderShape, SphereShape};
use super::triangle_mesh::TriangleMeshShape;

/// Collision skin applied to new shapes.
pub const DEFAULT_MARGIN: f32 = 0.04;

/// Shapes are shared read-only between collision objects.
pub type SharedShape = Arc<CollisionShape>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShapeType {
    Box,
    Sphere,
    Capsule,
    Cylinder,
    Cone,
    ConvexHull,
    TriangleMesh,
    Heightfield,
    Compound,
}

/// State common to all shapes: margin, scaling and the cached local bounds.
#[derive(Debug, Clone)]
pub struct ShapeBase {
    margin: f32,
    local_scaling: Vec3,
    bounds: OnceLock<Aabb>,
}

impl Default for ShapeBase {
    fn default() -> Self {
        Self {
            margin: DEFAULT_MARGIN,
            local_scaling: Vec3::ONE,
            bounds: OnceLock::new(),
        }
    }
}

impl ShapeBase {
    /// Drops the cached bounding box; the next query recomputes it.
    #[inline]
    pub fn invalidate(&mut self) {
        self.bounds = OnceLock::new();
    }
}

/// Support mapping plus volume and mass queries.
///
/// The support functions return the shape-local point that maximizes
/// `dot(point, direction)`. Everything else in the crate (narrow phase,
/// sweeps, bounds) is built from them.
pub trait Shape {
    fn base(&self) -> &ShapeBase;

    fn base_mut(&mut self) -> &mut ShapeBase;

    fn shape_type(&self) -> ShapeType;

    /// Extreme point along `direction`, including the collision margin
    fn local_supporting_vertex(&self, direction: Vec3) -> Vec3;

    /// Extreme point along `direction` of the bare geometry
    fn local_supporting_vertex_without_margin(&self, direction: Vec3) -> Vec3;

    fn volume(&self) -> f32;

    fn surface_area(&self) -> f32;

    /// Diagonal of the local inertia tensor for the given mass
    fn calculate_local_inertia(&self, mass: f32) -> Vec3;

    /// Uncached local bounds; callers should use [`Shape::bounding_box`]
    fn compute_local_aabb(&self) -> Aabb;

    fn is_convex(&self) -> bool {
        true
    }

    fn is_compound(&self) -> bool {
        false
    }

    /// Clears cached derived data after a mutation.
    fn invalidate(&mut self) {
        self.base_mut().invalidate();
    }

    fn margin(&self) -> f32 {
        self.base().margin
    }

    fn set_margin(&mut self, margin: f32) -> PhysicsResult<()> {
        if !(margin >= 0.0 && margin.is_finite()) {
            return Err(PhysicsError::invalid(format!(
                "margin must be non-negative, got {margin}"
            )));
        }
        self.base_mut().margin = margin;
        self.invalidate();
        Ok(())
    }

    fn local_scaling(&self) -> Vec3 {
        self.base().local_scaling
    }

    fn set_local_scaling(&mut self, scaling: Vec3) -> PhysicsResult<()> {
        if !(scaling.is_finite() && scaling.min_element() > 0.0) {
            return Err(PhysicsError::invalid(format!(
                "local scaling must be positive, got {scaling:?}"
            )));
        }
        self.base_mut().local_scaling = scaling;
        self.invalidate();
        Ok(())
    }

    /// Local bounds including margin and scaling, computed once per mutation.
    fn bounding_box(&self) -> Aabb {
        *self.base().bounds.get_or_init(|| self.compute_local_aabb())
    }

    /// Diagonal inertia tensor; zero for non-positive mass
    fn calculate_inertia(&self, mass: f32) -> Mat3 {
        if mass <= 0.0 {
            return Mat3::ZERO;
        }
        Mat3::from_diagonal(self.calculate_local_inertia(mass))
    }
}

/// Tagged union over every supported shape.
#[derive(Debug, Clone)]
pub enum CollisionShape {
    Box(BoxShape),
    Sphere(SphereShape),
    Capsule(CapsuleShape),
    Cylinder(CylinderShape),
    Cone(ConeShape),
    ConvexHull(ConvexHullShape),
    TriangleMesh(TriangleMeshShape),
    Heightfield(HeightfieldShape),
    Compound(CompoundShape),
}

impl CollisionShape {
    pub fn cuboid(half_extents: Vec3) -> PhysicsResult<Self> {
        BoxShape::new(half_extents).map(Self::Box)
    }

    pub fn sphere(radius: f32) -> PhysicsResult<Self> {
        SphereShape::new(radius).map(Self::Sphere)
    }

    /// Y-up capsule; `height` is the length of the cylindrical section
    pub fn capsule(radius: f32, height: f32) -> PhysicsResult<Self> {
        CapsuleShape::new(radius, height, 1).map(Self::Capsule)
    }

    pub fn cylinder(half_extents: Vec3) -> PhysicsResult<Self> {
        CylinderShape::new(half_extents, 1).map(Self::Cylinder)
    }

    pub fn cone(radius: f32, height: f32) -> PhysicsResult<Self> {
        ConeShape::new(radius, height, 1).map(Self::Cone)
    }

    pub fn convex_hull(points: &[Vec3]) -> PhysicsResult<Self> {
        ConvexHullShape::new(points).map(Self::ConvexHull)
    }

    pub fn triangle_mesh(vertices: Vec<Vec3>, indices: Vec<u32>) -> PhysicsResult<Self> {
        TriangleMeshShape::new(vertices, indices).map(Self::TriangleMesh)
    }

    /// Wraps the shape for sharing between collision objects
    pub fn into_shared(self) -> SharedShape {
        Arc::new(self)
    }

    pub fn as_dyn(&self) -> &dyn Shape {
        match self {
            Self::Box(s) => s,
            Self::Sphere(s) => s,
            Self::Capsule(s) => s,
            Self::Cylinder(s) => s,
            Self::Cone(s) => s,
            Self::ConvexHull(s) => s,
            Self::TriangleMesh(s) => s,
            Self::Heightfield(s) => s,
            Self::Compound(s) => s,
        }
    }

    pub fn as_dyn_mut(&mut self) -> &mut dyn Shape {
        match self {
            Self::Box(s) => s,
            Self::Sphere(s) => s,
            Self::Capsule(s) => s,
            Self::Cylinder(s) => s,
            Self::Cone(s) => s,
            Self::ConvexHull(s) => s,
            Self::TriangleMesh(s) => s,
            Self::Heightfield(s) => s,
            Self::Compound(s) => s,
        }
    }
}

impl Shape for CollisionShape {
    fn base(&self) -> &ShapeBase {
        self.as_dyn().base()
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        self.as_dyn_mut().base_mut()
    }

    fn shape_type(&self) -> ShapeType {
        self.as_dyn().shape_type()
    }

    fn local_supporting_vertex(&self, direction: Vec3) -> Vec3 {
        self.as_dyn().local_supporting_vertex(direction)
    }

    fn local_supporting_vertex_without_margin(&self, direction: Vec3) -> Vec3 {
        self.as_dyn().local_supporting_vertex_without_margin(direction)
    }

    fn volume(&self) -> f32 {
        self.as_dyn().volume()
    }

    fn surface_area(&self) -> f32 {
        self.as_dyn().surface_area()
    }

    fn calculate_local_inertia(&self, mass: f32) -> Vec3 {
        self.as_dyn().calculate_local_inertia(mass)
    }

    fn compute_local_aabb(&self) -> Aabb {
        self.as_dyn().compute_local_aabb()
    }

    fn is_convex(&self) -> bool {
        self.as_dyn().is_convex()
    }

    fn is_compound(&self) -> bool {
        self.as_dyn().is_compound()
    }

    fn invalidate(&mut self) {
        self.as_dyn_mut().invalidate();
    }

    fn bounding_box(&self) -> Aabb {
        self.as_dyn().bounding_box()
    }
}

/// A triangle in shape-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    #[inline]
    pub const fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Unit normal following counter-clockwise winding
    #[inline]
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a).normalize()
    }

    #[inline]
    pub fn area(&self) -> f32 {
        (self.b - self.a).cross(self.c - self.a).length() * 0.5
    }

    #[inline]
    pub fn aabb(&self) -> Aabb {
        Aabb::new(self.a.min(self.b).min(self.c), self.a.max(self.b).max(self.c))
    }

    #[inline]
    pub fn centroid(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }

    /// Two-sided Möller–Trumbore test. Returns the ray parameter of the hit.
    pub fn ray_intersection(&self, origin: Vec3, dir: Vec3, max_t: f32) -> Option<f32> {
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        let p = dir.cross(e2);
        let det = e1.dot(p);
        if det.abs() < 1e-10 {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = origin - self.a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = dir.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv_det;
        (t >= 0.0 && t <= max_t).then_some(t)
    }
}

/// Receives triangles from concave shapes.
pub trait TriangleCallback {
    fn process_triangle(&mut self, triangle: &Triangle, index: usize);
}

impl<F: FnMut(&Triangle, usize)> TriangleCallback for F {
    fn process_triangle(&mut self, triangle: &Triangle, index: usize) {
        self(triangle, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_is_cached_until_mutation() {
        let mut shape = CollisionShape::sphere(1.0).unwrap();
        let first = shape.bounding_box();
        assert!((first.max.x - (1.0 + DEFAULT_MARGIN)).abs() < 1e-6);

        shape.set_local_scaling(Vec3::splat(2.0)).unwrap();
        let second = shape.bounding_box();
        assert!((second.max.x - 2.0 * (1.0 + DEFAULT_MARGIN)).abs() < 1e-5);
    }

    #[test]
    fn test_rejects_bad_margin_and_scaling() {
        let mut shape = CollisionShape::cuboid(Vec3::ONE).unwrap();
        assert!(shape.set_margin(-0.1).is_err());
        assert!(shape.set_local_scaling(Vec3::new(1.0, 0.0, 1.0)).is_err());
        assert_eq!(shape.margin(), DEFAULT_MARGIN);
    }

    #[test]
    fn test_inertia_zero_for_massless() {
        let shape = CollisionShape::sphere(1.0).unwrap();
        assert!(shape.calculate_inertia(0.0).is_zero());
        let i = shape.calculate_inertia(1.0);
        assert!((i.diagonal() - Vec3::splat(0.4)).length() < 1e-6);
    }

    #[test]
    fn test_triangle_ray() {
        let tri = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Z);
        let t = tri
            .ray_intersection(Vec3::new(0.2, 1.0, 0.2), -Vec3::Y, 5.0)
            .unwrap();
        assert!((t - 1.0).abs() < 1e-6);
        assert!(tri.ray_intersection(Vec3::new(2.0, 1.0, 2.0), -Vec3::Y, 5.0).is_none());
        assert!((tri.area() - 0.5).abs() < 1e-6);
    }
}
