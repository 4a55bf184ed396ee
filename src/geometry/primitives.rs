//! Analytic convex primitives: box, sphere, capsule, cylinder and cone.
//!
//! Radii scale with the largest component of the local scaling; lengths
//! along the up axis scale with that axis' component.

use std::f32::consts::PI;

use crate::error::{PhysicsError, PhysicsResult};
use crate::math::Vec3;

use super::aabb::Aabb;
use super::shape::{Shape, ShapeBase, ShapeType};

fn check_up_axis(up_axis: usize) -> PhysicsResult<()> {
    if up_axis > 2 {
        return Err(PhysicsError::shape(format!(
            "up axis must be 0 (X), 1 (Y) or 2 (Z), got {up_axis}"
        )));
    }
    Ok(())
}

fn check_positive(name: &str, value: f32) -> PhysicsResult<()> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(PhysicsError::shape(format!("{name} must be positive, got {value}")));
    }
    Ok(())
}

/// Inertia diagonal of an axis-symmetric body given the axial and transverse moments.
fn axial_inertia(up_axis: usize, axial: f32, transverse: f32) -> Vec3 {
    let mut out = Vec3::splat(transverse);
    out[up_axis] = axial;
    out
}

/// Extent of a radius-`radius` disk around `up_axis`, with `half_height` along it.
fn axial_extents(up_axis: usize, radius: f32, half_height: f32) -> Vec3 {
    let mut out = Vec3::splat(radius);
    out[up_axis] = half_height;
    out
}

/// Adds the margin along the normalized direction.
#[inline]
fn with_margin(point: Vec3, direction: Vec3, margin: f32) -> Vec3 {
    point + direction.normalize() * margin
}

/// Axis-aligned box given by half-extents.
#[derive(Debug, Clone)]
pub struct BoxShape {
    base: ShapeBase,
    half_extents: Vec3,
}

impl BoxShape {
    pub fn new(half_extents: Vec3) -> PhysicsResult<Self> {
        if !(half_extents.is_finite() && half_extents.min_element() > 0.0) {
            return Err(PhysicsError::shape("Box half-extents must be positive"));
        }
        Ok(Self {
            base: ShapeBase::default(),
            half_extents,
        })
    }

    pub fn half_extents(&self) -> Vec3 {
        self.half_extents
    }

    pub fn half_extents_with_margin(&self) -> Vec3 {
        (self.half_extents + Vec3::splat(self.margin())).component_mul(self.local_scaling())
    }

    pub fn half_extents_without_margin(&self) -> Vec3 {
        self.half_extents.component_mul(self.local_scaling())
    }
}

impl Shape for BoxShape {
    fn base(&self) -> &ShapeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        &mut self.base
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Box
    }

    fn local_supporting_vertex(&self, direction: Vec3) -> Vec3 {
        self.half_extents_with_margin().signed_by(direction)
    }

    fn local_supporting_vertex_without_margin(&self, direction: Vec3) -> Vec3 {
        self.half_extents_without_margin().signed_by(direction)
    }

    fn volume(&self) -> f32 {
        let e = self.half_extents_without_margin();
        8.0 * e.x * e.y * e.z
    }

    fn surface_area(&self) -> f32 {
        let e = self.half_extents_without_margin();
        8.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }

    fn calculate_local_inertia(&self, mass: f32) -> Vec3 {
        let e = self.half_extents_without_margin();
        let f = mass / 3.0;
        Vec3::new(
            f * (e.y * e.y + e.z * e.z),
            f * (e.x * e.x + e.z * e.z),
            f * (e.x * e.x + e.y * e.y),
        )
    }

    fn compute_local_aabb(&self) -> Aabb {
        Aabb::symmetric(self.half_extents_with_margin())
    }
}

#[derive(Debug, Clone)]
pub struct SphereShape {
    base: ShapeBase,
    radius: f32,
}

impl SphereShape {
    pub fn new(radius: f32) -> PhysicsResult<Self> {
        check_positive("Sphere radius", radius)?;
        Ok(Self {
            base: ShapeBase::default(),
            radius,
        })
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn radius_with_margin(&self) -> f32 {
        (self.radius + self.margin()) * self.local_scaling().max_element()
    }

    pub fn radius_without_margin(&self) -> f32 {
        self.radius * self.local_scaling().max_element()
    }
}

impl Shape for SphereShape {
    fn base(&self) -> &ShapeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        &mut self.base
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Sphere
    }

    fn local_supporting_vertex(&self, direction: Vec3) -> Vec3 {
        direction.normalize() * self.radius_with_margin()
    }

    fn local_supporting_vertex_without_margin(&self, direction: Vec3) -> Vec3 {
        direction.normalize() * self.radius_without_margin()
    }

    fn volume(&self) -> f32 {
        let r = self.radius_without_margin();
        4.0 / 3.0 * PI * r * r * r
    }

    fn surface_area(&self) -> f32 {
        let r = self.radius_without_margin();
        4.0 * PI * r * r
    }

    fn calculate_local_inertia(&self, mass: f32) -> Vec3 {
        let r = self.radius_without_margin();
        Vec3::splat(0.4 * mass * r * r)
    }

    fn compute_local_aabb(&self) -> Aabb {
        Aabb::symmetric(Vec3::splat(self.radius_with_margin()))
    }
}

/// Segment of length `height` along `up_axis`, swept by a sphere of `radius`.
#[derive(Debug, Clone)]
pub struct CapsuleShape {
    base: ShapeBase,
    radius: f32,
    height: f32,
    up_axis: usize,
}

impl CapsuleShape {
    pub fn new(radius: f32, height: f32, up_axis: usize) -> PhysicsResult<Self> {
        check_positive("Capsule radius", radius)?;
        if !(height >= 0.0 && height.is_finite()) {
            return Err(PhysicsError::shape(format!(
                "Capsule height must be non-negative, got {height}"
            )));
        }
        check_up_axis(up_axis)?;
        Ok(Self {
            base: ShapeBase::default(),
            radius,
            height,
            up_axis,
        })
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Length of the cylindrical section, excluding the caps
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn up_axis(&self) -> usize {
        self.up_axis
    }

    fn scaled_radius(&self) -> f32 {
        self.radius * self.local_scaling().max_element()
    }

    fn scaled_half_height(&self) -> f32 {
        self.height * 0.5 * self.local_scaling()[self.up_axis]
    }

    fn segment_support(&self, direction: Vec3) -> Vec3 {
        let up = Vec3::unit_axis(self.up_axis);
        let hh = self.scaled_half_height();
        if direction.dot(up) >= 0.0 {
            up * hh
        } else {
            -up * hh
        }
    }
}

impl Shape for CapsuleShape {
    fn base(&self) -> &ShapeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        &mut self.base
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Capsule
    }

    fn local_supporting_vertex(&self, direction: Vec3) -> Vec3 {
        let r = self.scaled_radius() + self.margin();
        self.segment_support(direction) + direction.normalize() * r
    }

    fn local_supporting_vertex_without_margin(&self, direction: Vec3) -> Vec3 {
        self.segment_support(direction) + direction.normalize() * self.scaled_radius()
    }

    fn volume(&self) -> f32 {
        let r = self.scaled_radius();
        let h = self.scaled_half_height() * 2.0;
        PI * r * r * h + 4.0 / 3.0 * PI * r * r * r
    }

    fn surface_area(&self) -> f32 {
        let r = self.scaled_radius();
        let h = self.scaled_half_height() * 2.0;
        2.0 * PI * r * h + 4.0 * PI * r * r
    }

    /// Approximation: the mass is split between the cylinder and the caps in
    /// proportion `h : 4r/3`, and the caps are treated as a solid sphere.
    fn calculate_local_inertia(&self, mass: f32) -> Vec3 {
        let r = self.scaled_radius();
        let h = self.scaled_half_height() * 2.0;
        let cylinder_mass = mass * (h / (h + 4.0 * r / 3.0));
        let sphere_mass = mass - cylinder_mass;
        let (r2, h2) = (r * r, h * h);
        let sphere = sphere_mass * r2 * 0.4;
        axial_inertia(
            self.up_axis,
            cylinder_mass * r2 * 0.5 + sphere,
            cylinder_mass * (r2 * 0.25 + h2 / 12.0) + sphere,
        )
    }

    fn compute_local_aabb(&self) -> Aabb {
        let r = self.scaled_radius() + self.margin();
        Aabb::symmetric(axial_extents(self.up_axis, r, self.scaled_half_height() + r))
    }
}

/// Cylinder along `up_axis`; the radius is the larger of the two other half-extents.
#[derive(Debug, Clone)]
pub struct CylinderShape {
    base: ShapeBase,
    half_extents: Vec3,
    up_axis: usize,
}

impl CylinderShape {
    pub fn new(half_extents: Vec3, up_axis: usize) -> PhysicsResult<Self> {
        if !(half_extents.is_finite() && half_extents.min_element() > 0.0) {
            return Err(PhysicsError::shape("Cylinder half-extents must be positive"));
        }
        check_up_axis(up_axis)?;
        Ok(Self {
            base: ShapeBase::default(),
            half_extents,
            up_axis,
        })
    }

    pub fn half_extents(&self) -> Vec3 {
        self.half_extents
    }

    pub fn up_axis(&self) -> usize {
        self.up_axis
    }

    pub fn radius(&self) -> f32 {
        let e = self.half_extents;
        let r = match self.up_axis {
            0 => e.y.max(e.z),
            2 => e.x.max(e.y),
            _ => e.x.max(e.z),
        };
        r * self.local_scaling().max_element()
    }

    pub fn half_height(&self) -> f32 {
        self.half_extents[self.up_axis] * self.local_scaling()[self.up_axis]
    }
}

impl Shape for CylinderShape {
    fn base(&self) -> &ShapeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        &mut self.base
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Cylinder
    }

    fn local_supporting_vertex(&self, direction: Vec3) -> Vec3 {
        with_margin(
            self.local_supporting_vertex_without_margin(direction),
            direction,
            self.margin(),
        )
    }

    /// Rim of the end cap facing `direction`
    fn local_supporting_vertex_without_margin(&self, direction: Vec3) -> Vec3 {
        let up = Vec3::unit_axis(self.up_axis);
        let along = direction.dot(up);
        let cap = if along >= 0.0 { up } else { -up } * self.half_height();
        let radial = (direction - up * along).normalize();
        cap + radial * self.radius()
    }

    fn volume(&self) -> f32 {
        let r = self.radius();
        PI * r * r * self.half_height() * 2.0
    }

    fn surface_area(&self) -> f32 {
        let r = self.radius();
        2.0 * PI * r * r + 2.0 * PI * r * self.half_height() * 2.0
    }

    /// Solid-cylinder approximation: `m r²/2` axially, `m (r²/4 + h²/12)` across.
    fn calculate_local_inertia(&self, mass: f32) -> Vec3 {
        let r2 = self.radius() * self.radius();
        let h = self.half_height() * 2.0;
        axial_inertia(
            self.up_axis,
            mass * r2 * 0.5,
            mass * (r2 * 0.25 + h * h / 12.0),
        )
    }

    fn compute_local_aabb(&self) -> Aabb {
        let m = self.margin();
        Aabb::symmetric(axial_extents(
            self.up_axis,
            self.radius() + m,
            self.half_height() + m,
        ))
    }
}

/// Cone along `up_axis`, apex at `+height/2` and base disk at `-height/2`.
#[derive(Debug, Clone)]
pub struct ConeShape {
    base: ShapeBase,
    radius: f32,
    height: f32,
    up_axis: usize,
}

impl ConeShape {
    pub fn new(radius: f32, height: f32, up_axis: usize) -> PhysicsResult<Self> {
        check_positive("Cone radius", radius)?;
        check_positive("Cone height", height)?;
        check_up_axis(up_axis)?;
        Ok(Self {
            base: ShapeBase::default(),
            radius,
            height,
            up_axis,
        })
    }

    pub fn up_axis(&self) -> usize {
        self.up_axis
    }

    pub fn cone_radius(&self) -> f32 {
        self.radius * self.local_scaling().max_element()
    }

    pub fn cone_height(&self) -> f32 {
        self.height * self.local_scaling()[self.up_axis]
    }
}

impl Shape for ConeShape {
    fn base(&self) -> &ShapeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        &mut self.base
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Cone
    }

    fn local_supporting_vertex(&self, direction: Vec3) -> Vec3 {
        with_margin(
            self.local_supporting_vertex_without_margin(direction),
            direction,
            self.margin(),
        )
    }

    /// The apex wins when the direction's elevation above the base plane
    /// exceeds the half-angle complement, i.e. `sin(elev) > r / slant`.
    fn local_supporting_vertex_without_margin(&self, direction: Vec3) -> Vec3 {
        let up = Vec3::unit_axis(self.up_axis);
        let (r, h) = (self.cone_radius(), self.cone_height());
        let dir = direction.normalize();
        let along = dir.dot(up);
        let sin_half_angle = r / (r * r + h * h).sqrt();

        if along > sin_half_angle {
            return up * (h * 0.5);
        }
        let radial = (dir - up * along).normalize();
        -up * (h * 0.5) + radial * r
    }

    fn volume(&self) -> f32 {
        let (r, h) = (self.cone_radius(), self.cone_height());
        PI * r * r * h / 3.0
    }

    fn surface_area(&self) -> f32 {
        let (r, h) = (self.cone_radius(), self.cone_height());
        let slant = (r * r + h * h).sqrt();
        PI * r * r + PI * r * slant
    }

    /// Approximation: `0.3 m r²` axially, `m (0.15 r² + 0.2 h²)` across.
    fn calculate_local_inertia(&self, mass: f32) -> Vec3 {
        let (r, h) = (self.cone_radius(), self.cone_height());
        axial_inertia(
            self.up_axis,
            mass * r * r * 0.3,
            mass * (r * r * 0.15 + h * h * 0.2),
        )
    }

    fn compute_local_aabb(&self) -> Aabb {
        let m = self.margin();
        Aabb::symmetric(axial_extents(
            self.up_axis,
            self.cone_radius() + m,
            self.cone_height() * 0.5 + m,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    /// Directions on a coarse sphere, including the axes
    fn sample_directions() -> Vec<Vec3> {
        let mut dirs = vec![Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z];
        for i in 0..12 {
            for j in 1..6 {
                let theta = i as f32 / 12.0 * 2.0 * PI;
                let phi = j as f32 / 6.0 * PI;
                dirs.push(Vec3::new(
                    phi.sin() * theta.cos(),
                    phi.cos(),
                    phi.sin() * theta.sin(),
                ));
            }
        }
        dirs
    }

    fn assert_support_dominates(shape: &dyn Shape, samples: &[Vec3]) {
        for d in sample_directions() {
            let s = shape.local_supporting_vertex_without_margin(d);
            for p in samples {
                assert!(
                    s.dot(d) >= p.dot(d) - 1e-4,
                    "support {s:?} loses to {p:?} along {d:?}"
                );
            }
        }
    }

    #[test]
    fn test_box_support_dominates_corners() {
        let b = BoxShape::new(Vec3::new(1.0, 2.0, 0.5)).unwrap();
        let samples = crate::geometry::Aabb::symmetric(Vec3::new(1.0, 2.0, 0.5)).corners();
        assert_support_dominates(&b, &samples);
        let with_margin = b.local_supporting_vertex(Vec3::new(1.0, -1.0, 1.0));
        assert!((with_margin - Vec3::new(1.04, -2.04, 0.54)).length() < EPSILON);
    }

    #[test]
    fn test_sphere_support_and_inertia() {
        let s = SphereShape::new(1.0).unwrap();
        let surface: Vec<Vec3> = sample_directions().into_iter().map(|d| d.normalize()).collect();
        assert_support_dominates(&s, &surface);
        let i = s.calculate_local_inertia(1.0);
        assert!(approx_eq(i.x, 0.4) && approx_eq(i.y, 0.4) && approx_eq(i.z, 0.4));
    }

    #[test]
    fn test_capsule_support_dominates_surface() {
        let c = CapsuleShape::new(0.5, 2.0, 1).unwrap();
        let mut samples = Vec::new();
        for d in sample_directions() {
            let n = d.normalize();
            samples.push(Vec3::new(0.0, 1.0, 0.0) + n * 0.5);
            samples.push(Vec3::new(0.0, -1.0, 0.0) + n * 0.5);
        }
        assert_support_dominates(&c, &samples);
        let top = c.local_supporting_vertex_without_margin(Vec3::Y);
        assert!(approx_eq(top.y, 1.5));
    }

    #[test]
    fn test_capsule_volume_and_bounds() {
        let c = CapsuleShape::new(1.0, 2.0, 0).unwrap();
        let expected = PI * 2.0 + 4.0 / 3.0 * PI;
        assert!(approx_eq(c.volume(), expected));
        let aabb = c.compute_local_aabb();
        assert!(approx_eq(aabb.max.x, 2.0 + DEFAULT_MARGIN_TEST));
        assert!(approx_eq(aabb.max.y, 1.0 + DEFAULT_MARGIN_TEST));
    }

    const DEFAULT_MARGIN_TEST: f32 = crate::geometry::DEFAULT_MARGIN;

    #[test]
    fn test_cylinder_support_on_rim() {
        let c = CylinderShape::new(Vec3::new(1.0, 2.0, 1.0), 1).unwrap();
        let s = c.local_supporting_vertex_without_margin(Vec3::new(1.0, 1.0, 0.0));
        assert!((s - Vec3::new(1.0, 2.0, 0.0)).length() < EPSILON);
        assert!(approx_eq(c.volume(), PI * 4.0));
    }

    #[test]
    fn test_cone_apex_and_base() {
        let c = ConeShape::new(1.0, 2.0, 1).unwrap();
        assert_eq!(c.local_supporting_vertex_without_margin(Vec3::Y), Vec3::new(0.0, 1.0, 0.0));
        let side = c.local_supporting_vertex_without_margin(Vec3::X);
        assert!((side - Vec3::new(1.0, -1.0, 0.0)).length() < EPSILON);

        let mut samples = vec![Vec3::new(0.0, 1.0, 0.0)];
        for i in 0..16 {
            let a = i as f32 / 16.0 * 2.0 * PI;
            samples.push(Vec3::new(a.cos(), -1.0, a.sin()));
        }
        assert_support_dominates(&c, &samples);
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(BoxShape::new(Vec3::new(1.0, 0.0, 1.0)).is_err());
        assert!(SphereShape::new(-1.0).is_err());
        assert!(CapsuleShape::new(0.5, 1.0, 3).is_err());
        assert!(ConeShape::new(1.0, 0.0, 1).is_err());
        assert!(CylinderShape::new(Vec3::ONE, 5).is_err());
    }

    #[test]
    fn test_box_inertia() {
        let b = BoxShape::new(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        let i = b.calculate_local_inertia(3.0);
        assert!(approx_eq(i.x, 13.0));
        assert!(approx_eq(i.y, 10.0));
        assert!(approx_eq(i.z, 5.0));
        assert!(approx_eq(b.volume(), 48.0));
    }
}
