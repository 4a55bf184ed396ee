use crate::error::{PhysicsError, PhysicsResult};
use crate::math::Vec3;

use super::aabb::Aabb;
use super::shape::{Shape, ShapeBase, ShapeType};

/// Convex hull of a point cloud, queried by linear scan.
///
/// Volume, area and inertia are bounding-box approximations.
#[derive(Debug, Clone)]
pub struct ConvexHullShape {
    base: ShapeBase,
    points: Vec<Vec3>,
}

impl ConvexHullShape {
    /// Needs at least four points.
    pub fn new(points: &[Vec3]) -> PhysicsResult<Self> {
        if points.len() < 4 {
            return Err(PhysicsError::shape(format!(
                "Convex hull needs at least 4 vertices, got {}",
                points.len()
            )));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(PhysicsError::shape("Convex hull vertices must be finite"));
        }
        Ok(Self {
            base: ShapeBase::default(),
            points: points.to_vec(),
        })
    }

    /// Appends a point; the cached bounds are refreshed on the next query.
    pub fn add_point(&mut self, point: Vec3) {
        self.points.push(point);
        self.invalidate();
    }

    /// Unscaled points
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn scaled_point(&self, index: usize) -> Option<Vec3> {
        self.points
            .get(index)
            .map(|p| p.component_mul(self.local_scaling()))
    }

    fn scaled_points(&self) -> impl Iterator<Item = Vec3> + '_ {
        let scaling = self.local_scaling();
        self.points.iter().map(move |p| p.component_mul(scaling))
    }

    /// Removes points that coincide within 1e-6, keeping first occurrences.
    pub fn optimize_convex_hull(&mut self) {
        let mut unique: Vec<Vec3> = Vec::with_capacity(self.points.len());
        for &p in &self.points {
            if !unique.iter().any(|q| q.distance(p) <= 1e-6) {
                unique.push(p);
            }
        }
        self.points = unique;
        self.invalidate();
    }
}

impl Shape for ConvexHullShape {
    fn base(&self) -> &ShapeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        &mut self.base
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::ConvexHull
    }

    fn local_supporting_vertex(&self, direction: Vec3) -> Vec3 {
        self.local_supporting_vertex_without_margin(direction) + direction.normalize() * self.margin()
    }

    fn local_supporting_vertex_without_margin(&self, direction: Vec3) -> Vec3 {
        self.scaled_points()
            .fold((f32::NEG_INFINITY, Vec3::ZERO), |best, p| {
                let d = p.dot(direction);
                if d > best.0 {
                    (d, p)
                } else {
                    best
                }
            })
            .1
    }

    fn volume(&self) -> f32 {
        self.bounding_box().volume() * 0.5
    }

    fn surface_area(&self) -> f32 {
        self.bounding_box().surface_area() * 0.7
    }

    fn calculate_local_inertia(&self, mass: f32) -> Vec3 {
        let s = self.bounding_box().size();
        let f = mass / 12.0;
        Vec3::new(
            f * (s.y * s.y + s.z * s.z),
            f * (s.x * s.x + s.z * s.z),
            f * (s.x * s.x + s.y * s.y),
        )
    }

    fn compute_local_aabb(&self) -> Aabb {
        Aabb::from_points(self.scaled_points()).expand(self.margin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> Vec<Vec3> {
        vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::Z,
        ]
    }

    #[test]
    fn test_add_point_refreshes_bounds() {
        let mut hull = ConvexHullShape::new(&tetrahedron()).unwrap();
        let before = hull.bounding_box();
        assert!((before.max.x - 1.04).abs() < 1e-6);

        hull.add_point(Vec3::new(5.0, 0.0, 0.0));
        let after = hull.bounding_box();
        assert!((after.max.x - 5.04).abs() < 1e-5);
        assert_eq!(hull.num_points(), 5);
    }

    #[test]
    fn test_support_picks_extreme_vertex() {
        let hull = ConvexHullShape::new(&tetrahedron()).unwrap();
        assert_eq!(hull.local_supporting_vertex_without_margin(Vec3::Y), Vec3::Y);
        assert_eq!(
            hull.local_supporting_vertex_without_margin(Vec3::new(-1.0, -1.0, -1.0)),
            Vec3::ZERO
        );
        let with_margin = hull.local_supporting_vertex(Vec3::Z);
        assert!((with_margin.z - 1.04).abs() < 1e-6);
    }

    #[test]
    fn test_optimize_removes_duplicates() {
        let mut points = tetrahedron();
        points.push(Vec3::X);
        points.push(Vec3::new(0.0, 1.0 + 1e-8, 0.0));
        let mut hull = ConvexHullShape::new(&points).unwrap();
        hull.optimize_convex_hull();
        assert_eq!(hull.num_points(), 4);
    }

    #[test]
    fn test_requires_four_points() {
        assert!(ConvexHullShape::new(&[Vec3::ZERO, Vec3::X, Vec3::Y]).is_err());
    }

    #[test]
    fn test_scaled_point() {
        let mut hull = ConvexHullShape::new(&tetrahedron()).unwrap();
        hull.set_local_scaling(Vec3::new(2.0, 1.0, 1.0)).unwrap();
        assert_eq!(hull.scaled_point(1), Some(Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(hull.scaled_point(9), None);
    }
}
