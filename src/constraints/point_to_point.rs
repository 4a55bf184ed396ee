use crate::dynamics::RigidBody;
use crate::error::{PhysicsError, PhysicsResult};
use crate::math::Vec3;

use super::solver::JointBodies;
use super::{ConstraintBase, ConstraintParam, Joint, ALL_AXES};

/// Ball-socket joint pinning a point on A to a point on B.
#[derive(Debug, Clone)]
pub struct PointToPointConstraint {
    base: ConstraintBase,
    /// Pivot in A's local space
    pivot_a: Vec3,
    /// Pivot in B's local space, or a world point when B is absent
    pivot_b: Vec3,
}

impl PointToPointConstraint {
    pub fn new(
        body_a: &RigidBody,
        body_b: Option<&RigidBody>,
        pivot_a: Vec3,
        pivot_b: Vec3,
    ) -> PhysicsResult<Self> {
        if !pivot_a.is_finite() || !pivot_b.is_finite() {
            return Err(PhysicsError::ConstraintCreationFailed(
                "pivots must be finite".into(),
            ));
        }
        Ok(Self {
            base: ConstraintBase::between(body_a, body_b)?,
            pivot_a,
            pivot_b,
        })
    }

    pub fn pivot_a(&self) -> Vec3 {
        self.pivot_a
    }

    pub fn set_pivot_a(&mut self, pivot: Vec3) {
        self.pivot_a = pivot;
    }

    pub fn pivot_b(&self) -> Vec3 {
        self.pivot_b
    }

    pub fn set_pivot_b(&mut self, pivot: Vec3) {
        self.pivot_b = pivot;
    }

    /// World positions of both pivots
    pub fn world_pivots(&self, a: &RigidBody, b: Option<&RigidBody>) -> (Vec3, Vec3) {
        let world_a = a.transform().transform_point(self.pivot_a);
        let world_b = match b {
            Some(b) => b.transform().transform_point(self.pivot_b),
            None => self.pivot_b,
        };
        (world_a, world_b)
    }
}

impl Joint for PointToPointConstraint {
    fn base(&self) -> &ConstraintBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ConstraintBase {
        &mut self.base
    }

    fn solve_velocity(&mut self, a: &mut RigidBody, b: Option<&mut RigidBody>, dt: f32) -> f32 {
        let (anchor_a, anchor_b) = self.world_pivots(a, b.as_deref());
        let erp = self.base.param(ConstraintParam::ERP, ALL_AXES);
        JointBodies::new(a, b).solve_point(anchor_a, anchor_b, erp, dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CollisionShape;
    use crate::dynamics::integrate_positions;

    fn ball(position: Vec3) -> RigidBody {
        let shape = CollisionShape::sphere(0.5).unwrap().into_shared();
        RigidBody::new(Some(shape), 1.0)
            .unwrap()
            .with_position(position)
            .with_damping(0.0, 0.0)
            .unwrap()
    }

    fn pivot_distance(joint: &PointToPointConstraint, a: &RigidBody, b: Option<&RigidBody>) -> f32 {
        let (pa, pb) = joint.world_pivots(a, b);
        pa.distance(pb)
    }

    #[test]
    fn test_two_bodies_converge() {
        let mut a = ball(Vec3::ZERO);
        let mut b = ball(Vec3::new(1.5, 0.3, 0.0));
        let joint_pivots = (Vec3::new(0.5, 0.0, 0.0), Vec3::new(-0.5, 0.0, 0.0));
        let mut joint =
            PointToPointConstraint::new(&a, Some(&b), joint_pivots.0, joint_pivots.1).unwrap();
        let initial = pivot_distance(&joint, &a, Some(&b));
        assert!(initial > 0.4);

        let dt = 1.0 / 60.0;
        for _ in 0..120 {
            for _ in 0..10 {
                joint.solve(&mut a, Some(&mut b), dt);
            }
            integrate_positions(&mut a, dt);
            integrate_positions(&mut b, dt);
        }
        assert!(pivot_distance(&joint, &a, Some(&b)) < 1e-3);
    }

    #[test]
    fn test_world_anchor_pulls_body() {
        let mut a = ball(Vec3::new(0.0, -0.2, 0.0));
        let anchor = Vec3::new(0.0, 1.0, 0.0);
        let mut joint = PointToPointConstraint::new(&a, None, Vec3::new(0.0, 1.0, 0.0), anchor).unwrap();

        joint.solve(&mut a, None, 1.0 / 60.0);
        // Pivot sits below the anchor, so A is pushed up
        assert!(a.linear_velocity().y > 0.0);
        assert!(joint.base().applied_impulse() > 0.0);
    }

    #[test]
    fn test_static_pair_is_untouched() {
        let mut a = RigidBody::fixed(None);
        let mut joint =
            PointToPointConstraint::new(&a, None, Vec3::ZERO, Vec3::new(0.0, 3.0, 0.0)).unwrap();
        joint.solve(&mut a, None, 1.0 / 60.0);
        assert_eq!(a.linear_velocity(), Vec3::ZERO);
        assert_eq!(joint.base().applied_impulse(), 0.0);
    }

    #[test]
    fn test_rejects_non_finite_pivot() {
        let a = ball(Vec3::ZERO);
        assert!(PointToPointConstraint::new(&a, None, Vec3::splat(f32::NAN), Vec3::ZERO).is_err());
    }
}
