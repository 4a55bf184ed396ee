use crate::dynamics::RigidBody;
use crate::error::{PhysicsError, PhysicsResult};
use crate::math::utils::normalize_angle;
use crate::math::{Quat, Vec3};

use super::solver::{limit_rate, one_sided, JointBodies, MotorImpulse};
use super::{ConstraintBase, ConstraintParam, Joint, ALL_AXES};

/// Revolute joint: a shared pivot plus a shared axis of rotation.
///
/// The hinge angle is the signed rotation of B's reference vector away from
/// A's about the hinge axis, zero at construction time.
#[derive(Debug, Clone)]
pub struct HingeConstraint {
    base: ConstraintBase,
    pivot_a: Vec3,
    pivot_b: Vec3,
    axis_a: Vec3,
    axis_b: Vec3,
    reference_a: Vec3,
    reference_b: Vec3,
    reference_sign: f32,

    lower_limit: f32,
    upper_limit: f32,
    limit_softness: f32,
    solve_limit: bool,

    motor_enabled: bool,
    motor_target_velocity: f32,
    max_motor_impulse: f32,
    motor_impulse: MotorImpulse,

    hinge_angle: f32,
}

fn unit_axis(axis: Vec3) -> PhysicsResult<Vec3> {
    axis.try_normalize()
        .filter(|a| a.is_finite())
        .ok_or_else(|| PhysicsError::ConstraintCreationFailed("hinge axis must be non-zero".into()))
}

fn world_rotation(body: Option<&RigidBody>) -> Quat {
    body.map_or(Quat::IDENTITY, RigidBody::rotation)
}

impl HingeConstraint {
    /// Builds a hinge from pivots and axes in each body's local space.
    /// Without B, `pivot_b` and `axis_b` are in world space.
    pub fn new(
        body_a: &RigidBody,
        body_b: Option<&RigidBody>,
        pivot_a: Vec3,
        pivot_b: Vec3,
        axis_a: Vec3,
        axis_b: Vec3,
    ) -> PhysicsResult<Self> {
        if !pivot_a.is_finite() || !pivot_b.is_finite() {
            return Err(PhysicsError::ConstraintCreationFailed("pivots must be finite".into()));
        }
        let axis_a = unit_axis(axis_a)?;
        let axis_b = unit_axis(axis_b)?;

        let reference_a = axis_a.any_perpendicular();
        let world_reference = body_a.rotation().rotate_vec(reference_a);
        let reference_b = world_rotation(body_b).inverse_rotate_vec(world_reference);

        Ok(Self {
            base: ConstraintBase::between(body_a, body_b)?,
            pivot_a,
            pivot_b,
            axis_a,
            axis_b,
            reference_a,
            reference_b,
            reference_sign: 1.0,
            lower_limit: 1.0,
            upper_limit: -1.0,
            limit_softness: 0.9,
            solve_limit: false,
            motor_enabled: false,
            motor_target_velocity: 0.0,
            max_motor_impulse: 0.0,
            motor_impulse: MotorImpulse::default(),
            hinge_angle: 0.0,
        })
    }

    pub fn pivot_a(&self) -> Vec3 {
        self.pivot_a
    }

    pub fn pivot_b(&self) -> Vec3 {
        self.pivot_b
    }

    pub fn axis_a(&self) -> Vec3 {
        self.axis_a
    }

    pub fn axis_b(&self) -> Vec3 {
        self.axis_b
    }

    /// Flips the sign convention of [`HingeConstraint::hinge_angle`]
    pub fn set_reference_sign(&mut self, negative: bool) {
        self.reference_sign = if negative { -1.0 } else { 1.0 };
    }

    /// Current hinge angle in (-π, π]
    pub fn hinge_angle(&self, a: &RigidBody, b: Option<&RigidBody>) -> f32 {
        let axis = a.rotation().rotate_vec(self.axis_a);
        let ref_a = a.rotation().rotate_vec(self.reference_a).project_on_plane(axis);
        let ref_b = world_rotation(b)
            .rotate_vec(self.reference_b)
            .project_on_plane(axis);
        let sin = ref_a.cross(ref_b).dot(axis);
        let cos = ref_a.dot(ref_b);
        self.reference_sign * sin.atan2(cos)
    }

    /// Angle seen by the last solve
    pub fn last_angle(&self) -> f32 {
        self.hinge_angle
    }

    /// Limits the angle to `[low, high]`; `low > high` removes the limit.
    ///
    /// `bias` becomes the limit's error reduction and `relaxation` its
    /// constraint force mixing.
    pub fn set_limit(&mut self, low: f32, high: f32, softness: f32, bias: f32, relaxation: f32) {
        self.lower_limit = normalize_angle(low);
        self.upper_limit = normalize_angle(high);
        self.limit_softness = softness;
        self.base.set_param(ConstraintParam::STOP_ERP, bias, ALL_AXES);
        self.base.set_param(ConstraintParam::STOP_CFM, relaxation, ALL_AXES);
    }

    pub fn lower_limit(&self) -> f32 {
        self.lower_limit
    }

    pub fn upper_limit(&self) -> f32 {
        self.upper_limit
    }

    pub fn limit_softness(&self) -> f32 {
        self.limit_softness
    }

    pub fn has_limit(&self) -> bool {
        self.lower_limit <= self.upper_limit
    }

    /// True when the last solved angle was outside the limit range
    pub fn solve_limit(&self) -> bool {
        self.solve_limit
    }

    pub fn enable_angular_motor(
        &mut self,
        enable: bool,
        target_velocity: f32,
        max_motor_impulse: f32,
    ) -> PhysicsResult<()> {
        if max_motor_impulse.is_nan() || max_motor_impulse < 0.0 {
            return Err(PhysicsError::invalid(format!(
                "max motor impulse must be non-negative, got {max_motor_impulse}"
            )));
        }
        self.motor_enabled = enable;
        self.motor_target_velocity = target_velocity;
        self.max_motor_impulse = max_motor_impulse;
        Ok(())
    }

    pub fn motor_enabled(&self) -> bool {
        self.motor_enabled
    }

    pub fn motor_target_velocity(&self) -> f32 {
        self.motor_target_velocity
    }

    pub fn max_motor_impulse(&self) -> f32 {
        self.max_motor_impulse
    }

    /// Sets the motor velocity that reaches `target_angle` within `dt`
    pub fn set_motor_target(
        &mut self,
        a: &RigidBody,
        b: Option<&RigidBody>,
        target_angle: f32,
        dt: f32,
    ) -> PhysicsResult<()> {
        if dt <= 0.0 {
            return Err(PhysicsError::invalid(format!("dt must be positive, got {dt}")));
        }
        let current = self.hinge_angle(a, b);
        self.motor_target_velocity = normalize_angle(target_angle - current) / dt;
        Ok(())
    }
}

impl Joint for HingeConstraint {
    fn base(&self) -> &ConstraintBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ConstraintBase {
        &mut self.base
    }

    fn begin_step(&mut self) {
        self.motor_impulse.reset();
    }

    fn solve_velocity(&mut self, a: &mut RigidBody, b: Option<&mut RigidBody>, dt: f32) -> f32 {
        let b_ref = b.as_deref();
        let anchor_a = a.transform().transform_point(self.pivot_a);
        let anchor_b = match b_ref {
            Some(b) => b.transform().transform_point(self.pivot_b),
            None => self.pivot_b,
        };
        let axis_a = a.rotation().rotate_vec(self.axis_a);
        let axis_b = world_rotation(b_ref).rotate_vec(self.axis_b);
        let angle = self.hinge_angle(a, b_ref);
        self.hinge_angle = angle;
        self.solve_limit = self.has_limit() && (angle < self.lower_limit || angle > self.upper_limit);

        let erp = self.base.param(ConstraintParam::ERP, ALL_AXES);
        let stop_erp = self.base.param(ConstraintParam::STOP_ERP, ALL_AXES);
        let mut bodies = JointBodies::new(a, b);

        let mut total = bodies.solve_point(anchor_a, anchor_b, erp, dt);
        total += bodies.align_axes(axis_a, axis_b, erp, dt);

        // Angle grows with B spinning about the axis relative to A
        let drive = axis_a * self.reference_sign;
        if self.motor_enabled && self.max_motor_impulse > 0.0 {
            let bounds = self.motor_impulse.bounds(self.max_motor_impulse);
            let impulse = bodies.solve_angular(drive, self.motor_target_velocity, bounds);
            self.motor_impulse.add(impulse);
            total += impulse.abs();
        }

        if self.has_limit() {
            let rate = bodies.relative_angular_velocity().dot(drive);
            if let Some(target) =
                limit_rate(angle, rate, self.lower_limit, self.upper_limit, stop_erp, dt)
            {
                total += bodies
                    .solve_angular(drive, target, one_sided(target, rate))
                    .abs();
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{apply_gravity, integrate_positions, integrate_velocities};
    use crate::geometry::CollisionShape;
    use std::f32::consts::FRAC_PI_2;

    fn door() -> RigidBody {
        let shape = CollisionShape::cuboid(Vec3::new(0.5, 1.0, 0.05)).unwrap().into_shared();
        RigidBody::new(Some(shape), 2.0)
            .unwrap()
            .with_position(Vec3::new(0.5, 0.0, 0.0))
            .with_damping(0.0, 0.0)
            .unwrap()
    }

    fn world_hinge(body: &RigidBody) -> HingeConstraint {
        // Hinge along the door's left edge, world Y
        HingeConstraint::new(
            body,
            None,
            Vec3::new(-0.5, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::Y,
            Vec3::Y,
        )
        .unwrap()
    }

    fn run(body: &mut RigidBody, joint: &mut HingeConstraint, steps: usize, torque: Vec3) {
        let dt = 1.0 / 60.0;
        for _ in 0..steps {
            body.apply_torque(torque).unwrap();
            apply_gravity(body, Vec3::new(0.0, -9.81, 0.0));
            integrate_velocities(body, dt);
            joint.begin_step();
            for _ in 0..10 {
                joint.solve(body, None, dt);
            }
            integrate_positions(body, dt);
        }
    }

    #[test]
    fn test_angle_starts_at_zero() {
        let body = door();
        let joint = world_hinge(&body);
        assert!(joint.hinge_angle(&body, None).abs() < 1e-6);
    }

    #[test]
    fn test_angle_follows_rotation() {
        let mut body = door();
        let joint = world_hinge(&body);
        body.set_transform(body.position(), Quat::from_axis_angle(Vec3::Y, 0.5));
        // B is the world, so A turning +0.5 reads as B at -0.5
        assert!((joint.hinge_angle(&body, None) + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_zero_limits_lock_rigidly() {
        let mut body = door();
        let mut joint = world_hinge(&body);
        joint.set_limit(0.0, 0.0, 0.9, 0.3, 1.0);
        run(&mut body, &mut joint, 120, Vec3::new(0.0, 5.0, 0.0));
        assert!(joint.hinge_angle(&body, None).abs() < 1e-2);
    }

    #[test]
    fn test_pivot_holds_under_gravity() {
        let mut body = door();
        let mut joint = world_hinge(&body);
        run(&mut body, &mut joint, 120, Vec3::ZERO);
        let pivot = body.transform().transform_point(Vec3::new(-0.5, 0.0, 0.0));
        assert!(pivot.length() < 0.05);
    }

    #[test]
    fn test_motor_spins_door() {
        let mut body = door();
        let mut joint = world_hinge(&body);
        joint.enable_angular_motor(true, 1.0, 10.0).unwrap();
        run(&mut body, &mut joint, 30, Vec3::ZERO);
        // A turns at -1 rad/s relative to the world so B leads it by +1
        assert!((body.angular_velocity().y + 1.0).abs() < 0.05);
    }

    #[test]
    fn test_limit_stops_motor() {
        let mut body = door();
        let mut joint = world_hinge(&body);
        joint.set_limit(-0.3, 0.3, 0.9, 0.3, 1.0);
        joint.enable_angular_motor(true, 2.0, 10.0).unwrap();
        run(&mut body, &mut joint, 120, Vec3::ZERO);
        let angle = joint.hinge_angle(&body, None);
        assert!(angle <= 0.3 + 1e-2, "angle {angle}");
        assert!(angle > 0.25);
    }

    #[test]
    fn test_motor_impulse_budget_resets_each_step() {
        let mut body = door();
        let mut joint = world_hinge(&body);
        joint.enable_angular_motor(true, 50.0, 0.01).unwrap();
        let dt = 1.0 / 60.0;
        for _ in 0..3 {
            joint.begin_step();
            for _ in 0..10 {
                joint.solve(&mut body, None, dt);
            }
            assert!(joint.motor_impulse.accumulated().abs() <= 0.01 + 1e-6);
            assert!(joint.motor_impulse.accumulated().abs() > 0.009);
        }
    }

    #[test]
    fn test_motor_target_velocity() {
        let body = door();
        let mut joint = world_hinge(&body);
        joint
            .set_motor_target(&body, None, FRAC_PI_2, 0.5)
            .unwrap();
        assert!((joint.motor_target_velocity() - FRAC_PI_2 / 0.5).abs() < 1e-4);
        assert!(joint.set_motor_target(&body, None, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let body = door();
        assert!(HingeConstraint::new(&body, None, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, Vec3::Y).is_err());
        let mut joint = world_hinge(&body);
        assert!(joint.enable_angular_motor(true, 1.0, -1.0).is_err());
    }
}
