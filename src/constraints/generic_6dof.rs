use crate::dynamics::RigidBody;
use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Mat4, Transform, Vec3};

use super::solver::{limit_rate, one_sided, JointBodies, MotorImpulse};
use super::{ConstraintBase, ConstraintParam, Joint};

/// Number of independently driven axes: 3 linear, then 3 angular
pub const DOF_COUNT: usize = 6;

/// Joint with a limit and a motor on each of frame A's six axes.
///
/// Indices 0..3 are translations along frame A's X, Y, Z; indices 3..6
/// are the Euler angles of B's frame relative to A's. Limits default to
/// `±f32::MAX`, which leaves every axis free.
#[derive(Debug, Clone)]
pub struct Generic6DofConstraint {
    base: ConstraintBase,
    frame_a: Transform,
    frame_b: Transform,
    linear_lower: Vec3,
    linear_upper: Vec3,
    angular_lower: Vec3,
    angular_upper: Vec3,
    motor_enabled: [bool; DOF_COUNT],
    target_velocity: [f32; DOF_COUNT],
    max_motor_force: [f32; DOF_COUNT],
    motor_impulse: [MotorImpulse; DOF_COUNT],
}

fn check_index(index: usize) -> PhysicsResult<()> {
    if index >= DOF_COUNT {
        return Err(PhysicsError::invalid(format!(
            "axis index must be in 0..{DOF_COUNT}, got {index}"
        )));
    }
    Ok(())
}

fn is_free(lower: f32, upper: f32) -> bool {
    lower <= -f32::MAX && upper >= f32::MAX
}

impl Generic6DofConstraint {
    pub fn new(
        body_a: &RigidBody,
        body_b: Option<&RigidBody>,
        frame_a: Mat4,
        frame_b: Mat4,
    ) -> PhysicsResult<Self> {
        let base = ConstraintBase::between(body_a, body_b)?;
        if !frame_a.translation().is_finite() || !frame_b.translation().is_finite() {
            return Err(PhysicsError::ConstraintCreationFailed("frames must be finite".into()));
        }
        Ok(Self {
            base,
            frame_a: frame_a.into(),
            frame_b: frame_b.into(),
            linear_lower: Vec3::splat(-f32::MAX),
            linear_upper: Vec3::splat(f32::MAX),
            angular_lower: Vec3::splat(-f32::MAX),
            angular_upper: Vec3::splat(f32::MAX),
            motor_enabled: [false; DOF_COUNT],
            target_velocity: [0.0; DOF_COUNT],
            max_motor_force: [0.0; DOF_COUNT],
            motor_impulse: [MotorImpulse::default(); DOF_COUNT],
        })
    }

    pub fn set_linear_lower_limit(&mut self, limit: Vec3) {
        self.linear_lower = limit;
    }

    pub fn set_linear_upper_limit(&mut self, limit: Vec3) {
        self.linear_upper = limit;
    }

    pub fn set_angular_lower_limit(&mut self, limit: Vec3) {
        self.angular_lower = limit;
    }

    pub fn set_angular_upper_limit(&mut self, limit: Vec3) {
        self.angular_upper = limit;
    }

    pub fn linear_lower_limit(&self) -> Vec3 {
        self.linear_lower
    }

    pub fn linear_upper_limit(&self) -> Vec3 {
        self.linear_upper
    }

    pub fn angular_lower_limit(&self) -> Vec3 {
        self.angular_lower
    }

    pub fn angular_upper_limit(&self) -> Vec3 {
        self.angular_upper
    }

    pub fn enable_motor(&mut self, index: usize, on: bool) -> PhysicsResult<()> {
        check_index(index)?;
        self.motor_enabled[index] = on;
        Ok(())
    }

    pub fn set_target_velocity(&mut self, index: usize, velocity: f32) -> PhysicsResult<()> {
        check_index(index)?;
        self.target_velocity[index] = velocity;
        Ok(())
    }

    /// Negative forces are stored as zero
    pub fn set_max_motor_force(&mut self, index: usize, force: f32) -> PhysicsResult<()> {
        check_index(index)?;
        self.max_motor_force[index] = force.max(0.0);
        Ok(())
    }

    pub fn motor_enabled(&self, index: usize) -> bool {
        self.motor_enabled.get(index).copied().unwrap_or(false)
    }

    /// Offsets along frame A's axes and relative Euler angles, in that order
    pub fn positions(&self, a: &RigidBody, b: Option<&RigidBody>) -> [f32; DOF_COUNT] {
        let (frame_a, frame_b) = self.world_frames(a, b);
        let offset = frame_a.inverse_transform_vector(frame_b.position - frame_a.position);
        let euler = (frame_a.rotation.conjugate() * frame_b.rotation).to_euler();
        [offset.x, offset.y, offset.z, euler.x, euler.y, euler.z]
    }

    fn world_frames(&self, a: &RigidBody, b: Option<&RigidBody>) -> (Transform, Transform) {
        let frame_a = Transform::new(a.position(), a.rotation()).compose(self.frame_a);
        let frame_b = match b {
            Some(b) => Transform::new(b.position(), b.rotation()).compose(self.frame_b),
            None => self.frame_b,
        };
        (frame_a, frame_b)
    }
}

impl Joint for Generic6DofConstraint {
    fn base(&self) -> &ConstraintBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ConstraintBase {
        &mut self.base
    }

    fn begin_step(&mut self) {
        for motor in &mut self.motor_impulse {
            motor.reset();
        }
    }

    fn solve_velocity(&mut self, a: &mut RigidBody, b: Option<&mut RigidBody>, dt: f32) -> f32 {
        let (frame_a, frame_b) = self.world_frames(a, b.as_deref());
        let positions = self.positions(a, b.as_deref());

        let mut bodies = JointBodies::new(a, b);
        let r_a = frame_a.position - bodies.position_a();
        let r_b = frame_b.position - bodies.position_b();
        let mut total = 0.0;

        for i in 0..DOF_COUNT {
            let linear = i < 3;
            let axis = frame_a.transform_vector(Vec3::unit_axis(i % 3));
            let (lower, upper) = if linear {
                (self.linear_lower[i], self.linear_upper[i])
            } else {
                (self.angular_lower[i - 3], self.angular_upper[i - 3])
            };
            let stop_erp = self.base.param(ConstraintParam::STOP_ERP, i as i32);

            let rate = |bodies: &JointBodies<'_>| {
                if linear {
                    bodies.relative_velocity(r_a, r_b).dot(axis)
                } else {
                    bodies.relative_angular_velocity().dot(axis)
                }
            };
            let drive = |bodies: &mut JointBodies<'_>, target: f32, bounds: (f32, f32)| {
                if linear {
                    bodies.solve_linear(r_a, r_b, axis, target, bounds)
                } else {
                    bodies.solve_angular(axis, target, bounds)
                }
            };

            if self.motor_enabled[i] && self.max_motor_force[i] > 0.0 {
                let bounds = self.motor_impulse[i].bounds(self.max_motor_force[i] * dt);
                let impulse = drive(&mut bodies, self.target_velocity[i], bounds);
                self.motor_impulse[i].add(impulse);
                total += impulse.abs();
            }

            if is_free(lower, upper) {
                continue;
            }
            let current = rate(&bodies);
            if let Some(target) = limit_rate(positions[i], current, lower, upper, stop_erp, dt) {
                total += drive(&mut bodies, target, one_sided(target, current)).abs();
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{integrate_positions, integrate_velocities};
    use crate::geometry::CollisionShape;

    fn ball() -> RigidBody {
        let shape = CollisionShape::sphere(0.5).unwrap().into_shared();
        RigidBody::new(Some(shape), 1.0)
            .unwrap()
            .with_damping(0.0, 0.0)
            .unwrap()
    }

    fn joint(body: &RigidBody) -> Generic6DofConstraint {
        Generic6DofConstraint::new(body, None, Mat4::IDENTITY, Mat4::IDENTITY).unwrap()
    }

    fn run(body: &mut RigidBody, joint: &mut Generic6DofConstraint, steps: usize, force: Vec3) {
        let dt = 1.0 / 60.0;
        for _ in 0..steps {
            body.apply_central_force(force).unwrap();
            integrate_velocities(body, dt);
            joint.begin_step();
            for _ in 0..10 {
                joint.solve(body, None, dt);
            }
            integrate_positions(body, dt);
        }
    }

    #[test]
    fn test_default_is_free() {
        let mut body = ball();
        let mut j = joint(&body);
        run(&mut body, &mut j, 30, Vec3::new(6.0, 0.0, 0.0));
        // 6 m/s² for half a second
        assert!((body.linear_velocity().x - 3.0).abs() < 1e-3);
        assert_eq!(j.base().applied_impulse(), 0.0);
    }

    #[test]
    fn test_linear_limit_per_axis() {
        let mut body = ball();
        let mut j = joint(&body);
        // B is the world origin, so A moving +X reads as -X on the axis
        j.set_linear_lower_limit(Vec3::new(-0.5, -f32::MAX, -f32::MAX));
        j.set_linear_upper_limit(Vec3::new(0.5, f32::MAX, f32::MAX));
        run(&mut body, &mut j, 120, Vec3::new(10.0, 0.0, 5.0));
        assert!(body.position().x <= 0.5 + 1e-2);
        assert!(body.position().x > 0.45);
        // Z stays free
        assert!(body.position().z > 1.0);
    }

    #[test]
    fn test_locked_angular_axis() {
        let mut body = ball().with_angular_velocity(Vec3::new(0.0, 2.0, 2.0));
        let mut j = joint(&body);
        j.set_angular_lower_limit(Vec3::new(-f32::MAX, 0.0, -f32::MAX));
        j.set_angular_upper_limit(Vec3::new(f32::MAX, 0.0, f32::MAX));
        run(&mut body, &mut j, 30, Vec3::ZERO);
        let p = j.positions(&body, None);
        assert!(p[4].abs() < 1e-2);
        assert!(p[5].abs() > 0.5);
    }

    #[test]
    fn test_motor_on_angular_axis() {
        let mut body = ball();
        let mut j = joint(&body);
        j.enable_motor(5, true).unwrap();
        j.set_target_velocity(5, -2.0).unwrap();
        j.set_max_motor_force(5, 50.0).unwrap();
        run(&mut body, &mut j, 10, Vec3::ZERO);
        assert!((body.angular_velocity().z - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_motor_index_checked() {
        let body = ball();
        let mut j = joint(&body);
        assert!(j.enable_motor(6, true).is_err());
        assert!(j.set_target_velocity(7, 1.0).is_err());
        assert!(j.set_max_motor_force(9, 1.0).is_err());
        j.set_max_motor_force(0, -5.0).unwrap();
        assert!(!j.motor_enabled(0));
    }
}
