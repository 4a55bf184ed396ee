use crate::dynamics::RigidBody;
use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Mat4, Transform, Vec3};

use super::solver::{limit_rate, one_sided, plane_basis, JointBodies, MotorImpulse, UNBOUNDED};
use super::{ConstraintBase, ConstraintParam, Joint, ALL_AXES};

/// Prismatic joint sliding along, and turning about, frame A's local Z axis.
#[derive(Debug, Clone)]
pub struct SliderConstraint {
    base: ConstraintBase,
    frame_a: Transform,
    frame_b: Transform,

    lower_lin_limit: f32,
    upper_lin_limit: f32,
    lower_ang_limit: f32,
    upper_ang_limit: f32,

    powered_lin_motor: bool,
    target_lin_motor_velocity: f32,
    max_lin_motor_force: f32,
    powered_ang_motor: bool,
    target_ang_motor_velocity: f32,
    max_ang_motor_force: f32,
    lin_motor_impulse: MotorImpulse,
    ang_motor_impulse: MotorImpulse,

    linear_position: f32,
    angular_position: f32,
}

fn check_motor_force(force: f32) -> PhysicsResult<()> {
    if force.is_nan() || force < 0.0 {
        return Err(PhysicsError::invalid(format!(
            "max motor force must be non-negative, got {force}"
        )));
    }
    Ok(())
}

impl SliderConstraint {
    /// Frames are local to each body; without B, `frame_b` is a world frame.
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
            lower_lin_limit: -1.0,
            upper_lin_limit: 1.0,
            lower_ang_limit: 0.0,
            upper_ang_limit: 0.0,
            powered_lin_motor: false,
            target_lin_motor_velocity: 0.0,
            max_lin_motor_force: 0.0,
            powered_ang_motor: false,
            target_ang_motor_velocity: 0.0,
            max_ang_motor_force: 0.0,
            lin_motor_impulse: MotorImpulse::default(),
            ang_motor_impulse: MotorImpulse::default(),
            linear_position: 0.0,
            angular_position: 0.0,
        })
    }

    pub fn frame_a(&self) -> Transform {
        self.frame_a
    }

    pub fn frame_b(&self) -> Transform {
        self.frame_b
    }

    pub fn lower_lin_limit(&self) -> f32 {
        self.lower_lin_limit
    }

    pub fn set_lower_lin_limit(&mut self, limit: f32) {
        self.lower_lin_limit = limit;
    }

    pub fn upper_lin_limit(&self) -> f32 {
        self.upper_lin_limit
    }

    pub fn set_upper_lin_limit(&mut self, limit: f32) {
        self.upper_lin_limit = limit;
    }

    pub fn lower_ang_limit(&self) -> f32 {
        self.lower_ang_limit
    }

    pub fn set_lower_ang_limit(&mut self, limit: f32) {
        self.lower_ang_limit = limit;
    }

    pub fn upper_ang_limit(&self) -> f32 {
        self.upper_ang_limit
    }

    pub fn set_upper_ang_limit(&mut self, limit: f32) {
        self.upper_ang_limit = limit;
    }

    pub fn set_powered_lin_motor(&mut self, on: bool) {
        self.powered_lin_motor = on;
    }

    pub fn powered_lin_motor(&self) -> bool {
        self.powered_lin_motor
    }

    pub fn set_target_lin_motor_velocity(&mut self, velocity: f32) {
        self.target_lin_motor_velocity = velocity;
    }

    pub fn set_max_lin_motor_force(&mut self, force: f32) -> PhysicsResult<()> {
        check_motor_force(force)?;
        self.max_lin_motor_force = force;
        Ok(())
    }

    pub fn set_powered_ang_motor(&mut self, on: bool) {
        self.powered_ang_motor = on;
    }

    pub fn powered_ang_motor(&self) -> bool {
        self.powered_ang_motor
    }

    pub fn set_target_ang_motor_velocity(&mut self, velocity: f32) {
        self.target_ang_motor_velocity = velocity;
    }

    pub fn set_max_ang_motor_force(&mut self, force: f32) -> PhysicsResult<()> {
        check_motor_force(force)?;
        self.max_ang_motor_force = force;
        Ok(())
    }

    /// Offset of B's frame along the slide axis, as of the last solve
    pub fn linear_position(&self) -> f32 {
        self.linear_position
    }

    /// Rotation of B's frame about the slide axis, as of the last solve
    pub fn angular_position(&self) -> f32 {
        self.angular_position
    }

    /// Recomputes both positions from the bodies' current transforms
    pub fn calculate_transforms(&mut self, a: &RigidBody, b: Option<&RigidBody>) {
        let (frame_a, frame_b) = self.world_frames(a, b);
        self.update_positions(frame_a, frame_b);
    }

    fn world_frames(&self, a: &RigidBody, b: Option<&RigidBody>) -> (Transform, Transform) {
        let frame_a = Transform::new(a.position(), a.rotation()).compose(self.frame_a);
        let frame_b = match b {
            Some(b) => Transform::new(b.position(), b.rotation()).compose(self.frame_b),
            None => self.frame_b,
        };
        (frame_a, frame_b)
    }

    fn update_positions(&mut self, frame_a: Transform, frame_b: Transform) {
        let axis = frame_a.transform_vector(Vec3::Z);
        self.linear_position = (frame_b.position - frame_a.position).dot(axis);
        let relative = frame_a.rotation.conjugate() * frame_b.rotation;
        self.angular_position = relative.to_euler().z;
    }
}

impl Joint for SliderConstraint {
    fn base(&self) -> &ConstraintBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ConstraintBase {
        &mut self.base
    }

    fn begin_step(&mut self) {
        self.lin_motor_impulse.reset();
        self.ang_motor_impulse.reset();
    }

    fn solve_velocity(&mut self, a: &mut RigidBody, b: Option<&mut RigidBody>, dt: f32) -> f32 {
        let (frame_a, frame_b) = self.world_frames(a, b.as_deref());
        self.update_positions(frame_a, frame_b);

        let erp = self.base.param(ConstraintParam::ERP, ALL_AXES);
        let stop_erp = self.base.param(ConstraintParam::STOP_ERP, ALL_AXES);
        let axis = frame_a.transform_vector(Vec3::Z);
        let axis_b = frame_b.transform_vector(Vec3::Z);
        let (p, q) = plane_basis(axis);

        let mut bodies = JointBodies::new(a, b);
        let r_a = frame_a.position - bodies.position_a();
        let r_b = frame_b.position - bodies.position_b();
        let offset = frame_b.position - frame_a.position;
        let mut total = 0.0;

        // Off-axis drift
        for n in [p, q] {
            let target = -offset.dot(n) * erp / dt;
            total += bodies.solve_linear(r_a, r_b, n, target, UNBOUNDED).abs();
        }
        total += bodies.align_axes(axis, axis_b, erp, dt);

        if self.powered_lin_motor && self.max_lin_motor_force > 0.0 {
            let bounds = self.lin_motor_impulse.bounds(self.max_lin_motor_force * dt);
            let impulse =
                bodies.solve_linear(r_a, r_b, axis, self.target_lin_motor_velocity, bounds);
            self.lin_motor_impulse.add(impulse);
            total += impulse.abs();
        }
        let rate = bodies.relative_velocity(r_a, r_b).dot(axis);
        if let Some(target) = limit_rate(
            self.linear_position,
            rate,
            self.lower_lin_limit,
            self.upper_lin_limit,
            stop_erp,
            dt,
        ) {
            total += bodies
                .solve_linear(r_a, r_b, axis, target, one_sided(target, rate))
                .abs();
        }

        if self.powered_ang_motor && self.max_ang_motor_force > 0.0 {
            let bounds = self.ang_motor_impulse.bounds(self.max_ang_motor_force * dt);
            let impulse = bodies.solve_angular(axis, self.target_ang_motor_velocity, bounds);
            self.ang_motor_impulse.add(impulse);
            total += impulse.abs();
        }
        let rate = bodies.relative_angular_velocity().dot(axis);
        if let Some(target) = limit_rate(
            self.angular_position,
            rate,
            self.lower_ang_limit,
            self.upper_ang_limit,
            stop_erp,
            dt,
        ) {
            total += bodies
                .solve_angular(axis, target, one_sided(target, rate))
                .abs();
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{integrate_positions, integrate_velocities};
    use crate::geometry::CollisionShape;
    use crate::math::Quat;

    fn block() -> RigidBody {
        let shape = CollisionShape::cuboid(Vec3::splat(0.25)).unwrap().into_shared();
        RigidBody::new(Some(shape), 1.0)
            .unwrap()
            .with_damping(0.0, 0.0)
            .unwrap()
    }

    /// Slides `body` along world Z; A is the body, B the world origin
    fn rail(body: &RigidBody) -> SliderConstraint {
        SliderConstraint::new(body, None, Mat4::IDENTITY, Mat4::IDENTITY).unwrap()
    }

    fn run(body: &mut RigidBody, joint: &mut SliderConstraint, steps: usize, force: Vec3) {
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
        joint.calculate_transforms(body, None);
    }

    #[test]
    fn test_defaults() {
        let body = block();
        let joint = rail(&body);
        assert_eq!(joint.lower_lin_limit(), -1.0);
        assert_eq!(joint.upper_lin_limit(), 1.0);
        assert_eq!(joint.lower_ang_limit(), 0.0);
        assert_eq!(joint.upper_ang_limit(), 0.0);
    }

    #[test]
    fn test_positions_measured_in_frame_a() {
        let body = block().with_position(Vec3::new(0.0, 0.0, -0.4));
        let mut joint = rail(&body);
        joint.calculate_transforms(&body, None);
        // B (world origin) sits 0.4 ahead of A along Z
        assert!((joint.linear_position() - 0.4).abs() < 1e-5);

        let turned = block().with_rotation(Quat::from_axis_angle(Vec3::Z, 0.3));
        joint.calculate_transforms(&turned, None);
        assert!((joint.angular_position() + 0.3).abs() < 1e-4);
    }

    #[test]
    fn test_off_axis_force_is_resisted() {
        let mut body = block();
        let mut joint = rail(&body);
        run(&mut body, &mut joint, 60, Vec3::new(20.0, 0.0, 0.0));
        assert!(body.position().x.abs() < 0.02);
    }

    #[test]
    fn test_linear_limit_stops_slide() {
        let mut body = block();
        let mut joint = rail(&body);
        run(&mut body, &mut joint, 120, Vec3::new(0.0, 0.0, 30.0));
        // A moving +Z means B's position along the axis goes negative
        assert!(joint.linear_position() >= -1.0 - 1e-2);
        assert!(body.position().z < 1.0 + 1e-2);
        assert!(body.position().z > 0.9);
    }

    #[test]
    fn test_linear_motor_drives() {
        let mut body = block();
        let mut joint = rail(&body);
        joint.set_upper_lin_limit(10.0);
        joint.set_lower_lin_limit(-10.0);
        joint.set_powered_lin_motor(true);
        joint.set_target_lin_motor_velocity(-1.0);
        joint.set_max_lin_motor_force(100.0).unwrap();
        run(&mut body, &mut joint, 30, Vec3::ZERO);
        assert!((body.linear_velocity().z - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_linear_motor_force_is_per_step() {
        let mut body = block();
        let mut joint = rail(&body);
        joint.set_upper_lin_limit(10.0);
        joint.set_lower_lin_limit(-10.0);
        joint.set_powered_lin_motor(true);
        joint.set_target_lin_motor_velocity(-100.0);
        joint.set_max_lin_motor_force(6.0).unwrap();
        // Ten iterations still deliver at most F * dt on a 1 kg block
        run(&mut body, &mut joint, 1, Vec3::ZERO);
        assert!((body.linear_velocity().z - 6.0 / 60.0).abs() < 1e-4);
        run(&mut body, &mut joint, 1, Vec3::ZERO);
        assert!((body.linear_velocity().z - 12.0 / 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_twist_locked_by_default_limits() {
        let mut body = block().with_angular_velocity(Vec3::new(0.0, 0.0, 3.0));
        let mut joint = rail(&body);
        run(&mut body, &mut joint, 30, Vec3::ZERO);
        assert!(joint.angular_position().abs() < 1e-2);
    }

    #[test]
    fn test_rejects_negative_motor_force() {
        let body = block();
        let mut joint = rail(&body);
        assert!(joint.set_max_lin_motor_force(-1.0).is_err());
        assert!(joint.set_max_ang_motor_force(f32::NAN).is_err());
    }
}
