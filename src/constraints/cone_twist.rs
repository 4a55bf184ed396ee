use std::f32::consts::{FRAC_PI_4, FRAC_PI_6, PI};

use crate::dynamics::RigidBody;
use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Mat4, Quat, Transform, Vec3};

use super::solver::{limit_rate, one_sided, JointBodies, UNBOUNDED};
use super::{ConstraintBase, ConstraintParam, Joint, ALL_AXES};

/// Ball joint whose swing stays inside an elliptical cone around frame X
/// and whose twist about X is bounded.
#[derive(Debug, Clone)]
pub struct ConeTwistConstraint {
    base: ConstraintBase,
    frame_a: Transform,
    frame_b: Transform,

    swing_span1: f32,
    swing_span2: f32,
    twist_span: f32,
    limit_softness: f32,
    damping: f32,

    motor_enabled: bool,
    motor_target: Quat,
    max_motor_impulse: f32,
    /// Motor impulse magnitude spent so far this step
    motor_spent: f32,
    damped_this_step: bool,

    swing_ratio: f32,
    twist_angle: f32,
}

impl ConeTwistConstraint {
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
            swing_span1: FRAC_PI_4,
            swing_span2: FRAC_PI_4,
            twist_span: FRAC_PI_6,
            limit_softness: 1.0,
            damping: 0.01,
            motor_enabled: false,
            motor_target: Quat::IDENTITY,
            max_motor_impulse: 0.0,
            motor_spent: 0.0,
            damped_this_step: false,
            swing_ratio: 0.0,
            twist_angle: 0.0,
        })
    }

    /// Sets the cone half-angles (about frame Y and Z) and the twist span.
    /// Spans are clamped to `[0, π]`.
    pub fn set_limit(
        &mut self,
        swing_span1: f32,
        swing_span2: f32,
        twist_span: f32,
        softness: f32,
        bias: f32,
        relaxation: f32,
    ) {
        self.swing_span1 = swing_span1.clamp(0.0, PI);
        self.swing_span2 = swing_span2.clamp(0.0, PI);
        self.twist_span = twist_span.clamp(0.0, PI);
        self.limit_softness = softness;
        self.base.set_param(ConstraintParam::STOP_ERP, bias, ALL_AXES);
        self.base.set_param(ConstraintParam::STOP_CFM, relaxation, ALL_AXES);
    }

    pub fn swing_span1(&self) -> f32 {
        self.swing_span1
    }

    pub fn swing_span2(&self) -> f32 {
        self.swing_span2
    }

    pub fn twist_span(&self) -> f32 {
        self.twist_span
    }

    pub fn limit_softness(&self) -> f32 {
        self.limit_softness
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn set_damping(&mut self, damping: f32) -> PhysicsResult<()> {
        crate::error::ensure_range("cone twist damping", damping, 0.0, f32::MAX)?;
        self.damping = damping;
        Ok(())
    }

    pub fn enable_motor(&mut self, enable: bool) {
        self.motor_enabled = enable;
    }

    pub fn motor_enabled(&self) -> bool {
        self.motor_enabled
    }

    pub fn set_max_motor_impulse(&mut self, impulse: f32) -> PhysicsResult<()> {
        if impulse.is_nan() || impulse < 0.0 {
            return Err(PhysicsError::invalid(format!(
                "max motor impulse must be non-negative, got {impulse}"
            )));
        }
        self.max_motor_impulse = impulse;
        Ok(())
    }

    pub fn max_motor_impulse(&self) -> f32 {
        self.max_motor_impulse
    }

    /// Orientation of B's frame relative to A's that the motor drives toward
    pub fn set_motor_target(&mut self, target: Quat) {
        self.motor_target = target.normalize();
    }

    pub fn motor_target(&self) -> Quat {
        self.motor_target
    }

    /// Elliptical swing measure from the last solve; above 1 means the
    /// cone is violated
    pub fn swing_ratio(&self) -> f32 {
        self.swing_ratio
    }

    pub fn twist_angle(&self) -> f32 {
        self.twist_angle
    }

    /// `(swing angle, twist angle)` of B's frame relative to A's
    pub fn calculate_angles(&self, a: &RigidBody, b: Option<&RigidBody>) -> (f32, f32) {
        let relative = self.relative_rotation(a, b);
        let (swing, twist) = relative.swing_twist(Vec3::X);
        (swing.angle(), twist.signed_angle_about(Vec3::X))
    }

    fn world_frames(&self, a: &RigidBody, b: Option<&RigidBody>) -> (Transform, Transform) {
        let frame_a = Transform::new(a.position(), a.rotation()).compose(self.frame_a);
        let frame_b = match b {
            Some(b) => Transform::new(b.position(), b.rotation()).compose(self.frame_b),
            None => self.frame_b,
        };
        (frame_a, frame_b)
    }

    fn relative_rotation(&self, a: &RigidBody, b: Option<&RigidBody>) -> Quat {
        let (frame_a, frame_b) = self.world_frames(a, b);
        let relative = (frame_a.rotation.conjugate() * frame_b.rotation).normalize();
        if relative.w < 0.0 {
            -relative
        } else {
            relative
        }
    }

    fn ellipse_ratio(&self, swing_axis: Vec3, swing_angle: f32) -> f32 {
        let span1 = self.swing_span1.max(1e-4);
        let span2 = self.swing_span2.max(1e-4);
        let y = swing_axis.y * swing_angle / span1;
        let z = swing_axis.z * swing_angle / span2;
        (y * y + z * z).sqrt()
    }
}

impl Joint for ConeTwistConstraint {
    fn base(&self) -> &ConstraintBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ConstraintBase {
        &mut self.base
    }

    fn begin_step(&mut self) {
        self.motor_spent = 0.0;
        self.damped_this_step = false;
    }

    fn solve_velocity(&mut self, a: &mut RigidBody, b: Option<&mut RigidBody>, dt: f32) -> f32 {
        let (frame_a, frame_b) = self.world_frames(a, b.as_deref());
        let relative = self.relative_rotation(a, b.as_deref());
        let (swing, twist) = relative.swing_twist(Vec3::X);
        let (swing_axis, swing_angle) = swing.to_axis_angle();
        let twist_angle = twist.signed_angle_about(Vec3::X);
        let ratio = self.ellipse_ratio(swing_axis, swing_angle);
        self.swing_ratio = ratio;
        self.twist_angle = twist_angle;

        let erp = self.base.param(ConstraintParam::ERP, ALL_AXES);
        let stop_erp = self.base.param(ConstraintParam::STOP_ERP, ALL_AXES);
        let mut bodies = JointBodies::new(a, b);
        let mut total = bodies.solve_point(frame_a.position, frame_b.position, erp, dt);

        if self.motor_enabled && self.max_motor_impulse > 0.0 {
            let error = (self.motor_target * relative.conjugate()).normalize();
            let (axis, angle) = error.to_axis_angle();
            if angle > 1e-5 {
                let axis = frame_a.rotation.rotate_vec(axis);
                // The drive axis moves between iterations, so the cap is on magnitude
                let remaining = (self.max_motor_impulse - self.motor_spent).max(0.0);
                let impulse = bodies
                    .solve_angular(axis, angle * erp / dt, (-remaining, remaining))
                    .abs();
                self.motor_spent += impulse;
                total += impulse;
            }
        }

        let spin = bodies.relative_angular_velocity();
        let speed = spin.length();
        if self.damping > 0.0 && speed > 1e-6 && !self.damped_this_step {
            self.damped_this_step = true;
            let keep = 1.0 - (self.damping * dt).min(1.0);
            total += bodies
                .solve_angular(spin / speed, speed * keep, UNBOUNDED)
                .abs();
        }

        if swing_angle > 1e-4 {
            // The cone allows `swing_angle / ratio` in the current direction
            let axis = frame_a.rotation.rotate_vec(swing_axis);
            let rate = bodies.relative_angular_velocity().dot(axis);
            let allowed = swing_angle / ratio.max(1e-6);
            if let Some(target) = limit_rate(swing_angle, rate, -f32::MAX, allowed, stop_erp, dt) {
                total += bodies
                    .solve_angular(axis, target, one_sided(target, rate))
                    .abs();
            }
        }

        let twist_axis = frame_b.rotation.rotate_vec(Vec3::X);
        let rate = bodies.relative_angular_velocity().dot(twist_axis);
        if let Some(target) = limit_rate(
            twist_angle,
            rate,
            -self.twist_span,
            self.twist_span,
            stop_erp,
            dt,
        ) {
            total += bodies
                .solve_angular(twist_axis, target, one_sided(target, rate))
                .abs();
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::integrate_positions;
    use crate::geometry::CollisionShape;

    fn ball() -> RigidBody {
        let shape = CollisionShape::sphere(0.5).unwrap().into_shared();
        RigidBody::new(Some(shape), 1.0)
            .unwrap()
            .with_damping(0.0, 0.0)
            .unwrap()
    }

    fn socket(body: &RigidBody) -> ConeTwistConstraint {
        ConeTwistConstraint::new(body, None, Mat4::IDENTITY, Mat4::IDENTITY).unwrap()
    }

    fn run(body: &mut RigidBody, joint: &mut ConeTwistConstraint, steps: usize) {
        let dt = 1.0 / 60.0;
        for _ in 0..steps {
            body.activate();
            joint.begin_step();
            for _ in 0..10 {
                joint.solve(body, None, dt);
            }
            integrate_positions(body, dt);
        }
    }

    #[test]
    fn test_defaults() {
        let body = ball();
        let joint = socket(&body);
        assert!((joint.swing_span1() - FRAC_PI_4).abs() < 1e-6);
        assert!((joint.swing_span2() - FRAC_PI_4).abs() < 1e-6);
        assert!((joint.twist_span() - FRAC_PI_6).abs() < 1e-6);
        assert!((joint.damping() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_set_limit_clamps_spans() {
        let body = ball();
        let mut joint = socket(&body);
        joint.set_limit(4.0, -1.0, 5.0, 1.0, 0.3, 1.0);
        assert_eq!(joint.swing_span1(), PI);
        assert_eq!(joint.swing_span2(), 0.0);
        assert_eq!(joint.twist_span(), PI);
        assert_eq!(joint.base().param(ConstraintParam::STOP_ERP, ALL_AXES), 0.3);
    }

    #[test]
    fn test_swing_stays_in_cone() {
        let mut body = ball().with_angular_velocity(Vec3::new(0.0, 0.0, 3.0));
        let mut joint = socket(&body);
        run(&mut body, &mut joint, 60);
        let (swing, _) = joint.calculate_angles(&body, None);
        assert!(swing <= FRAC_PI_4 + 0.02, "swing {swing}");
        assert!(swing > FRAC_PI_4 - 0.05);
    }

    #[test]
    fn test_twist_limited() {
        let mut body = ball().with_angular_velocity(Vec3::new(3.0, 0.0, 0.0));
        let mut joint = socket(&body);
        run(&mut body, &mut joint, 60);
        let (_, twist) = joint.calculate_angles(&body, None);
        assert!(twist.abs() <= FRAC_PI_6 + 0.02, "twist {twist}");
    }

    #[test]
    fn test_damping_applied_once_per_step() {
        let dt = 1.0 / 60.0;
        let spin_after = |iterations: usize| {
            let mut body = ball().with_angular_velocity(Vec3::X);
            let mut joint = socket(&body);
            joint.set_damping(1.0).unwrap();
            joint.begin_step();
            for _ in 0..iterations {
                joint.solve(&mut body, None, dt);
            }
            body.angular_velocity().x
        };
        let once = spin_after(1);
        assert!((once - (1.0 - dt)).abs() < 1e-5, "spin {once}");
        assert!((spin_after(10) - once).abs() < 1e-5);
    }

    #[test]
    fn test_motor_reaches_target() {
        let mut body = ball();
        let mut joint = socket(&body);
        joint.enable_motor(true);
        joint.set_max_motor_impulse(10.0).unwrap();
        joint.set_motor_target(Quat::from_axis_angle(Vec3::Z, 0.3));
        run(&mut body, &mut joint, 120);
        let (swing, _) = joint.calculate_angles(&body, None);
        assert!((swing - 0.3).abs() < 1e-2, "swing {swing}");
    }

    #[test]
    fn test_rejects_negative_settings() {
        let body = ball();
        let mut joint = socket(&body);
        assert!(joint.set_max_motor_impulse(-1.0).is_err());
        assert!(joint.set_damping(-0.5).is_err());
    }
}
