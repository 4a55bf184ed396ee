use crate::dynamics::RigidBody;
use crate::math::{Mat3, Quat, Transform, Vec3};

/// The one or two bodies a joint acts on during a solve.
///
/// A missing body B is the static world. Bodies that are not both dynamic
/// and awake take no impulse.
pub(crate) struct JointBodies<'a> {
    a: &'a mut RigidBody,
    b: Option<&'a mut RigidBody>,
}

fn movable(body: &RigidBody) -> bool {
    body.is_dynamic() && body.is_active() && body.inverse_mass() > 0.0
}

fn inverse_mass(body: &RigidBody) -> f32 {
    if movable(body) {
        body.inverse_mass()
    } else {
        0.0
    }
}

fn inverse_inertia(body: &RigidBody) -> Mat3 {
    if movable(body) {
        body.inverse_inertia_world()
    } else {
        Mat3::ZERO
    }
}

fn push(body: &mut RigidBody, impulse: Vec3, r: Vec3) {
    if !movable(body) {
        return;
    }
    let linear = impulse.component_mul(body.linear_factor()) * body.inverse_mass();
    let angular = inverse_inertia(body) * r.cross(impulse).component_mul(body.angular_factor());
    body.linear_velocity += linear;
    body.angular_velocity += angular;
}

fn twist(body: &mut RigidBody, impulse: Vec3) {
    if !movable(body) {
        return;
    }
    body.angular_velocity += inverse_inertia(body) * impulse.component_mul(body.angular_factor());
}

impl<'a> JointBodies<'a> {
    pub fn new(a: &'a mut RigidBody, b: Option<&'a mut RigidBody>) -> Self {
        Self { a, b }
    }

    /// World frame of a body-local frame on A
    pub fn frame_a(&self, local: Transform) -> Transform {
        Transform::new(self.a.position(), self.a.rotation()).compose(local)
    }

    /// World frame of a body-local frame on B, or `local` itself for the world
    pub fn frame_b(&self, local: Transform) -> Transform {
        match &self.b {
            Some(b) => Transform::new(b.position(), b.rotation()).compose(local),
            None => local,
        }
    }

    pub fn position_a(&self) -> Vec3 {
        self.a.position()
    }

    pub fn position_b(&self) -> Vec3 {
        self.b.as_ref().map_or(Vec3::ZERO, |b| b.position())
    }

    pub fn rotation_a(&self) -> Quat {
        self.a.rotation()
    }

    pub fn rotation_b(&self) -> Quat {
        self.b.as_ref().map_or(Quat::IDENTITY, |b| b.rotation())
    }

    /// Velocity of B's anchor relative to A's anchor
    pub fn relative_velocity(&self, r_a: Vec3, r_b: Vec3) -> Vec3 {
        let v_a = self.a.linear_velocity() + self.a.angular_velocity().cross(r_a);
        let v_b = self
            .b
            .as_ref()
            .map_or(Vec3::ZERO, |b| b.linear_velocity() + b.angular_velocity().cross(r_b));
        v_b - v_a
    }

    pub fn relative_angular_velocity(&self) -> Vec3 {
        let w_b = self.b.as_ref().map_or(Vec3::ZERO, |b| b.angular_velocity());
        w_b - self.a.angular_velocity()
    }

    /// Effective mass denominator along `n` for anchors `r_a`, `r_b`
    pub fn linear_mass(&self, r_a: Vec3, r_b: Vec3, n: Vec3) -> f32 {
        let term = |body: &RigidBody, r: Vec3| {
            let rn = r.cross(n);
            inverse_mass(body) + rn.dot(inverse_inertia(body) * rn)
        };
        term(&*self.a, r_a) + self.b.as_deref().map_or(0.0, |b| term(b, r_b))
    }

    pub fn angular_mass(&self, n: Vec3) -> f32 {
        let term = |body: &RigidBody| n.dot(inverse_inertia(body) * n);
        term(&*self.a) + self.b.as_deref().map_or(0.0, term)
    }

    /// `-impulse` on A at `r_a`, `+impulse` on B at `r_b`
    pub fn apply_linear(&mut self, impulse: Vec3, r_a: Vec3, r_b: Vec3) {
        push(self.a, -impulse, r_a);
        if let Some(b) = self.b.as_deref_mut() {
            push(b, impulse, r_b);
        }
    }

    pub fn apply_angular(&mut self, impulse: Vec3) {
        twist(self.a, -impulse);
        if let Some(b) = self.b.as_deref_mut() {
            twist(b, impulse);
        }
    }

    /// Drives the relative anchor velocity along `n` to `target`, with the
    /// impulse clamped to `[min, max]`. Returns the impulse applied.
    pub fn solve_linear(
        &mut self,
        r_a: Vec3,
        r_b: Vec3,
        n: Vec3,
        target: f32,
        (min, max): (f32, f32),
    ) -> f32 {
        let k = self.linear_mass(r_a, r_b, n);
        if k <= 1e-12 {
            return 0.0;
        }
        let rate = self.relative_velocity(r_a, r_b).dot(n);
        let lambda = ((target - rate) / k).clamp(min, max);
        self.apply_linear(n * lambda, r_a, r_b);
        lambda
    }

    /// Angular counterpart of [`JointBodies::solve_linear`]
    pub fn solve_angular(&mut self, n: Vec3, target: f32, (min, max): (f32, f32)) -> f32 {
        let k = self.angular_mass(n);
        if k <= 1e-12 {
            return 0.0;
        }
        let rate = self.relative_angular_velocity().dot(n);
        let lambda = ((target - rate) / k).clamp(min, max);
        self.apply_angular(n * lambda);
        lambda
    }

    /// Pins the two anchors together, closing `error = anchor_a - anchor_b`
    /// at rate `erp / dt`. Returns the summed impulse magnitude.
    pub fn solve_point(&mut self, anchor_a: Vec3, anchor_b: Vec3, erp: f32, dt: f32) -> f32 {
        let r_a = anchor_a - self.position_a();
        let r_b = anchor_b - self.position_b();
        let error = anchor_a - anchor_b;
        let mut total = 0.0;
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            let target = error.dot(axis) * erp / dt;
            total += self.solve_linear(r_a, r_b, axis, target, UNBOUNDED).abs();
        }
        total
    }

    /// Keeps `axis_b` parallel to `axis_a`, leaving rotation about the
    /// axis free. Returns the summed impulse magnitude.
    pub fn align_axes(&mut self, axis_a: Vec3, axis_b: Vec3, erp: f32, dt: f32) -> f32 {
        let correction = axis_b.cross(axis_a) * (erp / dt);
        let (p, q) = plane_basis(axis_a);
        let mut total = 0.0;
        for n in [p, q] {
            total += self.solve_angular(n, correction.dot(n), UNBOUNDED).abs();
        }
        total
    }
}

/// Motor impulse accumulated over the iterations of one step.
///
/// Each iteration's impulse is clamped so the running total stays within
/// `±max`, capping the motor at `max` per step for any iteration count.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MotorImpulse {
    accumulated: f32,
}

impl MotorImpulse {
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }

    pub fn accumulated(&self) -> f32 {
        self.accumulated
    }

    /// Bounds for the next iteration's impulse
    pub fn bounds(&self, max: f32) -> (f32, f32) {
        let max = max.max(0.0);
        ((-max - self.accumulated).min(0.0), (max - self.accumulated).max(0.0))
    }

    pub fn add(&mut self, impulse: f32) {
        self.accumulated += impulse;
    }
}

pub(crate) const UNBOUNDED: (f32, f32) = (f32::NEG_INFINITY, f32::INFINITY);

/// Impulse bounds that only push toward larger or smaller positions
pub(crate) fn one_sided(target: f32, rate: f32) -> (f32, f32) {
    if target >= rate {
        (0.0, f32::INFINITY)
    } else {
        (f32::NEG_INFINITY, 0.0)
    }
}

/// Target rate that keeps `position` within `[lower, upper]` over the
/// next step, or `None` when the limit is inactive.
///
/// An already violated limit is pulled back at `stop_erp / dt`. Otherwise
/// the rate is clamped so the predicted position lands on the limit.
/// `lower > upper` leaves the coordinate free.
pub(crate) fn limit_rate(
    position: f32,
    rate: f32,
    lower: f32,
    upper: f32,
    stop_erp: f32,
    dt: f32,
) -> Option<f32> {
    if lower > upper {
        return None;
    }
    if position < lower {
        let target = (lower - position) * stop_erp / dt;
        return (rate < target).then_some(target);
    }
    if position > upper {
        let target = (upper - position) * stop_erp / dt;
        return (rate > target).then_some(target);
    }
    let predicted = position + rate * dt;
    if predicted < lower {
        Some((lower - position) / dt)
    } else if predicted > upper {
        Some((upper - position) / dt)
    } else {
        None
    }
}

/// Two unit vectors spanning the plane orthogonal to `axis`
pub(crate) fn plane_basis(axis: Vec3) -> (Vec3, Vec3) {
    let p = axis.any_perpendicular();
    (p, axis.cross(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_rate_inside_is_free() {
        assert_eq!(limit_rate(0.0, 0.5, -1.0, 1.0, 0.1, 0.1), None);
    }

    #[test]
    fn test_limit_rate_clamps_prediction() {
        // 0.9 + 2.0 * 0.1 overshoots 1.0
        let target = limit_rate(0.9, 2.0, -1.0, 1.0, 0.1, 0.1).unwrap();
        assert!((target - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_limit_rate_violation_uses_stop_erp() {
        let target = limit_rate(-1.5, 0.0, -1.0, 1.0, 0.1, 0.1).unwrap();
        assert!((target - 0.5).abs() < 1e-5);
        // Already separating fast enough
        assert_eq!(limit_rate(-1.5, 1.0, -1.0, 1.0, 0.1, 0.1), None);
    }

    #[test]
    fn test_limit_rate_inverted_range_is_free() {
        assert_eq!(limit_rate(5.0, 5.0, 1.0, -1.0, 0.1, 0.1), None);
    }

    #[test]
    fn test_motor_impulse_caps_running_total() {
        let mut motor = MotorImpulse::default();
        assert_eq!(motor.bounds(2.0), (-2.0, 2.0));
        motor.add(1.5);
        assert_eq!(motor.bounds(2.0), (-3.5, 0.5));
        motor.add(0.5);
        assert_eq!(motor.bounds(2.0), (-4.0, 0.0));
        // Budget lowered mid-step never forces a reverse push
        assert_eq!(motor.bounds(1.0), (-3.0, 0.0));
        motor.reset();
        assert_eq!(motor.accumulated(), 0.0);
    }

    #[test]
    fn test_one_sided_bounds() {
        assert_eq!(one_sided(1.0, 0.0), (0.0, f32::INFINITY));
        assert_eq!(one_sided(-1.0, 0.0), (f32::NEG_INFINITY, 0.0));
    }
}
