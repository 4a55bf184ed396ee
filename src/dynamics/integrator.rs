use crate::math::Vec3;

use super::rigid_body::RigidBody;

/// Adds `gravity * mass` to an active dynamic body's force accumulator
pub fn apply_gravity(body: &mut RigidBody, gravity: Vec3) {
    if !body.is_dynamic() || !body.is_active() || body.mass() <= 0.0 {
        return;
    }
    body.total_force += gravity * body.mass();
}

/// Integrates accumulated forces into velocities, then clears them.
///
/// `v = (v + F/m dt)(1 - linear_damping)` and
/// `w = (w + I⁻¹ T dt)(1 - angular_damping)`.
pub fn integrate_velocities(body: &mut RigidBody, dt: f32) {
    if !body.is_dynamic() || !body.is_active() {
        body.clear_forces();
        return;
    }

    if body.mass() > 0.0 {
        let acceleration = body.total_force / body.mass();
        body.linear_velocity =
            (body.linear_velocity + acceleration * dt) * (1.0 - body.linear_damping());
    }

    let angular_acceleration = body.inverse_inertia_world() * body.total_torque;
    body.angular_velocity =
        (body.angular_velocity + angular_acceleration * dt) * (1.0 - body.angular_damping());

    body.clear_forces();
}

/// Moves an active non-static body by its velocities and updates its
/// sleep state. Rotation composes as `rotation * delta`.
pub fn integrate_positions(body: &mut RigidBody, dt: f32) {
    if body.is_static() || !body.is_active() {
        return;
    }

    let position = body.position() + body.linear_velocity * dt;
    let rotation = body.rotation().integrate(body.angular_velocity, dt);
    body.set_transform(position, rotation);

    if body.is_dynamic() {
        body.update_sleep(dt);
    }
}

/// Semi-implicit Euler for a single body with no constraints
pub fn integrate_semi_implicit_euler(body: &mut RigidBody, gravity: Vec3, dt: f32) {
    apply_gravity(body, gravity);
    integrate_velocities(body, dt);
    integrate_positions(body, dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::BodyType;
    use crate::geometry::CollisionShape;
    use crate::math::Quat;

    fn body() -> RigidBody {
        let shape = CollisionShape::sphere(0.5).unwrap().into_shared();
        RigidBody::new(Some(shape), 1.0)
            .unwrap()
            .with_damping(0.0, 0.0)
            .unwrap()
    }

    #[test]
    fn test_gravity_integration() {
        let mut b = body();
        let gravity = Vec3::new(0.0, -9.81, 0.0);
        integrate_semi_implicit_euler(&mut b, gravity, 1.0 / 60.0);
        assert!(b.linear_velocity().y < 0.0);
        assert!(b.position().y < 0.0);
        assert_eq!(b.total_force(), Vec3::ZERO);
    }

    #[test]
    fn test_static_body_no_integration() {
        let mut b = body().with_body_type(BodyType::Static);
        integrate_semi_implicit_euler(&mut b, Vec3::new(0.0, -9.81, 0.0), 1.0 / 60.0);
        assert_eq!(b.position(), Vec3::ZERO);
        assert_eq!(b.linear_velocity(), Vec3::ZERO);
    }

    #[test]
    fn test_kinematic_moves_by_velocity_only() {
        let mut b = body().with_body_type(BodyType::Kinematic);
        b.set_linear_velocity(Vec3::new(2.0, 0.0, 0.0));
        integrate_semi_implicit_euler(&mut b, Vec3::new(0.0, -9.81, 0.0), 0.5);
        assert!((b.position() - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_angular_velocity_integration() {
        let mut b = body().with_rotation(Quat::IDENTITY);
        b.set_angular_velocity(Vec3::new(0.0, 0.0, std::f32::consts::PI));
        integrate_semi_implicit_euler(&mut b, Vec3::ZERO, 1.0);
        // Half a turn about Z maps +X to -X
        let x = b.rotation().rotate_vec(Vec3::X);
        assert!(x.x < -0.9);
    }

    #[test]
    fn test_damping_is_per_step_factor() {
        let mut b = body();
        b.set_linear_damping(0.1).unwrap();
        b.set_linear_velocity(Vec3::new(10.0, 0.0, 0.0));
        integrate_semi_implicit_euler(&mut b, Vec3::ZERO, 1.0 / 60.0);
        assert!((b.linear_velocity().x - 9.0).abs() < 1e-5);
    }
}
