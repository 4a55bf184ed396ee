#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::collision::{CollisionObject, ObjectId};
use crate::error::{ensure_range, PhysicsError, PhysicsResult};
use crate::geometry::{Shape, SharedShape};
use crate::math::{Mat3, Mat4, Quat, Vec3};

use super::material::PhysicsMaterial;

/// Seconds a body must stay below the sleep speed before deactivating
pub const SLEEP_DELAY: f32 = 2.0;

/// The type of rigid body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BodyType {
    /// Moved by forces, gravity and constraints
    #[default]
    Dynamic,
    /// Moved only by its velocity; never by forces
    Kinematic,
    /// Never moves
    Static,
}

/// Sleep state of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ActivationState {
    #[default]
    Active,
    /// Below the sleep speed, waiting out the delay
    WantsDeactivation,
    /// Asleep: skipped by integration until activated
    Deactivated,
    /// Simulated and never put to sleep
    DisableDeactivation,
    /// Excluded from simulation entirely
    DisableSimulation,
}

/// A rigid body: a collision object with mass, velocities and forces.
#[derive(Debug)]
pub struct RigidBody {
    object: CollisionObject,
    body_type: BodyType,
    mass: f32,
    density: f32,
    material: PhysicsMaterial,
    linear_damping: f32,
    angular_damping: f32,

    pub(crate) linear_velocity: Vec3,
    pub(crate) angular_velocity: Vec3,
    linear_factor: Vec3,
    angular_factor: Vec3,

    activation_state: ActivationState,
    sleep_threshold: f32,
    pub(crate) sleep_timer: f32,
    ccd_motion_threshold: f32,
    ccd_swept_sphere_radius: f32,

    /// Local-frame inertia and its inverse
    inertia: Mat3,
    inverse_inertia: Mat3,

    pub(crate) total_force: Vec3,
    pub(crate) total_torque: Vec3,
}

impl RigidBody {
    /// Creates a dynamic body. `mass` must be finite and non-negative.
    pub fn new(shape: Option<SharedShape>, mass: f32) -> PhysicsResult<Self> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(PhysicsError::BodyCreationFailed(format!(
                "Mass must be finite and non-negative, got {mass}"
            )));
        }
        Ok(Self::with_mass_unchecked(shape, mass))
    }

    /// Creates a static body
    pub fn fixed(shape: Option<SharedShape>) -> Self {
        let mut body = Self::with_mass_unchecked(shape, 0.0);
        body.set_body_type(BodyType::Static);
        body
    }

    /// Creates a kinematic body
    pub fn kinematic(shape: Option<SharedShape>) -> Self {
        let mut body = Self::with_mass_unchecked(shape, 0.0);
        body.set_body_type(BodyType::Kinematic);
        body
    }

    fn with_mass_unchecked(shape: Option<SharedShape>, mass: f32) -> Self {
        let mut body = Self {
            object: CollisionObject::new(shape),
            body_type: BodyType::Dynamic,
            mass,
            density: 1.0,
            material: PhysicsMaterial::default(),
            linear_damping: 0.04,
            angular_damping: 0.05,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            linear_factor: Vec3::ONE,
            angular_factor: Vec3::ONE,
            activation_state: ActivationState::Active,
            sleep_threshold: 0.8,
            sleep_timer: 0.0,
            ccd_motion_threshold: 0.0,
            ccd_swept_sphere_radius: 0.0,
            inertia: Mat3::ZERO,
            inverse_inertia: Mat3::ZERO,
            total_force: Vec3::ZERO,
            total_torque: Vec3::ZERO,
        };
        body.update_inertia();
        body
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.object.set_transform(Mat4::from_translation_rotation_scale(
            position,
            self.rotation(),
            self.object.scale(),
        ));
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.object.set_transform(Mat4::from_translation_rotation_scale(
            self.position(),
            rotation,
            self.object.scale(),
        ));
        self
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.object.set_transform(transform);
        self
    }

    pub fn with_body_type(mut self, body_type: BodyType) -> Self {
        self.set_body_type(body_type);
        self
    }

    pub fn with_linear_velocity(mut self, velocity: Vec3) -> Self {
        self.set_linear_velocity(velocity);
        self
    }

    pub fn with_angular_velocity(mut self, velocity: Vec3) -> Self {
        self.set_angular_velocity(velocity);
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> PhysicsResult<Self> {
        self.set_linear_damping(linear)?;
        self.set_angular_damping(angular)?;
        Ok(self)
    }

    // Collision object

    pub fn collision_object(&self) -> &CollisionObject {
        &self.object
    }

    pub fn collision_object_mut(&mut self) -> &mut CollisionObject {
        &mut self.object
    }

    pub fn id(&self) -> ObjectId {
        self.object.id()
    }

    pub(crate) fn set_id(&mut self, id: ObjectId) {
        self.object.set_id(id);
    }

    pub fn shape(&self) -> Option<&SharedShape> {
        self.object.shape()
    }

    /// Replaces the shape and recomputes inertia
    pub fn set_shape(&mut self, shape: Option<SharedShape>) {
        self.object.set_shape(shape);
        self.update_inertia();
    }

    // Transform

    pub fn transform(&self) -> &Mat4 {
        self.object.transform()
    }

    pub fn position(&self) -> Vec3 {
        self.object.position()
    }

    pub fn rotation(&self) -> Quat {
        self.object.rotation()
    }

    /// Sets position and rotation, keeping the current scale
    pub fn set_transform(&mut self, position: Vec3, rotation: Quat) {
        let scale = self.object.scale();
        self.object
            .set_transform(Mat4::from_translation_rotation_scale(position, rotation, scale));
    }

    pub fn set_world_transform(&mut self, transform: Mat4) {
        self.object.set_transform(transform);
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.set_transform(self.position() + offset, self.rotation());
    }

    /// Applies `rotation` in the body's local frame
    pub fn rotate(&mut self, rotation: Quat) {
        self.set_transform(self.position(), self.rotation() * rotation);
    }

    // Type and mass

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Static bodies lose mass and velocity; kinematic bodies lose mass;
    /// dynamic bodies without mass get a unit mass.
    pub fn set_body_type(&mut self, body_type: BodyType) {
        self.body_type = body_type;
        match body_type {
            BodyType::Static => {
                self.mass = 0.0;
                self.linear_velocity = Vec3::ZERO;
                self.angular_velocity = Vec3::ZERO;
            }
            BodyType::Kinematic => self.mass = 0.0,
            BodyType::Dynamic => {
                if self.mass <= 0.0 {
                    self.mass = 1.0;
                }
            }
        }
        self.clear_forces();
        self.update_inertia();
    }

    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    pub fn is_kinematic(&self) -> bool {
        self.body_type == BodyType::Kinematic
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inverse_mass(&self) -> f32 {
        if self.is_dynamic() && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    /// Static and kinematic bodies only accept a mass of zero
    pub fn set_mass(&mut self, mass: f32) -> PhysicsResult<()> {
        ensure_range("mass", mass, 0.0, f32::MAX)?;
        if !self.is_dynamic() && mass != 0.0 {
            return Err(PhysicsError::InvalidOperation(format!(
                "{:?} bodies always have zero mass",
                self.body_type
            )));
        }
        self.mass = mass;
        self.update_inertia();
        Ok(())
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    /// Sets density and, for dynamic bodies, mass = shape volume * density
    pub fn set_density(&mut self, density: f32) -> PhysicsResult<()> {
        if !density.is_finite() || density <= 0.0 {
            return Err(PhysicsError::invalid(format!(
                "density must be positive, got {density}"
            )));
        }
        self.density = density;
        if self.is_dynamic() {
            let volume = self.shape().map_or(0.0, |s| s.volume());
            self.mass = volume * density;
            self.update_inertia();
        }
        Ok(())
    }

    /// Local-frame inertia tensor
    pub fn inertia(&self) -> Mat3 {
        self.inertia
    }

    pub fn inverse_inertia(&self) -> Mat3 {
        self.inverse_inertia
    }

    /// Inverse inertia rotated into world space
    pub fn inverse_inertia_world(&self) -> Mat3 {
        if self.inverse_inertia.is_zero() {
            return Mat3::ZERO;
        }
        self.inverse_inertia
            .rotated(Mat3::from_quat(self.rotation()))
    }

    fn update_inertia(&mut self) {
        let shape_inertia = match self.shape() {
            Some(shape) if self.is_dynamic() && self.mass > 0.0 => {
                Some(shape.calculate_inertia(self.mass))
            }
            _ => None,
        };
        match shape_inertia {
            Some(inertia) => {
                let d = inertia.diagonal();
                let inv = |v: f32| if v > 1e-12 { 1.0 / v } else { 0.0 };
                self.inertia = inertia;
                self.inverse_inertia = Mat3::from_diagonal(Vec3::new(inv(d.x), inv(d.y), inv(d.z)));
            }
            None => {
                self.inertia = Mat3::ZERO;
                self.inverse_inertia = Mat3::ZERO;
            }
        }
    }

    // Material and damping

    pub fn material(&self) -> &PhysicsMaterial {
        &self.material
    }

    pub fn set_material(&mut self, material: PhysicsMaterial) -> PhysicsResult<()> {
        ensure_range("friction", material.friction, 0.0, f32::MAX)?;
        ensure_range("restitution", material.restitution, 0.0, 1.0)?;
        ensure_range("rolling friction", material.rolling_friction, 0.0, f32::MAX)?;
        ensure_range("spinning friction", material.spinning_friction, 0.0, f32::MAX)?;
        self.material = material;
        Ok(())
    }

    pub fn friction(&self) -> f32 {
        self.material.friction
    }

    pub fn set_friction(&mut self, friction: f32) -> PhysicsResult<()> {
        ensure_range("friction", friction, 0.0, f32::MAX)?;
        self.material.friction = friction;
        Ok(())
    }

    pub fn rolling_friction(&self) -> f32 {
        self.material.rolling_friction
    }

    pub fn set_rolling_friction(&mut self, friction: f32) -> PhysicsResult<()> {
        ensure_range("rolling friction", friction, 0.0, f32::MAX)?;
        self.material.rolling_friction = friction;
        Ok(())
    }

    pub fn restitution(&self) -> f32 {
        self.material.restitution
    }

    pub fn set_restitution(&mut self, restitution: f32) -> PhysicsResult<()> {
        ensure_range("restitution", restitution, 0.0, 1.0)?;
        self.material.restitution = restitution;
        Ok(())
    }

    pub fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    pub fn set_linear_damping(&mut self, damping: f32) -> PhysicsResult<()> {
        ensure_range("linear damping", damping, 0.0, 1.0)?;
        self.linear_damping = damping;
        Ok(())
    }

    pub fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    pub fn set_angular_damping(&mut self, damping: f32) -> PhysicsResult<()> {
        ensure_range("angular damping", damping, 0.0, 1.0)?;
        self.angular_damping = damping;
        Ok(())
    }

    // Velocities

    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    /// Ignored on static bodies
    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        if !self.is_static() {
            self.linear_velocity = velocity;
            self.activate();
        }
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    pub fn set_angular_velocity(&mut self, velocity: Vec3) {
        if !self.is_static() {
            self.angular_velocity = velocity;
            self.activate();
        }
    }

    pub fn linear_factor(&self) -> Vec3 {
        self.linear_factor
    }

    /// Per-axis multiplier on linear forces and impulses; zero locks an axis
    pub fn set_linear_factor(&mut self, factor: Vec3) {
        self.linear_factor = factor;
    }

    pub fn angular_factor(&self) -> Vec3 {
        self.angular_factor
    }

    pub fn set_angular_factor(&mut self, factor: Vec3) {
        self.angular_factor = factor;
    }

    /// Velocity of a world-space point rigidly attached to the body
    pub fn velocity_at_point(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.position())
    }

    // Forces

    /// Whether forces and impulses have any effect on this body
    fn accepts_forces(&self) -> bool {
        self.is_dynamic() && self.mass > 0.0 && self.activation_state != ActivationState::DisableSimulation
    }

    fn check_finite(name: &str, v: Vec3) -> PhysicsResult<()> {
        if v.is_finite() {
            Ok(())
        } else {
            Err(PhysicsError::invalid(format!("{name} must be finite")))
        }
    }

    /// Accumulates a force applied at `rel_pos` from the center of mass.
    ///
    /// A no-op on static, kinematic and simulation-disabled bodies.
    pub fn apply_force(&mut self, force: Vec3, rel_pos: Vec3) -> PhysicsResult<()> {
        Self::check_finite("force", force)?;
        Self::check_finite("relative position", rel_pos)?;
        if !self.accepts_forces() {
            return Ok(());
        }
        self.total_force += force.component_mul(self.linear_factor);
        if rel_pos != Vec3::ZERO {
            self.total_torque += rel_pos.cross(force).component_mul(self.angular_factor);
        }
        self.activate();
        Ok(())
    }

    pub fn apply_central_force(&mut self, force: Vec3) -> PhysicsResult<()> {
        self.apply_force(force, Vec3::ZERO)
    }

    pub fn apply_torque(&mut self, torque: Vec3) -> PhysicsResult<()> {
        Self::check_finite("torque", torque)?;
        if !self.accepts_forces() {
            return Ok(());
        }
        self.total_torque += torque.component_mul(self.angular_factor);
        self.activate();
        Ok(())
    }

    /// Changes velocity immediately: `dv = J / m`, `dw = I⁻¹ (r x J)`
    pub fn apply_impulse(&mut self, impulse: Vec3, rel_pos: Vec3) -> PhysicsResult<()> {
        Self::check_finite("impulse", impulse)?;
        Self::check_finite("relative position", rel_pos)?;
        if !self.accepts_forces() {
            return Ok(());
        }
        self.linear_velocity += impulse.component_mul(self.linear_factor) / self.mass;
        if rel_pos != Vec3::ZERO {
            let angular = rel_pos.cross(impulse).component_mul(self.angular_factor);
            self.angular_velocity += self.inverse_inertia_world() * angular;
        }
        self.activate();
        Ok(())
    }

    pub fn apply_central_impulse(&mut self, impulse: Vec3) -> PhysicsResult<()> {
        self.apply_impulse(impulse, Vec3::ZERO)
    }

    pub fn apply_torque_impulse(&mut self, torque: Vec3) -> PhysicsResult<()> {
        Self::check_finite("torque impulse", torque)?;
        if !self.accepts_forces() {
            return Ok(());
        }
        self.angular_velocity += self.inverse_inertia_world() * torque.component_mul(self.angular_factor);
        self.activate();
        Ok(())
    }

    pub fn total_force(&self) -> Vec3 {
        self.total_force
    }

    pub fn total_torque(&self) -> Vec3 {
        self.total_torque
    }

    pub fn clear_forces(&mut self) {
        self.total_force = Vec3::ZERO;
        self.total_torque = Vec3::ZERO;
    }

    // Activation

    pub fn activation_state(&self) -> ActivationState {
        self.activation_state
    }

    pub fn set_activation_state(&mut self, state: ActivationState) {
        self.activation_state = state;
        if state == ActivationState::Deactivated {
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
        }
    }

    /// True while the body takes part in integration
    pub fn is_active(&self) -> bool {
        matches!(
            self.activation_state,
            ActivationState::Active
                | ActivationState::WantsDeactivation
                | ActivationState::DisableDeactivation
        )
    }

    /// Wakes a sleeping body and restarts its sleep timer
    pub fn activate(&mut self) {
        if matches!(
            self.activation_state,
            ActivationState::Deactivated | ActivationState::WantsDeactivation
        ) {
            self.activation_state = ActivationState::Active;
        }
        self.sleep_timer = 0.0;
    }

    pub fn sleep_threshold(&self) -> f32 {
        self.sleep_threshold
    }

    pub fn set_sleep_threshold(&mut self, threshold: f32) -> PhysicsResult<()> {
        ensure_range("sleep threshold", threshold, 0.0, f32::MAX)?;
        self.sleep_threshold = threshold;
        Ok(())
    }

    /// Advances the sleep timer after position integration.
    ///
    /// Both speeds below `sleep_threshold * 0.1` for more than
    /// [`SLEEP_DELAY`] seconds puts the body to sleep with zero velocity.
    pub fn update_sleep(&mut self, dt: f32) {
        if matches!(
            self.activation_state,
            ActivationState::DisableDeactivation | ActivationState::DisableSimulation
        ) {
            return;
        }
        let limit = self.sleep_threshold * 0.1;
        if self.linear_velocity.length() < limit && self.angular_velocity.length() < limit {
            self.sleep_timer += dt;
            if self.sleep_timer > SLEEP_DELAY {
                self.set_activation_state(ActivationState::Deactivated);
            } else if self.activation_state == ActivationState::Active {
                self.activation_state = ActivationState::WantsDeactivation;
            }
        } else {
            self.sleep_timer = 0.0;
            if self.activation_state != ActivationState::Active {
                self.activation_state = ActivationState::Active;
            }
        }
    }

    // Continuous collision settings, stored only

    pub fn ccd_motion_threshold(&self) -> f32 {
        self.ccd_motion_threshold
    }

    pub fn set_ccd_motion_threshold(&mut self, threshold: f32) -> PhysicsResult<()> {
        ensure_range("ccd motion threshold", threshold, 0.0, f32::MAX)?;
        self.ccd_motion_threshold = threshold;
        Ok(())
    }

    pub fn ccd_swept_sphere_radius(&self) -> f32 {
        self.ccd_swept_sphere_radius
    }

    pub fn set_ccd_swept_sphere_radius(&mut self, radius: f32) -> PhysicsResult<()> {
        ensure_range("ccd swept sphere radius", radius, 0.0, f32::MAX)?;
        self.ccd_swept_sphere_radius = radius;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CollisionShape;

    fn ball(mass: f32) -> RigidBody {
        let shape = CollisionShape::sphere(1.0).unwrap().into_shared();
        RigidBody::new(Some(shape), mass).unwrap()
    }

    #[test]
    fn test_body_creation() {
        let body = ball(2.0).with_position(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(body.position(), Vec3::new(1.0, 2.0, 3.0));
        assert!((body.inverse_mass() - 0.5).abs() < 1e-6);
        assert!(RigidBody::new(None, -1.0).is_err());
    }

    #[test]
    fn test_static_body_has_no_mass_or_inertia() {
        let mut body = ball(3.0).with_body_type(BodyType::Static);
        assert!(body.is_static());
        assert_eq!(body.mass(), 0.0);
        assert!(body.inertia().is_zero());
        assert!(body.set_mass(1.0).is_err());
        body.apply_central_force(Vec3::new(100.0, 0.0, 0.0)).unwrap();
        assert_eq!(body.total_force(), Vec3::ZERO);
    }

    #[test]
    fn test_kinematic_ignores_forces_and_impulses() {
        let mut body = RigidBody::kinematic(None);
        body.apply_central_impulse(Vec3::X).unwrap();
        body.apply_torque(Vec3::Y).unwrap();
        assert_eq!(body.linear_velocity(), Vec3::ZERO);
        assert_eq!(body.total_torque(), Vec3::ZERO);
        assert!(body.inertia().is_zero());
    }

    #[test]
    fn test_dynamic_type_restores_unit_mass() {
        let mut body = RigidBody::fixed(None);
        body.set_body_type(BodyType::Dynamic);
        assert_eq!(body.mass(), 1.0);
    }

    #[test]
    fn test_setters_reject_out_of_range() {
        let mut body = ball(1.0);
        assert!(matches!(body.set_restitution(1.5), Err(PhysicsError::InvalidParameters(_))));
        assert!(body.set_friction(-0.1).is_err());
        assert!(body.set_linear_damping(1.1).is_err());
        assert!(body.set_angular_damping(-0.5).is_err());
        assert!(body.set_mass(-2.0).is_err());
        assert!(body.set_density(0.0).is_err());
        assert_eq!(body.restitution(), 0.0);
    }

    #[test]
    fn test_density_sets_mass_from_volume() {
        let mut body = ball(1.0);
        body.set_density(2.0).unwrap();
        let expected = 2.0 * body.shape().unwrap().volume();
        assert!((body.mass() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_apply_impulse() {
        let mut body = ball(2.0);
        body.apply_central_impulse(Vec3::new(4.0, 0.0, 0.0)).unwrap();
        assert_eq!(body.linear_velocity(), Vec3::new(2.0, 0.0, 0.0));
        assert!(body.apply_central_impulse(Vec3::new(f32::NAN, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_off_center_force_adds_torque() {
        let mut body = ball(1.0);
        body.apply_force(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(body.total_torque(), Vec3::new(0.0, 0.0, 1.0));
        body.set_linear_factor(Vec3::new(1.0, 0.0, 1.0));
        body.apply_central_force(Vec3::new(0.0, 5.0, 0.0)).unwrap();
        assert_eq!(body.total_force(), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_velocity_at_point() {
        let mut body = ball(1.0);
        body.set_linear_velocity(Vec3::new(1.0, 0.0, 0.0));
        body.set_angular_velocity(Vec3::new(0.0, 0.0, 1.0));
        // (0,0,1) x (0,1,0) = (-1,0,0)
        let vel = body.velocity_at_point(Vec3::new(0.0, 1.0, 0.0));
        assert!(vel.length() < 1e-6);
    }

    #[test]
    fn test_sleep_after_delay_and_wake_on_activity() {
        let mut body = ball(1.0);
        body.set_linear_velocity(Vec3::new(0.01, 0.0, 0.0));
        for _ in 0..60 {
            body.update_sleep(1.0 / 60.0);
        }
        assert_eq!(body.activation_state(), ActivationState::WantsDeactivation);
        for _ in 0..70 {
            body.update_sleep(1.0 / 60.0);
        }
        assert_eq!(body.activation_state(), ActivationState::Deactivated);
        assert_eq!(body.linear_velocity(), Vec3::ZERO);

        body.apply_central_impulse(Vec3::new(5.0, 0.0, 0.0)).unwrap();
        assert!(body.is_active());
        body.update_sleep(1.0 / 60.0);
        assert_eq!(body.activation_state(), ActivationState::Active);
    }

    #[test]
    fn test_rotate_keeps_position() {
        let mut body = ball(1.0).with_position(Vec3::new(0.0, 3.0, 0.0));
        body.rotate(Quat::from_axis_angle(Vec3::Y, 0.5));
        assert!((body.position() - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-5);
        assert!((body.rotation().angle() - 0.5).abs() < 1e-4);
    }
}
