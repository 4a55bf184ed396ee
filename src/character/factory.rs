//! Preconfigured controllers for common character types.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_4, FRAC_PI_6};

use crate::error::PhysicsResult;
use crate::geometry::CollisionShape;
use crate::math::Vec3;

use super::controller::CharacterController;
use super::settings::MovementSettings;

impl CharacterController {
    /// Capsule of total `height` (caps included); steps up to a fifth of it
    pub fn humanoid(height: f32, radius: f32, position: Vec3) -> PhysicsResult<Self> {
        let shape = CollisionShape::capsule(radius, (height - 2.0 * radius).max(0.0))?;
        let step_height = height * 0.2;
        let mut controller = Self::new(shape.into_shared(), step_height, position)?;
        controller.configure_movement(MovementSettings {
            jump_speed: 5.0,
            fall_speed: 20.0,
            step_height,
            max_slope: FRAC_PI_4,
            air_control: 0.2,
            ..MovementSettings::default()
        })?;
        Ok(controller)
    }

    pub fn default_humanoid(position: Vec3) -> PhysicsResult<Self> {
        Self::humanoid(1.8, 0.3, position)
    }

    /// Small, nimble capsule that climbs steeper slopes
    pub fn small(height: f32, radius: f32, position: Vec3) -> PhysicsResult<Self> {
        let shape = CollisionShape::capsule(radius, (height - 2.0 * radius).max(0.0))?;
        let step_height = height * 0.15;
        let mut controller = Self::new(shape.into_shared(), step_height, position)?;
        controller.configure_movement(MovementSettings {
            jump_speed: 3.0,
            fall_speed: 15.0,
            step_height,
            max_slope: FRAC_PI_3,
            air_control: 0.3,
            ..MovementSettings::default()
        })?;
        Ok(controller)
    }

    /// Box-shaped ground vehicle; `length` runs along Z. Cannot jump.
    pub fn vehicle(length: f32, width: f32, height: f32, position: Vec3) -> PhysicsResult<Self> {
        let half_extents = Vec3::new(width * 0.5, height * 0.5, length * 0.5);
        let shape = CollisionShape::cuboid(half_extents)?;
        let mut controller = Self::new(shape.into_shared(), 0.1, position)?;
        controller.configure_movement(MovementSettings {
            jump_speed: 0.0,
            fall_speed: 30.0,
            step_height: 0.1,
            max_slope: FRAC_PI_6,
            air_control: 0.1,
            ..MovementSettings::default()
        })?;
        Ok(controller)
    }

    /// Gravity-free sphere with full air control
    pub fn floating(radius: f32, position: Vec3) -> PhysicsResult<Self> {
        let shape = CollisionShape::sphere(radius)?;
        let mut controller = Self::new(shape.into_shared(), 0.0, position)?;
        controller.configure_movement(MovementSettings {
            gravity: 0.0,
            jump_speed: 5.0,
            fall_speed: 5.0,
            step_height: 0.0,
            max_slope: FRAC_PI_2,
            air_control: 1.0,
        })?;
        Ok(controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanoid_proportions() {
        let c = CharacterController::default_humanoid(Vec3::ZERO).unwrap();
        assert!((c.height() - 1.8).abs() < 1e-5);
        assert!((c.radius() - 0.3).abs() < 1e-6);
        assert!((c.step_height() - 0.36).abs() < 1e-5);
        assert_eq!(c.max_slope(), FRAC_PI_4);
    }

    #[test]
    fn test_small_character() {
        let c = CharacterController::small(1.2, 0.2, Vec3::ZERO).unwrap();
        assert!((c.height() - 1.2).abs() < 1e-5);
        assert_eq!(c.jump_speed(), 3.0);
        assert_eq!(c.max_slope(), FRAC_PI_3);
    }

    #[test]
    fn test_vehicle_footprint() {
        let c = CharacterController::vehicle(4.0, 2.0, 1.5, Vec3::ZERO).unwrap();
        // Box shapes report their narrower horizontal half extent
        assert!((c.radius() - 1.0).abs() < 1e-6);
        assert!((c.height() - 1.5).abs() < 1e-6);
        assert_eq!(c.jump_speed(), 0.0);
    }

    #[test]
    fn test_floating_ignores_gravity() {
        let c = CharacterController::floating(0.5, Vec3::ZERO).unwrap();
        assert_eq!(c.movement_settings().gravity, 0.0);
        assert_eq!(c.step_height(), 0.0);
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(CharacterController::floating(-1.0, Vec3::ZERO).is_err());
        assert!(CharacterController::humanoid(1.8, 0.0, Vec3::ZERO).is_err());
    }
}
