#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::collision::ObjectId;
use crate::error::{ensure_range, PhysicsResult};
use crate::math::consts::{FRAC_PI_2, FRAC_PI_4};
use crate::math::Vec3;

/// How the controller moves and falls.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MovementSettings {
    /// Vertical acceleration, negative is down
    pub gravity: f32,
    pub jump_speed: f32,
    /// Terminal falling speed
    pub fall_speed: f32,
    pub step_height: f32,
    /// Steepest walkable slope, radians
    pub max_slope: f32,
    /// Fraction of walk speed available while airborne
    pub air_control: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            gravity: -9.81,
            jump_speed: 5.0,
            fall_speed: 20.0,
            step_height: 0.35,
            max_slope: FRAC_PI_4,
            air_control: 0.2,
        }
    }
}

impl MovementSettings {
    pub fn validate(&self) -> PhysicsResult<()> {
        ensure_range("gravity", self.gravity, -f32::MAX, f32::MAX)?;
        ensure_range("jump speed", self.jump_speed, 0.0, f32::MAX)?;
        ensure_range("fall speed", self.fall_speed, 0.0, f32::MAX)?;
        ensure_range("step height", self.step_height, 0.0, f32::MAX)?;
        ensure_range("max slope", self.max_slope, 0.0, FRAC_PI_2)?;
        ensure_range("air control", self.air_control, 0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionSettings {
    /// Gap kept between the character and what it bumps into
    pub skin_width: f32,
    pub push_force: f32,
    pub ground_stickiness: f32,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            skin_width: 0.08,
            push_force: 1.0,
            ground_stickiness: 1.0,
        }
    }
}

impl CollisionSettings {
    pub fn validate(&self) -> PhysicsResult<()> {
        ensure_range("skin width", self.skin_width, 0.0, f32::MAX)?;
        ensure_range("push force", self.push_force, 0.0, f32::MAX)?;
        ensure_range("ground stickiness", self.ground_stickiness, 0.0, f32::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingSettings {
    pub jump_grace_time: f32,
    /// How long after walking off an edge a jump is still allowed
    pub coyote_time: f32,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            jump_grace_time: 0.1,
            coyote_time: 0.15,
        }
    }
}

impl TimingSettings {
    pub fn validate(&self) -> PhysicsResult<()> {
        ensure_range("jump grace time", self.jump_grace_time, 0.0, f32::MAX)?;
        ensure_range("coyote time", self.coyote_time, 0.0, f32::MAX)
    }
}

/// How [`push_character`](super::CharacterController::push_character)
/// feeds into the external velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PushMode {
    /// Adds a tenth of the vector, as if applied over a short interval
    Force,
    /// Adds the vector
    Impulse,
    /// Replaces the external velocity
    #[default]
    VelocityChange,
}

/// Snapshot of a controller's movement state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CharacterState {
    pub position: Vec3,
    pub on_ground: bool,
    pub can_jump: bool,
    pub vertical_velocity: f32,
    pub ground_normal: Vec3,
    pub ground_distance: f32,
    pub platform_velocity: Vec3,
    pub current_platform: Option<ObjectId>,
}
