#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ensure_range, PhysicsResult};

/// How two surface coefficients are merged into one for a contact.
///
/// Variants are ordered by precedence: when the two sides disagree, the
/// later variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CombineMode {
    #[default]
    Average,
    Minimum,
    Maximum,
    Multiply,
}

impl CombineMode {
    pub fn combine(self, a: f32, b: f32) -> f32 {
        match self {
            CombineMode::Average => 0.5 * (a + b),
            CombineMode::Minimum => a.min(b),
            CombineMode::Multiply => a * b,
            CombineMode::Maximum => a.max(b),
        }
    }
}

/// Surface response coefficients of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhysicsMaterial {
    pub friction: f32,
    pub restitution: f32,
    pub rolling_friction: f32,
    pub spinning_friction: f32,
    pub friction_combine: CombineMode,
    pub restitution_combine: CombineMode,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
            rolling_friction: 0.0,
            spinning_friction: 0.0,
            friction_combine: CombineMode::Average,
            restitution_combine: CombineMode::Average,
        }
    }
}

impl PhysicsMaterial {
    /// Validated constructor: friction >= 0, restitution in [0, 1]
    pub fn new(friction: f32, restitution: f32) -> PhysicsResult<Self> {
        ensure_range("friction", friction, 0.0, f32::MAX)?;
        ensure_range("restitution", restitution, 0.0, 1.0)?;
        Ok(Self {
            friction,
            restitution,
            ..Self::default()
        })
    }

    pub fn with_combine_modes(mut self, friction: CombineMode, restitution: CombineMode) -> Self {
        self.friction_combine = friction;
        self.restitution_combine = restitution;
        self
    }

    /// Effective material for a contact between the two surfaces.
    ///
    /// Rolling and spinning friction follow the friction mode.
    pub fn combine_with(&self, other: &PhysicsMaterial) -> PhysicsMaterial {
        let friction_mode = self.friction_combine.max(other.friction_combine);
        let restitution_mode = self.restitution_combine.max(other.restitution_combine);
        PhysicsMaterial {
            friction: friction_mode.combine(self.friction, other.friction),
            restitution: restitution_mode.combine(self.restitution, other.restitution),
            rolling_friction: friction_mode.combine(self.rolling_friction, other.rolling_friction),
            spinning_friction: friction_mode.combine(self.spinning_friction, other.spinning_friction),
            friction_combine: friction_mode,
            restitution_combine: restitution_mode,
        }
    }
}
