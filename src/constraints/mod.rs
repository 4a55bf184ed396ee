//! Joints between a body and another body or the world.
//!
//! Every joint shares a [`ConstraintBase`] (enable flag, breaking threshold,
//! per-axis parameters) and is solved at the velocity level by sequential
//! impulses. [`Constraint`] is the closed set of joints the world stores.

mod cone_twist;
mod generic_6dof;
mod hinge;
mod point_to_point;
mod slider;
mod solver;

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::collision::ObjectId;
use crate::dynamics::RigidBody;
use crate::error::{PhysicsError, PhysicsResult};

pub use cone_twist::ConeTwistConstraint;
pub use generic_6dof::Generic6DofConstraint;
pub use hinge::HingeConstraint;
pub use point_to_point::PointToPointConstraint;
pub use slider::SliderConstraint;

/// Handle of a constraint registered with a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstraintId(pub u32);

impl ConstraintId {
    pub const INVALID: Self = Self(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for ConstraintId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Tunable solver parameters, addressed per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[allow(non_camel_case_types)]
pub enum ConstraintParam {
    /// Error reduction for the locked degrees of freedom
    ERP,
    /// Error reduction applied when a limit is violated
    STOP_ERP,
    CFM,
    STOP_CFM,
    LINEAR_LOWER_LIMIT,
    LINEAR_UPPER_LIMIT,
    ANGULAR_LOWER_LIMIT,
    ANGULAR_UPPER_LIMIT,
    TARGET_VELOCITY,
    MAX_MOTOR_FORCE,
}

impl ConstraintParam {
    pub fn default_value(self) -> f32 {
        match self {
            ConstraintParam::ERP => 0.2,
            ConstraintParam::STOP_ERP => 0.1,
            ConstraintParam::CFM | ConstraintParam::STOP_CFM => 0.0,
            ConstraintParam::LINEAR_LOWER_LIMIT | ConstraintParam::ANGULAR_LOWER_LIMIT => -f32::MAX,
            ConstraintParam::LINEAR_UPPER_LIMIT | ConstraintParam::ANGULAR_UPPER_LIMIT => f32::MAX,
            ConstraintParam::TARGET_VELOCITY | ConstraintParam::MAX_MOTOR_FORCE => 0.0,
        }
    }
}

/// Axis value meaning "every axis"
pub const ALL_AXES: i32 = -1;

/// State shared by every joint type.
#[derive(Debug, Clone)]
pub struct ConstraintBase {
    id: ConstraintId,
    body_a: ObjectId,
    body_b: Option<ObjectId>,
    enabled: bool,
    breaking_threshold: f32,
    applied_impulse: f32,
    params: HashMap<(ConstraintParam, i32), f32>,
}

impl ConstraintBase {
    pub fn new(body_a: ObjectId, body_b: Option<ObjectId>) -> Self {
        Self {
            id: ConstraintId::INVALID,
            body_a,
            body_b,
            enabled: true,
            breaking_threshold: f32::INFINITY,
            applied_impulse: 0.0,
            params: HashMap::new(),
        }
    }

    /// Builds the base for a joint between `a` and `b`, rejecting self-joints
    pub(crate) fn between(a: &RigidBody, b: Option<&RigidBody>) -> PhysicsResult<Self> {
        let body_b = b.map(RigidBody::id);
        if a.id().is_valid() && body_b == Some(a.id()) {
            return Err(PhysicsError::ConstraintCreationFailed(format!(
                "body {} cannot be constrained to itself",
                a.id()
            )));
        }
        Ok(Self::new(a.id(), body_b))
    }

    pub fn id(&self) -> ConstraintId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ConstraintId) {
        self.id = id;
    }

    pub fn body_a(&self) -> ObjectId {
        self.body_a
    }

    /// `None` anchors the joint to the world
    pub fn body_b(&self) -> Option<ObjectId> {
        self.body_b
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn breaking_threshold(&self) -> f32 {
        self.breaking_threshold
    }

    pub fn set_breaking_threshold(&mut self, threshold: f32) -> PhysicsResult<()> {
        if threshold.is_nan() || threshold < 0.0 {
            return Err(PhysicsError::invalid(format!(
                "breaking threshold must be non-negative, got {threshold}"
            )));
        }
        self.breaking_threshold = threshold;
        Ok(())
    }

    /// Magnitude of the impulse applied by the last solve
    pub fn applied_impulse(&self) -> f32 {
        self.applied_impulse
    }

    /// Records the last solved impulse; disables the joint and returns
    /// `true` when it exceeds the breaking threshold.
    pub fn update_applied_impulse(&mut self, impulse: f32) -> bool {
        self.applied_impulse = impulse;
        if impulse.abs() > self.breaking_threshold {
            warn!(
                constraint = %self.id,
                impulse,
                threshold = self.breaking_threshold,
                "constraint broken"
            );
            self.enabled = false;
            return true;
        }
        false
    }

    /// Overrides `param` for `axis` ([`ALL_AXES`] for every axis)
    pub fn set_param(&mut self, param: ConstraintParam, value: f32, axis: i32) {
        self.params.insert((param, axis), value);
    }

    /// Looks up the axis entry, then the all-axes entry, then the default
    pub fn param(&self, param: ConstraintParam, axis: i32) -> f32 {
        self.params
            .get(&(param, axis))
            .or_else(|| self.params.get(&(param, ALL_AXES)))
            .copied()
            .unwrap_or_else(|| param.default_value())
    }
}

/// Behavior common to all joints.
pub trait Joint {
    fn base(&self) -> &ConstraintBase;

    fn base_mut(&mut self) -> &mut ConstraintBase;

    /// Runs one velocity iteration and returns the summed impulse magnitude.
    fn solve_velocity(&mut self, a: &mut RigidBody, b: Option<&mut RigidBody>, dt: f32) -> f32;

    /// Called once before the first iteration of each step. Joints with
    /// motors or damping reset their per-step impulse totals here.
    fn begin_step(&mut self) {}

    /// One solver iteration for an enabled joint, followed by the breaking check
    fn solve(&mut self, a: &mut RigidBody, b: Option<&mut RigidBody>, dt: f32) {
        if !self.base().is_enabled() || dt <= 0.0 {
            return;
        }
        let impulse = self.solve_velocity(a, b, dt);
        self.base_mut().update_applied_impulse(impulse);
    }
}

/// Any joint the world can own.
#[derive(Debug, Clone)]
pub enum Constraint {
    PointToPoint(PointToPointConstraint),
    Hinge(HingeConstraint),
    Slider(SliderConstraint),
    ConeTwist(ConeTwistConstraint),
    Generic6Dof(Generic6DofConstraint),
}

impl Constraint {
    pub fn as_joint(&self) -> &dyn Joint {
        match self {
            Constraint::PointToPoint(c) => c,
            Constraint::Hinge(c) => c,
            Constraint::Slider(c) => c,
            Constraint::ConeTwist(c) => c,
            Constraint::Generic6Dof(c) => c,
        }
    }

    pub fn as_joint_mut(&mut self) -> &mut dyn Joint {
        match self {
            Constraint::PointToPoint(c) => c,
            Constraint::Hinge(c) => c,
            Constraint::Slider(c) => c,
            Constraint::ConeTwist(c) => c,
            Constraint::Generic6Dof(c) => c,
        }
    }

    pub fn base(&self) -> &ConstraintBase {
        self.as_joint().base()
    }

    pub fn base_mut(&mut self) -> &mut ConstraintBase {
        self.as_joint_mut().base_mut()
    }

    pub fn id(&self) -> ConstraintId {
        self.base().id()
    }

    pub fn body_a(&self) -> ObjectId {
        self.base().body_a()
    }

    pub fn body_b(&self) -> Option<ObjectId> {
        self.base().body_b()
    }

    pub fn is_enabled(&self) -> bool {
        self.base().is_enabled()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.base_mut().set_enabled(enabled);
    }

    pub fn begin_step(&mut self) {
        self.as_joint_mut().begin_step();
    }

    pub fn solve(&mut self, a: &mut RigidBody, b: Option<&mut RigidBody>, dt: f32) {
        self.as_joint_mut().solve(a, b, dt);
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Constraint::PointToPoint(_) => "point_to_point",
            Constraint::Hinge(_) => "hinge",
            Constraint::Slider(_) => "slider",
            Constraint::ConeTwist(_) => "cone_twist",
            Constraint::Generic6Dof(_) => "generic_6dof",
        }
    }
}

macro_rules! impl_from_joint {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Constraint {
                fn from(c: $ty) -> Self {
                    Constraint::$variant(c)
                }
            }
        )*
    };
}

impl_from_joint! {
    PointToPoint => PointToPointConstraint,
    Hinge => HingeConstraint,
    Slider => SliderConstraint,
    ConeTwist => ConeTwistConstraint,
    Generic6Dof => Generic6DofConstraint,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CollisionShape;
    use crate::math::Vec3;

    #[test]
    fn test_param_defaults() {
        let base = ConstraintBase::new(ObjectId::new(0), None);
        assert_eq!(base.param(ConstraintParam::ERP, ALL_AXES), 0.2);
        assert_eq!(base.param(ConstraintParam::STOP_ERP, 2), 0.1);
        assert_eq!(base.param(ConstraintParam::LINEAR_UPPER_LIMIT, 0), f32::MAX);
        assert_eq!(base.param(ConstraintParam::ANGULAR_LOWER_LIMIT, 1), -f32::MAX);
        assert_eq!(base.param(ConstraintParam::MAX_MOTOR_FORCE, 0), 0.0);
    }

    #[test]
    fn test_param_axis_falls_back_to_all_axes() {
        let mut base = ConstraintBase::new(ObjectId::new(0), None);
        base.set_param(ConstraintParam::CFM, 0.5, ALL_AXES);
        base.set_param(ConstraintParam::CFM, 0.25, 1);
        assert_eq!(base.param(ConstraintParam::CFM, 1), 0.25);
        assert_eq!(base.param(ConstraintParam::CFM, 2), 0.5);
    }

    #[test]
    fn test_breaking_threshold_disables() {
        let mut base = ConstraintBase::new(ObjectId::new(0), None);
        base.set_breaking_threshold(10.0).unwrap();
        assert!(!base.update_applied_impulse(5.0));
        assert!(base.is_enabled());
        assert!(base.update_applied_impulse(-12.0));
        assert!(!base.is_enabled());
        assert_eq!(base.applied_impulse(), -12.0);
        assert!(base.set_breaking_threshold(-1.0).is_err());
    }

    #[test]
    fn test_broken_constraint_stops_solving() {
        let shape = CollisionShape::sphere(0.5).unwrap().into_shared();
        let mut a = RigidBody::new(Some(shape), 1.0).unwrap();
        let mut joint =
            PointToPointConstraint::new(&a, None, Vec3::ZERO, Vec3::new(0.0, 5.0, 0.0)).unwrap();
        joint.base_mut().set_breaking_threshold(0.01).unwrap();
        joint.solve(&mut a, None, 1.0 / 60.0);
        assert!(!joint.base().is_enabled());

        let v = a.linear_velocity();
        joint.solve(&mut a, None, 1.0 / 60.0);
        assert_eq!(a.linear_velocity(), v);
    }

    #[test]
    fn test_self_joint_rejected() {
        let shape = CollisionShape::sphere(0.5).unwrap().into_shared();
        let mut a = RigidBody::new(Some(shape), 1.0).unwrap();
        a.set_id(ObjectId::new(3));
        let err = PointToPointConstraint::new(&a, Some(&a), Vec3::ZERO, Vec3::ZERO).unwrap_err();
        assert!(matches!(err, PhysicsError::ConstraintCreationFailed(_)));
    }
}
