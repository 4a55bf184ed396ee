//! # rigidphys
//!
//! A 3D rigid body physics subsystem.
//!
//! ## Features
//!
//! - **Collision Shapes**: boxes, spheres, capsules, cylinders, cones, convex
//!   hulls, BVH-accelerated triangle meshes, heightfields and compounds
//! - **Rigid Body Dynamics**: dynamic, static and kinematic bodies with forces,
//!   impulses, damping and sleeping
//! - **Joints**: point-to-point, hinge, slider, cone-twist and generic 6-DOF
//!   constraints solved by sequential impulses
//! - **Character Controller**: kinematic walking, jumping, step and slope
//!   handling by ray probing
//! - **Queries**: raycasts, sphere sweeps and shape overlap tests
//!
//! ## Quick Start
//!
//! ```rust
//! use rigidphys::prelude::*;
//!
//! // Create a physics world
//! let mut world = PhysicsWorld::new(WorldConfig::default()).unwrap();
//!
//! // Create a static floor
//! let floor = CollisionShape::cuboid(Vec3::new(10.0, 0.5, 10.0)).unwrap();
//! world
//!     .add_rigid_body(RigidBody::fixed(Some(floor.into_shared())).with_position(Vec3::new(0.0, -0.5, 0.0)))
//!     .unwrap();
//!
//! // Create a dynamic ball
//! let ball = CollisionShape::sphere(0.5).unwrap();
//! let ball = world
//!     .add_rigid_body(
//!         RigidBody::new(Some(ball.into_shared()), 1.0)
//!             .unwrap()
//!             .with_position(Vec3::new(0.0, 5.0, 0.0)),
//!     )
//!     .unwrap();
//!
//! // Simulation loop
//! let dt = 1.0 / 60.0;
//! for _ in 0..60 {
//!     world.step(dt).unwrap();
//! }
//! let pos = world.rigid_body(ball).unwrap().position();
//! assert!(pos.y < 5.0);
//! ```

pub mod character;
pub mod collision;
pub mod constraints;
pub mod dynamics;
pub mod error;
pub mod geometry;
pub mod math;
mod world;

pub use error::{PhysicsError, PhysicsResult};
pub use world::{BroadphaseType, PhysicsWorld, RaycastResult, WorldConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::character::{CharacterController, CharacterState, PushMode};
    pub use crate::collision::{CollisionCallback, CollisionContact, CollisionObject, ContactInfo, ObjectId};
    pub use crate::constraints::{
        ConeTwistConstraint, Constraint, ConstraintId, Generic6DofConstraint, HingeConstraint,
        PointToPointConstraint, SliderConstraint,
    };
    pub use crate::dynamics::{ActivationState, BodyType, PhysicsMaterial, RigidBody};
    pub use crate::error::{PhysicsError, PhysicsResult};
    pub use crate::geometry::{Aabb, CollisionShape, Shape, ShapeType, SharedShape};
    pub use crate::math::{Mat3, Mat4, Quat, Transform, Vec3};
    pub use crate::world::{BroadphaseType, PhysicsWorld, RaycastResult, WorldConfig};
}
