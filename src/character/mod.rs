//! Kinematic character controllers that walk, jump and slide through a
//! [`PhysicsWorld`](crate::world::PhysicsWorld) by ray probing.

mod controller;
mod factory;
mod settings;

pub use controller::CharacterController;
pub use settings::{CharacterState, CollisionSettings, MovementSettings, PushMode, TimingSettings};
