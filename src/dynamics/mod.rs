mod integrator;
mod material;
mod rigid_body;

pub use integrator::{apply_gravity, integrate_positions, integrate_semi_implicit_euler, integrate_velocities};
pub use material::{CombineMode, PhysicsMaterial};
pub use rigid_body::{ActivationState, BodyType, RigidBody, SLEEP_DELAY};
