mod callbacks;
pub mod gjk;
mod object;
mod ray;

pub use callbacks::{CollisionCallback, CollisionContact, CollisionHandler, ContactInfo, TriggerHandler};
pub use gjk::{intersects, time_of_impact, Ball, Simplex, SupportMap, Translated, WorldShape};
pub use object::{CollisionObject, IdAllocator, ObjectId, ObjectPair};
pub use ray::{local_ray_test, ray_test, RayHit};
