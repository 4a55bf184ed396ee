use crate::math::Vec3;

use super::object::ObjectId;

/// Geometry of a detected contact between two objects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactInfo {
    /// Unit normal pointing from A towards B
    pub normal: Vec3,
    /// Deepest point of A along the normal
    pub world_pos_a: Vec3,
    /// Deepest point of B against the normal
    pub world_pos_b: Vec3,
    /// Signed gap along the normal; negative while penetrating
    pub distance: f32,
    /// Impulse applied to resolve the contact; detection alone reports zero
    pub impulse: f32,
    pub friction: f32,
    pub restitution: f32,
}

/// A contact together with the pair it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionContact {
    pub object_a: ObjectId,
    pub object_b: ObjectId,
    pub info: ContactInfo,
}

impl CollisionContact {
    pub fn involves(&self, id: ObjectId) -> bool {
        self.object_a == id || self.object_b == id
    }
}

/// Structured contact listener installed with `PhysicsWorld::set_collision_callback`.
pub trait CollisionCallback {
    /// First step a pair is found touching
    fn on_contact_added(&mut self, contact: &CollisionContact);

    /// Every later step the pair keeps touching
    fn on_contact_processed(&mut self, _contact: &CollisionContact) {}

    /// The pair stopped touching or one side left the world
    fn on_contact_destroyed(&mut self, _object_a: ObjectId, _object_b: ObjectId) {}
}

/// Simple listener for non-trigger contacts
pub type CollisionHandler = Box<dyn FnMut(&CollisionContact)>;

/// Listener for pairs where either side is a trigger
pub type TriggerHandler = Box<dyn FnMut(ObjectId, ObjectId)>;
