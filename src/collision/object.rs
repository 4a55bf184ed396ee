use std::any::Any;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::{Aabb, Shape, SharedShape};
use crate::math::{Mat4, Quat, Vec3};

use super::gjk::WorldShape;

/// Identifies a collision object, rigid body or character inside a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Not yet added to a world
    pub const INVALID: Self = Self(u32::MAX);

    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out monotonically increasing ids; owned by the world.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        if self.next == u32::MAX {
            self.next = 0;
        }
        id
    }

    pub fn next_object(&mut self) -> ObjectId {
        ObjectId(self.allocate())
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// Unordered pair of objects, normalized so `a <= b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectPair {
    pub a: ObjectId,
    pub b: ObjectId,
}

impl ObjectPair {
    pub fn new(a: ObjectId, b: ObjectId) -> Self {
        if a <= b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }
}

/// Something with a transform and an optional shape that takes part in
/// collision detection and queries.
pub struct CollisionObject {
    id: ObjectId,
    transform: Mat4,
    shape: Option<SharedShape>,
    /// Groups this object belongs to
    pub collision_groups: i32,
    /// Groups this object collides with; `-1` is everything
    pub collision_mask: i32,
    pub is_trigger: bool,
    pub user_data: Option<Box<dyn Any + Send + Sync>>,
    contact_processing_threshold: f32,
}

impl fmt::Debug for CollisionObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollisionObject")
            .field("id", &self.id)
            .field("transform", &self.transform)
            .field("shape", &self.shape.as_ref().map(|s| s.shape_type()))
            .field("collision_groups", &self.collision_groups)
            .field("collision_mask", &self.collision_mask)
            .field("is_trigger", &self.is_trigger)
            .field("user_data", &self.user_data.is_some())
            .finish()
    }
}

impl Default for CollisionObject {
    fn default() -> Self {
        Self {
            id: ObjectId::INVALID,
            transform: Mat4::IDENTITY,
            shape: None,
            collision_groups: 1,
            collision_mask: -1,
            is_trigger: false,
            user_data: None,
            contact_processing_threshold: 1e30,
        }
    }
}

impl CollisionObject {
    pub fn new(shape: Option<SharedShape>) -> Self {
        Self {
            shape,
            ..Self::default()
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.set_translation(position);
        self
    }

    pub fn with_groups(mut self, groups: i32, mask: i32) -> Self {
        self.collision_groups = groups;
        self.collision_mask = mask;
        self
    }

    pub fn as_trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    pub fn position(&self) -> Vec3 {
        self.transform.translation()
    }

    pub fn rotation(&self) -> Quat {
        self.transform.rotation()
    }

    pub fn scale(&self) -> Vec3 {
        self.transform.scale()
    }

    pub fn shape(&self) -> Option<&SharedShape> {
        self.shape.as_ref()
    }

    pub fn set_shape(&mut self, shape: Option<SharedShape>) {
        self.shape = shape;
    }

    pub fn contact_processing_threshold(&self) -> f32 {
        self.contact_processing_threshold
    }

    pub fn set_contact_processing_threshold(&mut self, threshold: f32) {
        self.contact_processing_threshold = threshold;
    }

    /// World-space bounds of the attached shape
    pub fn world_aabb(&self) -> Option<Aabb> {
        self.shape
            .as_ref()
            .map(|s| s.bounding_box().transformed(&self.transform))
    }

    /// World-space support point of the attached shape along `direction`
    pub fn support_world(&self, direction: Vec3) -> Option<Vec3> {
        use super::gjk::SupportMap;
        self.world_shape().map(|s| s.support(direction))
    }

    pub fn world_shape(&self) -> Option<WorldShape<'_>> {
        self.shape
            .as_ref()
            .map(|s| WorldShape::new(s.as_dyn(), &self.transform))
    }

    /// Query filter: `-1` matches everything, otherwise any shared group bit
    pub fn matches_groups(&self, groups: i32) -> bool {
        groups == -1 || (self.collision_groups & groups) != 0
    }

    /// Each side's groups must pass the other side's mask
    pub fn can_collide_with(&self, other: &CollisionObject) -> bool {
        (self.collision_groups & other.collision_mask) != 0
            && (other.collision_groups & self.collision_mask) != 0
    }
}
