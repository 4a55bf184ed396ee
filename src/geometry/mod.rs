mod aabb;
mod compound;
mod convex_hull;
mod heightfield;
mod primitives;
mod shape;
mod triangle_mesh;

pub use aabb::{Aabb, SlabHit};
pub use compound::{ChildShape, CompoundShape};
pub use convex_hull::ConvexHullShape;
pub use heightfield::HeightfieldShape;
pub use primitives::{BoxShape, CapsuleShape, ConeShape, CylinderShape, SphereShape};
pub use shape::{
    CollisionShape, Shape, ShapeBase, ShapeType, SharedShape, Triangle, TriangleCallback,
    DEFAULT_MARGIN,
};
pub use triangle_mesh::{BvhNode, MeshBvh, TriangleMeshShape, MAX_LEAF_TRIANGLES};
