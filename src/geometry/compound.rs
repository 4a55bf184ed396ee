use std::sync::Arc;

use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Mat3, Transform, Vec3};

use super::aabb::Aabb;
use super::shape::{Shape, ShapeBase, ShapeType, SharedShape};

/// A child of a compound: a shared shape placed by a rigid transform.
#[derive(Debug, Clone)]
pub struct ChildShape {
    pub transform: Transform,
    pub shape: SharedShape,
}

/// Union of child shapes, each in its own local frame.
#[derive(Debug, Clone, Default)]
pub struct CompoundShape {
    base: ShapeBase,
    children: Vec<ChildShape>,
}

impl CompoundShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child_shapes(&self) -> &[ChildShape] {
        &self.children
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn add_child_shape(&mut self, transform: Transform, shape: SharedShape) -> PhysicsResult<()> {
        if !transform.position.is_finite() {
            return Err(PhysicsError::shape("Child transform must be finite"));
        }
        self.children.push(ChildShape { transform, shape });
        self.invalidate();
        Ok(())
    }

    /// Removes every child that shares `shape`'s allocation
    pub fn remove_child_shape(&mut self, shape: &SharedShape) -> PhysicsResult<()> {
        self.children.retain(|c| !Arc::ptr_eq(&c.shape, shape));
        self.invalidate();
        Ok(())
    }

    pub fn remove_child_shape_by_index(&mut self, index: usize) -> PhysicsResult<()> {
        self.check_index(index)?;
        self.children.remove(index);
        self.invalidate();
        Ok(())
    }

    pub fn update_child_transform(&mut self, index: usize, transform: Transform) -> PhysicsResult<()> {
        self.check_index(index)?;
        self.children[index].transform = transform;
        self.invalidate();
        Ok(())
    }

    fn check_index(&self, index: usize) -> PhysicsResult<()> {
        if index >= self.children.len() {
            return Err(PhysicsError::shape(format!(
                "Child shape index {index} out of range ({} children)",
                self.children.len()
            )));
        }
        Ok(())
    }

    fn support_with(&self, direction: Vec3, child_support: impl Fn(&dyn Shape, Vec3) -> Vec3) -> Vec3 {
        let scale = self.local_scaling();
        let d = direction.component_mul(scale);
        let mut best = (f32::NEG_INFINITY, Vec3::ZERO);
        for child in &self.children {
            let local_dir = child.transform.inverse_transform_vector(d);
            let p = child
                .transform
                .transform_point(child_support(child.shape.as_dyn(), local_dir));
            let dot = p.dot(d);
            if dot > best.0 {
                best = (dot, p);
            }
        }
        best.1.component_mul(scale)
    }
}

impl Shape for CompoundShape {
    fn base(&self) -> &ShapeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        &mut self.base
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Compound
    }

    fn is_convex(&self) -> bool {
        false
    }

    fn is_compound(&self) -> bool {
        true
    }

    fn local_supporting_vertex(&self, direction: Vec3) -> Vec3 {
        self.support_with(direction, |s, d| s.local_supporting_vertex(d))
    }

    fn local_supporting_vertex_without_margin(&self, direction: Vec3) -> Vec3 {
        self.support_with(direction, |s, d| s.local_supporting_vertex_without_margin(d))
    }

    fn volume(&self) -> f32 {
        self.children.iter().map(|c| c.shape.volume()).sum()
    }

    fn surface_area(&self) -> f32 {
        self.children.iter().map(|c| c.shape.surface_area()).sum()
    }

    /// Mass is split by child volume; each child's tensor is rotated into
    /// the compound frame (`R I Rᵀ`) and the diagonal of the sum is kept.
    fn calculate_local_inertia(&self, mass: f32) -> Vec3 {
        let total_volume = self.volume();
        if self.children.is_empty() || total_volume <= 0.0 {
            return Vec3::ZERO;
        }
        let mut total = Mat3::ZERO;
        for child in &self.children {
            let child_mass = mass * child.shape.volume() / total_volume;
            let inertia = child.shape.calculate_inertia(child_mass);
            total += inertia.rotated(child.transform.rotation_matrix());
        }
        total.diagonal()
    }

    fn compute_local_aabb(&self) -> Aabb {
        if self.children.is_empty() {
            return Aabb::new(Vec3::ZERO, Vec3::ZERO);
        }
        self.children
            .iter()
            .fold(Aabb::EMPTY, |acc, c| {
                acc.union(c.shape.bounding_box().transformed_rigid(c.transform))
            })
            .expand(self.margin())
            .scaled(self.local_scaling())
    }
}
