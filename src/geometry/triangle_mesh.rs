use std::sync::OnceLock;

use crate::error::{PhysicsError, PhysicsResult};
use crate::math::Vec3;

use super::aabb::Aabb;
use super::shape::{Shape, ShapeBase, ShapeType, Triangle, TriangleCallback};

/// Triangles per leaf before a node is split.
pub const MAX_LEAF_TRIANGLES: usize = 4;

const NO_CHILD: u32 = u32::MAX;

/// A node of the mesh hierarchy.
///
/// Leaves own the range `first..first + count` of [`MeshBvh::triangle_order`];
/// internal nodes have two children and `count == 0`.
#[derive(Debug, Clone)]
pub struct BvhNode {
    pub aabb: Aabb,
    pub left: u32,
    pub right: u32,
    pub first: u32,
    pub count: u32,
}

impl BvhNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.right == NO_CHILD
    }
}

/// Static bounding volume hierarchy over the triangles of a mesh.
///
/// Built top-down: each node splits the longest axis of its centroid
/// bounds at the median triangle.
#[derive(Debug, Clone, Default)]
pub struct MeshBvh {
    nodes: Vec<BvhNode>,
    triangle_order: Vec<u32>,
}

impl MeshBvh {
    pub fn build(triangles: &[Triangle]) -> Self {
        let mut bvh = Self {
            nodes: Vec::with_capacity(triangles.len().max(1) * 2 / MAX_LEAF_TRIANGLES + 1),
            triangle_order: (0..triangles.len() as u32).collect(),
        };
        if !triangles.is_empty() {
            bvh.build_node(triangles, 0, triangles.len());
        }
        bvh
    }

    fn build_node(&mut self, triangles: &[Triangle], start: usize, end: usize) -> u32 {
        let order = &mut self.triangle_order[start..end];
        let aabb = order
            .iter()
            .fold(Aabb::EMPTY, |acc, &i| acc.union(triangles[i as usize].aabb()));

        let index = self.nodes.len() as u32;
        self.nodes.push(BvhNode {
            aabb,
            left: NO_CHILD,
            right: NO_CHILD,
            first: start as u32,
            count: (end - start) as u32,
        });

        if end - start <= MAX_LEAF_TRIANGLES {
            return index;
        }

        let centroids = Aabb::from_points(order.iter().map(|&i| triangles[i as usize].centroid()));
        let axis = centroids.longest_axis();
        let mid = (end - start) / 2;
        order.select_nth_unstable_by(mid, |&a, &b| {
            let ca = triangles[a as usize].centroid()[axis];
            let cb = triangles[b as usize].centroid()[axis];
            ca.total_cmp(&cb)
        });

        let left = self.build_node(triangles, start, start + mid);
        let right = self.build_node(triangles, start + mid, end);
        let node = &mut self.nodes[index as usize];
        node.left = left;
        node.right = right;
        node.count = 0;
        index
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Triangle indices in leaf order
    pub fn triangle_order(&self) -> &[u32] {
        &self.triangle_order
    }

    /// Bounds of the whole mesh
    pub fn root_aabb(&self) -> Aabb {
        self.nodes.first().map_or(Aabb::EMPTY, |n| n.aabb)
    }

    /// Visits triangles in leaves whose bounds overlap `aabb`
    pub fn query_aabb(&self, aabb: Aabb, mut callback: impl FnMut(usize)) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![0u32];
        while let Some(current) = stack.pop() {
            let n = &self.nodes[current as usize];
            if !n.aabb.intersects(aabb) {
                continue;
            }
            if n.is_leaf() {
                self.visit_leaf(n, &mut callback);
            } else {
                stack.push(n.left);
                stack.push(n.right);
            }
        }
    }

    /// Visits triangles in leaves the segment `origin + t * dir`, `t <= max_t`, may hit
    pub fn query_ray(&self, origin: Vec3, dir: Vec3, max_t: f32, mut callback: impl FnMut(usize)) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![0u32];
        while let Some(current) = stack.pop() {
            let n = &self.nodes[current as usize];
            if n.aabb.ray_entry(origin, dir, max_t).is_none() {
                continue;
            }
            if n.is_leaf() {
                self.visit_leaf(n, &mut callback);
            } else {
                stack.push(n.left);
                stack.push(n.right);
            }
        }
    }

    fn visit_leaf(&self, node: &BvhNode, callback: &mut impl FnMut(usize)) {
        let range = node.first as usize..(node.first + node.count) as usize;
        for &tri in &self.triangle_order[range] {
            callback(tri as usize);
        }
    }
}

/// Static concave mesh. Zero inertia; meant for level geometry.
#[derive(Debug, Clone)]
pub struct TriangleMeshShape {
    base: ShapeBase,
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    bvh: OnceLock<MeshBvh>,
}

impl TriangleMeshShape {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> PhysicsResult<Self> {
        if indices.len() % 3 != 0 {
            return Err(PhysicsError::shape("Indices array size must be multiple of 3"));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(PhysicsError::shape(format!(
                "Index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }
        Ok(Self {
            base: ShapeBase::default(),
            vertices,
            indices,
            bvh: OnceLock::new(),
        })
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Triangle `index` with local scaling applied
    pub fn triangle(&self, index: usize) -> Option<Triangle> {
        let idx = self.indices.get(index * 3..index * 3 + 3)?;
        let s = self.local_scaling();
        let v = |i: u32| self.vertices[i as usize].component_mul(s);
        Some(Triangle::new(v(idx[0]), v(idx[1]), v(idx[2])))
    }

    fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.triangle_count()).filter_map(|i| self.triangle(i))
    }

    /// Hierarchy over the scaled triangles, built on first use
    pub fn bvh(&self) -> &MeshBvh {
        self.bvh.get_or_init(|| {
            let tris: Vec<Triangle> = self.triangles().collect();
            MeshBvh::build(&tris)
        })
    }

    /// Calls `callback` for every triangle whose bounds overlap `aabb`
    pub fn process_all_triangles(&self, callback: &mut dyn TriangleCallback, aabb: Aabb) {
        self.bvh().query_aabb(aabb, |i| {
            if let Some(tri) = self.triangle(i) {
                if tri.aabb().intersects(aabb) {
                    callback.process_triangle(&tri, i);
                }
            }
        });
    }

    /// Nearest hit along the segment: `(t, unit normal facing the ray)`
    pub fn ray_test(&self, origin: Vec3, dir: Vec3, max_t: f32) -> Option<(f32, Vec3)> {
        let mut best: Option<(f32, Vec3)> = None;
        self.bvh().query_ray(origin, dir, max_t, |i| {
            let Some(tri) = self.triangle(i) else { return };
            let limit = best.map_or(max_t, |b| b.0);
            if let Some(t) = tri.ray_intersection(origin, dir, limit) {
                let n = tri.normal();
                best = Some((t, if n.dot(dir) > 0.0 { -n } else { n }));
            }
        });
        best
    }
}

impl Shape for TriangleMeshShape {
    fn base(&self) -> &ShapeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        &mut self.base
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::TriangleMesh
    }

    fn is_convex(&self) -> bool {
        false
    }

    fn invalidate(&mut self) {
        self.base.invalidate();
        self.bvh = OnceLock::new();
    }

    fn local_supporting_vertex(&self, direction: Vec3) -> Vec3 {
        self.local_supporting_vertex_without_margin(direction)
    }

    fn local_supporting_vertex_without_margin(&self, direction: Vec3) -> Vec3 {
        let s = self.local_scaling();
        self.vertices
            .iter()
            .map(|v| v.component_mul(s))
            .fold((f32::NEG_INFINITY, Vec3::ZERO), |best, p| {
                let d = p.dot(direction);
                if d > best.0 {
                    (d, p)
                } else {
                    best
                }
            })
            .1
    }

    /// Bounding-box volume; meshes are usually open surfaces
    fn volume(&self) -> f32 {
        self.bounding_box().volume()
    }

    fn surface_area(&self) -> f32 {
        self.triangles().map(|t| t.area()).sum()
    }

    fn calculate_local_inertia(&self, _mass: f32) -> Vec3 {
        Vec3::ZERO
    }

    /// Scaled vertex bounds, without margin
    fn compute_local_aabb(&self) -> Aabb {
        let s = self.local_scaling();
        if self.vertices.is_empty() {
            return Aabb::new(Vec3::ZERO, Vec3::ZERO);
        }
        Aabb::from_points(self.vertices.iter().map(|v| v.component_mul(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat grid of `n x n` quads on the XZ plane
    fn grid(n: usize) -> TriangleMeshShape {
        let mut vertices = Vec::new();
        for z in 0..=n {
            for x in 0..=n {
                vertices.push(Vec3::new(x as f32, 0.0, z as f32));
            }
        }
        let row = (n + 1) as u32;
        let mut indices = Vec::new();
        for z in 0..n as u32 {
            for x in 0..n as u32 {
                let i = z * row + x;
                indices.extend_from_slice(&[i, i + row, i + 1, i + 1, i + row, i + row + 1]);
            }
        }
        TriangleMeshShape::new(vertices, indices).unwrap()
    }

    #[test]
    fn test_bvh_splits_large_meshes() {
        let mesh = grid(8);
        let bvh = mesh.bvh();
        assert_eq!(mesh.triangle_count(), 128);
        assert!(bvh.nodes().len() > 1);
        for node in bvh.nodes().iter().filter(|n| n.is_leaf()) {
            assert!(node.count as usize <= MAX_LEAF_TRIANGLES);
        }
        let mut seen = bvh.triangle_order().to_vec();
        seen.sort_unstable();
        assert_eq!(seen, (0..128).collect::<Vec<u32>>());
    }

    #[test]
    fn test_small_mesh_single_leaf() {
        let mesh = grid(1);
        assert_eq!(mesh.bvh().nodes().len(), 1);
        assert!(mesh.bvh().nodes()[0].is_leaf());
    }

    #[test]
    fn test_process_triangles_in_region() {
        let mesh = grid(4);
        let mut hits = Vec::new();
        let region = Aabb::new(Vec3::new(0.1, -1.0, 0.1), Vec3::new(0.9, 1.0, 0.9));
        mesh.process_all_triangles(&mut |_: &Triangle, i: usize| hits.push(i), region);
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn test_ray_test_hits_plane() {
        let mesh = grid(8);
        let (t, n) = mesh
            .ray_test(Vec3::new(3.3, 5.0, 4.7), -Vec3::Y, 10.0)
            .unwrap();
        assert!((t - 5.0).abs() < 1e-5);
        assert!((n - Vec3::Y).length() < 1e-5);
        assert!(mesh.ray_test(Vec3::new(30.0, 5.0, 4.0), -Vec3::Y, 10.0).is_none());
    }

    #[test]
    fn test_rejects_bad_indices() {
        assert!(TriangleMeshShape::new(vec![Vec3::ZERO; 3], vec![0, 1]).is_err());
        assert!(TriangleMeshShape::new(vec![Vec3::ZERO; 3], vec![0, 1, 3]).is_err());
    }

    #[test]
    fn test_scaling_rebuilds_hierarchy() {
        let mut mesh = grid(2);
        assert!((mesh.bvh().root_aabb().max.x - 2.0).abs() < 1e-6);
        mesh.set_local_scaling(Vec3::new(3.0, 1.0, 1.0)).unwrap();
        assert!((mesh.bvh().root_aabb().max.x - 6.0).abs() < 1e-6);
        assert!((mesh.surface_area() - 12.0).abs() < 1e-4);
    }
}
