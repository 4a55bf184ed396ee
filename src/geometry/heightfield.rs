use crate::error::{PhysicsError, PhysicsResult};
use crate::math::Vec3;

use super::aabb::Aabb;
use super::shape::{Shape, ShapeBase, ShapeType, Triangle, TriangleCallback};

/// Terrain height grid.
///
/// Sample `(x, z)` sits at local `(x, data[z * width + x], z)` times the
/// local scaling. Each cell is split into two triangles.
#[derive(Debug, Clone)]
pub struct HeightfieldShape {
    base: ShapeBase,
    width: usize,
    height: usize,
    data: Vec<f32>,
    min_height: f32,
    max_height: f32,
    up_axis: usize,
}

impl HeightfieldShape {
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<f32>,
        min_height: f32,
        max_height: f32,
    ) -> PhysicsResult<Self> {
        if width == 0 || height == 0 {
            return Err(PhysicsError::shape("Heightfield dimensions must be positive"));
        }
        if data.len() != width * height {
            return Err(PhysicsError::shape(format!(
                "Height data size {} must match width * height = {}",
                data.len(),
                width * height
            )));
        }
        if !(max_height >= min_height) {
            return Err(PhysicsError::shape("Max height must be >= min height"));
        }
        Ok(Self {
            base: ShapeBase::default(),
            width,
            height,
            data,
            min_height,
            max_height,
            up_axis: 1,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn min_height(&self) -> f32 {
        self.min_height
    }

    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    /// Heights always run along local Y
    pub fn up_axis(&self) -> usize {
        self.up_axis
    }

    #[inline]
    fn sample(&self, x: usize, z: usize) -> f32 {
        self.data[z * self.width + x]
    }

    /// Bilinear height at grid coordinates, clamped to the grid
    pub fn height_at_point(&self, x: f32, z: f32) -> f32 {
        let cx = x.clamp(0.0, (self.width - 1) as f32);
        let cz = z.clamp(0.0, (self.height - 1) as f32);
        let (x0, z0) = (cx as usize, cz as usize);
        let x1 = (x0 + 1).min(self.width - 1);
        let z1 = (z0 + 1).min(self.height - 1);
        let (fx, fz) = (cx - x0 as f32, cz - z0 as f32);

        let h0 = self.sample(x0, z0) * (1.0 - fx) + self.sample(x1, z0) * fx;
        let h1 = self.sample(x0, z1) * (1.0 - fx) + self.sample(x1, z1) * fx;
        h0 * (1.0 - fz) + h1 * fz
    }

    /// Overwrites one sample. The value must lie in `[min_height, max_height]`.
    pub fn set_height_value(&mut self, x: usize, z: usize, value: f32) -> PhysicsResult<()> {
        if x >= self.width || z >= self.height {
            return Err(PhysicsError::invalid(format!(
                "Coordinates ({x}, {z}) out of bounds for {}x{} heightfield",
                self.width, self.height
            )));
        }
        if !(self.min_height..=self.max_height).contains(&value) {
            return Err(PhysicsError::invalid(format!(
                "Height {value} outside [{}, {}]",
                self.min_height, self.max_height
            )));
        }
        self.data[z * self.width + x] = value;
        self.invalidate();
        Ok(())
    }

    #[inline]
    fn vertex(&self, x: usize, z: usize) -> Vec3 {
        Vec3::new(x as f32, self.sample(x, z), z as f32).component_mul(self.local_scaling())
    }

    fn cell_triangles(&self, x: usize, z: usize) -> [Triangle; 2] {
        let v00 = self.vertex(x, z);
        let v10 = self.vertex(x + 1, z);
        let v01 = self.vertex(x, z + 1);
        let v11 = self.vertex(x + 1, z + 1);
        [Triangle::new(v00, v01, v10), Triangle::new(v10, v01, v11)]
    }

    /// Range of cells whose footprint overlaps `[lo, hi]` along one axis
    fn cell_range(lo: f32, hi: f32, scale: f32, cells: usize) -> std::ops::Range<usize> {
        if cells == 0 {
            return 0..0;
        }
        let (lo, hi) = if scale >= 0.0 { (lo / scale, hi / scale) } else { (hi / scale, lo / scale) };
        if hi < 0.0 || lo > cells as f32 {
            return 0..0;
        }
        // Cells touching the range boundary are included
        let start = (lo.ceil() as isize - 1).max(0) as usize;
        let end = (hi.floor().max(0.0) as usize + 1).min(cells);
        start.min(end)..end
    }

    /// Calls `callback` for the triangles of every cell overlapping `aabb`
    pub fn process_all_triangles(&self, callback: &mut dyn TriangleCallback, aabb: Aabb) {
        let s = self.local_scaling();
        let (cells_x, cells_z) = (self.width - 1, self.height - 1);
        let xs = Self::cell_range(aabb.min.x, aabb.max.x, s.x, cells_x);
        let zs = Self::cell_range(aabb.min.z, aabb.max.z, s.z, cells_z);
        for z in zs {
            for x in xs.clone() {
                for (k, tri) in self.cell_triangles(x, z).iter().enumerate() {
                    if tri.aabb().intersects(aabb) {
                        callback.process_triangle(tri, 2 * (z * cells_x + x) + k);
                    }
                }
            }
        }
    }

    /// Nearest hit along the segment: `(t, upward-facing unit normal)`
    pub fn ray_test(&self, origin: Vec3, dir: Vec3, max_t: f32) -> Option<(f32, Vec3)> {
        let region = Aabb::from_points([origin, origin + dir * max_t]);
        let mut best: Option<(f32, Vec3)> = None;
        self.process_all_triangles(
            &mut |tri: &Triangle, _: usize| {
                let limit = best.map_or(max_t, |b| b.0);
                if let Some(t) = tri.ray_intersection(origin, dir, limit) {
                    let n = tri.normal();
                    best = Some((t, if n.dot(dir) > 0.0 { -n } else { n }));
                }
            },
            region,
        );
        best
    }
}

impl Shape for HeightfieldShape {
    fn base(&self) -> &ShapeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        &mut self.base
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Heightfield
    }

    fn is_convex(&self) -> bool {
        false
    }

    fn local_supporting_vertex(&self, direction: Vec3) -> Vec3 {
        self.local_supporting_vertex_without_margin(direction)
    }

    /// Scans every sample: O(width * height)
    fn local_supporting_vertex_without_margin(&self, direction: Vec3) -> Vec3 {
        let mut best = (f32::NEG_INFINITY, Vec3::ZERO);
        for z in 0..self.height {
            for x in 0..self.width {
                let v = self.vertex(x, z);
                let d = v.dot(direction);
                if d > best.0 {
                    best = (d, v);
                }
            }
        }
        best.1
    }

    fn volume(&self) -> f32 {
        let s = self.local_scaling();
        let average = self.data.iter().sum::<f32>() / self.data.len() as f32;
        (self.width * self.height) as f32 * s.x * s.z * average * s.y
    }

    fn surface_area(&self) -> f32 {
        let mut total = 0.0;
        for z in 0..self.height - 1 {
            for x in 0..self.width - 1 {
                total += self.cell_triangles(x, z).iter().map(Triangle::area).sum::<f32>();
            }
        }
        total
    }

    fn calculate_local_inertia(&self, _mass: f32) -> Vec3 {
        Vec3::ZERO
    }

    fn compute_local_aabb(&self) -> Aabb {
        let lo = Vec3::new(0.0, self.min_height, 0.0);
        let hi = Vec3::new((self.width - 1) as f32, self.max_height, (self.height - 1) as f32);
        Aabb::new(lo, hi).scaled(self.local_scaling())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> HeightfieldShape {
        // 3x3 grid rising along x: heights 0, 1, 2
        let data = vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0, 2.0];
        HeightfieldShape::new(3, 3, data, 0.0, 4.0).unwrap()
    }

    #[test]
    fn test_bilinear_height() {
        let hf = ramp();
        assert!((hf.height_at_point(0.5, 0.5) - 0.5).abs() < 1e-6);
        assert!((hf.height_at_point(1.75, 1.0) - 1.75).abs() < 1e-6);
        // Clamped outside the grid
        assert!((hf.height_at_point(10.0, -3.0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_set_height_value_validates_and_invalidates() {
        let mut hf = ramp();
        assert!((hf.bounding_box().max.y - 4.0).abs() < 1e-6);
        assert!(hf.set_height_value(3, 0, 1.0).is_err());
        assert!(hf.set_height_value(0, 0, 5.0).is_err());
        hf.set_height_value(1, 1, 3.5).unwrap();
        assert!((hf.height_at_point(1.0, 1.0) - 3.5).abs() < 1e-6);
        let top = hf.local_supporting_vertex(Vec3::Y);
        assert_eq!(top, Vec3::new(1.0, 3.5, 1.0));
    }

    #[test]
    fn test_process_triangles_cells() {
        let hf = ramp();
        let mut count = 0;
        let region = Aabb::new(Vec3::new(0.2, -1.0, 0.2), Vec3::new(0.8, 5.0, 0.8));
        hf.process_all_triangles(&mut |_: &Triangle, _: usize| count += 1, region);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_ray_hits_surface() {
        let hf = ramp();
        let (t, n) = hf.ray_test(Vec3::new(1.5, 10.0, 1.0), -Vec3::Y, 20.0).unwrap();
        assert!((t - 8.5).abs() < 1e-4);
        assert!(n.y > 0.0);
    }

    #[test]
    fn test_volume_uses_average_height() {
        let hf = ramp();
        assert!((hf.volume() - 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_rejects_mismatched_data() {
        assert!(HeightfieldShape::new(2, 2, vec![0.0; 3], 0.0, 1.0).is_err());
        assert!(HeightfieldShape::new(2, 2, vec![0.0; 4], 1.0, 0.0).is_err());
    }
}
