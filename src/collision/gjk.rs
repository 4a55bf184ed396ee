//! Boolean GJK over support mappings, plus a swept variant for casts.

use crate::geometry::Shape;
use crate::math::{Mat4, Vec3};

const GJK_MAX_ITERATIONS: usize = 64;

const GJK_TOLERANCE: f32 = 1e-6;

/// Anything that can report its farthest world-space point along a direction.
pub trait SupportMap {
    fn support(&self, direction: Vec3) -> Vec3;

    /// A point inside the set, used to seed the search direction
    fn center(&self) -> Vec3;
}

/// A shape placed in the world by an affine transform.
///
/// For `x -> M x + t` the support along `d` is `M s(Mᵀ d) + t`, which stays
/// correct under non-uniform scale.
pub struct WorldShape<'a> {
    pub shape: &'a dyn Shape,
    pub transform: &'a Mat4,
}

impl<'a> WorldShape<'a> {
    pub fn new(shape: &'a dyn Shape, transform: &'a Mat4) -> Self {
        Self { shape, transform }
    }
}

impl SupportMap for WorldShape<'_> {
    fn support(&self, direction: Vec3) -> Vec3 {
        let local = self.transform.basis().transpose().mul_vec(direction);
        self.transform
            .transform_point(self.shape.local_supporting_vertex(local))
    }

    fn center(&self) -> Vec3 {
        self.transform.translation()
    }
}

/// A ball, used by sphere casts and overlap queries.
pub struct Ball {
    pub center: Vec3,
    pub radius: f32,
}

impl SupportMap for Ball {
    fn support(&self, direction: Vec3) -> Vec3 {
        self.center + direction.normalize() * self.radius
    }

    fn center(&self) -> Vec3 {
        self.center
    }
}

/// Another support map shifted by `offset`.
pub struct Translated<'a, S: SupportMap> {
    pub inner: &'a S,
    pub offset: Vec3,
}

impl<S: SupportMap> SupportMap for Translated<'_, S> {
    fn support(&self, direction: Vec3) -> Vec3 {
        self.inner.support(direction) + self.offset
    }

    fn center(&self) -> Vec3 {
        self.inner.center() + self.offset
    }
}

/// Up to four points of the Minkowski difference `A - B`; newest last.
#[derive(Debug, Clone, Default)]
pub struct Simplex {
    points: [Vec3; 4],
    size: usize,
}

impl Simplex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn push(&mut self, p: Vec3) {
        if self.size < 4 {
            self.points[self.size] = p;
            self.size += 1;
        }
    }

    fn set(&mut self, pts: &[Vec3]) {
        self.size = pts.len().min(4);
        self.points[..self.size].copy_from_slice(&pts[..self.size]);
    }
}

#[inline]
fn minkowski_support(a: &impl SupportMap, b: &impl SupportMap, d: Vec3) -> Vec3 {
    a.support(d) - b.support(-d)
}

#[inline]
fn triple(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    a.cross(b).cross(c)
}

/// True if the two convex sets overlap (touching counts).
pub fn intersects(a: &impl SupportMap, b: &impl SupportMap) -> bool {
    let mut direction = b.center() - a.center();
    if direction.is_near_zero(GJK_TOLERANCE) {
        direction = Vec3::X;
    }

    let mut simplex = Simplex::new();
    let first = minkowski_support(a, b, direction);
    simplex.push(first);
    direction = -first;

    for _ in 0..GJK_MAX_ITERATIONS {
        if direction.is_near_zero(GJK_TOLERANCE) {
            // Origin lies on the current simplex
            return true;
        }
        let p = minkowski_support(a, b, direction);
        if p.dot(direction) < 0.0 {
            return false;
        }
        simplex.push(p);
        if do_simplex(&mut simplex, &mut direction) {
            return true;
        }
    }
    false
}

/// Returns true once the simplex encloses the origin
fn do_simplex(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let p = simplex.points;
    match simplex.size {
        2 => line_case(simplex, direction, p[1], p[0]),
        3 => triangle_case(simplex, direction, p[2], p[1], p[0]),
        4 => tetrahedron_case(simplex, direction, p[3], p[2], p[1], p[0]),
        _ => false,
    }
}

/// `a` is the newest point
fn line_case(simplex: &mut Simplex, direction: &mut Vec3, a: Vec3, b: Vec3) -> bool {
    let ab = b - a;
    let ao = -a;
    if ab.dot(ao) > 0.0 {
        simplex.set(&[b, a]);
        *direction = triple(ab, ao, ab);
        // Origin on the segment
        direction.is_near_zero(GJK_TOLERANCE)
    } else {
        simplex.set(&[a]);
        *direction = ao;
        false
    }
}

fn triangle_case(simplex: &mut Simplex, direction: &mut Vec3, a: Vec3, b: Vec3, c: Vec3) -> bool {
    let ab = b - a;
    let ac = c - a;
    let ao = -a;
    let abc = ab.cross(ac);

    if abc.is_near_zero(GJK_TOLERANCE) {
        // Collinear points carry no area
        return line_case(simplex, direction, a, b);
    }

    if abc.cross(ac).dot(ao) > 0.0 {
        if ac.dot(ao) > 0.0 {
            simplex.set(&[c, a]);
            *direction = triple(ac, ao, ac);
            return direction.is_near_zero(GJK_TOLERANCE);
        }
        return line_case(simplex, direction, a, b);
    }

    if ab.cross(abc).dot(ao) > 0.0 {
        return line_case(simplex, direction, a, b);
    }

    let side = abc.dot(ao);
    if side.abs() < GJK_TOLERANCE * abc.length() {
        // Origin in the triangle's plane, inside its edges
        return true;
    }
    if side > 0.0 {
        simplex.set(&[c, b, a]);
        *direction = abc;
    } else {
        simplex.set(&[b, c, a]);
        *direction = -abc;
    }
    false
}

fn tetrahedron_case(
    simplex: &mut Simplex,
    direction: &mut Vec3,
    a: Vec3,
    b: Vec3,
    c: Vec3,
    d: Vec3,
) -> bool {
    let ab = b - a;
    let ac = c - a;
    let ad = d - a;
    let ao = -a;

    // Orient each face normal away from the opposite vertex
    let outward = |n: Vec3, opposite: Vec3| if n.dot(opposite) > 0.0 { -n } else { n };
    let abc = outward(ab.cross(ac), ad);
    let acd = outward(ac.cross(ad), ab);
    let adb = outward(ad.cross(ab), ac);

    if abc.dot(ao) > GJK_TOLERANCE {
        return triangle_case(simplex, direction, a, b, c);
    }
    if acd.dot(ao) > GJK_TOLERANCE {
        return triangle_case(simplex, direction, a, c, d);
    }
    if adb.dot(ao) > GJK_TOLERANCE {
        return triangle_case(simplex, direction, a, d, b);
    }
    true
}

/// First fraction `t` in `[0, 1]` at which `moving`, translated by
/// `t * motion`, touches `target`.
///
/// Marches in steps no longer than `step` and refines the first
/// overlapping step by bisection.
pub fn time_of_impact(
    moving: &impl SupportMap,
    motion: Vec3,
    target: &impl SupportMap,
    step: f32,
) -> Option<f32> {
    let at = |t: f32| {
        intersects(
            &Translated {
                inner: moving,
                offset: motion * t,
            },
            target,
        )
    };
    if at(0.0) {
        return Some(0.0);
    }

    let length = motion.length();
    let steps = if step > 0.0 {
        ((length / step).ceil() as usize).clamp(1, 256)
    } else {
        1
    };

    let mut prev = 0.0;
    for i in 1..=steps {
        let t = i as f32 / steps as f32;
        if at(t) {
            let (mut lo, mut hi) = (prev, t);
            for _ in 0..16 {
                let mid = 0.5 * (lo + hi);
                if at(mid) {
                    hi = mid;
                } else {
                    lo = mid;
                }
            }
            return Some(hi);
        }
        prev = t;
    }
    None
}
