//! Ray, hit record and the two intersection primitives.

use crate::util::{Bounds, Vec3};

/// Back-face and near-parallel rejection threshold for the determinant.
pub const DET_EPSILON: f32 = 1e-6;

/// Inverse direction used for an exactly-zero direction component.
pub const INV_DIR_SENTINEL: f32 = 1e30;

/// Ray with normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    /// Create a ray; `dir` is normalized here.
    #[inline]
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize_or_zero(),
        }
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Per-axis inverse direction with zero components mapped to the sentinel.
    #[inline]
    pub fn inv_dir(&self) -> Vec3 {
        let inv = |d: f32| if d == 0.0 { INV_DIR_SENTINEL } else { 1.0 / d };
        Vec3::new(inv(self.dir.x), inv(self.dir.y), inv(self.dir.z))
    }
}

/// Ray-triangle hit before material resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub dst: f32,
    /// Barycentric weights of corners a, b, c.
    pub weights: Vec3,
}

/// Möller–Trumbore style ray-triangle test.
///
/// Only front faces (counter-clockwise as seen from the ray origin) are hit.
/// Returns `None` for misses, back faces and hits behind the origin.
#[inline]
pub fn ray_triangle(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<TriangleHit> {
    let edge_ab = b - a;
    let edge_ac = c - a;
    let normal = edge_ab.cross(edge_ac);
    let ao = ray.origin - a;
    let dao = ao.cross(ray.dir);

    let det = -ray.dir.dot(normal);
    if det < DET_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let dst = ao.dot(normal) * inv_det;
    let u = edge_ac.dot(dao) * inv_det;
    let v = -edge_ab.dot(dao) * inv_det;
    let w = 1.0 - u - v;

    if dst >= 0.0 && u >= 0.0 && v >= 0.0 && w >= 0.0 {
        Some(TriangleHit {
            dst,
            weights: Vec3::new(w, u, v),
        })
    } else {
        None
    }
}

/// Slab test. Returns the entry distance (clamped to 0) if the ray's
/// forward half-line overlaps the box.
#[inline]
pub fn ray_bounds(ray: &Ray, inv_dir: Vec3, bounds: &Bounds) -> Option<f32> {
    let t_min = (bounds.min - ray.origin) * inv_dir;
    let t_max = (bounds.max - ray.origin) * inv_dir;
    let t1 = t_min.min(t_max);
    let t2 = t_min.max(t_max);
    let t_near = t1.max_element();
    let t_far = t2.min_element();
    (t_near <= t_far && t_far >= 0.0).then_some(t_near.max(0.0))
}

/// Intersection work counters, used by the debug views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntersectionStats {
    pub box_tests: u32,
    pub triangle_tests: u32,
}
