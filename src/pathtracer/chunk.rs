//! Triangle and chunk types shared by the partitioner and the integrator.
//!
//! A chunk is the unit of coarse culling: one bounds test decides whether
//! any of its triangles need the per-triangle intersection test.

use crate::util::{Affine3A, Bounds, Mat3, Vec3};

/// Triangle with per-vertex normals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub na: Vec3,
    pub nb: Vec3,
    pub nc: Vec3,
}

impl Triangle {
    /// Flat-shaded triangle, normal from the winding order.
    pub fn flat(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let n = (b - a).cross(c - a).normalize_or_zero();
        Self {
            a,
            b,
            c,
            na: n,
            nb: n,
            nc: n,
        }
    }

    /// The three corners in winding order.
    #[inline]
    pub fn vertices(&self) -> [Vec3; 3] {
        [self.a, self.b, self.c]
    }

    /// Centroid of the triangle.
    pub fn centroid(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }

    /// True if any corner lies inside `region` (inclusive).
    #[inline]
    pub fn touches(&self, region: &Bounds) -> bool {
        region.contains(self.a) || region.contains(self.b) || region.contains(self.c)
    }

    /// Apply a point transform and a normal matrix.
    pub fn transformed(&self, affine: &Affine3A, normal_mat: &Mat3) -> Self {
        Self {
            a: affine.transform_point3(self.a),
            b: affine.transform_point3(self.b),
            c: affine.transform_point3(self.c),
            na: (*normal_mat * self.na).normalize_or_zero(),
            nb: (*normal_mat * self.nb).normalize_or_zero(),
            nc: (*normal_mat * self.nc).normalize_or_zero(),
        }
    }
}

/// Bounded group of triangles sharing one sub-mesh material.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryChunk {
    pub triangles: Vec<Triangle>,
    pub bounds: Bounds,
    /// Sub-mesh index, used to look up the material.
    pub submesh: usize,
}

impl GeometryChunk {
    /// Build a chunk with tight bounds around `triangles`.
    pub fn new(triangles: Vec<Triangle>, submesh: usize) -> Self {
        let bounds = tight_bounds(&triangles);
        Self {
            triangles,
            bounds,
            submesh,
        }
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Min/max reduction over every triangle corner.
pub fn tight_bounds(triangles: &[Triangle]) -> Bounds {
    Bounds::from_points(triangles.iter().flat_map(|t| t.vertices()))
}
