//! Convert indexed meshes to chunked world-space triangle data.
//!
//! Bridges caller-owned vertex/index buffers to the path tracer's chunk
//! format. Chunk layout is computed once in local space; transform changes
//! only re-run the cheap per-vertex transform.

use std::ops::Range;

use super::chunk::{GeometryChunk, Triangle};
use super::split;
use crate::util::{Error, Result, Transform, Vec3};

/// Indexed triangle mesh with sub-mesh index ranges.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    /// Ranges into `indices`, one per sub-mesh. Lengths must be multiples of 3.
    pub submeshes: Vec<Range<usize>>,
}

impl MeshData {
    /// Mesh with a single sub-mesh covering all indices.
    pub fn single(positions: Vec<Vec3>, normals: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let submeshes = vec![0..indices.len()];
        Self {
            positions,
            normals,
            indices,
            submeshes,
        }
    }

    /// Face count across all sub-meshes.
    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(|r| r.len() / 3).sum()
    }

    /// Check buffer consistency.
    pub fn validate(&self) -> Result<()> {
        if self.normals.len() != self.positions.len() {
            return Err(Error::NormalCountMismatch {
                vertices: self.positions.len(),
                normals: self.normals.len(),
            });
        }
        for (i, range) in self.submeshes.iter().enumerate() {
            if range.start > range.end || range.end > self.indices.len() {
                return Err(Error::invalid(format!(
                    "sub-mesh {i} range {range:?} outside {} indices",
                    self.indices.len()
                )));
            }
            if range.len() % 3 != 0 {
                return Err(Error::invalid(format!(
                    "sub-mesh {i} index count {} is not a multiple of 3",
                    range.len()
                )));
            }
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= self.positions.len()) {
            return Err(Error::invalid(format!(
                "index {bad} out of range for {} vertices",
                self.positions.len()
            )));
        }
        Ok(())
    }

    /// Extract the triangles of one sub-mesh (no transform).
    pub fn submesh_triangles(&self, submesh: usize) -> Result<Vec<Triangle>> {
        let range = self
            .submeshes
            .get(submesh)
            .cloned()
            .ok_or_else(|| Error::invalid(format!("no sub-mesh {submesh}")))?;
        let indices = self
            .indices
            .get(range)
            .ok_or_else(|| Error::invalid(format!("sub-mesh {submesh} range out of bounds")))?;

        let mut tris = Vec::with_capacity(indices.len() / 3);
        for chunk in indices.chunks_exact(3) {
            let (i0, i1, i2) = (chunk[0] as usize, chunk[1] as usize, chunk[2] as usize);
            let vertex = |i: usize| -> Result<(Vec3, Vec3)> {
                let p = *self
                    .positions
                    .get(i)
                    .ok_or_else(|| Error::invalid(format!("index {i} out of range")))?;
                let n = self.normals.get(i).copied().unwrap_or(Vec3::ZERO);
                Ok((p, n))
            };
            let (a, na) = vertex(i0)?;
            let (b, nb) = vertex(i1)?;
            let (c, nc) = vertex(i2)?;
            tris.push(Triangle { a, b, c, na, nb, nc });
        }
        Ok(tris)
    }
}

/// Apply a transform to local-space chunks, recomputing bounds.
pub fn chunks_to_world(local: &[GeometryChunk], transform: &Transform) -> Vec<GeometryChunk> {
    let affine = transform.to_affine();
    let normal_mat = transform.normal_matrix();
    local
        .iter()
        .map(|chunk| {
            let triangles = chunk
                .triangles
                .iter()
                .map(|t| t.transformed(&affine, &normal_mat))
                .collect();
            GeometryChunk::new(triangles, chunk.submesh)
        })
        .collect()
}

/// A partitioned mesh placed in the world.
///
/// Holds the local-space chunk layout and re-derives world chunks only when
/// the mesh revision or transform changed since the last [`refresh`].
///
/// [`refresh`]: MeshInstance::refresh
#[derive(Debug, Clone)]
pub struct MeshInstance {
    local_chunks: Vec<GeometryChunk>,
    world_chunks: Vec<GeometryChunk>,
    transform: Transform,
    revision: u64,
    /// Last (revision, transform) the world chunks were built from.
    built_from: Option<(u64, Transform)>,
    dirty: bool,
}

impl MeshInstance {
    /// Partition `mesh` and place it with `transform`.
    pub fn new(mesh: &MeshData, transform: Transform) -> Result<Self> {
        let local_chunks = split::partition_mesh(mesh)?;
        Ok(Self {
            local_chunks,
            world_chunks: Vec::new(),
            transform,
            revision: 0,
            built_from: None,
            dirty: true,
        })
    }

    /// Replace the source mesh, re-running the split.
    ///
    /// On error the previous layout is kept.
    pub fn set_mesh(&mut self, mesh: &MeshData) -> Result<()> {
        self.local_chunks = split::partition_mesh(mesh)?;
        self.revision += 1;
        self.dirty = true;
        Ok(())
    }

    /// Move the instance. Marks dirty only if the transform differs.
    pub fn set_transform(&mut self, transform: Transform) {
        if transform != self.transform {
            self.transform = transform;
            self.dirty = true;
        }
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn local_chunks(&self) -> &[GeometryChunk] {
        &self.local_chunks
    }

    /// Rebuild world chunks if needed. Returns true if they were rebuilt.
    pub fn refresh(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        let current = (self.revision, self.transform);
        if self.built_from == Some(current) {
            return false;
        }
        self.world_chunks = chunks_to_world(&self.local_chunks, &self.transform);
        self.built_from = Some(current);
        true
    }

    /// World-space chunks as of the last [`refresh`](Self::refresh).
    pub fn world_chunks(&self) -> &[GeometryChunk] {
        &self.world_chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Quat;

    fn quad_mesh() -> MeshData {
        MeshData::single(
            vec![
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(-1.0, 0.0, 1.0),
            ],
            vec![Vec3::Y; 4],
            vec![0, 2, 1, 0, 3, 2],
        )
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut mesh = quad_mesh();
        mesh.submeshes = vec![0..4];
        assert!(matches!(mesh.validate(), Err(Error::InvalidMesh(_))));

        let mut mesh = quad_mesh();
        mesh.indices[0] = 9;
        assert!(matches!(mesh.validate(), Err(Error::InvalidMesh(_))));

        let mut mesh = quad_mesh();
        mesh.normals.pop();
        assert!(matches!(mesh.validate(), Err(Error::NormalCountMismatch { .. })));
    }

    #[test]
    fn test_submesh_triangles() {
        let mut mesh = quad_mesh();
        mesh.submeshes = vec![0..3, 3..6];
        assert_eq!(mesh.triangle_count(), 2);
        let second = mesh.submesh_triangles(1).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].b, Vec3::new(-1.0, 0.0, 1.0));
        assert!(mesh.submesh_triangles(2).is_err());
    }

    #[test]
    fn test_refresh_only_on_change() {
        let mut inst = MeshInstance::new(&quad_mesh(), Transform::IDENTITY).unwrap();
        assert!(inst.is_dirty());
        assert!(inst.refresh());
        assert!(!inst.refresh());

        // Same transform again: not dirty
        inst.set_transform(Transform::IDENTITY);
        assert!(!inst.is_dirty());
        assert!(!inst.refresh());

        inst.set_transform(Transform::from_position(Vec3::new(0.0, 2.0, 0.0)));
        assert!(inst.refresh());
        let b = inst.world_chunks()[0].bounds;
        assert_eq!(b.min.y, 2.0);
        assert_eq!(b.max.y, 2.0);

        inst.set_mesh(&quad_mesh()).unwrap();
        assert_eq!(inst.revision(), 1);
        assert!(inst.refresh());
    }

    #[test]
    fn test_world_refresh_matches_transformed_vertices() {
        let xf = Transform {
            position: Vec3::new(1.0, 0.0, 0.0),
            rotation: Quat::from_rotation_y(0.7),
            scale: Vec3::new(2.0, 1.0, 0.5),
        };
        let mut inst = MeshInstance::new(&quad_mesh(), xf).unwrap();
        inst.refresh();

        let affine = xf.to_affine();
        for chunk in inst.world_chunks() {
            for t in &chunk.triangles {
                for v in t.vertices() {
                    assert!(chunk.bounds.contains(v));
                }
                assert!((t.na.length() - 1.0).abs() < 1e-5);
            }
        }
        let corner = affine.transform_point3(Vec3::new(1.0, 0.0, 1.0));
        let found = inst
            .world_chunks()
            .iter()
            .flat_map(|c| c.triangles.iter())
            .any(|t| t.vertices().iter().any(|v| (*v - corner).length() < 1e-5));
        assert!(found);
    }
}
