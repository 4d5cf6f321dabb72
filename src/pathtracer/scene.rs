//! Scene registry and immutable per-frame snapshots.
//!
//! `Scene` is the mutable, caller-side registry of placed meshes.
//! [`Scene::snapshot`] flattens it into a [`SceneSnapshot`]: world-space
//! chunks with their resolved materials. Frames only ever read a snapshot
//! through an `Arc`, so a rebuild running elsewhere never shows a
//! half-updated mesh to the integrator.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::chunk::GeometryChunk;
use super::intersect::{ray_bounds, ray_triangle, IntersectionStats, Ray};
use super::material::{self, Material};
use super::scene_convert::{MeshData, MeshInstance};
use crate::util::{Error, Result, Transform, Vec3};

/// Mesh identity chosen by the caller.
pub type MeshId = u64;

/// Resolved ray hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    pub dst: f32,
    pub point: Vec3,
    /// Interpolated, normalized shading normal
    pub normal: Vec3,
    pub material: Material,
}

/// Immutable, world-space view of the scene for one or more frames.
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    chunks: Vec<GeometryChunk>,
    /// Material for each entry of `chunks`
    materials: Vec<Material>,
    /// Owning mesh for each entry of `chunks`
    owners: Vec<MeshId>,
    generation: u64,
}

impl SceneSnapshot {
    /// Snapshot from pre-built world chunks and a material table.
    pub fn from_chunks(chunks: Vec<GeometryChunk>, materials: &[Material]) -> Result<Self> {
        let mut snap = Self::default();
        snap.push_mesh(0, chunks, materials)?;
        Ok(snap)
    }

    fn push_mesh(&mut self, id: MeshId, chunks: Vec<GeometryChunk>, materials: &[Material]) -> Result<()> {
        for chunk in chunks {
            let m = *material::lookup(materials, chunk.submesh).ok_or(Error::EmptyMaterialTable(id))?;
            self.materials.push(m);
            self.owners.push(id);
            self.chunks.push(chunk);
        }
        Ok(())
    }

    pub fn chunks(&self) -> &[GeometryChunk] {
        &self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.chunks.iter().map(|c| c.len()).sum()
    }

    /// Chunks belonging to one mesh, in partition order.
    pub fn mesh_chunks(&self, id: MeshId) -> impl Iterator<Item = &GeometryChunk> {
        self.chunks
            .iter()
            .zip(&self.owners)
            .filter(move |(_, &owner)| owner == id)
            .map(|(c, _)| c)
    }

    /// Publication counter assigned by [`SceneStore::publish`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Nearest front-facing hit along `ray`.
    #[inline]
    pub fn intersect(&self, ray: &Ray) -> Option<HitRecord> {
        self.intersect_counted(ray, &mut IntersectionStats::default())
    }

    /// Like [`intersect`](Self::intersect), also counting the tests performed.
    pub fn intersect_counted(&self, ray: &Ray, stats: &mut IntersectionStats) -> Option<HitRecord> {
        let inv_dir = ray.inv_dir();
        let mut closest_dst = f32::INFINITY;
        let mut closest = None;

        for (ci, chunk) in self.chunks.iter().enumerate() {
            stats.box_tests += 1;
            match ray_bounds(ray, inv_dir, &chunk.bounds) {
                Some(enter) if enter <= closest_dst => {}
                _ => continue,
            }
            for tri in &chunk.triangles {
                stats.triangle_tests += 1;
                if let Some(hit) = ray_triangle(ray, tri.a, tri.b, tri.c) {
                    if hit.dst < closest_dst {
                        closest_dst = hit.dst;
                        closest = Some((ci, tri, hit));
                    }
                }
            }
        }

        closest.map(|(ci, tri, hit)| {
            let w = hit.weights;
            let geometric = (tri.b - tri.a).cross(tri.c - tri.a).normalize_or(Vec3::Y);
            let normal = (tri.na * w.x + tri.nb * w.y + tri.nc * w.z).normalize_or(geometric);
            HitRecord {
                dst: hit.dst,
                point: ray.at(hit.dst),
                normal,
                material: self.materials[ci],
            }
        })
    }
}

/// Placed mesh plus its material table.
#[derive(Debug, Clone)]
struct SceneObject {
    instance: MeshInstance,
    materials: Vec<Material>,
}

/// Mutable registry of meshes, keyed by caller-chosen id.
#[derive(Debug, Default)]
pub struct Scene {
    objects: BTreeMap<MeshId, SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition and register a mesh. Replaces any mesh with the same id.
    pub fn add_mesh(
        &mut self,
        id: MeshId,
        mesh: &MeshData,
        transform: Transform,
        materials: Vec<Material>,
    ) -> Result<()> {
        if materials.is_empty() {
            return Err(Error::EmptyMaterialTable(id));
        }
        let instance = MeshInstance::new(mesh, transform)?;
        let materials = materials.into_iter().map(Material::sanitized).collect();
        self.objects.insert(id, SceneObject { instance, materials });
        Ok(())
    }

    pub fn set_transform(&mut self, id: MeshId, transform: Transform) -> Result<()> {
        let obj = self.objects.get_mut(&id).ok_or(Error::MeshNotFound(id))?;
        obj.instance.set_transform(transform);
        Ok(())
    }

    pub fn set_mesh(&mut self, id: MeshId, mesh: &MeshData) -> Result<()> {
        let obj = self.objects.get_mut(&id).ok_or(Error::MeshNotFound(id))?;
        obj.instance.set_mesh(mesh)
    }

    pub fn set_materials(&mut self, id: MeshId, materials: Vec<Material>) -> Result<()> {
        if materials.is_empty() {
            return Err(Error::EmptyMaterialTable(id));
        }
        let obj = self.objects.get_mut(&id).ok_or(Error::MeshNotFound(id))?;
        obj.materials = materials.into_iter().map(Material::sanitized).collect();
        Ok(())
    }

    pub fn remove(&mut self, id: MeshId) -> bool {
        self.objects.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// True if any instance needs its world chunks rebuilt.
    pub fn is_dirty(&self) -> bool {
        self.objects.values().any(|o| o.instance.is_dirty())
    }

    /// Refresh dirty instances and flatten into a snapshot.
    #[tracing::instrument(skip_all, fields(meshes = self.objects.len()))]
    pub fn snapshot(&mut self) -> SceneSnapshot {
        let mut snap = SceneSnapshot::default();
        for (&id, obj) in self.objects.iter_mut() {
            if obj.instance.refresh() {
                tracing::debug!(id, "world chunks rebuilt");
            }
            let chunks = obj.instance.world_chunks().to_vec();
            // Material tables are checked non-empty on insert.
            if let Err(e) = snap.push_mesh(id, chunks, &obj.materials) {
                tracing::warn!("skipping mesh {id}: {e}");
            }
        }
        snap
    }
}

/// Shared slot holding the current snapshot.
///
/// Readers clone the `Arc` and keep using it for the whole frame; writers
/// replace it wholesale.
#[derive(Debug, Clone, Default)]
pub struct SceneStore {
    inner: Arc<RwLock<Arc<SceneSnapshot>>>,
}

impl SceneStore {
    pub fn new(snapshot: SceneSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// Current snapshot. Cheap; holds the read lock only for the clone.
    pub fn current(&self) -> Arc<SceneSnapshot> {
        Arc::clone(&self.inner.read())
    }

    /// Replace the current snapshot, bumping its generation.
    pub fn publish(&self, mut snapshot: SceneSnapshot) -> u64 {
        let mut slot = self.inner.write();
        snapshot.generation = slot.generation + 1;
        let generation = snapshot.generation;
        *slot = Arc::new(snapshot);
        generation
    }
}
