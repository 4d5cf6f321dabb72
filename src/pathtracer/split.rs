//! Octree-style mesh splitter.
//!
//! Splits each sub-mesh into chunks of at most [`MAX_TRIS_PER_CHUNK`]
//! triangles (or fewer levels than [`MAX_SPLIT_DEPTH`] allow), so the
//! integrator can reject whole groups of triangles with one bounds test.
//!
//! ## Assignment rule
//! A triangle goes to the first octant (in [`OCTANT_SIGNS`] order) that
//! contains any of its corners. Octants share faces, so a triangle crossing
//! a face is visible to several of them; the claimed bitset keeps it in the
//! first one only.

use smallvec::SmallVec;

use super::chunk::{GeometryChunk, Triangle};
use super::scene_convert::MeshData;
use crate::util::{Bounds, Error, Result, Vec3};

/// Chunks above this size are split further.
pub const MAX_TRIS_PER_CHUNK: usize = 48;

/// Maximum subdivision depth (root chunk is depth 0).
pub const MAX_SPLIT_DEPTH: u32 = 6;

/// Per-mesh face ceiling, bounds intersection cost per frame.
pub const MAX_MESH_TRIANGLES: usize = 1500;

/// Pad applied around the first vertex when seeding root bounds.
const ROOT_PAD: f32 = 0.01;

/// Octant enumeration order, x outermost.
pub const OCTANT_SIGNS: [[f32; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, 1.0, 1.0],
    [1.0, -1.0, -1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, -1.0],
    [1.0, 1.0, 1.0],
];

/// Leaf produced by the splitter with the depth it was emitted at.
#[derive(Debug, Clone)]
pub struct SplitLeaf {
    pub chunk: GeometryChunk,
    pub depth: u32,
}

/// Pending subdivision work.
struct Task {
    /// Indices into the sub-mesh triangle arena.
    tris: Vec<u32>,
    bounds: Bounds,
    depth: u32,
}

/// Partition a whole mesh into chunks, one sub-mesh at a time.
///
/// Fails before any work if the mesh exceeds [`MAX_MESH_TRIANGLES`].
#[tracing::instrument(skip_all, fields(tri_count = mesh.triangle_count()))]
pub fn partition_mesh(mesh: &MeshData) -> Result<Vec<GeometryChunk>> {
    check_mesh(mesh)?;

    let mut chunks = Vec::new();
    for submesh in 0..mesh.submeshes.len() {
        let triangles = mesh.submesh_triangles(submesh)?;
        let leaves = split_submesh(&triangles, submesh);
        tracing::debug!(
            submesh,
            triangles = triangles.len(),
            chunks = leaves.len(),
            max_depth = leaves.iter().map(|l| l.depth).max().unwrap_or(0),
            "sub-mesh split"
        );
        chunks.extend(leaves.into_iter().map(|l| l.chunk));
    }
    Ok(chunks)
}

/// Everything [`partition_mesh`] checks before splitting: the triangle
/// ceiling, then buffer consistency.
pub fn check_mesh(mesh: &MeshData) -> Result<()> {
    let count = mesh.triangle_count();
    if count > MAX_MESH_TRIANGLES {
        tracing::warn!(count, limit = MAX_MESH_TRIANGLES, "mesh rejected, too many triangles");
        return Err(Error::TriangleLimitExceeded {
            count,
            limit: MAX_MESH_TRIANGLES,
        });
    }
    mesh.validate()
}

/// Split one sub-mesh's triangles into leaf chunks.
///
/// Every input triangle ends up in exactly one leaf. An empty input yields
/// no leaves.
pub fn split_submesh(triangles: &[Triangle], submesh: usize) -> Vec<SplitLeaf> {
    let Some(first) = triangles.first() else {
        return Vec::new();
    };

    let mut root_bounds = Bounds::from_point_padded(first.a, ROOT_PAD);
    for t in triangles {
        for v in t.vertices() {
            root_bounds.expand_by_point(v);
        }
    }

    let mut leaves = Vec::new();
    let mut stack = vec![Task {
        tris: (0..triangles.len() as u32).collect(),
        bounds: root_bounds,
        depth: 0,
    }];

    let emit = |leaves: &mut Vec<SplitLeaf>, tris: &[u32], depth: u32| {
        let members = tris.iter().map(|&i| triangles[i as usize]).collect();
        leaves.push(SplitLeaf {
            chunk: GeometryChunk::new(members, submesh),
            depth,
        });
    };

    while let Some(task) = stack.pop() {
        if task.tris.len() <= MAX_TRIS_PER_CHUNK || task.depth >= MAX_SPLIT_DEPTH {
            emit(&mut leaves, &task.tris, task.depth);
            continue;
        }

        let mut claimed = vec![false; task.tris.len()];
        let mut children: SmallVec<[Task; 8]> = SmallVec::new();

        for signs in OCTANT_SIGNS {
            let region = octant_box(&task.bounds, Vec3::from_array(signs));
            let mut extracted = Vec::new();
            for (slot, &idx) in task.tris.iter().enumerate() {
                if !claimed[slot] && triangles[idx as usize].touches(&region) {
                    claimed[slot] = true;
                    extracted.push(idx);
                }
            }
            if extracted.is_empty() {
                continue;
            }
            let bounds = Bounds::from_points(
                extracted
                    .iter()
                    .flat_map(|&i| triangles[i as usize].vertices()),
            );
            children.push(Task {
                tris: extracted,
                bounds,
                depth: task.depth + 1,
            });
        }

        // Unclaimed triangles stay with this chunk.
        let residual: Vec<u32> = task
            .tris
            .iter()
            .zip(&claimed)
            .filter(|(_, &c)| !c)
            .map(|(&i, _)| i)
            .collect();
        if !residual.is_empty() {
            tracing::debug!(count = residual.len(), depth = task.depth, "unclaimed triangles kept in parent");
            emit(&mut leaves, &residual, task.depth);
        }

        // Reverse so the first octant is processed first
        stack.extend(children.into_iter().rev());
    }

    leaves
}

/// Probe volume for one octant.
///
/// Equivalent to a box of size `2 * size/4` centred at
/// `center + signs * size/4`, but built from the parent's own min/max and
/// centre so neighbouring octants share their face exactly.
pub fn octant_box(parent: &Bounds, signs: Vec3) -> Bounds {
    let c = parent.center();
    let lo = Vec3::select(signs.cmplt(Vec3::ZERO), parent.min, c);
    let hi = Vec3::select(signs.cmplt(Vec3::ZERO), c, parent.max);
    Bounds::new(lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tri(cx: f32, cy: f32, cz: f32) -> Triangle {
        Triangle::flat(
            Vec3::new(cx - 0.1, cy - 0.1, cz),
            Vec3::new(cx + 0.1, cy - 0.1, cz),
            Vec3::new(cx, cy + 0.1, cz),
        )
    }

    fn grid(n: usize) -> Vec<Triangle> {
        (0..n)
            .map(|i| make_tri((i % 10) as f32, ((i / 10) % 10) as f32, (i / 100) as f32))
            .collect()
    }

    #[test]
    fn test_empty_submesh() {
        assert!(split_submesh(&[], 0).is_empty());
    }

    #[test]
    fn test_small_submesh_single_leaf() {
        let tris = grid(MAX_TRIS_PER_CHUNK);
        let leaves = split_submesh(&tris, 3);
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].depth, 0);
        assert_eq!(leaves[0].chunk.submesh, 3);
        assert_eq!(leaves[0].chunk.len(), MAX_TRIS_PER_CHUNK);
    }

    #[test]
    fn test_dense_submesh_splits() {
        let tris = grid(400);
        let leaves = split_submesh(&tris, 0);
        assert!(leaves.len() > 1, "400 spread triangles should split");
        let total: usize = leaves.iter().map(|l| l.chunk.len()).sum();
        assert_eq!(total, 400);
        for leaf in &leaves {
            assert!(leaf.chunk.len() <= MAX_TRIS_PER_CHUNK || leaf.depth == MAX_SPLIT_DEPTH);
        }
    }

    #[test]
    fn test_coincident_triangles_stop_at_depth_limit() {
        // Identical triangles can never be separated.
        let tris = vec![make_tri(0.0, 0.0, 0.0); 100];
        let leaves = split_submesh(&tris, 0);
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].depth, MAX_SPLIT_DEPTH);
        assert_eq!(leaves[0].chunk.len(), 100);
    }

    #[test]
    fn test_straddling_triangle_goes_to_first_octant() {
        let parent = Bounds::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        // One vertex in the (-,-,-) octant, the rest in (+,+,+).
        let t = Triangle::flat(Vec3::splat(-0.5), Vec3::splat(0.5), Vec3::new(0.6, 0.5, 0.5));
        let first = OCTANT_SIGNS
            .iter()
            .position(|s| t.touches(&octant_box(&parent, Vec3::from_array(*s))));
        assert_eq!(first, Some(0));
    }

    #[test]
    fn test_octants_cover_parent() {
        let parent = Bounds::new(Vec3::new(-2.0, 0.0, 1.0), Vec3::new(2.0, 3.0, 5.0));
        let mut union = Bounds::EMPTY;
        for s in OCTANT_SIGNS {
            let region = octant_box(&parent, Vec3::from_array(s));
            assert_eq!(region.size(), parent.size() * 0.5);
            union.expand_by_box(&region);
        }
        assert_eq!(union, parent);
        // Centre lies on every octant's shared corner.
        for s in OCTANT_SIGNS {
            assert!(octant_box(&parent, Vec3::from_array(s)).contains(parent.center()));
        }
    }
}
