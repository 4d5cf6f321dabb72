//! Partitioning properties over realistic meshes.

use meshtrace::pathtracer::split::split_submesh;
use meshtrace::pathtracer::{partition_mesh, MeshData, MeshInstance, Triangle, MAX_MESH_TRIANGLES, MAX_SPLIT_DEPTH, MAX_TRIS_PER_CHUNK};
use meshtrace::util::{Quat, Transform, Vec3};
use meshtrace::Error;

/// UV sphere, `stacks * slices * 2` triangles (pole rows degenerate).
fn uv_sphere(stacks: u32, slices: u32, radius: f32) -> MeshData {
    let mut positions = Vec::new();
    for i in 0..=stacks {
        let theta = std::f32::consts::PI * i as f32 / stacks as f32;
        for j in 0..=slices {
            let phi = std::f32::consts::TAU * j as f32 / slices as f32;
            positions.push(Vec3::new(
                theta.sin() * phi.cos(),
                theta.cos(),
                theta.sin() * phi.sin(),
            ) * radius);
        }
    }
    let normals = positions.iter().map(|p| p.normalize_or_zero()).collect();
    let row = slices + 1;
    let mut indices = Vec::new();
    for i in 0..stacks {
        for j in 0..slices {
            let a = i * row + j;
            let b = a + row;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    MeshData::single(positions, normals, indices)
}

fn key(t: &Triangle) -> [u32; 9] {
    let mut k = [0; 9];
    for (i, v) in t.vertices().iter().enumerate() {
        k[i * 3] = v.x.to_bits();
        k[i * 3 + 1] = v.y.to_bits();
        k[i * 3 + 2] = v.z.to_bits();
    }
    k
}

#[test]
fn test_partition_keeps_every_triangle_once() {
    let mesh = uv_sphere(16, 24, 2.0);
    let chunks = partition_mesh(&mesh).unwrap();
    assert!(chunks.len() > 1);

    let mut expected: Vec<_> = mesh.submesh_triangles(0).unwrap().iter().map(key).collect();
    let mut got: Vec<_> = chunks.iter().flat_map(|c| c.triangles.iter().map(key)).collect();
    expected.sort_unstable();
    got.sort_unstable();
    assert_eq!(got, expected);
}

#[test]
fn test_leaves_respect_size_and_depth() {
    let mesh = uv_sphere(16, 24, 2.0);
    let tris = mesh.submesh_triangles(0).unwrap();
    let leaves = split_submesh(&tris, 0);
    for leaf in &leaves {
        assert!(leaf.depth <= MAX_SPLIT_DEPTH);
        assert!(
            leaf.chunk.len() <= MAX_TRIS_PER_CHUNK || leaf.depth == MAX_SPLIT_DEPTH,
            "leaf of {} triangles at depth {}",
            leaf.chunk.len(),
            leaf.depth
        );
        assert!(!leaf.chunk.is_empty());
    }
}

#[test]
fn test_chunk_bounds_contain_members() {
    let mesh = uv_sphere(12, 16, 1.0);
    for chunk in partition_mesh(&mesh).unwrap() {
        for t in &chunk.triangles {
            for v in t.vertices() {
                assert!(chunk.bounds.contains(v), "{v} outside {:?}", chunk.bounds);
            }
        }
    }
}

#[test]
fn test_submeshes_partitioned_separately() {
    let mut mesh = uv_sphere(8, 8, 1.0);
    let half = mesh.indices.len() / 2;
    mesh.submeshes = vec![0..half, half..mesh.indices.len()];
    let chunks = partition_mesh(&mesh).unwrap();
    let per_sub: Vec<usize> = (0..2)
        .map(|s| chunks.iter().filter(|c| c.submesh == s).map(|c| c.len()).sum())
        .collect();
    assert_eq!(per_sub, vec![half / 3, half / 3]);
}

#[test]
fn test_triangle_ceiling() {
    let flat = |n: usize| {
        let positions: Vec<Vec3> = (0..n)
            .flat_map(|i| {
                let x = i as f32;
                [Vec3::new(x, 0.0, 0.0), Vec3::new(x + 0.5, 0.0, 1.0), Vec3::new(x + 1.0, 0.0, 0.0)]
            })
            .collect();
        let normals = vec![Vec3::Y; positions.len()];
        let indices = (0..positions.len() as u32).collect();
        MeshData::single(positions, normals, indices)
    };

    assert!(partition_mesh(&flat(MAX_MESH_TRIANGLES)).is_ok());
    match partition_mesh(&flat(MAX_MESH_TRIANGLES + 1)) {
        Err(Error::TriangleLimitExceeded { count, limit }) => {
            assert_eq!(count, MAX_MESH_TRIANGLES + 1);
            assert_eq!(limit, MAX_MESH_TRIANGLES);
        }
        other => panic!("expected ceiling rejection, got {other:?}"),
    }
}

#[test]
fn test_transform_change_reuses_layout() {
    let mesh = uv_sphere(12, 16, 1.0);
    let mut inst = MeshInstance::new(&mesh, Transform::IDENTITY).unwrap();
    inst.refresh();
    let layout: Vec<usize> = inst.local_chunks().iter().map(|c| c.len()).collect();

    inst.set_transform(Transform {
        position: Vec3::new(10.0, 0.0, 0.0),
        rotation: Quat::from_rotation_z(1.0),
        scale: Vec3::new(2.0, 1.0, 1.0),
    });
    assert!(inst.is_dirty());
    assert!(inst.refresh());

    let world: Vec<usize> = inst.world_chunks().iter().map(|c| c.len()).collect();
    assert_eq!(world, layout);
    for chunk in inst.world_chunks() {
        assert!(chunk.bounds.min.x > 7.0);
        for t in &chunk.triangles {
            for v in t.vertices() {
                assert!(chunk.bounds.contains(v));
            }
        }
    }
}
