//! Built-in demo scene: checker floor, hidden overhead light, mirror prism.

use meshtrace::prelude::*;

pub const FLOOR: MeshId = 1;
pub const LIGHT: MeshId = 2;
pub const PRISM: MeshId = 3;

/// Flat grid on y = 0, `cells` x `cells` quads, facing +Y.
pub fn floor(half_size: f32, cells: u32) -> MeshData {
    let n = cells + 1;
    let step = 2.0 * half_size / cells as f32;
    let mut positions = Vec::with_capacity((n * n) as usize);
    for z in 0..n {
        for x in 0..n {
            positions.push(Vec3::new(-half_size + x as f32 * step, 0.0, -half_size + z as f32 * step));
        }
    }
    let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
    for z in 0..cells {
        for x in 0..cells {
            let i = z * n + x;
            indices.extend_from_slice(&[i, i + n + 1, i + 1, i, i + n, i + n + 1]);
        }
    }
    let normals = vec![Vec3::Y; positions.len()];
    MeshData::single(positions, normals, indices)
}

/// Square facing -Y, centered on the origin.
pub fn ceiling_panel(half_size: f32) -> MeshData {
    let s = half_size;
    MeshData::single(
        vec![
            Vec3::new(-s, 0.0, -s),
            Vec3::new(s, 0.0, -s),
            Vec3::new(s, 0.0, s),
            Vec3::new(-s, 0.0, s),
        ],
        vec![-Vec3::Y; 4],
        vec![0, 1, 2, 0, 2, 3],
    )
}

/// Upright triangular prism with outward-facing flat triangles.
pub fn prism(radius: f32, height: f32) -> MeshData {
    let ring: Vec<Vec3> = (0..3)
        .map(|i| {
            let a = i as f32 * std::f32::consts::TAU / 3.0;
            Vec3::new(a.cos() * radius, 0.0, a.sin() * radius)
        })
        .collect();
    let top: Vec<Vec3> = ring.iter().map(|p| *p + Vec3::Y * height).collect();
    let center = Vec3::Y * (height * 0.5);

    let mut faces = vec![[ring[0], ring[1], ring[2]], [top[0], top[1], top[2]]];
    for i in 0..3 {
        let j = (i + 1) % 3;
        faces.push([ring[i], ring[j], top[j]]);
        faces.push([ring[i], top[j], top[i]]);
    }

    // Unshared vertices so each face keeps its own flat normal
    let mut positions = Vec::with_capacity(faces.len() * 3);
    let mut normals = Vec::with_capacity(faces.len() * 3);
    for [a, mut b, mut c] in faces {
        let mut n = (b - a).cross(c - a).normalize_or_zero();
        if n.dot((a + b + c) / 3.0 - center) < 0.0 {
            std::mem::swap(&mut b, &mut c);
            n = -n;
        }
        positions.extend_from_slice(&[a, b, c]);
        normals.extend_from_slice(&[n, n, n]);
    }
    let indices = (0..positions.len() as u32).collect();
    MeshData::single(positions, normals, indices)
}

/// Queue the demo meshes on `worker`. Returns the epoch to wait for.
pub fn load(worker: &PartitionWorker) -> Result<u64> {
    worker.upsert(
        FLOOR,
        floor(8.0, 16),
        Transform::IDENTITY,
        vec![Material::checker(Vec3::splat(0.75), Vec3::splat(0.25))],
        1,
    )?;
    worker.upsert(
        LIGHT,
        ceiling_panel(1.5),
        Transform::from_position(Vec3::new(0.0, 4.0, 0.0)),
        vec![Material::emissive(Vec3::new(1.0, 0.95, 0.85), 6.0, MaterialFlag::InvisibleLightSource)],
        2,
    )?;
    worker.upsert(
        PRISM,
        prism(0.8, 1.6),
        Transform {
            position: Vec3::new(0.0, 0.0, 1.0),
            rotation: Quat::from_rotation_y(0.4),
            scale: Vec3::ONE,
        },
        vec![Material::glossy(Vec3::splat(0.9), 1.0, 0.85)],
        3,
    )?;
    Ok(3)
}

/// Camera a few units back and up, looking at the prism.
pub fn camera(settings: &RenderSettings) -> CameraParams {
    let xf = CameraParams::look_at(Vec3::new(0.0, 1.8, -5.0), Vec3::new(0.0, 0.8, 1.0), Vec3::Y);
    CameraParams::from_fov(settings.fov_y, settings.aspect(), settings.focus_distance, xf)
}
