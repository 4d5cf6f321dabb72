//! Per-sample path integration.
//!
//! One call to [`trace`] follows a single camera path through the scene.
//! All randomness comes from the caller's [`PixelRng`], consumed in a fixed
//! order per bounce: specular choice, diffuse direction, roulette draw.

use super::environment::EnvironmentSettings;
use super::intersect::{IntersectionStats, Ray};
use super::material::{Material, MaterialFlag};
use super::rng::PixelRng;
use super::scene::SceneSnapshot;
use crate::settings::{QualitySettings, MAX_BOUNCE_LIMIT};
use crate::util::{reflect, Vec3};

/// Distance to step past an invisible light before continuing the ray.
pub const PASS_THROUGH_OFFSET: f32 = 0.001;

/// Checker tile selection on the XZ plane.
///
/// Returns `a` where floor(x) and floor(z) have equal parity, `b` otherwise.
#[inline]
pub fn checker(point: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let cx = point.x.floor().rem_euclid(2.0);
    let cz = point.z.floor().rem_euclid(2.0);
    if cx == cz {
        a
    } else {
        b
    }
}

/// Radiance carried back along one camera path.
///
/// At most [`MAX_BOUNCE_LIMIT`] + 1 surface interactions are followed,
/// whatever `quality.max_bounces` says.
pub fn trace(
    mut ray: Ray,
    scene: &SceneSnapshot,
    env: &EnvironmentSettings,
    quality: &QualitySettings,
    rng: &mut PixelRng,
) -> Vec3 {
    let mut incoming = Vec3::ZERO;
    let mut throughput = Vec3::ONE;

    for bounce in 0..=quality.max_bounces.min(MAX_BOUNCE_LIMIT) {
        let Some(hit) = scene.intersect(&ray) else {
            incoming += env.light(ray.dir) * throughput;
            break;
        };

        let mut material: Material = hit.material;
        match material.flag {
            MaterialFlag::CheckerPattern => {
                material.base_color = checker(hit.point, material.base_color, material.emission_color);
            }
            MaterialFlag::InvisibleLightSource if bounce == 0 => {
                ray.origin = hit.point + ray.dir * PASS_THROUGH_OFFSET;
                continue;
            }
            MaterialFlag::InvisibleLightSource | MaterialFlag::Standard => {}
        }

        ray.origin = hit.point;
        let specular = if material.specular_probability >= rng.next_f32() { 1.0 } else { 0.0 };
        let diffuse_dir = (hit.normal + rng.direction()).normalize_or(hit.normal);
        let specular_dir = reflect(ray.dir, hit.normal);
        ray.dir = diffuse_dir
            .lerp(specular_dir, material.smoothness * specular)
            .normalize_or(hit.normal);

        incoming += material.emitted() * throughput;
        throughput *= material.base_color.lerp(material.specular_color, specular);

        if quality.russian_roulette {
            let p = throughput.max_element();
            if rng.next_f32() >= p {
                break;
            }
            throughput *= 1.0 / p;
        }
    }

    incoming
}

/// Color for the debug views, from the primary ray only.
pub fn debug_primary(ray: &Ray, scene: &SceneSnapshot, quality: &QualitySettings) -> Vec3 {
    use crate::settings::RenderMode;

    let mut stats = IntersectionStats::default();
    let hit = scene.intersect_counted(ray, &mut stats);
    let scale = 1.0 / quality.debug_threshold.max(1) as f32;
    match quality.mode {
        RenderMode::Normals => hit.map_or(Vec3::ZERO, |h| h.normal * 0.5 + 0.5),
        RenderMode::TriangleTests => count_color(stats.triangle_tests as f32 * scale),
        RenderMode::BoxTests => count_color(stats.box_tests as f32 * scale),
        RenderMode::PathTraced => Vec3::ZERO,
    }
}

/// Grey ramp up to 1, then red for counts over the threshold.
#[inline]
fn count_color(t: f32) -> Vec3 {
    if t > 1.0 {
        Vec3::X
    } else {
        Vec3::splat(t)
    }
}
