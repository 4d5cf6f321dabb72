//! Per-frame camera parameters and primary ray generation.

use super::intersect::Ray;
use super::rng::PixelRng;
use crate::util::{Affine3A, Vec2, Vec3};

/// Camera state supplied by the caller each frame.
///
/// The projection plane sits at `focus_distance` in front of the camera
/// (camera looks down its local +Z) and is `plane_width` by `plane_height`
/// world units in size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    pub plane_width: f32,
    pub plane_height: f32,
    pub focus_distance: f32,
    pub local_to_world: Affine3A,
}

impl CameraParams {
    /// Plane size from a vertical field of view (degrees) and aspect ratio.
    pub fn from_fov(fov_y_deg: f32, aspect: f32, focus_distance: f32, local_to_world: Affine3A) -> Self {
        let plane_height = focus_distance * (fov_y_deg.to_radians() * 0.5).tan() * 2.0;
        Self {
            plane_width: plane_height * aspect,
            plane_height,
            focus_distance,
            local_to_world,
        }
    }

    /// Camera-to-world transform looking from `eye` toward `target`.
    ///
    /// Local +Z maps to the view direction, +X to screen right and +Y to up.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Affine3A {
        let forward = (target - eye).normalize_or(Vec3::Z);
        let right = up.cross(forward).normalize_or(Vec3::X);
        let true_up = forward.cross(right);
        Affine3A::from_cols(right.into(), true_up.into(), forward.into(), eye.into())
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.local_to_world.translation.into()
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.local_to_world.matrix3.x_axis.into()
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.local_to_world.matrix3.y_axis.into()
    }

    /// World-space point on the focus plane for normalized screen coords.
    ///
    /// `uv` is (0,0) at the bottom-left and (1,1) at the top-right.
    #[inline]
    pub fn focus_point(&self, uv: Vec2) -> Vec3 {
        let local = Vec3::new(uv.x - 0.5, uv.y - 0.5, 1.0)
            * Vec3::new(self.plane_width, self.plane_height, self.focus_distance);
        self.local_to_world.transform_point3(local)
    }

    /// Jittered primary ray.
    ///
    /// `lens_blur` and `ray_spread` are in units of one image-width fraction:
    /// the disk samples are divided by `image_width`.
    #[inline]
    pub fn primary_ray(
        &self,
        uv: Vec2,
        image_width: u32,
        lens_blur: f32,
        ray_spread: f32,
        rng: &mut PixelRng,
    ) -> Ray {
        let focus = self.focus_point(uv);
        let (right, up) = (self.right(), self.up());
        let width = image_width.max(1) as f32;

        let defocus = rng.point_in_disk() * lens_blur / width;
        let origin = self.position() + right * defocus.x + up * defocus.y;

        let spread = rng.point_in_disk() * ray_spread / width;
        let target = focus + right * spread.x + up * spread.y;

        Ray::new(origin, target - origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> CameraParams {
        let xf = CameraParams::look_at(Vec3::new(0.0, 1.0, -5.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
        CameraParams::from_fov(60.0, 2.0, 5.0, xf)
    }

    #[test]
    fn test_plane_size() {
        let cam = camera();
        let expected = 5.0 * (30.0f32).to_radians().tan() * 2.0;
        assert!((cam.plane_height - expected).abs() < 1e-5);
        assert!((cam.plane_width - 2.0 * expected).abs() < 1e-5);
    }

    #[test]
    fn test_center_focus_point() {
        let cam = camera();
        let p = cam.focus_point(Vec2::splat(0.5));
        assert!((p - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
        // Right edge lies along camera right
        let r = cam.focus_point(Vec2::new(1.0, 0.5));
        assert!((r - p).dot(cam.right()) > 0.0);
    }

    #[test]
    fn test_no_jitter_ray_is_pinhole() {
        let cam = camera();
        let mut rng = PixelRng::new(0, 0);
        let ray = cam.primary_ray(Vec2::splat(0.5), 64, 0.0, 0.0, &mut rng);
        assert_eq!(ray.origin, cam.position());
        assert!((ray.dir - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_defocus_keeps_focus_plane_sharp() {
        let cam = camera();
        let mut rng = PixelRng::new(17, 4);
        for _ in 0..32 {
            let ray = cam.primary_ray(Vec2::splat(0.5), 64, 8.0, 0.0, &mut rng);
            assert!((ray.origin - cam.position()).length() <= 8.0 / 64.0 + 1e-5);
            // All rays converge on the focus point
            let t = (cam.focus_point(Vec2::splat(0.5)) - ray.origin).length();
            assert!((ray.at(t) - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-4);
        }
    }
}
