//! Frame dispatch and progressive accumulation.
//!
//! [`render_frame`] produces one noisy frame in parallel across pixels.
//! [`ProgressiveRenderer`] owns the accumulated image and the frame
//! counter, blending each new frame into an exact running mean.
//!
//! ## Usage
//! ```ignore
//! let mut pt = ProgressiveRenderer::new(width, height);
//! loop {
//!     let scene = store.current();
//!     pt.render(&scene, &camera, &settings.quality, &settings.environment);
//!     display(pt.accumulated());
//! }
//! ```

use std::time::{Duration, Instant};

use rayon::prelude::*;

use super::camera::CameraParams;
use super::environment::EnvironmentSettings;
use super::rng::PixelRng;
use super::scene::SceneSnapshot;
use super::shade;
use crate::settings::{QualitySettings, RenderMode};
use crate::util::{luminance, Vec2, Vec3};

/// Row-major RGB float image, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<Vec3>,
}

impl Image {
    /// Black image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec3::ZERO; width as usize * height as usize],
        }
    }

    /// Image with every pixel set to `color`.
    pub fn filled(width: u32, height: u32, color: Vec3) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Vec3] {
        &self.pixels
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<Vec3> {
        (x < self.width && y < self.height).then(|| self.pixels[(y * self.width + x) as usize])
    }

    /// Raw RGB f32 bytes for texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Mean pixel value.
    pub fn mean(&self) -> Vec3 {
        if self.pixels.is_empty() {
            return Vec3::ZERO;
        }
        self.pixels.iter().copied().sum::<Vec3>() / self.pixels.len() as f32
    }
}

/// Numbers describing one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Frame index the frame was seeded and blended with
    pub frame_index: u32,
    pub primary_rays: u64,
    pub elapsed: Duration,
    pub mean_luminance: f32,
}

/// Render one noisy frame.
///
/// Each pixel seeds its own [`PixelRng`] from its linear index and
/// `frame_index`, so the result depends only on the inputs, not on thread
/// scheduling. Quality and environment values are clamped into range first.
#[tracing::instrument(skip_all, fields(frame = frame_index, w = width, h = height))]
pub fn render_frame(
    scene: &SceneSnapshot,
    camera: &CameraParams,
    quality: &QualitySettings,
    env: &EnvironmentSettings,
    width: u32,
    height: u32,
    frame_index: u32,
) -> Image {
    let mut image = Image::new(width, height);
    if width == 0 || height == 0 {
        return image;
    }
    let quality = &quality.sanitized();
    let env = &env.sanitized();
    let rays = quality.rays_per_pixel;

    image
        .pixels
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(row, line)| {
            // Row 0 is the top of the image, uv.y grows upward
            let y = height - 1 - row as u32;
            for (x, px) in line.iter_mut().enumerate() {
                let pixel_index = (row as u32).wrapping_mul(width).wrapping_add(x as u32);
                let uv = Vec2::new(
                    (x as f32 + 0.5) / width as f32,
                    (y as f32 + 0.5) / height as f32,
                );
                *px = shade_pixel(scene, camera, quality, env, uv, width, pixel_index, frame_index, rays);
            }
        });

    image
}

#[allow(clippy::too_many_arguments)]
#[inline]
fn shade_pixel(
    scene: &SceneSnapshot,
    camera: &CameraParams,
    quality: &QualitySettings,
    env: &EnvironmentSettings,
    uv: Vec2,
    width: u32,
    pixel_index: u32,
    frame_index: u32,
    rays: u32,
) -> Vec3 {
    let mut rng = PixelRng::new(pixel_index, frame_index);

    if quality.mode != RenderMode::PathTraced {
        let ray = camera.primary_ray(uv, width, 0.0, 0.0, &mut rng);
        return shade::debug_primary(&ray, scene, quality);
    }

    let mut total = Vec3::ZERO;
    for _ in 0..rays {
        let ray = camera.primary_ray(uv, width, quality.lens_blur, quality.ray_spread, &mut rng);
        total += shade::trace(ray, scene, env, quality, &mut rng);
    }
    total / rays as f32
}

/// Blend `frame` into `accumulated` with weight `1 / (frame_index + 1)`.
///
/// Frame 0 replaces the accumulated image outright, so after blending
/// frames 0..N the result is their arithmetic mean.
pub fn blend_into(accumulated: &mut Image, frame: &Image, frame_index: u32) {
    debug_assert_eq!(accumulated.pixels.len(), frame.pixels.len());
    let weight = 1.0 / (frame_index as f32 + 1.0);
    accumulated
        .pixels
        .par_iter_mut()
        .zip(frame.pixels.par_iter())
        .for_each(|(acc, new)| {
            *acc = *acc * (1.0 - weight) + *new * weight;
        });
}

/// Owner of the accumulated image and frame counter.
pub struct ProgressiveRenderer {
    width: u32,
    height: u32,
    accumulated: Image,
    last_frame: Image,
    /// Frames blended so far; also seeds the next frame
    pub frame_index: u32,
    paused: bool,
}

impl ProgressiveRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            accumulated: Image::new(width, height),
            last_frame: Image::new(width, height),
            frame_index: 0,
            paused: false,
        }
    }

    /// Change resolution, dropping accumulated history.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) {
            *self = Self {
                paused: self.paused,
                ..Self::new(width, height)
            };
        }
    }

    /// Restart accumulation (camera or scene changed).
    pub fn reset_accumulation(&mut self) {
        if self.frame_index > 0 {
            tracing::warn!(frames = self.frame_index, "accumulation reset");
        }
        self.frame_index = 0;
    }

    /// Freeze the running mean. While paused [`render`](Self::render) does
    /// nothing and the frame counter stays put.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn accumulated(&self) -> &Image {
        &self.accumulated
    }

    /// Most recent raw (pre-accumulation) frame.
    pub fn last_frame(&self) -> &Image {
        &self.last_frame
    }

    /// Render, blend and advance. Returns `None` while paused.
    pub fn render(
        &mut self,
        scene: &SceneSnapshot,
        camera: &CameraParams,
        quality: &QualitySettings,
        env: &EnvironmentSettings,
    ) -> Option<FrameStats> {
        if self.paused {
            return None;
        }
        let start = Instant::now();
        let frame = render_frame(scene, camera, quality, env, self.width, self.height, self.frame_index);
        let stats = self.accumulate(frame);
        let stats = FrameStats {
            primary_rays: self.width as u64 * self.height as u64 * quality.rays_per_pixel.max(1) as u64,
            elapsed: start.elapsed(),
            ..stats
        };
        tracing::debug!(
            frame = stats.frame_index,
            ms = stats.elapsed.as_secs_f32() * 1000.0,
            lum = stats.mean_luminance,
            "frame rendered"
        );
        Some(stats)
    }

    /// Blend an externally produced frame and advance the counter.
    ///
    /// Ignores frames of the wrong size.
    pub fn accumulate(&mut self, frame: Image) -> FrameStats {
        let frame_index = self.frame_index;
        if (frame.width, frame.height) != (self.width, self.height) {
            tracing::warn!(
                got_w = frame.width,
                got_h = frame.height,
                "frame size mismatch, not accumulated"
            );
        } else {
            blend_into(&mut self.accumulated, &frame, frame_index);
            self.last_frame = frame;
            self.frame_index = self.frame_index.wrapping_add(1);
        }
        FrameStats {
            frame_index,
            primary_rays: 0,
            elapsed: Duration::ZERO,
            mean_luminance: luminance(self.accumulated.mean()),
        }
    }
}
