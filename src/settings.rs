//! Persistent render settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pathtracer::EnvironmentSettings;
use crate::util::{Error, Result};

/// Upper bound for `max_bounces`.
pub const MAX_BOUNCE_LIMIT: u32 = 32;

/// What each pixel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    /// Full path-traced radiance
    #[default]
    PathTraced,
    /// Primary-hit shading normal mapped to [0, 1]
    Normals,
    /// Primary-ray triangle tests, divided by the debug threshold
    TriangleTests,
    /// Primary-ray chunk bounds tests, divided by the debug threshold
    BoxTests,
}

/// Integrator quality knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySettings {
    pub max_bounces: u32,
    pub rays_per_pixel: u32,
    /// Depth-of-field disk radius (scaled by 1 / image width)
    pub lens_blur: f32,
    /// Anti-aliasing disk radius on the focus plane (scaled by 1 / image width)
    pub ray_spread: f32,
    pub russian_roulette: bool,
    pub mode: RenderMode,
    /// Test count mapped to full white in the debug count views
    pub debug_threshold: u32,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            max_bounces: 4,
            rays_per_pixel: 4,
            lens_blur: 0.0,
            ray_spread: 1.0,
            russian_roulette: true,
            mode: RenderMode::PathTraced,
            debug_threshold: 200,
        }
    }
}

impl QualitySettings {
    /// Clamp every field into its valid range.
    pub fn sanitize(&mut self) {
        self.max_bounces = self.max_bounces.min(MAX_BOUNCE_LIMIT);
        self.rays_per_pixel = self.rays_per_pixel.max(1);
        self.lens_blur = self.lens_blur.max(0.0);
        self.ray_spread = self.ray_spread.max(0.0);
        self.debug_threshold = self.debug_threshold.max(1);
    }

    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }
}

/// Render settings that persist between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub quality: QualitySettings,
    pub environment: EnvironmentSettings,
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees
    pub fov_y: f32,
    pub focus_distance: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            quality: QualitySettings::default(),
            environment: EnvironmentSettings::default(),
            width: 320,
            height: 180,
            fov_y: 45.0,
            focus_distance: 1.0,
        }
    }
}

impl RenderSettings {
    /// Default settings file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("meshtrace");
            p.push("settings.json");
            p
        })
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::default_path()
            .and_then(|p| Self::load_from(&p).ok())
            .unwrap_or_else(|| Self::default().sanitized())
    }

    /// Load and sanitize settings from a JSON file
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut settings: Self = serde_json::from_str(&text).map_err(|source| Error::Settings {
            path: path.to_path_buf(),
            source,
        })?;
        settings.sanitize();
        Ok(settings)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path().ok_or(Error::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save settings as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn sanitize(&mut self) {
        self.quality.sanitize();
        self.environment.sanitize();
        if self.width == 0 || self.height == 0 {
            self.width = 320;
            self.height = 180;
        }
        if !(self.fov_y > 0.0 && self.fov_y < 180.0) {
            self.fov_y = 45.0;
        }
        if !(self.focus_distance > 0.0) {
            self.focus_distance = 1.0;
        }
    }

    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_quality_sanitize() {
        let q = QualitySettings {
            max_bounces: 100,
            rays_per_pixel: 0,
            lens_blur: -1.0,
            ray_spread: -2.0,
            debug_threshold: 0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(q.max_bounces, MAX_BOUNCE_LIMIT);
        assert_eq!(q.rays_per_pixel, 1);
        assert_eq!(q.lens_blur, 0.0);
        assert_eq!(q.ray_spread, 0.0);
        assert_eq!(q.debug_threshold, 1);
    }

    #[test]
    fn test_degenerate_view_is_fixed_up() {
        let s = RenderSettings {
            width: 0,
            fov_y: 180.0,
            focus_distance: -2.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!((s.width, s.height), (320, 180));
        assert_eq!(s.fov_y, 45.0);
        assert_eq!(s.focus_distance, 1.0);
        assert_eq!(RenderSettings::default().sanitized(), RenderSettings::default());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut s = RenderSettings::default().sanitized();
        s.quality.max_bounces = 7;
        s.quality.mode = RenderMode::BoxTests;
        s.environment.enabled = false;
        s.save_to(&path).unwrap();

        let back = RenderSettings::load_from(&path).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "quality": { "rays_per_pixel": 0, "max_bounces": 64 } }"#).unwrap();
        let s = RenderSettings::load_from(&path).unwrap();
        assert_eq!(s.quality.rays_per_pixel, 1);
        assert_eq!(s.quality.max_bounces, MAX_BOUNCE_LIMIT);
        assert!(s.environment.enabled);
    }

    #[test]
    fn test_bad_json_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        match RenderSettings::load_from(&path) {
            Err(Error::Settings { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected settings error, got {other:?}"),
        }
    }
}
