//! Procedural sky/ground environment light.

use serde::{Deserialize, Serialize};

use crate::util::{smoothstep, Vec3};

/// Environment parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSettings {
    pub enabled: bool,
    pub ground_color: Vec3,
    pub horizon_color: Vec3,
    pub zenith_color: Vec3,
    /// Direction toward the sun. Normalized on use.
    pub sun_direction: Vec3,
    /// Sun disc sharpness exponent (>= 1)
    pub sun_focus: f32,
    /// Sun disc brightness (>= 0)
    pub sun_intensity: f32,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ground_color: Vec3::splat(0.35),
            horizon_color: Vec3::ONE,
            zenith_color: Vec3::new(0.08, 0.37, 0.73),
            sun_direction: Vec3::new(0.4, 0.8, -0.45),
            sun_focus: 500.0,
            sun_intensity: 10.0,
        }
    }
}

impl EnvironmentSettings {
    /// Environment that contributes no light.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Clamp sun parameters into their valid ranges.
    pub fn sanitize(&mut self) {
        self.sun_focus = self.sun_focus.max(1.0);
        self.sun_intensity = self.sun_intensity.max(0.0);
        if self.sun_direction.length_squared() == 0.0 || !self.sun_direction.is_finite() {
            self.sun_direction = Vec3::Y;
        }
    }

    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }

    /// Light arriving from direction `dir` (unit length).
    pub fn light(&self, dir: Vec3) -> Vec3 {
        if !self.enabled {
            return Vec3::ZERO;
        }
        let sky_t = smoothstep(0.0, 0.4, dir.y).powf(0.35);
        let ground_to_sky_t = smoothstep(-0.01, 0.0, dir.y);
        let sky = self.horizon_color.lerp(self.zenith_color, sky_t);

        let sun_dir = self.sun_direction.normalize_or(Vec3::Y);
        let sun = dir.dot(sun_dir).max(0.0).powf(self.sun_focus.max(1.0)) * self.sun_intensity.max(0.0);
        let sun_mask = if ground_to_sky_t >= 1.0 { 1.0 } else { 0.0 };

        self.ground_color.lerp(sky, ground_to_sky_t) + Vec3::splat(sun * sun_mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_sun() -> EnvironmentSettings {
        EnvironmentSettings {
            sun_intensity: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_disabled_is_black() {
        let env = EnvironmentSettings::disabled();
        assert_eq!(env.light(Vec3::Y), Vec3::ZERO);
        assert_eq!(env.light(-Vec3::Y), Vec3::ZERO);
    }

    #[test]
    fn test_ground_horizon_zenith() {
        let env = no_sun();
        assert!((env.light(-Vec3::Y) - env.ground_color).length() < 1e-6);
        assert!((env.light(Vec3::Y) - env.zenith_color).length() < 1e-6);
        assert!((env.light(Vec3::X) - env.horizon_color).length() < 1e-6);
    }

    #[test]
    fn test_sun_only_above_horizon() {
        let mut env = EnvironmentSettings {
            sun_direction: Vec3::new(1.0, -0.001, 0.0),
            sun_focus: 1.0,
            sun_intensity: 5.0,
            ..Default::default()
        };
        env.sanitize();
        // Looking straight at a sun that sits below the horizon: ground only.
        let dir = env.sun_direction;
        let ground_mix = env.light(dir);
        assert!(ground_mix.max_element() < 1.5);

        env.sun_direction = Vec3::new(0.0, 1.0, 0.0);
        let overhead = env.light(Vec3::Y);
        assert!((overhead - (env.zenith_color + Vec3::splat(5.0))).length() < 1e-5);
    }

    #[test]
    fn test_raw_sun_values_clamped_on_use() {
        let env = EnvironmentSettings {
            sun_direction: Vec3::X,
            sun_focus: -2.0,
            sun_intensity: -5.0,
            ..Default::default()
        };
        // Looking away from the sun: 0^focus must not blow up.
        for dir in [-Vec3::X, Vec3::Z, Vec3::Y, -Vec3::Y] {
            let c = env.light(dir);
            assert!(c.is_finite() && c.min_element() >= 0.0, "{dir}: {c}");
        }
    }

    #[test]
    fn test_sanitize_clamps() {
        let mut env = EnvironmentSettings {
            sun_focus: 0.2,
            sun_intensity: -3.0,
            sun_direction: Vec3::ZERO,
            ..Default::default()
        };
        env.sanitize();
        assert_eq!(env.sun_focus, 1.0);
        assert_eq!(env.sun_intensity, 0.0);
        assert_eq!(env.sun_direction, Vec3::Y);
    }
}
