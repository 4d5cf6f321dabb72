//! Surface materials for the path tracer.

use serde::{Deserialize, Serialize};

use crate::util::Vec3;

/// Special-case behaviour evaluated by the shading step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaterialFlag {
    #[default]
    Standard,
    /// Base color alternates with the emission color on a unit XZ grid.
    CheckerPattern,
    /// Skipped by camera rays, lit normally by scattered rays.
    InvisibleLightSource,
}

/// Diffuse/specular material with optional emission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub base_color: Vec3,
    pub emission_color: Vec3,
    pub emission_strength: f32,
    pub specular_color: Vec3,
    /// 0 = fully diffuse scatter, 1 = perfect mirror (on specular bounces)
    pub smoothness: f32,
    /// Chance that a bounce is specular
    pub specular_probability: f32,
    pub flag: MaterialFlag,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: Vec3::splat(0.8),
            emission_color: Vec3::ZERO,
            emission_strength: 0.0,
            specular_color: Vec3::ONE,
            smoothness: 0.0,
            specular_probability: 0.0,
            flag: MaterialFlag::Standard,
        }
    }
}

impl Material {
    /// Plain diffuse surface.
    pub fn diffuse(base_color: Vec3) -> Self {
        Self {
            base_color,
            ..Self::default()
        }
    }

    /// Light source. `flag` is usually `Standard` or `InvisibleLightSource`.
    pub fn emissive(color: Vec3, strength: f32, flag: MaterialFlag) -> Self {
        Self {
            base_color: Vec3::ZERO,
            emission_color: color,
            emission_strength: strength,
            flag,
            ..Self::default()
        }
    }

    /// Glossy surface with a chance of mirror-like bounces.
    pub fn glossy(base_color: Vec3, smoothness: f32, specular_probability: f32) -> Self {
        Self {
            base_color,
            smoothness,
            specular_probability,
            ..Self::default()
        }
        .sanitized()
    }

    /// Two-tone checkerboard; the second tone lives in `emission_color`.
    pub fn checker(a: Vec3, b: Vec3) -> Self {
        Self {
            base_color: a,
            emission_color: b,
            emission_strength: 0.0,
            flag: MaterialFlag::CheckerPattern,
            ..Self::default()
        }
    }

    /// Clamp probabilities into [0, 1] and strength to non-negative.
    pub fn sanitized(mut self) -> Self {
        self.smoothness = self.smoothness.clamp(0.0, 1.0);
        self.specular_probability = self.specular_probability.clamp(0.0, 1.0);
        self.emission_strength = self.emission_strength.max(0.0);
        self
    }

    /// Radiance emitted by the surface itself.
    #[inline]
    pub fn emitted(&self) -> Vec3 {
        self.emission_color * self.emission_strength
    }
}

/// Resolve a sub-mesh index against a material table.
///
/// Out-of-range indices use the last material. Returns `None` only for an
/// empty table, which scene registration rejects.
#[inline]
pub fn lookup(materials: &[Material], submesh: usize) -> Option<&Material> {
    materials.get(submesh).or_else(|| materials.last())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_clamps_to_last() {
        let table = [Material::diffuse(Vec3::X), Material::diffuse(Vec3::Y)];
        assert_eq!(lookup(&table, 0).map(|m| m.base_color), Some(Vec3::X));
        assert_eq!(lookup(&table, 1).map(|m| m.base_color), Some(Vec3::Y));
        assert_eq!(lookup(&table, 7).map(|m| m.base_color), Some(Vec3::Y));
        assert!(lookup(&[], 0).is_none());
    }

    #[test]
    fn test_sanitized() {
        let m = Material::glossy(Vec3::ONE, 1.5, -0.2);
        assert_eq!(m.smoothness, 1.0);
        assert_eq!(m.specular_probability, 0.0);
    }

    #[test]
    fn test_material_json() {
        let m = Material::checker(Vec3::ZERO, Vec3::ONE);
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("CheckerPattern"));
        let back: Material = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
