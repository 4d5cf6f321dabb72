//! Per-pixel random number stream.
//!
//! PCG-style step: an LCG advance followed by an xorshift-multiply output
//! permutation. One `PixelRng` is seeded per pixel per frame and every
//! stochastic decision for that pixel draws from it in a fixed order, so a
//! (pixel, frame) pair always replays the same sequence.

use crate::util::{Vec2, Vec3};

/// Multiplier mixing the frame index into the seed.
pub const FRAME_SEED_MUL: u32 = 719_393;

const LCG_MUL: u32 = 747_796_405;
const LCG_INC: u32 = 2_891_336_453;

/// Evolving random state owned by a single pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRng {
    state: u32,
}

impl PixelRng {
    /// Seed from a linear pixel index and a frame index.
    #[inline]
    pub fn new(pixel_index: u32, frame_index: u32) -> Self {
        Self {
            state: pixel_index.wrapping_add(frame_index.wrapping_mul(FRAME_SEED_MUL)),
        }
    }

    #[inline]
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Advance and return the next 32-bit value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(LCG_MUL).wrapping_add(LCG_INC);
        let s = self.state;
        let word = ((s >> ((s >> 28) + 4)) ^ s).wrapping_mul(277_803_737);
        (word >> 22) ^ word
    }

    /// Uniform value in [0, 1].
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() as f64 / u32::MAX as f64) as f32
    }

    /// Standard normal sample (Box-Muller, cosine branch).
    #[inline]
    pub fn normal(&mut self) -> f32 {
        let theta = std::f32::consts::TAU * self.next_f32();
        // Guard ln(0) when the draw lands exactly on zero.
        let u = self.next_f32().max(f32::MIN_POSITIVE);
        let rho = (-2.0 * u.ln()).sqrt();
        rho * theta.cos()
    }

    /// Uniformly distributed unit vector.
    #[inline]
    pub fn direction(&mut self) -> Vec3 {
        let x = self.normal();
        let y = self.normal();
        let z = self.normal();
        Vec3::new(x, y, z).normalize_or(Vec3::Y)
    }

    /// Uniform point in the unit disk.
    #[inline]
    pub fn point_in_disk(&mut self) -> Vec2 {
        let angle = std::f32::consts::TAU * self.next_f32();
        let r = self.next_f32().sqrt();
        Vec2::new(angle.cos(), angle.sin()) * r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_formula() {
        assert_eq!(PixelRng::new(5, 0).state(), 5);
        assert_eq!(PixelRng::new(5, 2).state(), 5 + 2 * FRAME_SEED_MUL);
        // Wraps rather than overflowing
        let _ = PixelRng::new(u32::MAX, u32::MAX);
    }

    #[test]
    fn test_reproducible_sequence() {
        let mut a = PixelRng::new(1234, 7);
        let mut b = PixelRng::new(1234, 7);
        for _ in 0..1000 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
        let mut c = PixelRng::new(1235, 7);
        let mut d = PixelRng::new(1234, 7);
        assert_ne!(c.next_u32(), d.next_u32());
    }

    #[test]
    fn test_uniform_range_and_mean() {
        let mut rng = PixelRng::new(42, 0);
        let n = 20_000;
        let mut sum = 0.0f64;
        for _ in 0..n {
            let v = rng.next_f32();
            assert!((0.0..=1.0).contains(&v));
            sum += v as f64;
        }
        let mean = sum / n as f64;
        assert!((mean - 0.5).abs() < 0.02, "mean {mean}");
    }

    #[test]
    fn test_disk_and_direction() {
        let mut rng = PixelRng::new(9, 3);
        for _ in 0..1000 {
            assert!(rng.point_in_disk().length() <= 1.0 + 1e-6);
            assert!((rng.direction().length() - 1.0).abs() < 1e-4);
        }
    }
}
