//! Deterministic 2D value noise and fractal Brownian motion.
//!
//! [`NoiseField::sample`] hashes the four integer lattice points around
//! `(x, y)` and blends them with smoothstep easing, so the field is
//! continuous while remaining a pure function of its inputs. The hash
//! constants are instance parameters, never shared global state.
//!
//! Same inputs always produce bit-identical outputs on every platform: the
//! hash is pure wrapping integer arithmetic and the interpolation is a fixed
//! sequence of f64 operations.

use serde::{Deserialize, Serialize};

/// Value-noise generator with fixed hash parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseField {
    /// Lattice row stride `K` in `floor(x) + floor(y) * K + seed`.
    stride: i32,
    /// Multiplier applied in each mixing round.
    multiplier: u32,
}

/// Octave configuration for [`NoiseField::fbm`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fbm {
    /// Number of octaves summed.
    pub octaves: u32,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves. The first octave has amplitude `gain`.
    pub gain: f64,
    /// Seed increment between octaves (`seed + i * seed_step`).
    pub seed_step: i32,
}

impl Default for Fbm {
    fn default() -> Self {
        Self {
            octaves: 4,
            lacunarity: 2.0,
            gain: 0.5,
            seed_step: 1,
        }
    }
}

impl Fbm {
    /// Convenience constructor with the standard gain of 0.5.
    pub fn new(octaves: u32, lacunarity: f64, seed_step: i32) -> Self {
        Self {
            octaves,
            lacunarity,
            gain: 0.5,
            seed_step,
        }
    }

    /// Upper bound of the summed amplitudes, `sum(gain^(i+1))`.
    pub fn amplitude_sum(&self) -> f64 {
        (1..=self.octaves as i32).map(|i| self.gain.powi(i)).sum()
    }
}

impl NoiseField {
    /// Lattice stride used by the flow renderers.
    pub const DEFAULT_STRIDE: i32 = 57;
    /// Hash multiplier shared by every renderer.
    pub const DEFAULT_MULTIPLIER: u32 = 0x045d_9f3b;

    /// Creates a field with the default stride and multiplier.
    pub fn new() -> Self {
        Self {
            stride: Self::DEFAULT_STRIDE,
            multiplier: Self::DEFAULT_MULTIPLIER,
        }
    }

    /// Creates a field with a custom lattice stride.
    ///
    /// The stride should be a large odd (ideally prime) constant so that
    /// neighbouring rows do not collide after a short period.
    pub fn with_stride(stride: i32) -> Self {
        Self {
            stride,
            multiplier: Self::DEFAULT_MULTIPLIER,
        }
    }

    pub fn stride(&self) -> i32 {
        self.stride
    }

    /// Integer hash normalised to [0, 1): two multiply-xor-shift rounds, a
    /// final xor-shift, then the low 16 bits divided by 2^16.
    fn hash(&self, n: i32) -> f64 {
        let mut h = n as u32;
        h = ((h >> 16) ^ h).wrapping_mul(self.multiplier);
        h = ((h >> 16) ^ h).wrapping_mul(self.multiplier);
        h ^= h >> 16;
        (h & 0xffff) as f64 / 65_536.0
    }

    fn lattice(&self, ix: i32, iy: i32, seed: i32) -> f64 {
        self.hash(ix.wrapping_add(iy.wrapping_mul(self.stride)).wrapping_add(seed))
    }

    /// Samples the field at `(x, y)` for `seed`. Output is in [0, 1).
    pub fn sample(&self, x: f64, y: f64, seed: i32) -> f64 {
        let fx0 = x.floor();
        let fy0 = y.floor();
        let ix = lattice_coord(fx0);
        let iy = lattice_coord(fy0);
        let sx = smoothstep(x - fx0);
        let sy = smoothstep(y - fy0);

        let n00 = self.lattice(ix, iy, seed);
        let n10 = self.lattice(ix.wrapping_add(1), iy, seed);
        let n01 = self.lattice(ix, iy.wrapping_add(1), seed);
        let n11 = self.lattice(ix.wrapping_add(1), iy.wrapping_add(1), seed);

        let top = n00 * (1.0 - sx) + n10 * sx;
        let bottom = n01 * (1.0 - sx) + n11 * sx;
        top * (1.0 - sy) + bottom * sy
    }

    /// Fractal sum of `octaves` samples.
    ///
    /// Octave `i` is sampled at `(x, y) * lacunarity^i` with seed
    /// `seed + i * seed_step` and weighted by `gain^(i+1)`, so with the usual
    /// gain of 0.5 the result stays in [0, 1). The generator does not clamp.
    pub fn fbm(&self, x: f64, y: f64, seed: i32, params: &Fbm) -> f64 {
        self.fbm_shifted(x, y, (0.0, 0.0), seed, params)
    }

    /// Like [`fbm`](Self::fbm), but every octave is additionally translated
    /// by the unscaled `shift`, which is how the animated renderers scroll time.
    pub fn fbm_shifted(&self, x: f64, y: f64, shift: (f64, f64), seed: i32, params: &Fbm) -> f64 {
        let mut value = 0.0;
        let mut amplitude = params.gain;
        let mut frequency = 1.0;
        let mut octave_seed = seed;
        for _ in 0..params.octaves {
            value += amplitude
                * self.sample(x * frequency + shift.0, y * frequency + shift.1, octave_seed);
            amplitude *= params.gain;
            frequency *= params.lacunarity;
            octave_seed = octave_seed.wrapping_add(params.seed_step);
        }
        value
    }
}

impl Default for NoiseField {
    fn default() -> Self {
        Self::new()
    }
}

/// `t² (3 − 2t)`.
fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Floors to a lattice index, wrapping far-away coordinates into i32.
fn lattice_coord(floored: f64) -> i32 {
    if floored.is_finite() {
        (floored as i64) as i32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_is_bit_identical_across_calls() {
        let noise = NoiseField::new();
        for &(x, y, seed) in &[(0.3, 0.7, 0), (12.25, -4.5, 42), (-1000.1, 77.7, 3)] {
            let a = noise.sample(x, y, seed);
            let b = noise.sample(x, y, seed);
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn sample_at_lattice_point_equals_hash() {
        let noise = NoiseField::new();
        let v = noise.sample(3.0, 5.0, 7);
        assert_eq!(v.to_bits(), noise.lattice(3, 5, 7).to_bits());
    }

    #[test]
    fn sample_is_continuous_across_cell_boundary() {
        let noise = NoiseField::new();
        let left = noise.sample(4.0 - 1e-9, 2.5, 0);
        let right = noise.sample(4.0 + 1e-9, 2.5, 0);
        assert!((left - right).abs() < 1e-6, "jump at boundary: {left} vs {right}");
    }

    #[test]
    fn different_seeds_produce_different_fields() {
        let noise = NoiseField::new();
        let differing = (0..64)
            .filter(|&i| {
                let x = i as f64 * 0.37;
                noise.sample(x, 1.3, 0) != noise.sample(x, 1.3, 43)
            })
            .count();
        assert!(differing > 48, "only {differing}/64 samples differ");
    }

    #[test]
    fn stride_is_an_instance_parameter() {
        let a = NoiseField::with_stride(57);
        let b = NoiseField::with_stride(131);
        assert_eq!(a.stride(), 57);
        assert_ne!(a.sample(0.5, 1.5, 0), b.sample(0.5, 1.5, 0));
    }

    #[test]
    fn fbm_with_one_octave_is_scaled_sample() {
        let noise = NoiseField::new();
        let params = Fbm::new(1, 2.0, 0);
        let v = noise.fbm(1.7, 2.9, 5, &params);
        assert!((v - 0.5 * noise.sample(1.7, 2.9, 5)).abs() < 1e-15);
    }

    #[test]
    fn fbm_is_deterministic() {
        let noise = NoiseField::with_stride(131);
        let params = Fbm::new(5, 2.1, 0);
        let a = noise.fbm(0.12, 0.34, 42, &params);
        let b = noise.fbm(0.12, 0.34, 42, &params);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn fbm_shift_translates_every_octave_without_scaling() {
        let field = NoiseField::new();
        let params = Fbm::new(1, 2.0, 43);
        let shifted = field.fbm_shifted(1.25, 2.5, (0.5, 0.75), 0, &params);
        assert_eq!(shifted, 0.5 * field.sample(1.75, 3.25, 0));
        assert_eq!(
            field.fbm_shifted(3.0, 4.0, (0.0, 0.0), 9, &params),
            field.fbm(3.0, 4.0, 9, &params)
        );
    }

    #[test]
    fn amplitude_sum_for_four_octaves() {
        let params = Fbm::default();
        assert!((params.amplitude_sum() - 0.9375).abs() < 1e-12);
    }

    #[test]
    fn non_finite_coordinates_do_not_panic() {
        let noise = NoiseField::new();
        let _ = noise.sample(f64::INFINITY, 0.0, 0);
        let _ = noise.sample(1e300, -1e300, 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn sample_in_half_open_unit_interval(
                x in -1e6_f64..1e6,
                y in -1e6_f64..1e6,
                seed in any::<i32>(),
            ) {
                let v = NoiseField::new().sample(x, y, seed);
                prop_assert!((0.0..1.0).contains(&v), "sample = {v}");
            }

            #[test]
            fn sample_deterministic_for_any_input(
                x in -1e4_f64..1e4,
                y in -1e4_f64..1e4,
                seed in any::<i32>(),
                stride in 1_i32..100_000,
            ) {
                let noise = NoiseField::with_stride(stride);
                prop_assert_eq!(
                    noise.sample(x, y, seed).to_bits(),
                    noise.sample(x, y, seed).to_bits()
                );
            }

            #[test]
            fn fbm_bounded_by_amplitude_sum(
                x in -1e3_f64..1e3,
                y in -1e3_f64..1e3,
                octaves in 1_u32..6,
                seed_step in 0_i32..64,
            ) {
                let params = Fbm::new(octaves, 2.0, seed_step);
                let v = NoiseField::new().fbm(x, y, 0, &params);
                prop_assert!(v >= 0.0 && v < params.amplitude_sum() + 1e-12, "fbm = {v}");
                prop_assert!(v < 1.0);
            }
        }
    }
}
