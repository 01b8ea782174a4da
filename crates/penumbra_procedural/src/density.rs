//! # Density Field
//!
//! A static `S×S×S` grid of 8-bit scattering-medium density.
//!
//! ## Layout
//!
//! Texels are stored x-fastest, then y, then z, one byte each, which is
//! exactly the upload layout of an `R8Unorm` 3D texture. The value 128 is
//! the midpoint (zero perturbation).
//!
//! ## Sampling
//!
//! `DensityField::sample` mirrors GPU linear filtering with repeat
//! addressing: texel centers sit at `(i + 0.5) / S`, and every axis wraps,
//! so `sample(c) == sample(c + 1)` for any coordinate.

use std::fmt;

use crate::error::{FieldError, FieldResult};
use crate::noise::{FieldSeed, ImprovedNoise, MAX_PERIOD};

/// Smallest accepted field edge length.
pub const MIN_FIELD_SIZE: u32 = 2;

/// Largest accepted field edge length (16 MiB of texels).
pub const MAX_FIELD_SIZE: u32 = 256;

/// Field edge length used when none is configured.
pub const DEFAULT_FIELD_SIZE: u32 = 128;

/// Stored value for zero perturbation.
pub const FIELD_MIDPOINT: u8 = 128;

/// Validates a field edge length.
///
/// # Errors
///
/// Returns `FieldError::InvalidSize` unless `size` is a power of two in
/// `MIN_FIELD_SIZE..=MAX_FIELD_SIZE`.
pub fn validate_size(size: u32) -> FieldResult<()> {
    if size.is_power_of_two() && (MIN_FIELD_SIZE..=MAX_FIELD_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(FieldError::InvalidSize {
            size,
            min: MIN_FIELD_SIZE,
            max: MAX_FIELD_SIZE,
        })
    }
}

/// Maps a signed noise value onto the stored byte range around the midpoint.
#[inline]
#[must_use]
pub fn encode_density(value: f64) -> u8 {
    (f64::from(FIELD_MIDPOINT) + 128.0 * value).clamp(0.0, 255.0) as u8
}

/// Immutable 3D density grid.
#[derive(Clone, PartialEq, Eq)]
pub struct DensityField {
    size: u32,
    texels: Vec<u8>,
}

impl DensityField {
    /// Wraps existing texel data.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is invalid or `texels.len() != size³`.
    pub fn from_texels(size: u32, texels: Vec<u8>) -> FieldResult<Self> {
        validate_size(size)?;
        let expected = (size as usize).pow(3);
        if texels.len() != expected {
            return Err(FieldError::DataLength {
                expected,
                actual: texels.len(),
            });
        }
        Ok(Self { size, texels })
    }

    /// Edge length `S`.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Raw texels in upload order.
    #[must_use]
    pub fn texels(&self) -> &[u8] {
        &self.texels
    }

    /// Storage footprint in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.texels.len()
    }

    /// Fetches one texel; coordinates wrap on every axis.
    #[must_use]
    pub fn texel(&self, x: i64, y: i64, z: i64) -> u8 {
        let s = i64::from(self.size);
        let (x, y, z) = (x.rem_euclid(s), y.rem_euclid(s), z.rem_euclid(s));
        self.texels[((z * s + y) * s + x) as usize]
    }

    /// Trilinearly filtered sample at normalized coordinates, in `[0, 1]`.
    #[must_use]
    pub fn sample(&self, uvw: [f32; 3]) -> f32 {
        let s = self.size as f32;
        let split = |c: f32| -> (i64, f32) {
            let t = c * s - 0.5;
            let base = t.floor();
            (base as i64, t - base)
        };
        let (x0, fx) = split(uvw[0]);
        let (y0, fy) = split(uvw[1]);
        let (z0, fz) = split(uvw[2]);

        let t = |dx: i64, dy: i64, dz: i64| f32::from(self.texel(x0 + dx, y0 + dy, z0 + dz));
        let mix = |a: f32, b: f32, f: f32| a + (b - a) * f;

        let c00 = mix(t(0, 0, 0), t(1, 0, 0), fx);
        let c10 = mix(t(0, 1, 0), t(1, 1, 0), fx);
        let c01 = mix(t(0, 0, 1), t(1, 0, 1), fx);
        let c11 = mix(t(0, 1, 1), t(1, 1, 1), fx);

        let c0 = mix(c00, c10, fy);
        let c1 = mix(c01, c11, fy);

        mix(c0, c1, fz) / 255.0
    }

    /// Mean stored value, normalized to `[0, 1]`.
    #[must_use]
    pub fn mean(&self) -> f32 {
        let sum: u64 = self.texels.iter().map(|&v| u64::from(v)).sum();
        (sum as f64 / self.texels.len() as f64 / 255.0) as f32
    }
}

impl fmt::Debug for DensityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DensityField")
            .field("size", &self.size)
            .field("bytes", &self.texels.len())
            .finish()
    }
}

/// Builds density fields from layered coherent noise.
///
/// # Example
///
/// ```rust
/// use penumbra_procedural::{FieldSeed, NoiseFieldSynthesizer};
///
/// let synth = NoiseFieldSynthesizer::new(FieldSeed::new(7));
/// let field = synth.build(16, &[10.0], 5.0)?;
/// assert_eq!(field.byte_len(), 16 * 16 * 16);
/// # Ok::<(), penumbra_procedural::FieldError>(())
/// ```
pub struct NoiseFieldSynthesizer {
    seed: FieldSeed,
    noise: ImprovedNoise,
}

impl NoiseFieldSynthesizer {
    /// Creates a synthesizer whose permutation table derives from `seed`.
    #[must_use]
    pub fn new(seed: FieldSeed) -> Self {
        Self {
            seed,
            noise: ImprovedNoise::new(seed),
        }
    }

    /// The seed this synthesizer was built from.
    #[must_use]
    pub fn seed(&self) -> FieldSeed {
        self.seed
    }

    /// Synthesizes a `size³` field.
    ///
    /// Cell `(x, y, z)` evaluates noise at `(x/S, y/S, z/S) × repeat_factor
    /// × scale` for every octave scale; octaves are blended with halving
    /// amplitude and normalized. When `repeat_factor × scale` is a whole
    /// number the lattice wraps with that period and the field tiles.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid size, an empty octave list, or a
    /// non-positive / non-finite scale or repeat factor.
    pub fn build(
        &self,
        size: u32,
        octave_scales: &[f64],
        repeat_factor: f64,
    ) -> FieldResult<DensityField> {
        validate_size(size)?;
        if octave_scales.is_empty() {
            return Err(FieldError::EmptyOctaves);
        }
        if let Some(&bad) = octave_scales.iter().find(|s| !s.is_finite() || **s <= 0.0) {
            return Err(FieldError::InvalidOctaveScale(bad));
        }
        if !repeat_factor.is_finite() || repeat_factor <= 0.0 {
            return Err(FieldError::InvalidRepeatFactor(repeat_factor));
        }

        let octaves: Vec<(f64, u32, f64)> = octave_scales
            .iter()
            .enumerate()
            .map(|(i, &scale)| {
                let amplitude = 0.5_f64.powi(i as i32);
                (scale, lattice_period(repeat_factor * scale), amplitude)
            })
            .collect();
        let total_amplitude: f64 = octaves.iter().map(|o| o.2).sum();

        let edge = f64::from(size);
        let mut texels = Vec::with_capacity((size as usize).pow(3));

        for z in 0..size {
            let nz = f64::from(z) / edge * repeat_factor;
            for y in 0..size {
                let ny = f64::from(y) / edge * repeat_factor;
                for x in 0..size {
                    let nx = f64::from(x) / edge * repeat_factor;

                    let mut value = 0.0;
                    for &(scale, period, amplitude) in &octaves {
                        value += amplitude
                            * self
                                .noise
                                .sample_periodic(nx * scale, ny * scale, nz * scale, period);
                    }

                    texels.push(encode_density(value / total_amplitude));
                }
            }
        }

        let field = DensityField::from_texels(size, texels)?;
        tracing::debug!(
            size,
            octaves = octaves.len(),
            seed = self.seed.value(),
            mean = field.mean(),
            "density field synthesized"
        );
        Ok(field)
    }
}

/// Lattice period for a whole-number extent, or the table period otherwise.
fn lattice_period(extent: f64) -> u32 {
    let rounded = extent.round();
    if (extent - rounded).abs() < 1e-6 && (1.0..=f64::from(MAX_PERIOD)).contains(&rounded) {
        rounded as u32
    } else {
        MAX_PERIOD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(size: u32) -> DensityField {
        NoiseFieldSynthesizer::new(FieldSeed::new(99))
            .build(size, &[10.0], 5.0)
            .expect("valid field")
    }

    #[test]
    fn test_rejects_bad_sizes() {
        let synth = NoiseFieldSynthesizer::new(FieldSeed::default());
        for size in [0, 1, 3, 24, 512] {
            assert!(
                matches!(synth.build(size, &[10.0], 5.0), Err(FieldError::InvalidSize { .. })),
                "size {size} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_bad_octaves() {
        let synth = NoiseFieldSynthesizer::new(FieldSeed::default());
        assert_eq!(synth.build(8, &[], 5.0).unwrap_err(), FieldError::EmptyOctaves);
        assert_eq!(
            synth.build(8, &[10.0, -1.0], 5.0).unwrap_err(),
            FieldError::InvalidOctaveScale(-1.0)
        );
        assert!(matches!(
            synth.build(8, &[10.0], f64::NAN),
            Err(FieldError::InvalidRepeatFactor(_))
        ));
    }

    #[test]
    fn test_texel_wraps() {
        let f = field(8);
        assert_eq!(f.texel(0, 0, 0), f.texel(8, -8, 16));
        assert_eq!(f.texel(3, 5, 7), f.texel(-5, 13, -1));
    }

    #[test]
    fn test_sample_at_texel_center_is_exact() {
        let f = field(8);
        let center = |i: u32| (i as f32 + 0.5) / 8.0;
        let expected = f32::from(f.texel(2, 3, 4)) / 255.0;
        let got = f.sample([center(2), center(3), center(4)]);
        assert!((got - expected).abs() < 1e-6);
    }

    #[test]
    fn test_values_span_both_sides_of_midpoint() {
        let f = field(16);
        let below = f.texels().iter().filter(|&&v| v < FIELD_MIDPOINT).count();
        let above = f.texels().iter().filter(|&&v| v > FIELD_MIDPOINT).count();
        assert!(below > 0 && above > 0);
        assert!((f.mean() - 0.5).abs() < 0.1);
    }

    #[test]
    fn test_single_octave_reads_the_seed_table() {
        let seed = FieldSeed::new(99);
        let f = field(8);
        let noise = ImprovedNoise::new(seed);
        let period = lattice_period(5.0 * 10.0);
        for (x, y, z) in [(0u32, 0u32, 0u32), (3, 5, 7), (7, 1, 4)] {
            let at = |c: u32| f64::from(c) / 8.0 * 5.0 * 10.0;
            let value = noise.sample_periodic(at(x), at(y), at(z), period);
            assert_eq!(
                f.texel(i64::from(x), i64::from(y), i64::from(z)),
                encode_density(value)
            );
        }
    }

    #[test]
    fn test_from_texels_checks_length() {
        assert!(matches!(
            DensityField::from_texels(4, vec![0; 10]),
            Err(FieldError::DataLength { expected: 64, actual: 10 })
        ));
    }

    #[test]
    fn test_lattice_period() {
        assert_eq!(lattice_period(50.0), 50);
        assert_eq!(lattice_period(2.5), MAX_PERIOD);
        assert_eq!(lattice_period(1000.0), MAX_PERIOD);
    }

    #[test]
    fn test_encode_density() {
        assert_eq!(encode_density(0.0), FIELD_MIDPOINT);
        assert_eq!(encode_density(1.5), 255);
        assert_eq!(encode_density(-2.0), 0);
    }
}
