//! # Improved Gradient Noise
//!
//! Deterministic 3D coherent noise on an integer lattice.
//!
//! ## Why improved noise?
//!
//! - Quintic fade curve: continuous second derivative, no grid creases
//! - 12 edge gradients: no axis-aligned bias
//! - Trivially periodic: wrap the lattice indices and the noise tiles
//!
//! ## Determinism Guarantee
//!
//! Given the same `FieldSeed`, this implementation produces **exactly**
//! the same values on any platform, any time.

/// Largest lattice period the permutation table can express.
pub const MAX_PERIOD: u32 = 256;

/// Seed for deterministic field generation.
///
/// All procedural density derives from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldSeed(u64);

impl FieldSeed {
    /// Creates a new field seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl Default for FieldSeed {
    fn default() -> Self {
        Self(0x5EED_F00D_0DDB_A115)
    }
}

/// Pre-computed permutation table.
///
/// Computed once from the seed and reused for every sample.
struct PermutationTable {
    /// 512-entry permutation table (256 entries, doubled for overflow handling).
    perm: [u8; 512],
}

impl PermutationTable {
    fn new(seed: FieldSeed) -> Self {
        let mut perm = [0u8; 512];

        for (i, slot) in perm.iter_mut().take(256).enumerate() {
            *slot = i as u8;
        }

        // Fisher-Yates with xorshift64; a zero state would never advance
        let mut rng_state = seed.value() | 1;
        for i in (1..256).rev() {
            rng_state ^= rng_state << 13;
            rng_state ^= rng_state >> 7;
            rng_state ^= rng_state << 17;

            let j = (rng_state % (i as u64 + 1)) as usize;
            perm.swap(i, j);
        }

        for i in 0..256 {
            perm[256 + i] = perm[i];
        }

        Self { perm }
    }

    /// Hashes a lattice corner. Indices must already be wrapped to `0..256`.
    #[inline]
    fn hash(&self, x: usize, y: usize, z: usize) -> u8 {
        let a = self.perm[x] as usize + y;
        let b = self.perm[a] as usize + z;
        self.perm[b]
    }
}

/// 3D improved gradient noise generator.
///
/// Produces smooth, continuous values roughly in `[-1, 1]`.
///
/// # Example
///
/// ```rust
/// use penumbra_procedural::{FieldSeed, ImprovedNoise};
///
/// let noise = ImprovedNoise::new(FieldSeed::new(42));
/// let value = noise.sample(1.5, 2.25, 3.75);
/// assert!((-1.1..=1.1).contains(&value));
///
/// // Period 4: the pattern repeats every 4 lattice units
/// let a = noise.sample_periodic(0.3, 0.6, 0.9, 4);
/// let b = noise.sample_periodic(4.3, 0.6, 0.9, 4);
/// assert!((a - b).abs() < 1e-9);
/// ```
pub struct ImprovedNoise {
    perm_table: PermutationTable,
}

impl ImprovedNoise {
    /// Creates a new noise generator from a seed.
    #[must_use]
    pub fn new(seed: FieldSeed) -> Self {
        Self {
            perm_table: PermutationTable::new(seed),
        }
    }

    /// Samples non-periodic noise (the lattice repeats every 256 units).
    #[must_use]
    pub fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        self.sample_periodic(x, y, z, MAX_PERIOD)
    }

    /// Samples noise whose lattice wraps every `period` units on all axes.
    ///
    /// `period` is clamped to `1..=256`.
    #[must_use]
    pub fn sample_periodic(&self, x: f64, y: f64, z: f64, period: u32) -> f64 {
        let period = i64::from(period.clamp(1, MAX_PERIOD));

        let (xf, yf, zf) = (x.floor(), y.floor(), z.floor());
        let (x, y, z) = (x - xf, y - yf, z - zf);

        let wrap = |cell: f64| -> (usize, usize) {
            let c0 = (cell as i64).rem_euclid(period);
            let c1 = (c0 + 1) % period;
            (c0 as usize, c1 as usize)
        };
        let (x0, x1) = wrap(xf);
        let (y0, y1) = wrap(yf);
        let (z0, z1) = wrap(zf);

        let u = fade(x);
        let v = fade(y);
        let w = fade(z);

        let t = &self.perm_table;
        let n000 = grad(t.hash(x0, y0, z0), x, y, z);
        let n100 = grad(t.hash(x1, y0, z0), x - 1.0, y, z);
        let n010 = grad(t.hash(x0, y1, z0), x, y - 1.0, z);
        let n110 = grad(t.hash(x1, y1, z0), x - 1.0, y - 1.0, z);
        let n001 = grad(t.hash(x0, y0, z1), x, y, z - 1.0);
        let n101 = grad(t.hash(x1, y0, z1), x - 1.0, y, z - 1.0);
        let n011 = grad(t.hash(x0, y1, z1), x, y - 1.0, z - 1.0);
        let n111 = grad(t.hash(x1, y1, z1), x - 1.0, y - 1.0, z - 1.0);

        lerp(
            w,
            lerp(v, lerp(u, n000, n100), lerp(u, n010, n110)),
            lerp(v, lerp(u, n001, n101), lerp(u, n011, n111)),
        )
    }
}

/// Quintic fade curve `6t^5 - 15t^4 + 10t^3`.
#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

/// Dot product with one of the 12 cube-edge gradients.
#[inline]
fn grad(hash: u8, x: f64, y: f64, z: f64) -> f64 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}
