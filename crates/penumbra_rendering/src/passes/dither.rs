//! Ordered-dither thresholds.
//!
//! Recursive Bayer matrices: each doubling of the tile size interleaves
//! four copies of the smaller matrix, so neighboring pixels get maximally
//! different thresholds.

/// Threshold in `[0, 1)` from a `2^levels`-square Bayer tile.
#[must_use]
pub fn bayer(levels: u32, x: u32, y: u32) -> f32 {
    let mut value = 0u32;
    for i in 0..levels {
        let xb = (x >> i) & 1;
        let yb = (y >> i) & 1;
        value = value * 4 + (((xb ^ yb) << 1) | yb);
    }
    value as f32 / (1u32 << (2 * levels)) as f32
}

/// 4×4 Bayer threshold.
#[must_use]
pub fn bayer4(x: u32, y: u32) -> f32 {
    bayer(2, x, y)
}

/// 16×16 Bayer threshold, as used to offset ray-march start positions.
#[must_use]
pub fn bayer16(x: u32, y: u32) -> f32 {
    bayer(4, x, y)
}
