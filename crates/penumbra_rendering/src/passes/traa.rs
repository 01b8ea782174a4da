//! Temporal reprojection anti-aliasing.
//!
//! Blends the current frame with its own previous output, fetched through
//! the motion vector of the closest-depth pixel in each 3×3 neighborhood.
//! History is clamped to the neighborhood's color range so disoccluded
//! pixels do not ghost. No sub-pixel jitter is applied: a static scene
//! converges to exactly the current frame.

use wgpu::TextureFormat;

use crate::device::{Image, Texel};
use crate::error::RenderResult;
use crate::graph::{FrameInputs, OutputSpec, PassInputs, PassOutputs, PortName, RenderNode, Resolution};

/// Anti-aliased color.
pub const OUTPUTS: &[OutputSpec] = &[OutputSpec {
    name: "color",
    format: TextureFormat::Rgba16Float,
}];

/// Weight of the clamped history.
pub const HISTORY_WEIGHT: f32 = 0.9;

/// Temporal anti-aliasing node.
#[derive(Default)]
pub struct TemporalReprojectionPass {
    history_valid: bool,
}

impl TemporalReprojectionPass {
    /// Node without history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Per-channel min and max over the 3×3 neighborhood of `(x, y)`.
fn neighborhood(image: &Image, x: i64, y: i64) -> (Texel, Texel) {
    let mut lo = [f32::INFINITY; 4];
    let mut hi = [f32::NEG_INFINITY; 4];
    for dy in -1..=1 {
        for dx in -1..=1 {
            let t = image.get(x + dx, y + dy);
            for c in 0..4 {
                lo[c] = lo[c].min(t[c]);
                hi[c] = hi[c].max(t[c]);
            }
        }
    }
    (lo, hi)
}

/// Offset of the closest-depth pixel in the 3×3 neighborhood.
fn closest_depth(depth: &Image, x: i64, y: i64) -> (i64, i64) {
    let mut best = (0, 0);
    let mut best_depth = f32::INFINITY;
    for dy in -1..=1 {
        for dx in -1..=1 {
            let d = depth.get(x + dx, y + dy)[0];
            if d < best_depth {
                best_depth = d;
                best = (dx, dy);
            }
        }
    }
    best
}

impl RenderNode for TemporalReprojectionPass {
    fn name(&self) -> &str {
        "traa"
    }

    fn inputs(&self) -> &'static [PortName] {
        &["color", "depth", "velocity"]
    }

    fn outputs(&self) -> &'static [OutputSpec] {
        OUTPUTS
    }

    fn resolution(&self) -> Resolution {
        Resolution::Inherit
    }

    fn execute(
        &mut self,
        _frame: &FrameInputs<'_>,
        inputs: &PassInputs<'_>,
        outputs: &mut PassOutputs,
    ) -> RenderResult<()> {
        let color = inputs.image("color")?;
        let depth = inputs.image("depth")?;
        let velocity = inputs.image("velocity")?;
        let history = inputs.previous("color")?;
        let (w, h) = color.extent();

        let out = if self.history_valid {
            Image::from_fn(w, h, |x, y| {
                let (xi, yi) = (i64::from(x), i64::from(y));
                let current = color.get(xi, yi);
                let (dx, dy) = closest_depth(depth, xi, yi);
                let v = velocity.sample_nearest(color.uv(
                    (xi + dx).clamp(0, i64::from(w) - 1) as u32,
                    (yi + dy).clamp(0, i64::from(h) - 1) as u32,
                ));
                let px = x as f32 + 0.5 - v[0] * w as f32;
                let py = y as f32 + 0.5 - v[1] * h as f32;
                if !(0.0..=w as f32).contains(&px) || !(0.0..=h as f32).contains(&py) {
                    return current;
                }

                let (lo, hi) = neighborhood(color, xi, yi);
                let previous = history.sample_bilinear_px(px, py);
                let mut blended = current;
                for c in 0..4 {
                    let clamped = previous[c].clamp(lo[c], hi[c]);
                    blended[c] = current[c] + (clamped - current[c]) * HISTORY_WEIGHT;
                }
                blended
            })
        } else {
            color.clone()
        };

        self.history_valid = true;
        outputs.write("color", out)
    }

    fn on_reallocated(&mut self) {
        if self.history_valid {
            tracing::warn!(pass = "traa", "temporal history reset");
        }
        self.history_valid = false;
    }
}
