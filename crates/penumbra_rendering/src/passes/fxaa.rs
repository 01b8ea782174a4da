//! Fast approximate anti-aliasing.
//!
//! Luma-based edge detection: pixels whose local contrast exceeds the
//! threshold are blended toward the neighbor across the dominant edge, by
//! an amount driven by how much the pixel stands out from its 3×3 average.

use wgpu::TextureFormat;

use crate::device::{Image, Texel};
use crate::error::RenderResult;
use crate::graph::{FrameInputs, OutputSpec, PassInputs, PassOutputs, PortName, RenderNode, Resolution};
use crate::math;

/// Anti-aliased color.
pub const OUTPUTS: &[OutputSpec] = &[OutputSpec {
    name: "color",
    format: TextureFormat::Rgba16Float,
}];

/// Minimum contrast, relative to local maximum luma, treated as an edge.
pub const EDGE_THRESHOLD: f32 = 0.166;

/// Absolute contrast floor for dark regions.
pub const EDGE_THRESHOLD_MIN: f32 = 0.0833;

/// Strength of sub-pixel blending.
pub const SUBPIXEL_QUALITY: f32 = 0.75;

/// Perceptual luma of a linear texel.
#[must_use]
pub fn luma(t: Texel) -> f32 {
    t[0] * 0.299 + t[1] * 0.587 + t[2] * 0.114
}

/// Anti-aliases one image.
#[must_use]
pub fn fxaa(src: &Image) -> Image {
    Image::from_fn(src.width(), src.height(), |x, y| {
        let (x, y) = (i64::from(x), i64::from(y));
        let l = |dx: i64, dy: i64| luma(src.get(x + dx, y + dy));

        let m = l(0, 0);
        let (n, s, e, w) = (l(0, -1), l(0, 1), l(1, 0), l(-1, 0));
        let hi = m.max(n).max(s).max(e).max(w);
        let lo = m.min(n).min(s).min(e).min(w);
        let range = hi - lo;
        let center = src.get(x, y);
        if range < EDGE_THRESHOLD_MIN.max(hi * EDGE_THRESHOLD) {
            return center;
        }

        let (ne, nw, se, sw) = (l(1, -1), l(-1, -1), l(1, 1), l(-1, 1));
        let average = (2.0 * (n + s + e + w) + ne + nw + se + sw) / 12.0;
        let sub = math::smoothstep(0.0, 1.0, math::saturate((average - m).abs() / range));
        let blend = sub * sub * SUBPIXEL_QUALITY;

        let horizontal_edge = (n + s - 2.0 * m).abs() * 2.0
            + (ne + se - 2.0 * e).abs()
            + (nw + sw - 2.0 * w).abs()
            >= (e + w - 2.0 * m).abs() * 2.0
                + (ne + nw - 2.0 * n).abs()
                + (se + sw - 2.0 * s).abs();

        let (dx, dy) = if horizontal_edge {
            if (n - m).abs() >= (s - m).abs() { (0, -1) } else { (0, 1) }
        } else if (w - m).abs() >= (e - m).abs() {
            (-1, 0)
        } else {
            (1, 0)
        };

        let other = src.get(x + dx, y + dy);
        let mut out = center;
        for c in 0..3 {
            out[c] = center[c] + (other[c] - center[c]) * blend;
        }
        out
    })
}

/// FXAA node.
#[derive(Default)]
pub struct FxaaPass;

impl RenderNode for FxaaPass {
    fn name(&self) -> &str {
        "fxaa"
    }

    fn inputs(&self) -> &'static [PortName] {
        &["color"]
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
        outputs.write("color", fxaa(inputs.image("color")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_image_unchanged() {
        let img = Image::filled(6, 6, [0.4, 0.4, 0.4, 1.0]);
        assert_eq!(fxaa(&img), img);
    }

    #[test]
    fn test_isolated_pixel_is_softened() {
        let mut img = Image::filled(5, 5, [0.0, 0.0, 0.0, 1.0]);
        img.set(2, 2, [1.0, 1.0, 1.0, 1.0]);
        let out = fxaa(&img);
        let v = out.get(2, 2)[0];
        assert!(v < 1.0 && v > 0.0);
        assert_eq!(out.get(2, 2)[3], 1.0);
    }

    #[test]
    fn test_luma_weights_sum_to_one() {
        assert!((luma([1.0, 1.0, 1.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
