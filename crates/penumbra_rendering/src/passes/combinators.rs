//! Texture combinators.
//!
//! Small stateless nodes that combine or filter existing textures: the
//! separable blur, resampling, scaling, addition and clamping that turn
//! the low-resolution scattering buffer into something composable.

use wgpu::TextureFormat;

use crate::device::Image;
use crate::error::{RenderError, RenderResult};
use crate::graph::{FrameInputs, OutputSpec, PassInputs, PassOutputs, PortName, RenderNode, Resolution, ScaleSource};
use crate::params::{LiveParameters, ScalarParam};
use crate::uniforms::{BlurUniforms, BLUR_TAPS};

/// Single-input port list.
pub const INPUT: &[PortName] = &["input"];

/// Two-input port list.
pub const AB: &[PortName] = &["a", "b"];

/// Single HDR output.
pub const OUTPUT: &[OutputSpec] = &[OutputSpec {
    name: "output",
    format: TextureFormat::Rgba16Float,
}];

/// Blur direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurAxis {
    /// Along rows.
    Horizontal,
    /// Along columns.
    Vertical,
}

/// Where a scalar factor comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarSource {
    /// Constant value.
    Constant(f32),
    /// Follows a live parameter.
    Live(ScalarParam),
}

impl ScalarSource {
    /// Current value.
    #[must_use]
    pub fn resolve(self, params: &LiveParameters) -> f32 {
        match self {
            Self::Constant(v) => v,
            Self::Live(p) => params.scalar(p),
        }
    }
}

/// One axis of a Gaussian blur; tap spacing follows `denoise_strength`.
pub struct GaussianBlur {
    name: String,
    axis: BlurAxis,
}

impl GaussianBlur {
    /// Blur node along `axis`.
    #[must_use]
    pub fn new(name: impl Into<String>, axis: BlurAxis) -> Self {
        Self {
            name: name.into(),
            axis,
        }
    }

    /// WGSL source of the GPU kernel.
    #[must_use]
    pub fn shader_source() -> &'static str {
        include_str!("../../shaders/gaussian_blur.wgsl")
    }
}

/// Applies one blur axis on the CPU.
#[must_use]
pub fn blur(source: &Image, uniforms: &BlurUniforms) -> Image {
    let [sx, sy] = uniforms.step;
    Image::from_fn(source.width(), source.height(), |x, y| {
        let cx = x as f32 + 0.5;
        let cy = y as f32 + 0.5;
        let mut sum = scaled(source.sample_bilinear_px(cx, cy), uniforms.weight(0));
        for i in 1..=BLUR_TAPS {
            let w = uniforms.weight(i);
            let d = i as f32;
            let plus = source.sample_bilinear_px(cx + sx * d, cy + sy * d);
            let minus = source.sample_bilinear_px(cx - sx * d, cy - sy * d);
            for c in 0..4 {
                sum[c] += (plus[c] + minus[c]) * w;
            }
        }
        sum
    })
}

fn scaled(t: [f32; 4], s: f32) -> [f32; 4] {
    [t[0] * s, t[1] * s, t[2] * s, t[3] * s]
}

impl RenderNode for GaussianBlur {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> &'static [PortName] {
        INPUT
    }

    fn outputs(&self) -> &'static [OutputSpec] {
        OUTPUT
    }

    fn resolution(&self) -> Resolution {
        Resolution::Inherit
    }

    fn execute(
        &mut self,
        frame: &FrameInputs<'_>,
        inputs: &PassInputs<'_>,
        outputs: &mut PassOutputs,
    ) -> RenderResult<()> {
        let source = inputs.image("input")?;
        let uniforms = BlurUniforms::new(self.axis, frame.params.denoise_strength(), source.extent());
        outputs.write("output", blur(source, &uniforms))
    }
}

/// Resamples its input bilinearly to its own resolution.
pub struct SampleAtUv {
    name: String,
    scale: ScaleSource,
}

impl SampleAtUv {
    /// Resampler rendering at `scale` of the surface.
    #[must_use]
    pub fn new(name: impl Into<String>, scale: ScaleSource) -> Self {
        Self {
            name: name.into(),
            scale,
        }
    }
}

impl RenderNode for SampleAtUv {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> &'static [PortName] {
        INPUT
    }

    fn outputs(&self) -> &'static [OutputSpec] {
        OUTPUT
    }

    fn resolution(&self) -> Resolution {
        Resolution::Scaled(self.scale)
    }

    fn execute(
        &mut self,
        _frame: &FrameInputs<'_>,
        inputs: &PassInputs<'_>,
        outputs: &mut PassOutputs,
    ) -> RenderResult<()> {
        let source = inputs.image("input")?;
        let (w, h) = outputs.extent("output");
        let out = Image::from_fn(w, h, |x, y| {
            source.sample_bilinear([(x as f32 + 0.5) / w as f32, (y as f32 + 0.5) / h as f32])
        });
        outputs.write("output", out)
    }
}

/// Multiplies RGB by a factor; alpha passes through.
pub struct Multiply {
    name: String,
    factor: ScalarSource,
}

impl Multiply {
    /// Multiplier node.
    #[must_use]
    pub fn new(name: impl Into<String>, factor: ScalarSource) -> Self {
        Self {
            name: name.into(),
            factor,
        }
    }
}

impl RenderNode for Multiply {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> &'static [PortName] {
        INPUT
    }

    fn outputs(&self) -> &'static [OutputSpec] {
        OUTPUT
    }

    fn resolution(&self) -> Resolution {
        Resolution::Inherit
    }

    fn execute(
        &mut self,
        frame: &FrameInputs<'_>,
        inputs: &PassInputs<'_>,
        outputs: &mut PassOutputs,
    ) -> RenderResult<()> {
        let k = self.factor.resolve(frame.params);
        let mut out = inputs.image("input")?.clone();
        for t in out.texels_mut() {
            t[0] *= k;
            t[1] *= k;
            t[2] *= k;
        }
        outputs.write("output", out)
    }
}

/// Adds `b` to `a` texel by texel; alpha comes from `a`.
pub struct Add {
    name: String,
}

impl Add {
    /// Adder node.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl RenderNode for Add {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> &'static [PortName] {
        AB
    }

    fn outputs(&self) -> &'static [OutputSpec] {
        OUTPUT
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
        let a = inputs.image("a")?;
        let b = inputs.image("b")?;
        if a.extent() != b.extent() {
            return Err(RenderError::BackendExecution {
                pass: String::new(),
                reason: format!(
                    "operand extents differ: {:?} vs {:?}",
                    a.extent(),
                    b.extent()
                ),
            });
        }
        let mut out = a.clone();
        for (t, u) in out.texels_mut().iter_mut().zip(b.texels()) {
            t[0] += u[0];
            t[1] += u[1];
            t[2] += u[2];
        }
        outputs.write("output", out)
    }
}

/// Clamps every channel to `[min, max]`.
pub struct Clamp {
    name: String,
    min: f32,
    max: f32,
}

impl Clamp {
    /// Clamp node.
    #[must_use]
    pub fn new(name: impl Into<String>, min: f32, max: f32) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }
}

impl RenderNode for Clamp {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> &'static [PortName] {
        INPUT
    }

    fn outputs(&self) -> &'static [OutputSpec] {
        OUTPUT
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
        let mut out = inputs.image("input")?.clone();
        for t in out.texels_mut() {
            for c in t.iter_mut() {
                *c = c.clamp(self.min, self.max);
            }
        }
        outputs.write("output", out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spike() -> Image {
        let mut img = Image::new(31, 1);
        img.set(15, 0, [1.0, 1.0, 1.0, 1.0]);
        img
    }

    #[test]
    fn test_blur_preserves_energy() {
        let out = blur(&spike(), &BlurUniforms::new(BlurAxis::Horizontal, 1.0, (31, 1)));
        let total: f32 = out.texels().iter().map(|t| t[0]).sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(out.get(15, 0)[0] > out.get(16, 0)[0]);
        assert!((out.get(14, 0)[0] - out.get(16, 0)[0]).abs() < 1e-6);
    }

    #[test]
    fn test_blur_axis_is_separable() {
        let out = blur(&spike(), &BlurUniforms::new(BlurAxis::Vertical, 1.0, (31, 1)));
        // A one-row image blurred vertically only samples itself.
        assert!((out.get(15, 0)[0] - 1.0).abs() < 1e-5);
        assert!(out.get(14, 0)[0].abs() < 1e-6);
    }

    #[test]
    fn test_zero_strength_is_identity() {
        let img = Image::from_fn(5, 4, |x, y| [x as f32, y as f32, 0.5, 1.0]);
        let out = blur(&img, &BlurUniforms::new(BlurAxis::Horizontal, 0.0, (5, 4)));
        for (a, b) in img.texels().iter().zip(out.texels()) {
            for c in 0..4 {
                assert!((a[c] - b[c]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_scalar_source() {
        let p = LiveParameters::default();
        assert_eq!(ScalarSource::Constant(2.0).resolve(&p), 2.0);
        assert_eq!(ScalarSource::Live(ScalarParam::Intensity).resolve(&p), p.intensity());
    }

    #[test]
    fn test_shader_has_entry_point() {
        assert!(GaussianBlur::shader_source().contains("fn main"));
    }
}
