//! Final encode to the surface format.

use wgpu::TextureFormat;

use crate::device::Image;
use crate::error::RenderResult;
use crate::graph::{FrameInputs, OutputSpec, PassInputs, PassOutputs, PortName, RenderNode, Resolution};

/// The presented frame.
pub const OUTPUTS: &[OutputSpec] = &[OutputSpec {
    name: "surface",
    format: TextureFormat::Rgba8UnormSrgb,
}];

/// sRGB transfer function for one linear channel in `[0, 1]`.
#[must_use]
pub fn linear_to_srgb(v: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// Encodes linear color to sRGB at full surface resolution.
#[derive(Default)]
pub struct Present;

impl RenderNode for Present {
    fn name(&self) -> &str {
        "present"
    }

    fn inputs(&self) -> &'static [PortName] {
        &["color"]
    }

    fn outputs(&self) -> &'static [OutputSpec] {
        OUTPUTS
    }

    fn resolution(&self) -> Resolution {
        Resolution::FULL
    }

    fn execute(
        &mut self,
        _frame: &FrameInputs<'_>,
        inputs: &PassInputs<'_>,
        outputs: &mut PassOutputs,
    ) -> RenderResult<()> {
        let color = inputs.image("color")?;
        let (w, h) = outputs.extent("surface");
        let out = if color.extent() == (w, h) {
            Image::from_fn(w, h, |x, y| encode(color.get(i64::from(x), i64::from(y))))
        } else {
            let target = Image::new(w, h);
            Image::from_fn(w, h, |x, y| encode(color.sample_bilinear(target.uv(x, y))))
        };
        outputs.write("surface", out)
    }
}

fn encode(t: [f32; 4]) -> [f32; 4] {
    [
        linear_to_srgb(t[0]),
        linear_to_srgb(t[1]),
        linear_to_srgb(t[2]),
        t[3].clamp(0.0, 1.0),
    ]
}
