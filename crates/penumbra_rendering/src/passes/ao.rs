//! Screen-space ambient occlusion.
//!
//! Reconstructs each pixel's position from the pre-pass depth, then tests
//! `ao_samples` points on a spiral through the normal-oriented hemisphere
//! against the depth buffer. The spiral is rotated per pixel by a 4×4
//! Bayer threshold. A sample occludes when it lies behind the stored
//! surface by more than a small bias and less than `ao_thickness`; closer
//! samples weigh more. With temporal filtering the result is blended with
//! the reprojected previous frame.

use wgpu::TextureFormat;

use crate::device::Image;
use crate::error::RenderResult;
use crate::graph::{FrameInputs, OutputSpec, PassInputs, PassOutputs, PortName, RenderNode, Resolution, ScaleSource};
use crate::math::{self, Vec3};
use crate::params::{LiveParameters, ScaleParam};

use super::dither::bayer4;
use super::geometry::decode_normal;

/// Occlusion output: 1 = fully open, 0 = fully occluded.
pub const OUTPUTS: &[OutputSpec] = &[OutputSpec {
    name: "ao",
    format: TextureFormat::R16Float,
}];

/// Depth difference below which a sample never occludes.
pub const DEPTH_BIAS: f32 = 0.01;

/// Weight of the reprojected history.
pub const HISTORY_WEIGHT: f32 = 0.8;

const GOLDEN_ANGLE: f32 = 2.399_963_2;

/// Ambient-occlusion node.
pub struct AmbientOcclusionPass {
    temporal: bool,
    history_valid: bool,
}

impl AmbientOcclusionPass {
    /// Node with or without temporal filtering.
    #[must_use]
    pub fn new(temporal: bool) -> Self {
        Self {
            temporal,
            history_valid: false,
        }
    }
}

/// Any unit vector perpendicular to `n`.
fn tangent(n: Vec3) -> Vec3 {
    let helper = if n[1].abs() < 0.99 { [0.0, 1.0, 0.0] } else { [1.0, 0.0, 0.0] };
    math::normalize(math::cross(helper, n))
}

/// Radial position of sample `i` of `samples`, at the center of its
/// stratum so every sample lies strictly inside the radius.
#[must_use]
pub fn sample_ratio(i: u32, samples: u32) -> f32 {
    (i as f32 + 0.5) / samples as f32
}

/// Weight of a sample at `ratio` (0 = center, 1 = radius).
#[must_use]
pub fn distance_weight(ratio: f32, params: &LiveParameters) -> f32 {
    (1.0 - ratio.powf(params.ao_distance_exponent()))
        .max(0.0)
        .powf(params.ao_distance_falloff())
}

impl RenderNode for AmbientOcclusionPass {
    fn name(&self) -> &str {
        "ao"
    }

    fn inputs(&self) -> &'static [PortName] {
        &["depth", "normal", "velocity"]
    }

    fn outputs(&self) -> &'static [OutputSpec] {
        OUTPUTS
    }

    fn resolution(&self) -> Resolution {
        Resolution::Scaled(ScaleSource::Live(ScaleParam::AmbientOcclusion))
    }

    fn execute(
        &mut self,
        frame: &FrameInputs<'_>,
        inputs: &PassInputs<'_>,
        outputs: &mut PassOutputs,
    ) -> RenderResult<()> {
        let depth = inputs.image("depth")?;
        let normals = inputs.image("normal")?;
        let velocity = inputs.image("velocity")?;
        let history = inputs.previous("ao")?;
        let (w, h) = outputs.extent("ao");

        let camera = frame.camera;
        let params = frame.params;
        let forward = camera.basis().forward;
        let samples = params.ao_samples();
        let background = camera.far * 0.999;
        let use_history = self.temporal && self.history_valid;

        let out = Image::from_fn(w, h, |x, y| {
            let uv = [(x as f32 + 0.5) / w as f32, (y as f32 + 0.5) / h as f32];
            let d = depth.sample_nearest(uv)[0];
            let mut ao = 1.0;

            if d < background {
                let ray = camera.ray(uv);
                let p = ray.at(d / math::dot(ray.direction, forward).max(1e-4));
                let n = camera.from_view(decode_normal(normals.sample_nearest(uv)));
                let t = tangent(n);
                let b = math::cross(n, t);
                let rotation = bayer4(x % 4, y % 4) * std::f32::consts::TAU;

                let mut occlusion = 0.0;
                let mut total = 0.0;
                for i in 0..samples {
                    let f = sample_ratio(i, samples);
                    let phi = i as f32 * GOLDEN_ANGLE + rotation;
                    let r = f.sqrt();
                    let dir = math::add(
                        math::add(math::scale(t, phi.cos() * r), math::scale(b, phi.sin() * r)),
                        math::scale(n, (1.0 - f).sqrt()),
                    );
                    let s = math::add(p, math::scale(dir, params.ao_radius() * f));

                    let Some(s_uv) = camera.project(s) else {
                        continue;
                    };
                    if !(0.0..=1.0).contains(&s_uv[0]) || !(0.0..=1.0).contains(&s_uv[1]) {
                        continue;
                    }
                    let weight = distance_weight(f, params);
                    let delta = camera.view_depth(s) - depth.sample_nearest(s_uv)[0];
                    if delta > DEPTH_BIAS && delta < params.ao_thickness() {
                        occlusion += weight;
                    }
                    total += weight;
                }
                if total > 0.0 {
                    ao = math::saturate(1.0 - params.ao_scale() * occlusion / total);
                }
            }

            if use_history {
                let v = velocity.sample_nearest(uv);
                // Pixel-space reprojection keeps static pixels exact.
                let px = x as f32 + 0.5 - v[0] * w as f32;
                let py = y as f32 + 0.5 - v[1] * h as f32;
                if (0.0..=w as f32).contains(&px) && (0.0..=h as f32).contains(&py) {
                    let previous = history.sample_bilinear_px(px, py)[0];
                    ao += (previous - ao) * HISTORY_WEIGHT;
                }
            }
            [ao, 0.0, 0.0, 1.0]
        });

        self.history_valid = true;
        outputs.write("ao", out)
    }

    fn on_reallocated(&mut self) {
        if self.history_valid {
            tracing::warn!(pass = "ao", "occlusion history reset");
        }
        self.history_valid = false;
    }
}
