//! # Volumetric Scattering
//!
//! Ray-marched single scattering through an axis-aligned medium box.
//!
//! For every output texel the camera ray is clipped to the box, then
//! sampled at `steps` evenly spaced points whose start is offset by a
//! 16×16 Bayer threshold (the blur pass hides the resulting pattern).
//! The march stops at the opaque scene depth, so fog never shows through
//! solid geometry.
//!
//! At each sample the medium density is the product of three drifting
//! lookups into the density field at different frequencies; `smoke_amount`
//! blends between uniform density (0) and the full noise (1). Scattered
//! light is the sum over volumetric-layer lights of their attenuated
//! irradiance, occluded by default-layer shadow casters for lights that
//! cast shadows.
//!
//! Objects on the volumetric layer render as emissive surfaces that also
//! end the march.

use penumbra_procedural::DensityField;
use wgpu::TextureFormat;

use crate::device::{Image, VolumeId};
use crate::error::{RenderError, RenderResult};
use crate::graph::{FrameInputs, OutputSpec, PassInputs, PassOutputs, PortName, RenderNode, Resolution, ScaleSource};
use crate::math::{self, Aabb, Ray, Vec3};
use crate::params::ScaleParam;
use crate::scene::{Layers, Scene, LAYER_VOLUMETRIC};
use crate::uniforms::{PackedLight, VolumetricUniforms};

use super::dither::bayer16;

/// Scattering output.
pub const OUTPUTS: &[OutputSpec] = &[OutputSpec {
    name: "color",
    format: TextureFormat::Rgba16Float,
}];

/// Noise octaves sampled per march step: (frequency, drift speed).
const GRAIN_OCTAVES: [(f32, f32); 3] = [(0.1, 0.02), (0.05, 1.0), (0.02, 2.0)];

/// The participating-medium box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeBounds {
    center: Vec3,
    half_extents: Vec3,
}

impl VolumeBounds {
    /// Box centered at `position` with full edge lengths `size`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Configuration` for non-positive or non-finite
    /// sizes and non-finite positions.
    pub fn new(position: Vec3, size: Vec3) -> RenderResult<Self> {
        if !size.iter().all(|s| *s > 0.0 && s.is_finite()) {
            return Err(RenderError::config(format!(
                "volume size must be positive on every axis, got {size:?}"
            )));
        }
        if !position.iter().all(|p| p.is_finite()) {
            return Err(RenderError::config(format!(
                "volume position must be finite, got {position:?}"
            )));
        }
        Ok(Self {
            center: position,
            half_extents: math::scale(size, 0.5),
        })
    }

    /// Box center.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Half edge lengths.
    #[must_use]
    pub fn half_extents(&self) -> Vec3 {
        self.half_extents
    }

    /// Full edge lengths.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        math::scale(self.half_extents, 2.0)
    }

    /// As an [`Aabb`].
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb {
            center: self.center,
            half_extents: self.half_extents,
        }
    }
}

/// One drifting density lookup, biased to `[0.5, 1.5]`.
#[must_use]
pub fn grain(field: &DensityField, p: Vec3, time: f32, frequency: f32, drift: f32) -> f32 {
    let shifted = math::add(p, math::scale([time, 0.0, time * 0.3], drift));
    let q = math::scale(shifted, frequency);
    field.sample([math::fract(q[0]), math::fract(q[1]), math::fract(q[2])]) + 0.5
}

/// Scattering coefficient at `p`: exactly 1 when `smoke_amount` is 0.
#[must_use]
pub fn scattering_at(field: &DensityField, p: Vec3, time: f32, smoke_amount: f32) -> f32 {
    let density: f32 = GRAIN_OCTAVES
        .iter()
        .map(|&(frequency, drift)| grain(field, p, time, frequency, drift))
        .product();
    1.0 + (density - 1.0) * smoke_amount
}

/// Everything one ray march reads.
pub struct MarchContext<'a> {
    /// Density field.
    pub field: &'a DensityField,
    /// Packed per-dispatch state.
    pub uniforms: &'a VolumetricUniforms,
    /// Volumetric-layer lights.
    pub lights: &'a [PackedLight],
    /// Scene, for shadow rays.
    pub scene: &'a Scene,
    /// Layers that cast shadows into the medium.
    pub occluders: Layers,
}

impl MarchContext<'_> {
    /// In-scattered radiance along `ray` up to distance `t_limit`.
    ///
    /// `jitter` in `[0, 1)` offsets the first sample by that fraction of a
    /// step.
    #[must_use]
    pub fn march(&self, ray: &Ray, t_limit: f32, jitter: f32) -> Vec3 {
        let Some((t_near, t_far)) = self.uniforms.volume().intersect(ray) else {
            return [0.0; 3];
        };
        let t_near = t_near.max(0.0);
        let steps = self.uniforms.steps().max(1);
        let step = (t_far - t_near) / steps as f32;
        let t_end = t_far.min(t_limit);
        let time = self.uniforms.time();
        let smoke = self.uniforms.smoke_amount();

        let mut radiance = [0.0; 3];
        let mut t = t_near + jitter * step;
        for _ in 0..steps {
            if t >= t_end {
                break;
            }
            let p = ray.at(t);
            let incoming = self.incoming(p);
            if incoming != [0.0; 3] {
                let k = scattering_at(self.field, p, time, smoke) * step;
                radiance = math::add(radiance, math::scale(incoming, k));
            }
            t += step;
        }
        radiance
    }

    fn incoming(&self, p: Vec3) -> Vec3 {
        let mut sum = [0.0; 3];
        for light in self.lights {
            let Some(irr) = light.irradiance_at(p) else {
                continue;
            };
            if light.casts_shadow() && self.scene.occluded(p, light.position(), self.occluders) {
                continue;
            }
            sum = math::add(sum, irr.radiance);
        }
        sum
    }
}

/// Renders light scattered by the medium toward the camera.
pub struct VolumetricScatteringPass {
    bounds: VolumeBounds,
    volume: VolumeId,
    mask: Layers,
}

impl VolumetricScatteringPass {
    /// Pass marching `bounds` through the uploaded density `volume`.
    #[must_use]
    pub fn new(bounds: VolumeBounds, volume: VolumeId) -> Self {
        Self {
            bounds,
            volume,
            mask: Layers::single(LAYER_VOLUMETRIC),
        }
    }

    /// Medium box.
    #[must_use]
    pub fn bounds(&self) -> VolumeBounds {
        self.bounds
    }

    /// WGSL source of the GPU kernel.
    #[must_use]
    pub fn shader_source() -> &'static str {
        include_str!("../../shaders/volumetric_scatter.wgsl")
    }
}

impl RenderNode for VolumetricScatteringPass {
    fn name(&self) -> &str {
        "volumetric"
    }

    fn inputs(&self) -> &'static [PortName] {
        &["depth"]
    }

    fn outputs(&self) -> &'static [OutputSpec] {
        OUTPUTS
    }

    fn resolution(&self) -> Resolution {
        Resolution::Scaled(ScaleSource::Live(ScaleParam::Volumetric))
    }

    fn layer_mask(&self) -> Option<Layers> {
        Some(self.mask)
    }

    fn execute(
        &mut self,
        frame: &FrameInputs<'_>,
        inputs: &PassInputs<'_>,
        outputs: &mut PassOutputs,
    ) -> RenderResult<()> {
        let field = frame.device.volume(self.volume)?;
        let depth = inputs.image("depth")?;
        let (w, h) = outputs.extent("color");

        let uniforms = VolumetricUniforms::new(
            frame.camera,
            &self.bounds,
            frame.params,
            frame.scene.elapsed,
            field.size(),
            (w, h),
        );
        let lights: Vec<PackedLight> = frame
            .scene
            .lights_in(self.mask)
            .map(PackedLight::from_light)
            .collect();
        let ctx = MarchContext {
            field,
            uniforms: &uniforms,
            lights: &lights,
            scene: frame.scene,
            occluders: Layers::default(),
        };
        let forward = uniforms.forward();

        let out = Image::from_fn(w, h, |x, y| {
            let uv = [(x as f32 + 0.5) / w as f32, (y as f32 + 0.5) / h as f32];
            let ray = uniforms.ray(uv);
            let cos = math::dot(ray.direction, forward).max(1e-4);
            let mut t_limit = depth.sample_nearest(uv)[0] / cos;

            let mut emitted = [0.0; 3];
            if let Some((hit, object)) = frame.scene.closest_hit(&ray, self.mask, t_limit) {
                t_limit = hit.t;
                emitted = object.material.emissive;
            }

            let jitter = bayer16(x % 16, y % 16);
            let c = math::add(ctx.march(&ray, t_limit, jitter), emitted);
            [c[0], c[1], c[2], 1.0]
        });

        outputs.write("color", out)
    }
}
