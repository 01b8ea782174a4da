//! # Uniform Blocks
//!
//! `Pod` layouts shared by the CPU kernels and the WGSL shaders in
//! `shaders/`. Every block is a whole number of 16-byte rows so it can be
//! bound as a uniform buffer without padding fix-ups.

use bytemuck::{Pod, Zeroable};

use crate::camera::Camera;
use crate::math::{self, Aabb, Ray, Vec3};
use crate::params::LiveParameters;
use crate::passes::combinators::BlurAxis;
use crate::passes::volumetric::VolumeBounds;
use crate::scene::{Irradiance, Light, LightKind};

/// Blur taps on each side of the center texel.
pub const BLUR_TAPS: usize = 12;

/// Gaussian standard deviation, in taps.
pub const BLUR_SIGMA: f32 = 4.0;

/// Per-dispatch data for `volumetric_scatter.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct VolumetricUniforms {
    /// Eye position; w = near plane.
    pub camera_position: [f32; 4],
    /// Unit view direction; w = far plane.
    pub camera_forward: [f32; 4],
    /// Right axis scaled by `tan(fov/2) × aspect`.
    pub camera_right: [f32; 4],
    /// Up axis scaled by `tan(fov/2)`.
    pub camera_up: [f32; 4],
    /// Medium box center; w = march steps.
    pub volume_center: [f32; 4],
    /// Medium box half-extents; w = smoke amount.
    pub volume_half_extents: [f32; 4],
    /// Elapsed seconds, density field edge, output width, output height.
    pub frame: [f32; 4],
}

impl VolumetricUniforms {
    /// Packs the state one volumetric dispatch reads.
    #[must_use]
    pub fn new(
        camera: &Camera,
        bounds: &VolumeBounds,
        params: &LiveParameters,
        time: f32,
        field_size: u32,
        extent: (u32, u32),
    ) -> Self {
        let basis = camera.basis();
        let t = camera.tan_half_fov();
        let right = math::scale(basis.right, t * camera.aspect);
        let up = math::scale(basis.up, t);
        let c = bounds.center();
        let h = bounds.half_extents();
        Self {
            camera_position: [camera.position[0], camera.position[1], camera.position[2], camera.near],
            camera_forward: [basis.forward[0], basis.forward[1], basis.forward[2], camera.far],
            camera_right: [right[0], right[1], right[2], 0.0],
            camera_up: [up[0], up[1], up[2], 0.0],
            volume_center: [c[0], c[1], c[2], params.steps() as f32],
            volume_half_extents: [h[0], h[1], h[2], params.smoke_amount()],
            frame: [time, field_size as f32, extent.0 as f32, extent.1 as f32],
        }
    }

    /// Camera ray through screen `uv`.
    #[must_use]
    pub fn ray(&self, uv: [f32; 2]) -> Ray {
        let x = uv[0] * 2.0 - 1.0;
        let y = 1.0 - uv[1] * 2.0;
        let dir = math::add(
            xyz(self.camera_forward),
            math::add(math::scale(xyz(self.camera_right), x), math::scale(xyz(self.camera_up), y)),
        );
        Ray::new(xyz(self.camera_position), dir)
    }

    /// Unit view direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        xyz(self.camera_forward)
    }

    /// Far plane; depth of the background.
    #[must_use]
    pub fn far(&self) -> f32 {
        self.camera_forward[3]
    }

    /// Medium box.
    #[must_use]
    pub fn volume(&self) -> Aabb {
        Aabb {
            center: xyz(self.volume_center),
            half_extents: xyz(self.volume_half_extents),
        }
    }

    /// March steps.
    #[must_use]
    pub fn steps(&self) -> u32 {
        self.volume_center[3] as u32
    }

    /// Smoke amount.
    #[must_use]
    pub fn smoke_amount(&self) -> f32 {
        self.volume_half_extents[3]
    }

    /// Elapsed seconds.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.frame[0]
    }
}

/// One light in the storage buffer both scene kernels iterate.
///
/// Cone cosines are precomputed so the per-sample evaluation is trig-free.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PackedLight {
    /// Position; w = 1 for spot lights, 0 for point lights.
    pub position: [f32; 4],
    /// Color × intensity; w = cutoff distance (0 = none).
    pub radiance: [f32; 4],
    /// Spot axis; w = cosine of the cone angle.
    pub direction: [f32; 4],
    /// Decay, cosine of the inner cone angle, shadow flag, unused.
    pub params: [f32; 4],
}

impl PackedLight {
    /// Packs a scene light.
    #[must_use]
    pub fn from_light(light: &Light) -> Self {
        let p = light.position;
        let r = math::scale(light.color, light.intensity);
        let (kind, axis, cone_cos, inner_cos) = match light.kind {
            LightKind::Point => (0.0, [0.0; 3], -1.0, -1.0),
            LightKind::Spot {
                target,
                angle,
                penumbra,
            } => (
                1.0,
                math::normalize(math::sub(target, p)),
                angle.cos(),
                (angle * (1.0 - penumbra)).cos(),
            ),
        };
        Self {
            position: [p[0], p[1], p[2], kind],
            radiance: [r[0], r[1], r[2], light.distance],
            direction: [axis[0], axis[1], axis[2], cone_cos],
            params: [
                light.decay,
                inner_cos,
                if light.cast_shadow { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }

    /// World position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        xyz(self.position)
    }

    /// Whether shadow rays should be traced toward this light.
    #[must_use]
    pub fn casts_shadow(&self) -> bool {
        self.params[2] > 0.5
    }

    /// Light reaching `p`, ignoring occlusion.
    #[must_use]
    pub fn irradiance_at(&self, p: Vec3) -> Option<Irradiance> {
        let to_light = math::sub(xyz(self.position), p);
        let distance = math::length(to_light);
        if distance <= 1e-6 {
            return None;
        }
        let direction = math::scale(to_light, 1.0 / distance);

        let mut factor =
            crate::scene::light::distance_attenuation(distance, self.radiance[3], self.params[0]);
        if self.position[3] > 0.5 {
            let cos_theta = -math::dot(direction, xyz(self.direction));
            factor *= math::smoothstep(self.direction[3], self.params[1], cos_theta);
        }

        (factor > 0.0).then(|| Irradiance {
            direction,
            distance,
            radiance: math::scale(xyz(self.radiance), factor),
        })
    }
}

/// Per-dispatch data for `gaussian_blur.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BlurUniforms {
    /// Offset between taps, in texels.
    pub step: [f32; 2],
    /// `1 / extent`.
    pub texel_size: [f32; 2],
    /// Center weight followed by the one-sided tap weights.
    pub weights: [[f32; 4]; 4],
}

impl BlurUniforms {
    /// Blur along `axis` with taps `strength` texels apart.
    #[must_use]
    pub fn new(axis: BlurAxis, strength: f32, extent: (u32, u32)) -> Self {
        let step = match axis {
            BlurAxis::Horizontal => [strength, 0.0],
            BlurAxis::Vertical => [0.0, strength],
        };
        let mut weights = [[0.0; 4]; 4];
        for (i, w) in gaussian_weights().into_iter().enumerate() {
            weights[i / 4][i % 4] = w;
        }
        Self {
            step,
            texel_size: [1.0 / extent.0.max(1) as f32, 1.0 / extent.1.max(1) as f32],
            weights,
        }
    }

    /// Weight of the tap `offset` steps from the center.
    #[must_use]
    pub fn weight(&self, offset: usize) -> f32 {
        if offset > BLUR_TAPS {
            return 0.0;
        }
        self.weights[offset / 4][offset % 4]
    }
}

/// Normalized one-sided Gaussian weights: `w[0] + 2 Σ w[1..] = 1`.
#[must_use]
pub fn gaussian_weights() -> [f32; BLUR_TAPS + 1] {
    let mut w = [0.0f32; BLUR_TAPS + 1];
    for (i, v) in w.iter_mut().enumerate() {
        let x = i as f32;
        *v = (-(x * x) / (2.0 * BLUR_SIGMA * BLUR_SIGMA)).exp();
    }
    let total = w[0] + 2.0 * w[1..].iter().sum::<f32>();
    for v in &mut w {
        *v /= total;
    }
    w
}

fn xyz(v: [f32; 4]) -> Vec3 {
    [v[0], v[1], v[2]]
}
