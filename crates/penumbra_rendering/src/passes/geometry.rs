//! Geometry passes.
//!
//! - **`PrePass`** writes the per-pixel attributes later passes need:
//!   view-space normals, screen-space motion and linear view depth.
//! - **`ScenePass`** shades the default layer: ambient (scaled by the
//!   ambient-occlusion input), Lambert diffuse from every default-layer
//!   light with optional shadow rays, and emission. Background pixels get
//!   the scene's vertical gradient.
//!
//! Both trace one primary ray per pixel against the analytic scene.

use wgpu::TextureFormat;

use crate::camera::Camera;
use crate::device::Image;
use crate::error::RenderResult;
use crate::graph::{FrameInputs, OutputSpec, PassInputs, PassOutputs, PortName, RenderNode, Resolution};
use crate::math::{self, Vec3};
use crate::scene::{Layers, Renderable, Scene, SURFACE_EPSILON};
use crate::uniforms::PackedLight;

/// Pre-pass outputs.
pub const PRE_PASS_OUTPUTS: &[OutputSpec] = &[
    OutputSpec {
        name: "normal",
        format: TextureFormat::Rgba8Unorm,
    },
    OutputSpec {
        name: "velocity",
        format: TextureFormat::Rg16Float,
    },
    OutputSpec {
        name: "depth",
        format: TextureFormat::R32Float,
    },
];

/// Scene pass outputs.
pub const SCENE_OUTPUTS: &[OutputSpec] = &[
    OutputSpec {
        name: "color",
        format: TextureFormat::Rgba16Float,
    },
    OutputSpec {
        name: "depth",
        format: TextureFormat::R32Float,
    },
];

/// First surface along a primary ray.
pub struct SurfaceSample<'a> {
    /// World position.
    pub position: Vec3,
    /// Unit normal facing the camera.
    pub normal: Vec3,
    /// Linear view depth.
    pub depth: f32,
    /// Object hit.
    pub object: &'a Renderable,
}

/// Traces the primary ray through `uv` against objects in `mask`, up to
/// the far plane.
#[must_use]
pub fn primary_hit<'a>(
    scene: &'a Scene,
    camera: &Camera,
    mask: Layers,
    uv: [f32; 2],
) -> Option<SurfaceSample<'a>> {
    let ray = camera.ray(uv);
    let cos = math::dot(ray.direction, camera.basis().forward);
    let t_max = camera.far / cos.max(1e-4);
    let (hit, object) = scene.closest_hit(&ray, mask, t_max)?;
    Some(SurfaceSample {
        position: ray.at(hit.t),
        normal: hit.normal,
        depth: hit.t * cos,
        object,
    })
}

/// Packs a unit vector into `[0, 1]`.
#[must_use]
pub fn encode_normal(n: Vec3) -> [f32; 4] {
    [n[0] * 0.5 + 0.5, n[1] * 0.5 + 0.5, n[2] * 0.5 + 0.5, 1.0]
}

/// Inverse of [`encode_normal`], renormalized.
#[must_use]
pub fn decode_normal(t: [f32; 4]) -> Vec3 {
    math::normalize([t[0] * 2.0 - 1.0, t[1] * 2.0 - 1.0, t[2] * 2.0 - 1.0])
}

/// Writes view-space normals, screen-space motion and linear depth.
pub struct PrePass {
    mask: Layers,
}

impl Default for PrePass {
    fn default() -> Self {
        Self {
            mask: Layers::default(),
        }
    }
}

impl PrePass {
    /// Pre-pass over the default layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderNode for PrePass {
    fn name(&self) -> &str {
        "pre_pass"
    }

    fn inputs(&self) -> &'static [PortName] {
        &[]
    }

    fn outputs(&self) -> &'static [OutputSpec] {
        PRE_PASS_OUTPUTS
    }

    fn resolution(&self) -> Resolution {
        Resolution::FULL
    }

    fn layer_mask(&self) -> Option<Layers> {
        Some(self.mask)
    }

    fn execute(
        &mut self,
        frame: &FrameInputs<'_>,
        _inputs: &PassInputs<'_>,
        outputs: &mut PassOutputs,
    ) -> RenderResult<()> {
        let (w, h) = outputs.extent("normal");
        let camera = frame.camera;
        let previous = frame.history_camera();

        let mut normal = Image::new(w, h);
        let mut velocity = Image::new(w, h);
        let mut depth = Image::new(w, h);

        for y in 0..h {
            for x in 0..w {
                let uv = normal.uv(x, y);
                let (n, d, world, world_prev) = match primary_hit(frame.scene, camera, self.mask, uv) {
                    Some(s) => {
                        let moved_from = frame
                            .previous_positions
                            .get(&s.object.id)
                            .copied()
                            .unwrap_or(s.object.position);
                        let offset = math::sub(s.object.position, moved_from);
                        (
                            camera.to_view(s.normal),
                            s.depth,
                            s.position,
                            math::sub(s.position, offset),
                        )
                    }
                    None => {
                        let ray = camera.ray(uv);
                        let cos = math::dot(ray.direction, camera.basis().forward).max(1e-4);
                        let far = ray.at(camera.far / cos);
                        ([0.0, 0.0, 1.0], camera.far, far, far)
                    }
                };

                // Both ends go through `project` so a static point yields
                // exactly zero motion.
                let motion = match (camera.project(world), previous.project(world_prev)) {
                    (Some(now), Some(prev)) => [now[0] - prev[0], now[1] - prev[1]],
                    _ => [0.0, 0.0],
                };

                normal.set(x, y, encode_normal(n));
                velocity.set(x, y, [motion[0], motion[1], 0.0, 0.0]);
                depth.set(x, y, [d, 0.0, 0.0, 0.0]);
            }
        }

        outputs.write("normal", normal)?;
        outputs.write("velocity", velocity)?;
        outputs.write("depth", depth)
    }
}

/// Shades the default layer.
pub struct ScenePass {
    mask: Layers,
}

impl Default for ScenePass {
    fn default() -> Self {
        Self {
            mask: Layers::default(),
        }
    }
}

impl ScenePass {
    /// Scene pass over the default layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Lambert shading of one surface point.
#[must_use]
pub fn shade(
    scene: &Scene,
    lights: &[PackedLight],
    mask: Layers,
    surface: &SurfaceSample<'_>,
    ambient_occlusion: f32,
) -> Vec3 {
    let material = &surface.object.material;
    let mut incoming = math::scale(scene.ambient, ambient_occlusion);
    let lift = math::add(surface.position, math::scale(surface.normal, SURFACE_EPSILON));

    for light in lights {
        let Some(irr) = light.irradiance_at(surface.position) else {
            continue;
        };
        let n_dot_l = math::dot(surface.normal, irr.direction);
        if n_dot_l <= 0.0 {
            continue;
        }
        if light.casts_shadow() && scene.occluded(lift, light.position(), mask) {
            continue;
        }
        incoming = math::add(incoming, math::scale(irr.radiance, n_dot_l));
    }

    math::add(math::mul(material.albedo, incoming), material.emissive)
}

impl RenderNode for ScenePass {
    fn name(&self) -> &str {
        "scene"
    }

    fn inputs(&self) -> &'static [PortName] {
        &["ao"]
    }

    fn outputs(&self) -> &'static [OutputSpec] {
        SCENE_OUTPUTS
    }

    fn resolution(&self) -> Resolution {
        Resolution::FULL
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
        let ao = inputs.image("ao")?;
        let (w, h) = outputs.extent("color");
        let lights: Vec<PackedLight> = frame
            .scene
            .lights_in(self.mask)
            .map(PackedLight::from_light)
            .collect();

        let mut color = Image::new(w, h);
        let mut depth = Image::new(w, h);

        for y in 0..h {
            for x in 0..w {
                let uv = color.uv(x, y);
                match primary_hit(frame.scene, frame.camera, self.mask, uv) {
                    Some(s) => {
                        let occlusion = ao.sample_bilinear(uv)[0];
                        let c = shade(frame.scene, &lights, self.mask, &s, occlusion);
                        color.set(x, y, [c[0], c[1], c[2], 1.0]);
                        depth.set(x, y, [s.depth, 0.0, 0.0, 0.0]);
                    }
                    None => {
                        let c = frame.scene.background.at(uv[1]);
                        color.set(x, y, [c[0], c[1], c[2], 1.0]);
                        depth.set(x, y, [frame.camera.far, 0.0, 0.0, 0.0]);
                    }
                }
            }
        }

        outputs.write("color", color)?;
        outputs.write("depth", depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Light, Renderable};

    fn camera() -> Camera {
        Camera::perspective(60.0, 1.0, 0.1, 50.0).looking_at([0.0, 0.0, 5.0], [0.0; 3])
    }

    #[test]
    fn test_primary_hit_depth_is_view_depth() {
        let mut scene = Scene::new();
        scene.add_object(Renderable::plane(1, [0.0, 0.0, 0.0], [0.0, 0.0, 1.0]));
        let cam = camera();
        for uv in [[0.5, 0.5], [0.1, 0.9]] {
            let s = primary_hit(&scene, &cam, Layers::default(), uv).expect("plane fills view");
            // The plane is perpendicular to the view axis, so depth is constant.
            assert!((s.depth - 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_hits_beyond_far_plane_are_background() {
        let mut scene = Scene::new();
        scene.add_object(Renderable::sphere(1, [0.0, 0.0, -100.0], 1.0));
        assert!(primary_hit(&scene, &camera(), Layers::default(), [0.5, 0.5]).is_none());
    }

    #[test]
    fn test_normal_encoding() {
        let n = math::normalize([0.2, -0.5, 0.8]);
        let back = decode_normal(encode_normal(n));
        for i in 0..3 {
            assert!((back[i] - n[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_shade_ambient_occlusion_and_shadow() {
        let mut scene = Scene::new();
        scene.ambient = [0.5; 3];
        scene.add_object(Renderable::plane(1, [0.0; 3], [0.0, 1.0, 0.0]).with_albedo([1.0; 3]));
        scene.add_object(Renderable::sphere(2, [0.0, 2.0, 0.0], 0.5).casting_shadows());
        let light = Light::point([0.0, 4.0, 0.0], [1.0; 3], 16.0).casting_shadows();
        let lights = [PackedLight::from_light(&light)];

        let surface = SurfaceSample {
            position: [0.0; 3],
            normal: [0.0, 1.0, 0.0],
            depth: 1.0,
            object: &scene.objects[0],
        };
        // Shadowed: ambient only, scaled by occlusion.
        let c = shade(&scene, &lights, Layers::default(), &surface, 0.5);
        assert!((c[0] - 0.25).abs() < 1e-6);

        // Move off the shadow: ambient plus direct.
        let lit = SurfaceSample {
            position: [3.0, 0.0, 0.0],
            ..surface
        };
        let c = shade(&scene, &lights, Layers::default(), &lit, 1.0);
        assert!(c[0] > 0.5);
    }
}
