//! # Scene Model
//!
//! The read-only world description the compositor renders each frame:
//! analytic renderables, punctual lights, ambient light and a background
//! gradient. Passes see only entities whose layer masks intersect their
//! own.

pub mod layers;
pub mod light;
pub mod object;

pub use layers::{Layers, LAYER_DEFAULT, LAYER_VOLUMETRIC};
pub use light::{Irradiance, Light, LightKind};
pub use object::{Hit, Material, ObjectId, Renderable, Shape};

use crate::math::{self, Ray, Vec3};

/// Offset applied to secondary ray origins to avoid self-intersection.
pub const SURFACE_EPSILON: f32 = 1e-3;

/// Vertical background gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Background {
    /// Color at the top edge of the screen.
    pub top: Vec3,
    /// Color at the bottom edge of the screen.
    pub bottom: Vec3,
}

impl Background {
    /// Gradient color at screen row `v` (0 = top).
    #[must_use]
    pub fn at(&self, v: f32) -> Vec3 {
        math::mix(self.top, self.bottom, math::saturate(v))
    }
}

impl Default for Background {
    fn default() -> Self {
        Self {
            top: [0.0; 3],
            bottom: [0.0; 3],
        }
    }
}

/// Everything a frame renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    /// Renderables.
    pub objects: Vec<Renderable>,
    /// Lights.
    pub lights: Vec<Light>,
    /// Uniform ambient radiance.
    pub ambient: Vec3,
    /// Background gradient.
    pub background: Background,
    /// Seconds since the animation started; drives medium drift.
    pub elapsed: f32,
}

impl Scene {
    /// Empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a renderable.
    pub fn add_object(&mut self, object: Renderable) -> &mut Self {
        self.objects.push(object);
        self
    }

    /// Adds a light.
    pub fn add_light(&mut self, light: Light) -> &mut Self {
        self.lights.push(light);
        self
    }

    /// Renderables visible to `mask`.
    pub fn objects_in(&self, mask: Layers) -> impl Iterator<Item = &Renderable> {
        self.objects.iter().filter(move |o| o.layers.intersects(mask))
    }

    /// Lights visible to `mask`.
    pub fn lights_in(&self, mask: Layers) -> impl Iterator<Item = &Light> {
        self.lights.iter().filter(move |l| l.layers.intersects(mask))
    }

    /// Closest renderable in `mask` hit by `ray` before `t_max`.
    #[must_use]
    pub fn closest_hit(&self, ray: &Ray, mask: Layers, t_max: f32) -> Option<(Hit, &Renderable)> {
        let mut best: Option<(Hit, &Renderable)> = None;
        let mut limit = t_max;
        for object in self.objects_in(mask) {
            if let Some(hit) = object.intersect(ray, 0.0, limit) {
                limit = hit.t;
                best = Some((hit, object));
            }
        }
        best
    }

    /// True if a shadow caster in `mask` blocks the segment `from → to`.
    #[must_use]
    pub fn occluded(&self, from: Vec3, to: Vec3, mask: Layers) -> bool {
        let delta = math::sub(to, from);
        let distance = math::length(delta);
        if distance <= SURFACE_EPSILON {
            return false;
        }
        let ray = Ray::new(from, delta);
        self.objects_in(mask)
            .filter(|o| o.cast_shadow)
            .any(|o| o.intersect(&ray, SURFACE_EPSILON, distance - SURFACE_EPSILON).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        let mut s = Scene::new();
        s.add_object(Renderable::sphere(1, [0.0, 0.0, 0.0], 1.0).casting_shadows())
            .add_object(Renderable::sphere(2, [0.0, 0.0, -5.0], 1.0))
            .add_object(
                Renderable::sphere(3, [0.0, 0.0, 3.0], 0.5)
                    .with_layers(Layers::single(LAYER_VOLUMETRIC)),
            );
        s
    }

    #[test]
    fn test_closest_hit_respects_mask() {
        let s = scene();
        let ray = Ray::new([0.0, 0.0, 10.0], [0.0, 0.0, -1.0]);

        let (hit, obj) = s.closest_hit(&ray, Layers::default(), f32::INFINITY).expect("hit");
        assert_eq!(obj.id, ObjectId(1));
        assert!((hit.t - 9.0).abs() < 1e-5);

        let (_, obj) = s
            .closest_hit(&ray, Layers::single(LAYER_VOLUMETRIC), f32::INFINITY)
            .expect("hit");
        assert_eq!(obj.id, ObjectId(3));
    }

    #[test]
    fn test_occlusion_only_by_casters() {
        let s = scene();
        // Sphere 1 casts, sphere 2 does not.
        assert!(s.occluded([0.0, 0.0, 5.0], [0.0, 0.0, -3.0], Layers::default()));
        assert!(!s.occluded([0.0, 0.0, -3.0], [0.0, 0.0, -8.0], Layers::default()));
        assert!(!s.occluded([0.0, 0.0, 5.0], [0.0, 0.0, -3.0], Layers::single(LAYER_VOLUMETRIC)));
    }

    #[test]
    fn test_background_gradient() {
        let bg = Background {
            top: [1.0, 0.0, 0.0],
            bottom: [0.0, 0.0, 1.0],
        };
        assert_eq!(bg.at(0.0), [1.0, 0.0, 0.0]);
        assert_eq!(bg.at(1.0), [0.0, 0.0, 1.0]);
        assert_eq!(bg.at(0.5), [0.5, 0.0, 0.5]);
    }
}
