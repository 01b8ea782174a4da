//! Punctual lights.
//!
//! Attenuation follows the physically based punctual model: inverse power
//! falloff with a smooth window that reaches zero at `distance`.

use crate::math::{self, Vec3};

use super::layers::Layers;

/// Light emission shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Omnidirectional.
    Point,
    /// Cone aimed at `target`.
    Spot {
        /// Point the cone axis passes through.
        target: Vec3,
        /// Cone half-angle in radians.
        angle: f32,
        /// Fraction of the cone, in `[0, 1]`, that fades toward the edge.
        penumbra: f32,
    },
}

/// A point or spot light.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Emission shape.
    pub kind: LightKind,
    /// World position.
    pub position: Vec3,
    /// Linear RGB color.
    pub color: Vec3,
    /// Scalar intensity.
    pub intensity: f32,
    /// Cutoff distance; 0 means unbounded.
    pub distance: f32,
    /// Falloff exponent.
    pub decay: f32,
    /// Layer membership.
    pub layers: Layers,
    /// Whether the light is occluded by shadow casters.
    pub cast_shadow: bool,
}

/// Light arriving at a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Irradiance {
    /// Unit direction from the point toward the light.
    pub direction: Vec3,
    /// Distance to the light.
    pub distance: f32,
    /// Incoming radiance (color × intensity × attenuation).
    pub radiance: Vec3,
}

impl Light {
    /// Point light on the default layer.
    #[must_use]
    pub fn point(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            color,
            intensity,
            distance: 0.0,
            decay: 2.0,
            layers: Layers::default(),
            cast_shadow: false,
        }
    }

    /// Spot light aimed at `target` with half-angle `angle`.
    #[must_use]
    pub fn spot(position: Vec3, target: Vec3, color: Vec3, intensity: f32, angle: f32) -> Self {
        Self {
            kind: LightKind::Spot {
                target,
                angle,
                penumbra: 0.0,
            },
            ..Self::point(position, color, intensity)
        }
    }

    /// Sets the cutoff distance.
    #[must_use]
    pub fn with_distance(mut self, distance: f32) -> Self {
        self.distance = distance;
        self
    }

    /// Sets the falloff exponent.
    #[must_use]
    pub fn with_decay(mut self, decay: f32) -> Self {
        self.decay = decay;
        self
    }

    /// Sets the spot penumbra; no effect on point lights.
    #[must_use]
    pub fn with_penumbra(mut self, value: f32) -> Self {
        if let LightKind::Spot { penumbra, .. } = &mut self.kind {
            *penumbra = value;
        }
        self
    }

    /// Makes the light cast shadows.
    #[must_use]
    pub fn casting_shadows(mut self) -> Self {
        self.cast_shadow = true;
        self
    }

    /// Replaces the layer mask.
    #[must_use]
    pub fn with_layers(mut self, layers: Layers) -> Self {
        self.layers = layers;
        self
    }

    /// Unit spot axis, or `None` for point lights.
    #[must_use]
    pub fn spot_direction(&self) -> Option<Vec3> {
        match self.kind {
            LightKind::Spot { target, .. } => {
                Some(math::normalize(math::sub(target, self.position)))
            }
            LightKind::Point => None,
        }
    }

    /// Light reaching `p`, ignoring occlusion. `None` when nothing arrives.
    #[must_use]
    pub fn irradiance_at(&self, p: Vec3) -> Option<Irradiance> {
        let to_light = math::sub(self.position, p);
        let distance = math::length(to_light);
        if distance <= 1e-6 {
            return None;
        }
        let direction = math::scale(to_light, 1.0 / distance);

        let mut factor = self.intensity * distance_attenuation(distance, self.distance, self.decay);
        if let LightKind::Spot {
            target,
            angle,
            penumbra,
        } = self.kind
        {
            let axis = math::normalize(math::sub(target, self.position));
            let cos_theta = -math::dot(direction, axis);
            factor *= spot_attenuation(angle, penumbra, cos_theta);
        }

        (factor > 0.0).then(|| Irradiance {
            direction,
            distance,
            radiance: math::scale(self.color, factor),
        })
    }
}

/// Inverse power falloff windowed to zero at `cutoff` (when positive).
#[must_use]
pub fn distance_attenuation(distance: f32, cutoff: f32, decay: f32) -> f32 {
    let mut falloff = 1.0 / distance.powf(decay).max(0.01);
    if cutoff > 0.0 {
        let ratio = distance / cutoff;
        let window = math::saturate(1.0 - ratio * ratio * ratio * ratio);
        falloff *= window * window;
    }
    falloff
}

/// Cone falloff: 1 inside the inner cone, 0 outside `angle`, smooth in
/// between.
#[must_use]
pub fn spot_attenuation(angle: f32, penumbra: f32, cos_theta: f32) -> f32 {
    let cone_cos = angle.cos();
    let inner_cos = (angle * (1.0 - penumbra)).cos();
    math::smoothstep(cone_cos, inner_cos, cos_theta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_square() {
        let a = distance_attenuation(2.0, 0.0, 2.0);
        let b = distance_attenuation(4.0, 0.0, 2.0);
        assert!((a / b - 4.0).abs() < 1e-5);
        // Clamped near the light.
        assert!((distance_attenuation(0.01, 0.0, 2.0) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_cutoff_window_reaches_zero() {
        assert_eq!(distance_attenuation(5.0, 5.0, 2.0), 0.0);
        assert_eq!(distance_attenuation(7.0, 5.0, 2.0), 0.0);
        assert!(distance_attenuation(2.0, 5.0, 2.0) > 0.0);
    }

    #[test]
    fn test_spot_cone() {
        let light = Light::spot([0.0, 5.0, 0.0], [0.0; 3], [1.0; 3], 10.0, 0.3)
            .with_penumbra(0.5);
        assert!(light.irradiance_at([0.0; 3]).is_some());
        // Far outside the cone.
        assert!(light.irradiance_at([5.0, 0.0, 0.0]).is_none());
        // Behind the light.
        assert!(light.irradiance_at([0.0, 10.0, 0.0]).is_none());
    }

    #[test]
    fn test_spot_penumbra_is_smooth() {
        let inside = spot_attenuation(0.4, 0.5, 0.3_f32.cos());
        let edge = spot_attenuation(0.4, 0.5, 0.39_f32.cos());
        assert!(inside > edge && edge > 0.0 && inside < 1.0);
        assert_eq!(spot_attenuation(0.4, 0.5, 1.0), 1.0);
    }

    #[test]
    fn test_point_light_direction() {
        let light = Light::point([0.0, 2.0, 0.0], [1.0, 0.5, 0.25], 4.0);
        let irr = light.irradiance_at([0.0; 3]).expect("lit");
        assert_eq!(irr.direction, [0.0, 1.0, 0.0]);
        assert!((irr.distance - 2.0).abs() < 1e-6);
        assert!((irr.radiance[0] - 1.0).abs() < 1e-5);
        assert!((irr.radiance[2] - 0.25).abs() < 1e-5);
    }
}
