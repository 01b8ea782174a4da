//! # Live Parameters
//!
//! Values hosts may change between frames without rebuilding the pass
//! graph. Setters validate and reject out-of-range values; nothing is
//! silently clamped. Changes apply from the next `render` call.

use crate::config::RendererConfig;
use crate::error::{RenderError, RenderResult};

/// Upper bound on march steps per ray.
pub const MAX_STEPS: u32 = 1024;

/// Upper bound on ambient-occlusion samples per pixel.
pub const MAX_AO_SAMPLES: u32 = 256;

/// Resolution fractions a node can follow live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleParam {
    /// Volumetric chain resolution.
    Volumetric,
    /// Ambient-occlusion resolution.
    AmbientOcclusion,
}

/// Scalars a combinator node can read live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarParam {
    /// Scattered-light multiplier.
    Intensity,
}

/// Tunable values read by passes each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveParameters {
    steps: u32,
    smoke_amount: f32,
    intensity: f32,
    denoise_strength: f32,
    volumetric_resolution: f32,
    ao_samples: u32,
    ao_radius: f32,
    ao_scale: f32,
    ao_thickness: f32,
    ao_distance_exponent: f32,
    ao_distance_falloff: f32,
    ao_resolution: f32,
}

impl Default for LiveParameters {
    fn default() -> Self {
        let c = RendererConfig::default();
        Self {
            steps: c.steps,
            smoke_amount: c.smoke_amount,
            intensity: c.intensity,
            denoise_strength: c.denoise_strength,
            volumetric_resolution: c.resolution_scale,
            ao_samples: c.ao_samples,
            ao_radius: c.ao_radius,
            ao_scale: c.ao_scale,
            ao_thickness: c.ao_thickness,
            ao_distance_exponent: c.ao_distance_exponent,
            ao_distance_falloff: c.ao_distance_falloff,
            ao_resolution: c.ao_resolution_scale,
        }
    }
}

fn check(ok: bool, name: &str, value: impl std::fmt::Display, rule: &str) -> RenderResult<()> {
    if ok {
        Ok(())
    } else {
        Err(RenderError::config(format!("{name} must be {rule}, got {value}")))
    }
}

fn check_count(name: &str, value: u32, max: u32) -> RenderResult<()> {
    check(
        value > 0 && value <= max,
        name,
        value,
        &format!("in 1..={max}"),
    )
}

fn check_fraction(name: &str, value: f32) -> RenderResult<()> {
    check(value > 0.0 && value <= 1.0, name, value, "in (0, 1]")
}

fn check_non_negative(name: &str, value: f32) -> RenderResult<()> {
    check(value >= 0.0 && value.is_finite(), name, value, "finite and >= 0")
}

fn check_positive(name: &str, value: f32) -> RenderResult<()> {
    check(value > 0.0 && value.is_finite(), name, value, "finite and > 0")
}

impl LiveParameters {
    /// Validated parameters taken from `config`.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value as `RenderError::Configuration`.
    pub fn from_config(config: &RendererConfig) -> RenderResult<Self> {
        let mut p = Self::default();
        p.set_steps(config.steps)?;
        p.set_smoke_amount(config.smoke_amount)?;
        p.set_intensity(config.intensity)?;
        p.set_denoise_strength(config.denoise_strength)?;
        p.set_volumetric_resolution(config.resolution_scale)?;
        p.set_ao_samples(config.ao_samples)?;
        p.set_ao_radius(config.ao_radius)?;
        p.set_ao_scale(config.ao_scale)?;
        p.set_ao_thickness(config.ao_thickness)?;
        p.set_ao_distance_exponent(config.ao_distance_exponent)?;
        p.set_ao_distance_falloff(config.ao_distance_falloff)?;
        p.set_ao_resolution(config.ao_resolution_scale)?;
        Ok(p)
    }

    /// Current value of a live resolution fraction.
    #[must_use]
    pub fn scale(&self, param: ScaleParam) -> f32 {
        match param {
            ScaleParam::Volumetric => self.volumetric_resolution,
            ScaleParam::AmbientOcclusion => self.ao_resolution,
        }
    }

    /// Current value of a live scalar.
    #[must_use]
    pub fn scalar(&self, param: ScalarParam) -> f32 {
        match param {
            ScalarParam::Intensity => self.intensity,
        }
    }

    /// March steps per ray.
    #[must_use]
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Blend between uniform (0) and noise-modulated (1) density.
    #[must_use]
    pub fn smoke_amount(&self) -> f32 {
        self.smoke_amount
    }

    /// Scattered-light multiplier.
    #[must_use]
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Blur tap spacing in texels.
    #[must_use]
    pub fn denoise_strength(&self) -> f32 {
        self.denoise_strength
    }

    /// Volumetric chain resolution fraction.
    #[must_use]
    pub fn volumetric_resolution(&self) -> f32 {
        self.volumetric_resolution
    }

    /// Occlusion samples per pixel.
    #[must_use]
    pub fn ao_samples(&self) -> u32 {
        self.ao_samples
    }

    /// World-space occlusion radius.
    #[must_use]
    pub fn ao_radius(&self) -> f32 {
        self.ao_radius
    }

    /// Occlusion strength.
    #[must_use]
    pub fn ao_scale(&self) -> f32 {
        self.ao_scale
    }

    /// Depth difference beyond which a sample stops occluding.
    #[must_use]
    pub fn ao_thickness(&self) -> f32 {
        self.ao_thickness
    }

    /// Exponent of the sample-distance weight.
    #[must_use]
    pub fn ao_distance_exponent(&self) -> f32 {
        self.ao_distance_exponent
    }

    /// Falloff of the sample-distance weight.
    #[must_use]
    pub fn ao_distance_falloff(&self) -> f32 {
        self.ao_distance_falloff
    }

    /// Occlusion resolution fraction.
    #[must_use]
    pub fn ao_resolution(&self) -> f32 {
        self.ao_resolution
    }

    /// Sets march steps per ray.
    ///
    /// # Errors
    ///
    /// Rejects 0 and values above [`MAX_STEPS`].
    pub fn set_steps(&mut self, steps: u32) -> RenderResult<()> {
        check_count("steps", steps, MAX_STEPS)?;
        self.steps = steps;
        Ok(())
    }

    /// Sets the density modulation blend.
    ///
    /// # Errors
    ///
    /// Rejects values outside `[0, 1]`.
    pub fn set_smoke_amount(&mut self, amount: f32) -> RenderResult<()> {
        check((0.0..=1.0).contains(&amount), "smoke_amount", amount, "in [0, 1]")?;
        self.smoke_amount = amount;
        Ok(())
    }

    /// Sets the scattered-light multiplier.
    ///
    /// # Errors
    ///
    /// Rejects negative and non-finite values.
    pub fn set_intensity(&mut self, intensity: f32) -> RenderResult<()> {
        check_non_negative("intensity", intensity)?;
        self.intensity = intensity;
        Ok(())
    }

    /// Sets the blur tap spacing.
    ///
    /// # Errors
    ///
    /// Rejects negative and non-finite values.
    pub fn set_denoise_strength(&mut self, strength: f32) -> RenderResult<()> {
        check_non_negative("denoise_strength", strength)?;
        self.denoise_strength = strength;
        Ok(())
    }

    /// Sets the volumetric resolution fraction.
    ///
    /// # Errors
    ///
    /// Rejects values outside `(0, 1]`.
    pub fn set_volumetric_resolution(&mut self, scale: f32) -> RenderResult<()> {
        check_fraction("resolution", scale)?;
        self.volumetric_resolution = scale;
        Ok(())
    }

    /// Sets occlusion samples per pixel.
    ///
    /// # Errors
    ///
    /// Rejects 0 and values above [`MAX_AO_SAMPLES`].
    pub fn set_ao_samples(&mut self, samples: u32) -> RenderResult<()> {
        check_count("ao_samples", samples, MAX_AO_SAMPLES)?;
        self.ao_samples = samples;
        Ok(())
    }

    /// Sets the occlusion radius.
    ///
    /// # Errors
    ///
    /// Rejects non-positive and non-finite values.
    pub fn set_ao_radius(&mut self, radius: f32) -> RenderResult<()> {
        check_positive("ao_radius", radius)?;
        self.ao_radius = radius;
        Ok(())
    }

    /// Sets the occlusion strength.
    ///
    /// # Errors
    ///
    /// Rejects negative and non-finite values.
    pub fn set_ao_scale(&mut self, scale: f32) -> RenderResult<()> {
        check_non_negative("ao_scale", scale)?;
        self.ao_scale = scale;
        Ok(())
    }

    /// Sets the occlusion thickness.
    ///
    /// # Errors
    ///
    /// Rejects non-positive and non-finite values.
    pub fn set_ao_thickness(&mut self, thickness: f32) -> RenderResult<()> {
        check_positive("ao_thickness", thickness)?;
        self.ao_thickness = thickness;
        Ok(())
    }

    /// Sets the sample-distance exponent.
    ///
    /// # Errors
    ///
    /// Rejects non-positive and non-finite values.
    pub fn set_ao_distance_exponent(&mut self, exponent: f32) -> RenderResult<()> {
        check_positive("ao_distance_exponent", exponent)?;
        self.ao_distance_exponent = exponent;
        Ok(())
    }

    /// Sets the sample-distance falloff.
    ///
    /// # Errors
    ///
    /// Rejects negative and non-finite values.
    pub fn set_ao_distance_falloff(&mut self, falloff: f32) -> RenderResult<()> {
        check_non_negative("ao_distance_falloff", falloff)?;
        self.ao_distance_falloff = falloff;
        Ok(())
    }

    /// Sets the occlusion resolution fraction.
    ///
    /// # Errors
    ///
    /// Rejects values outside `(0, 1]`.
    pub fn set_ao_resolution(&mut self, scale: f32) -> RenderResult<()> {
        check_fraction("ao_resolution", scale)?;
        self.ao_resolution = scale;
        Ok(())
    }
}
