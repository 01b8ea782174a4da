//! # Renderer Configuration
//!
//! Startup settings, loadable from TOML. Missing keys fall back to the
//! defaults below; unknown keys are rejected.
//!
//! ```toml
//! steps = 16
//! smoke_amount = 0.8
//! resolution_scale = 0.25
//! volume_size = [20.0, 10.0, 20.0]
//! use_traa = true
//! ```

use std::path::Path;

use penumbra_procedural::{validate_size, FieldSeed, DEFAULT_FIELD_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::params::LiveParameters;
use crate::passes::volumetric::VolumeBounds;

/// Everything the compositor needs at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    /// March steps per ray.
    pub steps: u32,
    /// Density modulation blend in `[0, 1]`.
    pub smoke_amount: f32,
    /// Scattered-light multiplier.
    pub intensity: f32,
    /// Blur tap spacing in texels.
    pub denoise_strength: f32,
    /// Volumetric chain resolution fraction.
    pub resolution_scale: f32,
    /// Full edge lengths of the participating-medium box.
    pub volume_size: [f32; 3],
    /// Center of the participating-medium box.
    pub volume_position: [f32; 3],
    /// Occlusion samples per pixel.
    pub ao_samples: u32,
    /// Occlusion radius.
    pub ao_radius: f32,
    /// Occlusion strength.
    pub ao_scale: f32,
    /// Occlusion thickness.
    pub ao_thickness: f32,
    /// Sample-distance weight exponent.
    pub ao_distance_exponent: f32,
    /// Sample-distance weight falloff.
    pub ao_distance_falloff: f32,
    /// Occlusion resolution fraction.
    pub ao_resolution_scale: f32,
    /// Include the temporal anti-aliasing pass.
    pub use_traa: bool,
    /// Blend ambient occlusion with the previous frame.
    pub use_temporal_filtering: bool,
    /// Include the volumetric chain.
    pub volumetric_enabled: bool,
    /// Density field seed.
    pub seed: u64,
    /// Density field edge length.
    pub density_field_size: u32,
    /// Noise frequency of each octave.
    pub octave_scales: Vec<f64>,
    /// Number of noise periods across the field.
    pub repeat_factor: f64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            steps: 12,
            smoke_amount: 1.0,
            intensity: 1.0,
            denoise_strength: 0.6,
            resolution_scale: 0.25,
            volume_size: [20.0, 10.0, 20.0],
            volume_position: [0.0, 2.0, 0.0],
            ao_samples: 16,
            ao_radius: 0.25,
            ao_scale: 1.0,
            ao_thickness: 1.0,
            ao_distance_exponent: 1.0,
            ao_distance_falloff: 1.0,
            ao_resolution_scale: 0.5,
            use_traa: true,
            use_temporal_filtering: true,
            volumetric_enabled: true,
            seed: FieldSeed::default().value(),
            density_field_size: DEFAULT_FIELD_SIZE,
            octave_scales: vec![10.0],
            repeat_factor: 5.0,
        }
    }
}

impl RendererConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Configuration` for malformed TOML or unknown
    /// keys. Values are not range-checked here; see [`Self::validate`].
    pub fn from_toml_str(text: &str) -> RenderResult<Self> {
        toml::from_str(text).map_err(|e| RenderError::config(format!("renderer config: {e}")))
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Configuration` if the file cannot be read or
    /// parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RenderError::config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks every value.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting.
    pub fn validate(&self) -> RenderResult<()> {
        LiveParameters::from_config(self)?;
        self.volume_bounds()?;
        validate_size(self.density_field_size)?;
        if self.octave_scales.is_empty() {
            return Err(RenderError::config("octave_scales must not be empty"));
        }
        Ok(())
    }

    /// The configured medium box.
    ///
    /// # Errors
    ///
    /// Fails for non-positive sizes or non-finite coordinates.
    pub fn volume_bounds(&self) -> RenderResult<VolumeBounds> {
        VolumeBounds::new(self.volume_position, self.volume_size)
    }

    /// Density field seed.
    #[must_use]
    pub fn field_seed(&self) -> FieldSeed {
        FieldSeed::new(self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        RendererConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RendererConfig::from_toml_str(
            "steps = 24\nsmoke_amount = 0.5\nvolume_size = [4.0, 2.0, 4.0]\nuse_traa = false\n",
        )
        .unwrap();
        assert_eq!(config.steps, 24);
        assert_eq!(config.smoke_amount, 0.5);
        assert_eq!(config.volume_size, [4.0, 2.0, 4.0]);
        assert!(!config.use_traa);
        assert_eq!(config.ao_samples, RendererConfig::default().ao_samples);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = RendererConfig::from_toml_str("stepz = 3").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = RendererConfig {
            smoke_amount: 2.0,
            ..RendererConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RendererConfig {
            volume_size: [1.0, 0.0, 1.0],
            ..RendererConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RendererConfig {
            density_field_size: 100,
            ..RendererConfig::default()
        };
        assert!(matches!(config.validate(), Err(RenderError::Field(_))));
    }
}
