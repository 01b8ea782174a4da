//! # Render Passes
//!
//! Every node of the default frame graph:
//!
//! | Node | Module | Output |
//! |------|--------|--------|
//! | `pre_pass` | [`geometry`] | normal, velocity, depth |
//! | `ao` | [`ao`] | occlusion term |
//! | `scene` | [`geometry`] | lit color, depth |
//! | `volumetric` | [`volumetric`] | scattered light |
//! | `denoise_h`, `denoise_v`, `upsample`, `scale`, `compose`, `display` | [`combinators`] | color |
//! | `traa` | [`traa`] | anti-aliased color |
//! | `fxaa` | [`fxaa`] | anti-aliased color |
//! | `present` | [`present`] | sRGB surface |

pub mod ao;
pub mod combinators;
pub mod dither;
pub mod fxaa;
pub mod geometry;
pub mod present;
pub mod traa;
pub mod volumetric;

pub use ao::AmbientOcclusionPass;
pub use combinators::{Add, BlurAxis, Clamp, GaussianBlur, Multiply, SampleAtUv, ScalarSource};
pub use fxaa::FxaaPass;
pub use geometry::{PrePass, ScenePass};
pub use present::{linear_to_srgb, Present};
pub use traa::TemporalReprojectionPass;
pub use volumetric::{VolumeBounds, VolumetricScatteringPass};
