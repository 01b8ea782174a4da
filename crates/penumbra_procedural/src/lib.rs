//! # PENUMBRA Procedural Generation
//!
//! Deterministic density fields for volumetric scattering.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed always produces the same field, bit for bit
//! 2. **Periodic**: Fields wrap on every axis, so they can be tiled in space
//! 3. **One-shot**: Synthesis is an `O(S³)` initialization cost, never per frame
//!
//! ## Core Components
//!
//! - `ImprovedNoise`: 3D gradient noise with optional lattice period
//! - `NoiseFieldSynthesizer`: Bakes layered noise into a `DensityField`
//! - `DensityField`: Immutable `R8Unorm`-layout grid with wrap-around sampling
//!
//! ## Example
//!
//! ```rust
//! use penumbra_procedural::{FieldSeed, NoiseFieldSynthesizer};
//!
//! let synth = NoiseFieldSynthesizer::new(FieldSeed::new(12345));
//! let field = synth.build(32, &[10.0], 5.0)?;
//!
//! // Wrap-around sampling
//! let a = field.sample([0.25, 0.5, 0.75]);
//! let b = field.sample([1.25, 0.5, 0.75]);
//! assert!((a - b).abs() < 1e-5);
//! # Ok::<(), penumbra_procedural::FieldError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod density;
pub mod error;
pub mod noise;

pub use density::{
    encode_density, validate_size, DensityField, NoiseFieldSynthesizer, DEFAULT_FIELD_SIZE,
    FIELD_MIDPOINT, MAX_FIELD_SIZE, MIN_FIELD_SIZE,
};
pub use error::{FieldError, FieldResult};
pub use noise::{FieldSeed, ImprovedNoise};
