//! # PENUMBRA
//!
//! Volumetric lighting on top of a small multi-pass compositor.
//!
//! ## Crates
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────────────────────┐
//! │ penumbra_procedural  │─────>│ penumbra_rendering                   │
//! │                      │      │                                      │
//! │  • Improved noise    │      │  • Pass graph (DAG, resolutions)     │
//! │  • Density field     │      │  • Pre-pass, AO, scene, volumetric   │
//! │                      │      │  • Blur, upsample, compose, TRAA     │
//! └──────────────────────┘      │  • FXAA, present, FrameCompositor    │
//!                               └──────────────────┬───────────────────┘
//!                                                  │
//!                               ┌──────────────────▼───────────────────┐
//!                               │ penumbra (this crate)                │
//!                               │  • demo stage                        │
//!                               │  • penumbra_headless binary          │
//!                               └──────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use penumbra::{demo, FrameCompositor, RenderContext, RendererConfig, TargetSurface};
//!
//! # fn main() -> penumbra::RenderResult<()> {
//! let mut ctx = RenderContext::new(TargetSurface::new(640, 360, 1.0)?);
//! let mut compositor = FrameCompositor::new(&mut ctx, RendererConfig::default())?;
//! let scene = demo::stage(&compositor)?;
//! compositor.render(&mut ctx, &scene, &demo::camera(640.0 / 360.0))?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod demo;

pub use penumbra_procedural as procedural;
pub use penumbra_rendering as rendering;

pub use penumbra_rendering::{
    Camera, FrameCompositor, FrameReport, RenderContext, RenderError, RenderResult,
    RendererConfig, Scene, TargetSurface,
};
