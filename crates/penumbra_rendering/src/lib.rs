//! # PENUMBRA Rendering
//!
//! Real-time volumetric lighting composited through a multi-pass graph.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        FRAME GRAPH                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Pre-Pass → AO → Scene color ─────────────────┐               │
//! │                      │ depth                   ↓              │
//! │                      └→ Volumetric → Blur H/V → Upsample      │
//! │                                       → × intensity → Add     │
//! │                                                    ↓          │
//! │                          TRAA → FXAA → Clamp → Present (sRGB) │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every pass executes on the CPU reference backend ([`device::SoftwareDevice`]),
//! which models texture allocation with `wgpu` descriptors, a memory budget
//! and device loss. The volumetric march and the blur also ship as WGSL
//! kernels fed by the same `bytemuck` uniform blocks.
//!
//! ## Guarantees
//!
//! - Same config, scene and camera produce the same pixels
//! - Graph order is computed once at build time
//! - Invalid parameters are rejected, never clamped
//! - Resize, rebuild and dispose release every texture they replace
//!
//! ## Example
//!
//! ```rust,no_run
//! use penumbra_rendering::{
//!     Camera, FrameCompositor, Light, RenderContext, RendererConfig, Renderable, Scene,
//!     TargetSurface,
//! };
//!
//! let mut ctx = RenderContext::new(TargetSurface::new(640, 360, 1.0)?);
//! let mut compositor = FrameCompositor::new(&mut ctx, RendererConfig::default())?;
//!
//! let mut scene = Scene::new();
//! scene.add_object(Renderable::plane(1, [0.0, -1.0, 0.0], [0.0, 1.0, 0.0]));
//! let mut spot = Light::spot([0.0, 4.0, 0.0], [0.0; 3], [1.0; 3], 40.0, 0.5);
//! compositor.enable_light_for_volumetric(&mut spot)?;
//! scene.add_light(spot);
//!
//! let report = compositor.render(&mut ctx, &scene, &Camera::default())?;
//! assert_eq!(ctx.frame_extent(), report.surface_extent);
//! compositor.dispose(&mut ctx)?;
//! # Ok::<(), penumbra_rendering::RenderError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod camera;
pub mod compositor;
pub mod config;
pub mod device;
pub mod error;
pub mod graph;
pub mod math;
pub mod params;
pub mod passes;
pub mod scene;
pub mod uniforms;

pub use camera::Camera;
pub use compositor::{FrameCompositor, FrameReport};
pub use config::RendererConfig;
pub use device::{
    Image, RenderContext, ResizeHandle, SoftwareDevice, TargetSurface, TextureDesc, Texel,
    MAX_PIXEL_RATIO,
};
pub use error::{GraphError, RenderError, RenderResult};
pub use graph::{CompositeGraph, GraphBuilder, NodeId, RenderNode, Resolution, ScaleSource};
pub use params::{LiveParameters, ScaleParam, ScalarParam};
pub use passes::VolumeBounds;
pub use scene::{
    Background, Layers, Light, LightKind, Material, ObjectId, Renderable, Scene, Shape,
    LAYER_DEFAULT, LAYER_VOLUMETRIC,
};
