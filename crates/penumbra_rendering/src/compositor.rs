//! # Frame Compositor
//!
//! Owns the pass graph, its output textures, the uploaded density volume
//! and the live parameters, and drives one frame per [`FrameCompositor::render`]
//! call.
//!
//! ## Frame Lifecycle
//!
//! ```text
//! render()
//!   ├─ apply pending resize
//!   ├─ reconcile output allocations (may reallocate, resets history)
//!   ├─ execute every node in graph order
//!   ├─ present the `present` node's surface texture
//!   └─ remember camera + object positions for motion vectors
//! ```
//!
//! A frame either completes or aborts with the failing pass logged and
//! returned. The graph is only rebuilt by explicit structural calls.

use std::collections::HashMap;

use penumbra_procedural::NoiseFieldSynthesizer;

use crate::camera::Camera;
use crate::config::RendererConfig;
use crate::device::{Image, RenderContext, ResizeHandle, TextureId, VolumeId};
use crate::error::{RenderError, RenderResult};
use crate::graph::{
    CompositeGraph, FrameInputs, GraphBuilder, NodeId, PassInputs, PassOutputs, PortName,
    ResourceTable, ScaleSource,
};
use crate::math::Vec3;
use crate::params::{LiveParameters, ScalarParam};
use crate::passes::{
    Add, AmbientOcclusionPass, BlurAxis, Clamp, FxaaPass, GaussianBlur, Multiply, PrePass,
    Present, SampleAtUv, ScalarSource, ScenePass, TemporalReprojectionPass, VolumeBounds,
    VolumetricScatteringPass,
};
use crate::scene::{Layers, Light, ObjectId, Scene, LAYER_VOLUMETRIC};

/// Summary of one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Zero-based index of the frame.
    pub frame_index: u64,
    /// Nodes executed.
    pub nodes_executed: usize,
    /// Physical size of the presented frame.
    pub surface_extent: (u32, u32),
    /// True if a pending resize was applied before this frame.
    pub resized: bool,
}

/// Builds the frame graph for `config`.
///
/// The volumetric chain and the TRAA node are only declared when enabled,
/// so disabling them removes their cost entirely.
fn build_graph(
    config: &RendererConfig,
    bounds: VolumeBounds,
    volume: VolumeId,
) -> RenderResult<(CompositeGraph, NodeId)> {
    let mut g = GraphBuilder::new();

    let pre = g.add(PrePass::new())?;
    let ao = g.add(AmbientOcclusionPass::new(config.use_temporal_filtering))?;
    g.bind(ao, "depth", pre, "depth")?;
    g.bind(ao, "normal", pre, "normal")?;
    g.bind(ao, "velocity", pre, "velocity")?;

    let scene = g.add(ScenePass::new())?;
    g.bind(scene, "ao", ao, "ao")?;

    let mut color: (NodeId, PortName) = (scene, "color");

    if config.volumetric_enabled {
        let vol = g.add(VolumetricScatteringPass::new(bounds, volume))?;
        g.bind(vol, "depth", scene, "depth")?;

        let blur_h = g.add(GaussianBlur::new("denoise_h", BlurAxis::Horizontal))?;
        g.bind(blur_h, "input", vol, "color")?;
        let blur_v = g.add(GaussianBlur::new("denoise_v", BlurAxis::Vertical))?;
        g.bind(blur_v, "input", blur_h, "output")?;

        let upsample = g.add(SampleAtUv::new("upsample", ScaleSource::Fixed(1.0)))?;
        g.bind(upsample, "input", blur_v, "output")?;
        let scale = g.add(Multiply::new(
            "scale",
            ScalarSource::Live(ScalarParam::Intensity),
        ))?;
        g.bind(scale, "input", upsample, "output")?;

        let compose = g.add(Add::new("compose"))?;
        g.bind(compose, "a", scene, "color")?;
        g.bind(compose, "b", scale, "output")?;
        color = (compose, "output");
    }

    if config.use_traa {
        let traa = g.add(TemporalReprojectionPass::new())?;
        g.bind(traa, "color", color.0, color.1)?;
        g.bind(traa, "depth", scene, "depth")?;
        g.bind(traa, "velocity", pre, "velocity")?;
        color = (traa, "color");
    }

    let fxaa = g.add(FxaaPass)?;
    g.bind(fxaa, "color", color.0, color.1)?;
    let display = g.add(Clamp::new("display", 0.0, 1.0))?;
    g.bind(display, "input", fxaa, "color")?;
    let present = g.add(Present)?;
    g.bind(present, "color", display, "output")?;

    Ok((g.build()?, present))
}

/// Volumetric frame renderer.
pub struct FrameCompositor {
    config: RendererConfig,
    params: LiveParameters,
    bounds: VolumeBounds,
    volume: VolumeId,
    graph: CompositeGraph,
    present: NodeId,
    resources: ResourceTable,
    resize: ResizeHandle,
    previous_camera: Option<Camera>,
    previous_positions: HashMap<ObjectId, Vec3>,
    frame_index: u64,
    disposed: bool,
}

impl FrameCompositor {
    /// Validates `config`, synthesizes and uploads the density field, and
    /// builds the frame graph. Output textures are allocated lazily by the
    /// first frame.
    ///
    /// # Errors
    ///
    /// Configuration errors for invalid settings; `ResourceExhaustion` if
    /// the density volume does not fit the device budget.
    pub fn new(ctx: &mut RenderContext, config: RendererConfig) -> RenderResult<Self> {
        config.validate()?;
        let params = LiveParameters::from_config(&config)?;
        let bounds = config.volume_bounds()?;

        let field = NoiseFieldSynthesizer::new(config.field_seed()).build(
            config.density_field_size,
            &config.octave_scales,
            config.repeat_factor,
        )?;
        let volume = ctx
            .device_mut()
            .create_volume("density_field", field)
            .map_err(|e| RenderError::from(e).in_pass("volumetric"))?;

        let (graph, present) = match build_graph(&config, bounds, volume) {
            Ok(built) => built,
            Err(e) => {
                ctx.device_mut().release_volume(volume);
                return Err(e);
            }
        };
        let resources = ResourceTable::new(&graph);

        tracing::info!(
            nodes = graph.len(),
            order = ?graph.names(),
            field_size = config.density_field_size,
            "frame compositor ready"
        );

        Ok(Self {
            config,
            params,
            bounds,
            volume,
            graph,
            present,
            resources,
            resize: ResizeHandle::default(),
            previous_camera: None,
            previous_positions: HashMap::new(),
            frame_index: 0,
            disposed: false,
        })
    }

    fn ensure_live(&self) -> RenderResult<()> {
        if self.disposed {
            Err(RenderError::UseAfterDispose)
        } else {
            Ok(())
        }
    }

    /// Renders one frame of `scene` seen from `camera` into the context's
    /// surface.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose` after [`Self::dispose`]; a configuration error for
    /// an invalid camera; `ResourceExhaustion` or `BackendExecution` when a
    /// pass cannot allocate or run. A failed frame presents nothing.
    pub fn render(
        &mut self,
        ctx: &mut RenderContext,
        scene: &Scene,
        camera: &Camera,
    ) -> RenderResult<FrameReport> {
        self.ensure_live()?;
        camera.validate()?;

        let resized = self.apply_pending_resize(ctx)?;
        let extent = ctx.surface().physical_size();

        let changed = self
            .resources
            .reconcile(&self.graph, ctx.device_mut(), extent, &self.params)
            .map_err(|e| {
                tracing::error!(frame = self.frame_index, error = %e, "frame aborted during allocation");
                e
            })?;
        for id in changed {
            self.graph.node_mut(id).on_reallocated();
        }

        let order = self.graph.order().to_vec();
        for &id in &order {
            if let Err(e) = self.execute_node(ctx, scene, camera, id) {
                tracing::error!(
                    frame = self.frame_index,
                    pass = self.graph.node(id).name(),
                    error = %e,
                    "frame aborted"
                );
                return Err(e);
            }
        }

        let surface = self.output_texture(self.present, "surface")?;
        let frame = ctx.device().texture(surface).map_err(RenderError::from)?.clone();
        ctx.present(&frame);

        self.previous_camera = Some(*camera);
        self.previous_positions = scene.objects.iter().map(|o| (o.id, o.position)).collect();

        let report = FrameReport {
            frame_index: self.frame_index,
            nodes_executed: order.len(),
            surface_extent: extent,
            resized,
        };
        self.frame_index += 1;
        tracing::debug!(
            frame = report.frame_index,
            width = extent.0,
            height = extent.1,
            nodes = report.nodes_executed,
            "frame rendered"
        );
        Ok(report)
    }

    fn apply_pending_resize(&mut self, ctx: &mut RenderContext) -> RenderResult<bool> {
        let Some((width, height)) = self.resize.take() else {
            return Ok(false);
        };
        let surface = ctx.surface().resized(width, height)?;
        tracing::debug!(width, height, physical = ?surface.physical_size(), "surface resized");
        ctx.set_surface(surface);
        Ok(true)
    }

    fn output_texture(&self, node: NodeId, port: &str) -> RenderResult<TextureId> {
        self.resources
            .texture(node, port)
            .ok_or_else(|| RenderError::BackendExecution {
                pass: self.graph.node(node).name().to_string(),
                reason: format!("output '{port}' is not allocated"),
            })
    }

    fn execute_node(
        &mut self,
        ctx: &mut RenderContext,
        scene: &Scene,
        camera: &Camera,
        id: NodeId,
    ) -> RenderResult<()> {
        let bound = self
            .graph
            .bindings(id)
            .iter()
            .map(|b| Ok((b.input, self.output_texture(b.source, b.output)?)))
            .collect::<RenderResult<Vec<_>>>()?;
        let own = self.resources.outputs(id);
        let mut outputs = PassOutputs::new(
            own.iter()
                .map(|&(port, _)| (port, self.resources.extent(id, port).unwrap_or((0, 0)))),
        );

        let frame = FrameInputs {
            scene,
            camera,
            previous_camera: self.previous_camera.as_ref(),
            previous_positions: &self.previous_positions,
            params: &self.params,
            device: ctx.device(),
        };
        let inputs = PassInputs::new(ctx.device(), bound, own.clone());
        let node = self.graph.node_mut(id);
        let name = node.name().to_string();
        let layers = node.layer_mask().map(Layers::bits);
        node.execute(&frame, &inputs, &mut outputs)
            .map_err(|e| e.in_pass(&name))?;

        for (port, image) in outputs.into_images() {
            let image = image.ok_or_else(|| RenderError::BackendExecution {
                pass: name.clone(),
                reason: format!("output '{port}' was not written"),
            })?;
            let texture = own
                .iter()
                .find(|(p, _)| *p == port)
                .map(|&(_, t)| t)
                .ok_or_else(|| RenderError::BackendExecution {
                    pass: name.clone(),
                    reason: format!("output '{port}' is not allocated"),
                })?;
            ctx.device_mut()
                .write_texture(texture, image)
                .map_err(|e| RenderError::from(e).in_pass(&name))?;
        }

        tracing::trace!(pass = %name, frame = self.frame_index, ?layers, "pass executed");
        Ok(())
    }

    /// Sets the march step count.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a configuration error for an out-of-range value.
    pub fn set_steps(&mut self, steps: u32) -> RenderResult<()> {
        self.ensure_live()?;
        self.params.set_steps(steps)
    }

    /// Sets the density modulation blend.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a configuration error for an out-of-range value.
    pub fn set_smoke_amount(&mut self, amount: f32) -> RenderResult<()> {
        self.ensure_live()?;
        self.params.set_smoke_amount(amount)
    }

    /// Sets the scattered-light multiplier.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a configuration error for an out-of-range value.
    pub fn set_intensity(&mut self, intensity: f32) -> RenderResult<()> {
        self.ensure_live()?;
        self.params.set_intensity(intensity)
    }

    /// Sets the blur tap spacing.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a configuration error for an out-of-range value.
    pub fn set_denoise_strength(&mut self, strength: f32) -> RenderResult<()> {
        self.ensure_live()?;
        self.params.set_denoise_strength(strength)
    }

    /// Sets the volumetric chain's resolution fraction. Takes effect at the
    /// next frame's allocation pass.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a configuration error for a value outside
    /// `(0, 1]`.
    pub fn set_resolution(&mut self, scale: f32) -> RenderResult<()> {
        self.ensure_live()?;
        self.params.set_volumetric_resolution(scale)
    }

    /// Sets the occlusion sample count.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a configuration error for an out-of-range value.
    pub fn set_ao_samples(&mut self, samples: u32) -> RenderResult<()> {
        self.ensure_live()?;
        self.params.set_ao_samples(samples)
    }

    /// Sets the occlusion radius.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a configuration error for an out-of-range value.
    pub fn set_ao_radius(&mut self, radius: f32) -> RenderResult<()> {
        self.ensure_live()?;
        self.params.set_ao_radius(radius)
    }

    /// Sets the occlusion strength.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a configuration error for an out-of-range value.
    pub fn set_ao_scale(&mut self, scale: f32) -> RenderResult<()> {
        self.ensure_live()?;
        self.params.set_ao_scale(scale)
    }

    /// Sets the occlusion thickness.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a configuration error for an out-of-range value.
    pub fn set_ao_thickness(&mut self, thickness: f32) -> RenderResult<()> {
        self.ensure_live()?;
        self.params.set_ao_thickness(thickness)
    }

    /// Sets the occlusion resolution fraction.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a configuration error for a value outside
    /// `(0, 1]`.
    pub fn set_ao_resolution(&mut self, scale: f32) -> RenderResult<()> {
        self.ensure_live()?;
        self.params.set_ao_resolution(scale)
    }

    /// Adds `light` to the volumetric layer. Calling it twice is harmless.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`.
    pub fn enable_light_for_volumetric(&self, light: &mut Light) -> RenderResult<()> {
        self.ensure_live()?;
        light.layers.enable(LAYER_VOLUMETRIC);
        Ok(())
    }

    /// Adds or removes the TRAA node.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a graph error from the rebuild.
    pub fn set_traa_enabled(&mut self, ctx: &mut RenderContext, enabled: bool) -> RenderResult<()> {
        self.ensure_live()?;
        if self.config.use_traa == enabled {
            return Ok(());
        }
        self.config.use_traa = enabled;
        self.rebuild(ctx)
    }

    /// Adds or removes the volumetric chain.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a graph error from the rebuild.
    pub fn set_volumetric_enabled(
        &mut self,
        ctx: &mut RenderContext,
        enabled: bool,
    ) -> RenderResult<()> {
        self.ensure_live()?;
        if self.config.volumetric_enabled == enabled {
            return Ok(());
        }
        self.config.volumetric_enabled = enabled;
        self.rebuild(ctx)
    }

    /// Switches temporal filtering of the occlusion term.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a graph error from the rebuild.
    pub fn set_temporal_filtering(
        &mut self,
        ctx: &mut RenderContext,
        enabled: bool,
    ) -> RenderResult<()> {
        self.ensure_live()?;
        if self.config.use_temporal_filtering == enabled {
            return Ok(());
        }
        self.config.use_temporal_filtering = enabled;
        self.rebuild(ctx)
    }

    /// Moves or resizes the participating-medium box.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a configuration error for an invalid box.
    pub fn reconfigure_volume(
        &mut self,
        ctx: &mut RenderContext,
        position: Vec3,
        size: Vec3,
    ) -> RenderResult<()> {
        self.ensure_live()?;
        let bounds = VolumeBounds::new(position, size)?;
        self.config.volume_position = position;
        self.config.volume_size = size;
        self.bounds = bounds;
        self.rebuild(ctx)
    }

    fn rebuild(&mut self, ctx: &mut RenderContext) -> RenderResult<()> {
        let (graph, present) = build_graph(&self.config, self.bounds, self.volume)?;
        self.resources.release_all(ctx.device_mut());
        self.graph = graph;
        self.present = present;
        self.resources = ResourceTable::new(&self.graph);
        tracing::info!(nodes = self.graph.len(), order = ?self.graph.names(), "frame graph rebuilt");
        Ok(())
    }

    /// Posts a new CSS surface size, applied at the start of the next frame.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose`, or a configuration error for a zero dimension.
    pub fn on_resize(&self, width: u32, height: u32) -> RenderResult<()> {
        self.ensure_live()?;
        self.resize.request(width, height)
    }

    /// Handle for posting resizes from another thread.
    #[must_use]
    pub fn resize_handle(&self) -> ResizeHandle {
        self.resize.clone()
    }

    /// Releases the density volume and every output texture. The
    /// compositor is unusable afterwards.
    ///
    /// # Errors
    ///
    /// `UseAfterDispose` on a second call.
    pub fn dispose(&mut self, ctx: &mut RenderContext) -> RenderResult<()> {
        self.ensure_live()?;
        self.resources.release_all(ctx.device_mut());
        ctx.device_mut().release_volume(self.volume);
        self.disposed = true;
        tracing::info!(frames = self.frame_index, "frame compositor disposed");
        Ok(())
    }

    /// True after [`Self::dispose`].
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Node names in execution order.
    #[must_use]
    pub fn execution_order(&self) -> Vec<&str> {
        self.graph.names()
    }

    /// Allocated extent of `node.port`, if the node exists and has rendered.
    #[must_use]
    pub fn output_extent(&self, node: &str, port: &str) -> Option<(u32, u32)> {
        self.graph
            .find(node)
            .and_then(|id| self.resources.extent(id, port))
    }

    /// Layer mask `node` filters the scene with, or `None` for image-only
    /// passes and unknown names.
    #[must_use]
    pub fn layer_mask(&self, node: &str) -> Option<Layers> {
        self.graph
            .find(node)
            .and_then(|id| self.graph.node(id).layer_mask())
    }

    /// Last image written to `node.port`.
    #[must_use]
    pub fn output_image<'a>(
        &self,
        ctx: &'a RenderContext,
        node: &str,
        port: &str,
    ) -> Option<&'a Image> {
        let texture = self.resources.texture(self.graph.find(node)?, port)?;
        ctx.device().texture(texture).ok()
    }

    /// Live parameters.
    #[must_use]
    pub fn params(&self) -> &LiveParameters {
        &self.params
    }

    /// Medium box.
    #[must_use]
    pub fn volume_bounds(&self) -> VolumeBounds {
        self.bounds
    }

    /// Current structural configuration.
    #[must_use]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Frames rendered so far.
    #[must_use]
    pub fn frames_rendered(&self) -> u64 {
        self.frame_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::TargetSurface;

    fn small_config() -> RendererConfig {
        RendererConfig {
            density_field_size: 8,
            ..RendererConfig::default()
        }
    }

    fn context() -> RenderContext {
        RenderContext::new(TargetSurface::new(16, 8, 1.0).unwrap())
    }

    #[test]
    fn test_default_order() {
        let mut ctx = context();
        let c = FrameCompositor::new(&mut ctx, small_config()).unwrap();
        assert_eq!(
            c.execution_order(),
            vec![
                "pre_pass", "ao", "scene", "volumetric", "denoise_h", "denoise_v", "upsample",
                "scale", "compose", "traa", "fxaa", "display", "present",
            ]
        );
    }

    #[test]
    fn test_disabled_stages_are_removed() {
        let mut ctx = context();
        let config = RendererConfig {
            use_traa: false,
            volumetric_enabled: false,
            ..small_config()
        };
        let c = FrameCompositor::new(&mut ctx, config).unwrap();
        assert_eq!(
            c.execution_order(),
            vec!["pre_pass", "ao", "scene", "fxaa", "display", "present"]
        );
    }

    #[test]
    fn test_layer_masks_per_pass() {
        let mut ctx = context();
        let c = FrameCompositor::new(&mut ctx, small_config()).unwrap();
        assert_eq!(c.layer_mask("pre_pass"), Some(Layers::default()));
        assert_eq!(c.layer_mask("scene"), Some(Layers::default()));
        assert_eq!(
            c.layer_mask("volumetric"),
            Some(Layers::single(LAYER_VOLUMETRIC))
        );
        assert_eq!(c.layer_mask("denoise_h"), None);
        assert_eq!(c.layer_mask("missing"), None);
    }

    #[test]
    fn test_invalid_config_uploads_nothing() {
        let mut ctx = context();
        let config = RendererConfig {
            steps: 0,
            ..small_config()
        };
        let err = FrameCompositor::new(&mut ctx, config).err().unwrap();
        assert!(err.is_configuration());
        assert_eq!(ctx.device().live_volumes(), 0);
    }

    #[test]
    fn test_rebuild_releases_outputs() {
        let mut ctx = context();
        let mut c = FrameCompositor::new(&mut ctx, small_config()).unwrap();
        c.render(&mut ctx, &Scene::new(), &Camera::default()).unwrap();
        let with_traa = ctx.device().live_textures();

        c.set_traa_enabled(&mut ctx, false).unwrap();
        assert_eq!(ctx.device().live_textures(), 0);
        assert!(!c.execution_order().contains(&"traa"));

        c.render(&mut ctx, &Scene::new(), &Camera::default()).unwrap();
        assert_eq!(ctx.device().live_textures(), with_traa - 1);
    }
}
