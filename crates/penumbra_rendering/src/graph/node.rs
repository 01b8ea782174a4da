//! Pass node contract.
//!
//! A node declares named input and output ports, a resolution policy and
//! an `execute` step. Nodes never touch device memory directly: they read
//! inputs through [`PassInputs`] and hand finished images to
//! [`PassOutputs`]; the compositor uploads them once the node returns.

use std::collections::HashMap;

use wgpu::TextureFormat;

use crate::camera::Camera;
use crate::device::{Image, SoftwareDevice, TextureId};
use crate::error::{RenderError, RenderResult};
use crate::math::Vec3;
use crate::params::{LiveParameters, ScaleParam};
use crate::scene::{Layers, ObjectId, Scene};

/// Port identifier.
pub type PortName = &'static str;

/// Output port declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSpec {
    /// Port name.
    pub name: PortName,
    /// Texel format of the backing texture.
    pub format: TextureFormat,
}

/// Where a resolution fraction comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleSource {
    /// Constant fraction.
    Fixed(f32),
    /// Follows a live parameter.
    Live(ScaleParam),
}

impl ScaleSource {
    /// Current fraction.
    #[must_use]
    pub fn resolve(self, params: &LiveParameters) -> f32 {
        match self {
            Self::Fixed(v) => v,
            Self::Live(p) => params.scale(p),
        }
    }
}

/// Output extent policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Fraction of the surface's physical size.
    Scaled(ScaleSource),
    /// Same extent as the first bound input.
    Inherit,
}

impl Resolution {
    /// Full surface resolution.
    pub const FULL: Self = Self::Scaled(ScaleSource::Fixed(1.0));
}

/// Per-frame state shared by every node.
pub struct FrameInputs<'a> {
    /// Scene being rendered.
    pub scene: &'a Scene,
    /// Current camera.
    pub camera: &'a Camera,
    /// Camera of the previous completed frame, if any.
    pub previous_camera: Option<&'a Camera>,
    /// Object positions of the previous completed frame.
    pub previous_positions: &'a HashMap<ObjectId, Vec3>,
    /// Live parameters.
    pub params: &'a LiveParameters,
    /// Device, for volume access.
    pub device: &'a SoftwareDevice,
}

impl FrameInputs<'_> {
    /// Previous camera, or the current one on the first frame.
    #[must_use]
    pub fn history_camera(&self) -> &Camera {
        self.previous_camera.unwrap_or(self.camera)
    }
}

/// Read access to a node's bound inputs and its own previous outputs.
pub struct PassInputs<'a> {
    device: &'a SoftwareDevice,
    bound: Vec<(PortName, TextureId)>,
    own: Vec<(PortName, TextureId)>,
}

impl<'a> PassInputs<'a> {
    pub(crate) fn new(
        device: &'a SoftwareDevice,
        bound: Vec<(PortName, TextureId)>,
        own: Vec<(PortName, TextureId)>,
    ) -> Self {
        Self { device, bound, own }
    }

    fn lookup(&self, ports: &[(PortName, TextureId)], port: &str) -> RenderResult<&'a Image> {
        let id = ports
            .iter()
            .find(|(name, _)| *name == port)
            .map(|&(_, id)| id)
            .ok_or_else(|| RenderError::BackendExecution {
                pass: String::new(),
                reason: format!("no texture bound to port '{port}'"),
            })?;
        Ok(self.device.texture(id)?)
    }

    /// Contents of input `port`.
    ///
    /// # Errors
    ///
    /// Fails if the port is unbound or its texture is gone.
    pub fn image(&self, port: &str) -> RenderResult<&'a Image> {
        self.lookup(&self.bound, port)
    }

    /// What this node wrote to output `port` last frame; zeros right after
    /// (re)allocation.
    ///
    /// # Errors
    ///
    /// Fails if the node declares no such output.
    pub fn previous(&self, port: &str) -> RenderResult<&'a Image> {
        self.lookup(&self.own, port)
    }
}

/// Write side of a node execution.
pub struct PassOutputs {
    slots: Vec<(PortName, (u32, u32), Option<Image>)>,
}

impl PassOutputs {
    pub(crate) fn new(ports: impl IntoIterator<Item = (PortName, (u32, u32))>) -> Self {
        Self {
            slots: ports.into_iter().map(|(p, e)| (p, e, None)).collect(),
        }
    }

    /// Extent the image for `port` must have; `(0, 0)` for unknown ports.
    #[must_use]
    pub fn extent(&self, port: &str) -> (u32, u32) {
        self.slots
            .iter()
            .find(|(name, ..)| *name == port)
            .map_or((0, 0), |&(_, extent, _)| extent)
    }

    /// Stores the finished image for `port`.
    ///
    /// # Errors
    ///
    /// Fails for an undeclared port.
    pub fn write(&mut self, port: &str, image: Image) -> RenderResult<()> {
        let slot = self
            .slots
            .iter_mut()
            .find(|(name, ..)| *name == port)
            .ok_or_else(|| RenderError::BackendExecution {
                pass: String::new(),
                reason: format!("write to undeclared output '{port}'"),
            })?;
        slot.2 = Some(image);
        Ok(())
    }

    pub(crate) fn into_images(self) -> impl Iterator<Item = (PortName, Option<Image>)> {
        self.slots.into_iter().map(|(name, _, image)| (name, image))
    }
}

/// A pass in the compositing graph.
pub trait RenderNode: Send {
    /// Unique node name.
    fn name(&self) -> &str;

    /// Declared input ports.
    fn inputs(&self) -> &'static [PortName];

    /// Declared output ports.
    fn outputs(&self) -> &'static [OutputSpec];

    /// Output extent policy.
    fn resolution(&self) -> Resolution;

    /// Layers whose objects and lights this pass reads; `None` for passes
    /// that only consume images.
    fn layer_mask(&self) -> Option<Layers> {
        None
    }

    /// Renders one frame.
    ///
    /// # Errors
    ///
    /// Any failure aborts the frame.
    fn execute(
        &mut self,
        frame: &FrameInputs<'_>,
        inputs: &PassInputs<'_>,
        outputs: &mut PassOutputs,
    ) -> RenderResult<()>;

    /// Called after the node's outputs were reallocated; history-keeping
    /// nodes must drop their history here.
    fn on_reallocated(&mut self) {}
}
