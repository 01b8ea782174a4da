//! Output texture allocation.
//!
//! Every output port owns one device texture. At the start of each frame
//! the table recomputes every extent from the surface size and the live
//! parameters, and reallocates exactly the slots whose extent changed.

use wgpu::TextureFormat;

use crate::device::{SoftwareDevice, TextureDesc, TextureId};
use crate::error::{RenderError, RenderResult};
use crate::params::LiveParameters;

use super::builder::{CompositeGraph, NodeId};
use super::node::{PortName, Resolution};

/// Extent of a target rendered at `scale` of `full`: floored, rounded
/// down to an even size, and never below one texel.
#[must_use]
pub fn scaled_extent(full: (u32, u32), scale: f32) -> (u32, u32) {
    let axis = |v: u32| {
        let scaled = (v as f32 * scale).floor() as u32;
        (scaled & !1).max(1)
    };
    if scale >= 1.0 {
        return full;
    }
    (axis(full.0), axis(full.1))
}

struct Slot {
    port: PortName,
    format: TextureFormat,
    texture: Option<TextureId>,
    extent: (u32, u32),
}

/// Output textures of every node in a graph.
pub struct ResourceTable {
    slots: Vec<Vec<Slot>>,
}

impl ResourceTable {
    /// Empty slots for every declared output; nothing is allocated yet.
    #[must_use]
    pub fn new(graph: &CompositeGraph) -> Self {
        let slots = graph
            .node_ids()
            .map(|id| {
                graph
                    .node(id)
                    .outputs()
                    .iter()
                    .map(|spec| Slot {
                        port: spec.name,
                        format: spec.format,
                        texture: None,
                        extent: (0, 0),
                    })
                    .collect()
            })
            .collect();
        Self { slots }
    }

    /// Brings every allocation in line with the current surface and
    /// parameters. Returns the nodes whose outputs were (re)allocated.
    ///
    /// # Errors
    ///
    /// Propagates device allocation failures, attributed to the node.
    pub fn reconcile(
        &mut self,
        graph: &CompositeGraph,
        device: &mut SoftwareDevice,
        surface: (u32, u32),
        params: &LiveParameters,
    ) -> RenderResult<Vec<NodeId>> {
        let mut changed = Vec::new();

        for &id in graph.order() {
            let node = graph.node(id);
            let extent = match node.resolution() {
                Resolution::Scaled(source) => scaled_extent(surface, source.resolve(params)),
                Resolution::Inherit => {
                    let first = graph.bindings(id)[0];
                    self.extent(first.source, first.output).unwrap_or(surface)
                }
            };

            let mut reallocated = false;
            for slot in &mut self.slots[id.index()] {
                if slot.texture.is_some() && slot.extent == extent {
                    continue;
                }
                if let Some(old) = slot.texture.take() {
                    device.release_texture(old);
                }
                let label = format!("{}.{}", node.name(), slot.port);
                let desc = TextureDesc::new_2d(label, slot.format, extent.0, extent.1);
                let texture = device
                    .create_texture(desc)
                    .map_err(|e| RenderError::from(e).in_pass(node.name()))?;
                slot.texture = Some(texture);
                slot.extent = extent;
                reallocated = true;
            }
            if reallocated {
                tracing::debug!(node = node.name(), width = extent.0, height = extent.1, "outputs allocated");
                changed.push(id);
            }
        }

        Ok(changed)
    }

    /// Texture behind `node.port`.
    #[must_use]
    pub fn texture(&self, node: NodeId, port: &str) -> Option<TextureId> {
        self.slot(node, port).and_then(|s| s.texture)
    }

    /// Allocated extent of `node.port`.
    #[must_use]
    pub fn extent(&self, node: NodeId, port: &str) -> Option<(u32, u32)> {
        self.slot(node, port)
            .filter(|s| s.texture.is_some())
            .map(|s| s.extent)
    }

    /// `(port, texture)` for every allocated output of `node`.
    #[must_use]
    pub fn outputs(&self, node: NodeId) -> Vec<(PortName, TextureId)> {
        self.slots[node.index()]
            .iter()
            .filter_map(|s| s.texture.map(|t| (s.port, t)))
            .collect()
    }

    /// Frees every texture.
    pub fn release_all(&mut self, device: &mut SoftwareDevice) {
        for slot in self.slots.iter_mut().flatten() {
            if let Some(texture) = slot.texture.take() {
                device.release_texture(texture);
            }
        }
    }

    fn slot(&self, node: NodeId, port: &str) -> Option<&Slot> {
        self.slots.get(node.index())?.iter().find(|s| s.port == port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_extent_floors_to_even() {
        assert_eq!(scaled_extent((1920, 1080), 0.25), (480, 270));
        assert_eq!(scaled_extent((101, 77), 0.5), (50, 38));
        assert_eq!(scaled_extent((99, 99), 0.1), (8, 8));
    }

    #[test]
    fn test_scaled_extent_minimum_one() {
        assert_eq!(scaled_extent((3, 3), 0.25), (1, 1));
        assert_eq!(scaled_extent((1, 1), 0.01), (1, 1));
    }

    #[test]
    fn test_full_scale_is_exact() {
        assert_eq!(scaled_extent((101, 77), 1.0), (101, 77));
    }
}
