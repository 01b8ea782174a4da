//! # Pass Graph
//!
//! A directed acyclic graph of render passes and texture combinators.
//!
//! ```text
//! GraphBuilder::add(node) ──► NodeId
//! GraphBuilder::bind(target.input ← source.output)
//! GraphBuilder::build() ──► CompositeGraph (validated, ordered)
//! ResourceTable::reconcile() ──► one texture per output port
//! ```
//!
//! Build-time errors are configuration errors: duplicate names, unknown or
//! unbound ports, and cycles are all rejected before a frame is rendered.

pub mod builder;
pub mod node;
pub mod resources;

pub use builder::{Binding, CompositeGraph, GraphBuilder, NodeId};
pub use node::{
    FrameInputs, OutputSpec, PassInputs, PassOutputs, PortName, RenderNode, Resolution,
    ScaleSource,
};
pub use resources::{scaled_extent, ResourceTable};
