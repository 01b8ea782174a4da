//! # Render Error Types
//!
//! Every failure the compositor reports to its host.
//!
//! Configuration problems (bad parameters, malformed graphs, invalid field
//! settings) are distinguished from runtime failures (device memory, device
//! loss) so hosts can decide whether retrying makes sense.

use penumbra_procedural::FieldError;
use thiserror::Error;

use crate::device::DeviceError;

/// Errors raised while building or validating a pass graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two nodes share a name.
    #[error("duplicate node name '{0}'")]
    DuplicateNode(String),

    /// A node handle does not belong to this builder.
    #[error("unknown node handle #{0}")]
    UnknownNode(usize),

    /// A binding names an input port the node does not declare.
    #[error("node '{node}' has no input port '{port}'")]
    UnknownInput {
        /// Node being bound.
        node: String,
        /// Offending port.
        port: String,
    },

    /// A binding names an output port the source node does not declare.
    #[error("node '{node}' has no output port '{port}'")]
    UnknownOutput {
        /// Source node.
        node: String,
        /// Offending port.
        port: String,
    },

    /// An input port was bound twice.
    #[error("input '{port}' of node '{node}' is already bound")]
    AlreadyBound {
        /// Node being bound.
        node: String,
        /// Offending port.
        port: String,
    },

    /// An input port was never bound.
    #[error("input '{port}' of node '{node}' is not bound")]
    Unbound {
        /// Node with the dangling input.
        node: String,
        /// Dangling port.
        port: String,
    },

    /// A node inherits its resolution but has no input to inherit from.
    #[error("node '{0}' inherits its resolution but declares no inputs")]
    NoResolutionSource(String),

    /// The bindings contain a cycle.
    #[error("cycle detected through node '{0}'")]
    Cycle(String),
}

/// Errors that can occur while configuring or rendering.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A parameter or config value was outside its accepted range.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The pass graph is malformed.
    #[error("invalid pass graph: {0}")]
    Graph(#[from] GraphError),

    /// The density field could not be synthesized.
    #[error("invalid density field: {0}")]
    Field(#[from] FieldError),

    /// The device refused an allocation.
    #[error("out of device memory allocating '{label}': requested {requested} bytes with {in_use} of {budget} in use")]
    ResourceExhaustion {
        /// Resource being allocated.
        label: String,
        /// Bytes requested.
        requested: u64,
        /// Bytes already allocated.
        in_use: u64,
        /// Device budget in bytes.
        budget: u64,
    },

    /// A pass failed on the device.
    #[error("pass '{pass}' failed: {reason}")]
    BackendExecution {
        /// Pass that aborted the frame.
        pass: String,
        /// Backend message.
        reason: String,
    },

    /// The renderer was used after `dispose`.
    #[error("renderer used after dispose")]
    UseAfterDispose,
}

impl RenderError {
    /// Shorthand for a configuration error.
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// True for errors caused by the caller's configuration rather than
    /// the device.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Graph(_) | Self::Field(_)
        )
    }

    /// Attributes an anonymous backend failure to `pass`.
    #[must_use]
    pub(crate) fn in_pass(self, pass: &str) -> Self {
        match self {
            Self::BackendExecution { pass: p, reason } if p.is_empty() => Self::BackendExecution {
                pass: pass.to_string(),
                reason,
            },
            other => other,
        }
    }
}

impl From<DeviceError> for RenderError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::OutOfMemory {
                label,
                requested,
                in_use,
                budget,
            } => Self::ResourceExhaustion {
                label,
                requested,
                in_use,
                budget,
            },
            other => Self::BackendExecution {
                pass: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(RenderError::config("bad").is_configuration());
        assert!(RenderError::from(GraphError::Cycle("a".into())).is_configuration());
        assert!(RenderError::from(FieldError::EmptyOctaves).is_configuration());
        assert!(!RenderError::UseAfterDispose.is_configuration());
        assert!(!RenderError::from(DeviceError::Lost).is_configuration());
    }

    #[test]
    fn test_in_pass_fills_only_anonymous_failures() {
        let named = RenderError::from(DeviceError::Lost).in_pass("fxaa");
        assert!(matches!(
            &named,
            RenderError::BackendExecution { pass, .. } if pass == "fxaa"
        ));

        // Already attributed: keep the original pass.
        let kept = named.in_pass("display");
        assert!(matches!(
            kept,
            RenderError::BackendExecution { pass, .. } if pass == "fxaa"
        ));

        assert_eq!(
            RenderError::UseAfterDispose.in_pass("fxaa"),
            RenderError::UseAfterDispose
        );
    }

    #[test]
    fn test_out_of_memory_maps_to_exhaustion() {
        let err = RenderError::from(DeviceError::OutOfMemory {
            label: "scene.color".into(),
            requested: 64,
            in_use: 32,
            budget: 80,
        });
        assert!(matches!(err, RenderError::ResourceExhaustion { requested: 64, .. }));
    }
}
