//! Error types for frame graph construction and shader reflection.

use crate::backend::{BackendError, ShaderStageFlags};
use crate::frame_graph::ResourceHandle;
use crate::reflection::ResourceType;
use glam::Vec2;
use thiserror::Error;

/// Structural problems in the pass/resource topology.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("There is no output window in the graph")]
    NoOutputWindow,

    #[error("There are multiple output windows in the graph (passes \"{first}\" and \"{second}\")")]
    MultipleOutputWindows { first: String, second: String },

    #[error("Input \"{resource}\" of pass \"{pass}\" is not the output of any previous pass")]
    UnsatisfiedInput { resource: String, pass: String },

    #[error(
        "Write-only output \"{resource}\" of pass \"{pass}\" is used by the preceding pass \"{preceding}\""
    )]
    ShadowedWrite {
        resource: String,
        pass: String,
        preceding: String,
    },
}

/// Frame graph errors
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Resource {resource} of pass \"{pass}\" does not belong to this frame graph")]
    Identity {
        resource: ResourceHandle,
        pass: String,
    },

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("Attachments of pass \"{pass}\" do not have the same size ({expected} vs {found})")]
    ExtentMismatch {
        pass: String,
        expected: Vec2,
        found: Vec2,
    },

    #[error(
        "Failed to add resource {resource} to frame graph pass \"{pass}\": resource has already been added to this pass"
    )]
    DuplicateResource {
        resource: ResourceHandle,
        pass: String,
    },

    #[error("Invalid frame graph configuration: {0}")]
    InvalidConfig(String),

    #[error("frame graph validation failed: {0}")]
    Validation(Box<GraphError>),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl GraphError {
    /// The underlying error, without the validation wrapper.
    pub fn root_cause(&self) -> &GraphError {
        match self {
            GraphError::Validation(inner) => inner.root_cause(),
            other => other,
        }
    }
}

/// Shader reflection errors
#[derive(Error, Debug)]
pub enum ReflectionError {
    #[error("Failed to add resource \"{name}\": {resource_type:?} resources cannot be added here")]
    UnexpectedResourceType {
        name: String,
        resource_type: ResourceType,
        stages: ShaderStageFlags,
    },

    #[error("Failed to add resource \"{name}\" of set {found} to the reflection of set {expected}")]
    SetMismatch {
        name: String,
        expected: u32,
        found: u32,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ReflectionError {
    /// Whether the error is about a resource that does not fit the reflection it was added to.
    pub fn is_kind_error(&self) -> bool {
        matches!(
            self,
            ReflectionError::UnexpectedResourceType { .. } | ReflectionError::SetMismatch { .. }
        )
    }
}
