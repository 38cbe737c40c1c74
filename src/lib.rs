//! Frame Graph - declarative per-frame GPU work scheduling
//!
//! A frame is described as passes that read and write resources. The graph:
//! - validates the description (handle ownership, a single output window, attachment extents)
//! - orders passes by walking dependencies backward from the output pass, culling the rest
//! - keeps per-frame-in-flight command recorders, fences and semaphores
//! - records and submits the scheduled passes every frame
//!
//! The [`reflection`] module turns shader reflection data into descriptor set layouts and
//! pipeline layouts.
//!
//! Two backends implement the device traits:
//! - **Vulkan**: via ash (native only)
//! - **Dummy**: records submissions in memory, for tests and headless runs

pub mod backend;
pub mod error;
pub mod frame_graph;
pub mod frame_resource_index;
pub mod reflection;
pub mod window;

pub use backend::{CommandRecorder, Device, Format};
pub use error::{GraphError, ReflectionError, TopologyError};
pub use frame_graph::{
    FrameGraph, LogicalPass, LogicalResource, PassHandle, ResourceAccess, ResourceHandle,
    ResourceSizing, ResourceUsage,
};
pub use frame_resource_index::{FrameResourceIndex, FrameResources};
pub use reflection::{DescriptorSetReflection, PipelineReflection, PipelineResource, ResourceType};
pub use window::{HeadlessWindow, OutputWindow};

/// Configuration for creating a [`FrameGraph`]
#[derive(Debug, Clone)]
pub struct FrameGraphConfig {
    /// Number of frames the CPU may record ahead of the GPU
    pub frames_in_flight: usize,
    /// How long `process` waits for a slot's previous frame, in nanoseconds
    pub fence_timeout_ns: u64,
}

impl Default for FrameGraphConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            fence_timeout_ns: u64::MAX,
        }
    }
}
