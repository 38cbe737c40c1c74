//! Frame graph
//!
//! A frame is described as logical passes that read and write logical resources. The graph
//! validates that description, orders the passes by their dependencies, drops passes that do
//! not contribute to the output window, and records the remaining passes once per frame.

mod graph;
mod pass;
mod physical;
mod resource;
mod schedule;

pub use graph::FrameGraph;
pub use pass::{
    LogicalPass, PassCallback, PassHandle, ResourceAccess, ResourceBinding, ResourceUsage,
};
pub use physical::{PhysicalAttachment, PhysicalPass, PhysicalResource};
pub use resource::{LogicalResource, ResourceHandle, ResourceSizing};
