//! Shader resource reflection
//!
//! Turns the resources reported by shader reflection into descriptor set layouts and pipeline
//! layouts, merging declarations that appear in several stages.

mod descriptor_set;
mod hash;
mod pipeline;
mod resource;

pub use descriptor_set::DescriptorSetReflection;
pub use hash::ContentHash;
pub use pipeline::PipelineReflection;
pub use resource::{BaseType, PipelineResource, PipelineResourceMember, ResourceType};
