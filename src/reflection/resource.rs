//! Reflected shader resources

use crate::backend::types::{AccessFlags, DescriptorType, ShaderStageFlags};

/// Kind of a reflected shader resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ResourceType {
    Input,
    Output,
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    InputAttachment,
    PushConstantBuffer,
    #[default]
    None,
}

impl ResourceType {
    /// Descriptor type for kinds that live in a descriptor set.
    pub fn descriptor_type(self) -> Option<DescriptorType> {
        match self {
            ResourceType::Sampler => Some(DescriptorType::Sampler),
            ResourceType::CombinedImageSampler => Some(DescriptorType::CombinedImageSampler),
            ResourceType::SampledImage => Some(DescriptorType::SampledImage),
            ResourceType::StorageImage => Some(DescriptorType::StorageImage),
            ResourceType::UniformTexelBuffer => Some(DescriptorType::UniformTexelBuffer),
            ResourceType::StorageTexelBuffer => Some(DescriptorType::StorageTexelBuffer),
            ResourceType::UniformBuffer => Some(DescriptorType::UniformBuffer),
            ResourceType::StorageBuffer => Some(DescriptorType::StorageBuffer),
            ResourceType::InputAttachment => Some(DescriptorType::InputAttachment),
            ResourceType::Input
            | ResourceType::Output
            | ResourceType::PushConstantBuffer
            | ResourceType::None => None,
        }
    }

    pub fn is_descriptor(self) -> bool {
        self.descriptor_type().is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Input => "input",
            ResourceType::Output => "output",
            ResourceType::Sampler => "sampler",
            ResourceType::CombinedImageSampler => "combined_image_sampler",
            ResourceType::SampledImage => "sampled_image",
            ResourceType::StorageImage => "storage_image",
            ResourceType::UniformTexelBuffer => "uniform_texel_buffer",
            ResourceType::StorageTexelBuffer => "storage_texel_buffer",
            ResourceType::UniformBuffer => "uniform_buffer",
            ResourceType::StorageBuffer => "storage_buffer",
            ResourceType::InputAttachment => "input_attachment",
            ResourceType::PushConstantBuffer => "push_constant_buffer",
            ResourceType::None => "none",
        }
    }
}

/// Scalar type of a reflected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BaseType {
    Bool,
    Char,
    Int,
    Uint,
    Uint64,
    Half,
    Float,
    Double,
    Struct,
    #[default]
    None,
}

impl BaseType {
    pub fn as_str(self) -> &'static str {
        match self {
            BaseType::Bool => "bool",
            BaseType::Char => "char",
            BaseType::Int => "int",
            BaseType::Uint => "uint",
            BaseType::Uint64 => "uint64",
            BaseType::Half => "half",
            BaseType::Float => "float",
            BaseType::Double => "double",
            BaseType::Struct => "struct",
            BaseType::None => "none",
        }
    }
}

/// A member of a reflected block, possibly a struct with members of its own.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineResourceMember {
    pub name: String,
    pub base_type: BaseType,
    pub offset: u32,
    pub size: u32,
    pub vec_size: u32,
    pub columns: u32,
    pub array_size: u32,
    pub members: Vec<PipelineResourceMember>,
}

/// One resource declared by a shader module, as produced by shader reflection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineResource {
    pub name: String,
    pub resource_type: ResourceType,
    pub base_type: BaseType,
    pub stages: ShaderStageFlags,
    pub access: AccessFlags,
    pub set: u32,
    pub binding: u32,
    pub location: u32,
    pub offset: u32,
    pub size: u32,
    pub vec_size: u32,
    pub columns: u32,
    pub array_size: u32,
    pub members: Vec<PipelineResourceMember>,
}

impl PipelineResource {
    pub fn new(
        name: impl Into<String>,
        resource_type: ResourceType,
        stages: ShaderStageFlags,
    ) -> Self {
        Self {
            name: name.into(),
            resource_type,
            stages,
            ..Default::default()
        }
    }

    pub fn with_set(mut self, set: u32) -> Self {
        self.set = set;
        self
    }

    pub fn with_binding(mut self, binding: u32) -> Self {
        self.binding = binding;
        self
    }

    pub fn with_location(mut self, location: u32) -> Self {
        self.location = location;
        self
    }

    pub fn with_range(mut self, offset: u32, size: u32) -> Self {
        self.offset = offset;
        self.size = size;
        self
    }

    pub fn with_array_size(mut self, array_size: u32) -> Self {
        self.array_size = array_size;
        self
    }

    pub fn with_access(mut self, access: AccessFlags) -> Self {
        self.access = access;
        self
    }

    pub fn with_members(mut self, members: Vec<PipelineResourceMember>) -> Self {
        self.base_type = BaseType::Struct;
        self.members = members;
        self
    }

    /// Fold the stages of another declaration of the same resource into this one.
    pub fn merge_stages(&mut self, stages: ShaderStageFlags) {
        self.stages |= stages;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_kinds() {
        assert_eq!(
            ResourceType::UniformBuffer.descriptor_type(),
            Some(DescriptorType::UniformBuffer)
        );
        assert!(ResourceType::InputAttachment.is_descriptor());
        assert!(!ResourceType::Input.is_descriptor());
        assert!(!ResourceType::Output.is_descriptor());
        assert!(!ResourceType::PushConstantBuffer.is_descriptor());
        assert!(!ResourceType::None.is_descriptor());
    }

    #[test]
    fn test_merge_stages_is_order_independent() {
        let mut a =
            PipelineResource::new("tex", ResourceType::SampledImage, ShaderStageFlags::VERTEX);
        a.merge_stages(ShaderStageFlags::FRAGMENT);
        let mut b =
            PipelineResource::new("tex", ResourceType::SampledImage, ShaderStageFlags::FRAGMENT);
        b.merge_stages(ShaderStageFlags::VERTEX);
        assert_eq!(a.stages, b.stages);
        assert_eq!(a.stages, ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT);
    }
}
