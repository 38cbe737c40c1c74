//! Reflection of a single descriptor set

use super::hash::ContentHash;
use super::resource::{PipelineResource, ResourceType};
use crate::backend::{DescriptorSetLayout, DescriptorSetLayoutBinding, Device};
use crate::error::ReflectionError;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// All descriptor-bound resources of one set index, merged across shader stages.
///
/// The layout and the hash are computed on first access and dropped again by every
/// [`add_resource`](Self::add_resource).
pub struct DescriptorSetReflection {
    device: Arc<dyn Device>,
    set: u32,
    resources: BTreeMap<String, PipelineResource>,
    layout: Mutex<Option<Arc<DescriptorSetLayout>>>,
    hash: Mutex<Option<ContentHash>>,
}

impl DescriptorSetReflection {
    pub fn new(device: Arc<dyn Device>, set: u32) -> Self {
        Self {
            device,
            set,
            resources: BTreeMap::new(),
            layout: Mutex::new(None),
            hash: Mutex::new(None),
        }
    }

    /// Add a resource of this set.
    ///
    /// A resource whose name is already known only contributes its stages.
    pub fn add_resource(&mut self, resource: PipelineResource) -> Result<(), ReflectionError> {
        if !resource.resource_type.is_descriptor() {
            return Err(ReflectionError::UnexpectedResourceType {
                name: resource.name,
                resource_type: resource.resource_type,
                stages: resource.stages,
            });
        }

        if resource.set != self.set {
            return Err(ReflectionError::SetMismatch {
                name: resource.name,
                expected: self.set,
                found: resource.set,
            });
        }

        *self.layout.get_mut() = None;
        *self.hash.get_mut() = None;

        match self.resources.get_mut(&resource.name) {
            Some(existing) => existing.merge_stages(resource.stages),
            None => {
                self.resources.insert(resource.name.clone(), resource);
            }
        }

        Ok(())
    }

    pub fn set(&self) -> u32 {
        self.set
    }

    pub fn resources(&self) -> &BTreeMap<String, PipelineResource> {
        &self.resources
    }

    pub fn resources_of_type(
        &self,
        resource_type: ResourceType,
    ) -> BTreeMap<String, PipelineResource> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == resource_type)
            .map(|(name, r)| (name.clone(), r.clone()))
            .collect()
    }

    /// Layout bindings, ordered by binding index.
    pub fn bindings(&self) -> Vec<DescriptorSetLayoutBinding> {
        let mut bindings: Vec<_> = self
            .resources
            .values()
            .filter_map(|r| {
                r.resource_type
                    .descriptor_type()
                    .map(|descriptor_type| DescriptorSetLayoutBinding {
                        binding: r.binding,
                        descriptor_type,
                        descriptor_count: r.array_size.max(1),
                        stages: r.stages,
                    })
            })
            .collect();
        bindings.sort_by_key(|b| b.binding);
        bindings
    }

    /// The descriptor set layout for the current resources.
    pub fn layout(&self) -> Result<Arc<DescriptorSetLayout>, ReflectionError> {
        let mut cached = self.layout.lock();
        if let Some(layout) = cached.as_ref() {
            return Ok(Arc::clone(layout));
        }

        let layout = Arc::new(DescriptorSetLayout::new(
            Arc::clone(&self.device),
            self.bindings(),
        )?);
        log::trace!(
            "Created descriptor set layout for set {} ({} bindings)",
            self.set,
            layout.bindings().len()
        );
        *cached = Some(Arc::clone(&layout));
        Ok(layout)
    }

    /// Hash of the binding content, ignoring resource names.
    ///
    /// Sets with equal hashes can use the same descriptor set layout.
    pub fn hash(&self) -> ContentHash {
        *self.hash.lock().get_or_insert_with(|| {
            let mut hash = ContentHash::new();
            for binding in self.bindings() {
                hash.push(&binding.binding)
                    .push(&binding.descriptor_type)
                    .push(&binding.stages.bits())
                    .push(&binding.descriptor_count);
            }
            hash
        })
    }
}

impl Clone for DescriptorSetReflection {
    fn clone(&self) -> Self {
        Self {
            device: Arc::clone(&self.device),
            set: self.set,
            resources: self.resources.clone(),
            layout: Mutex::new(self.layout.lock().clone()),
            hash: Mutex::new(*self.hash.lock()),
        }
    }
}

impl fmt::Debug for DescriptorSetReflection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorSetReflection")
            .field("set", &self.set)
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyDevice;
    use crate::backend::{DescriptorType, ShaderStageFlags};

    fn uniform(name: &str, binding: u32, stages: ShaderStageFlags) -> PipelineResource {
        PipelineResource::new(name, ResourceType::UniformBuffer, stages).with_binding(binding)
    }

    #[test]
    fn test_rejects_non_descriptor_kinds() {
        let mut set = DescriptorSetReflection::new(Arc::new(DummyDevice::new()), 0);
        for resource_type in [
            ResourceType::Input,
            ResourceType::Output,
            ResourceType::PushConstantBuffer,
            ResourceType::None,
        ] {
            let err = set
                .add_resource(PipelineResource::new("x", resource_type, ShaderStageFlags::VERTEX))
                .unwrap_err();
            assert!(err.is_kind_error());
        }
        assert!(set.resources().is_empty());
    }

    #[test]
    fn test_rejects_other_set() {
        let mut set = DescriptorSetReflection::new(Arc::new(DummyDevice::new()), 1);
        let err = set
            .add_resource(uniform("camera", 0, ShaderStageFlags::VERTEX).with_set(0))
            .unwrap_err();
        assert!(matches!(
            err,
            ReflectionError::SetMismatch {
                expected: 1,
                found: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_name_collision_unions_stages() {
        let mut set = DescriptorSetReflection::new(Arc::new(DummyDevice::new()), 0);
        set.add_resource(uniform("camera", 0, ShaderStageFlags::VERTEX))
            .unwrap();
        set.add_resource(uniform("camera", 0, ShaderStageFlags::FRAGMENT))
            .unwrap();

        assert_eq!(set.resources().len(), 1);
        assert_eq!(
            set.resources()["camera"].stages,
            ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn test_layout_is_memoized_until_mutation() {
        let device = Arc::new(DummyDevice::new());
        let mut set = DescriptorSetReflection::new(device.clone(), 0);
        set.add_resource(uniform("camera", 0, ShaderStageFlags::VERTEX))
            .unwrap();

        let first = set.layout().unwrap();
        let second = set.layout().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(device.live_descriptor_set_layouts(), 1);

        set.add_resource(
            PipelineResource::new(
                "albedo",
                ResourceType::CombinedImageSampler,
                ShaderStageFlags::FRAGMENT,
            )
            .with_binding(1)
            .with_array_size(4),
        )
        .unwrap();
        let third = set.layout().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));

        let bindings = device.descriptor_set_layout(third.handle()).unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[1].descriptor_type, DescriptorType::CombinedImageSampler);
        assert_eq!(bindings[1].descriptor_count, 4);
    }

    #[test]
    fn test_dropping_layout_destroys_it() {
        let device = Arc::new(DummyDevice::new());
        let mut set = DescriptorSetReflection::new(device.clone(), 0);
        set.add_resource(uniform("camera", 0, ShaderStageFlags::VERTEX))
            .unwrap();
        let layout = set.layout().unwrap();
        drop(set);
        assert_eq!(device.live_descriptor_set_layouts(), 1);
        drop(layout);
        assert_eq!(device.live_descriptor_set_layouts(), 0);
    }

    #[test]
    fn test_hash_ignores_names() {
        let device: Arc<dyn Device> = Arc::new(DummyDevice::new());
        let mut a = DescriptorSetReflection::new(device.clone(), 0);
        a.add_resource(uniform("camera", 0, ShaderStageFlags::VERTEX))
            .unwrap();
        let mut b = DescriptorSetReflection::new(device, 0);
        b.add_resource(uniform("view", 0, ShaderStageFlags::VERTEX))
            .unwrap();
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_hash_is_stable_and_changes_on_add() {
        let mut set = DescriptorSetReflection::new(Arc::new(DummyDevice::new()), 0);
        set.add_resource(uniform("camera", 0, ShaderStageFlags::VERTEX))
            .unwrap();
        let before = set.hash();
        assert_eq!(before, set.hash());

        set.add_resource(uniform("lights", 1, ShaderStageFlags::FRAGMENT))
            .unwrap();
        assert_ne!(before, set.hash());
    }
}
