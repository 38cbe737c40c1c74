//! Reflection of a whole pipeline
//!
//! A [`PipelineReflection`] collects the resources of every shader stage of a pipeline. Stage
//! inputs and outputs and push constant blocks are kept in their own maps; everything that is
//! bound through descriptors is routed to the [`DescriptorSetReflection`] of its set. From this
//! the pipeline layout can be derived.

use super::descriptor_set::DescriptorSetReflection;
use super::resource::{PipelineResource, PipelineResourceMember, ResourceType};
use crate::backend::{DescriptorSetLayout, Device, PipelineLayout, PushConstantRange};
use crate::error::ReflectionError;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub struct PipelineReflection {
    device: Arc<dyn Device>,
    inputs: BTreeMap<String, PipelineResource>,
    outputs: BTreeMap<String, PipelineResource>,
    push_constant_buffers: BTreeMap<String, PipelineResource>,
    descriptor_sets: BTreeMap<u32, Arc<DescriptorSetReflection>>,
    layout: Mutex<Option<Arc<PipelineLayout>>>,
}

impl PipelineReflection {
    pub fn new(device: Arc<dyn Device>) -> Self {
        Self {
            device,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            push_constant_buffers: BTreeMap::new(),
            descriptor_sets: BTreeMap::new(),
            layout: Mutex::new(None),
        }
    }

    /// Add a resource reported by one shader stage.
    ///
    /// Inputs and outputs are keyed by stage and name, since different stages may legally use the
    /// same name. Everything else is keyed by name alone and merges stage masks on collision.
    pub fn add_resource(&mut self, resource: PipelineResource) -> Result<(), ReflectionError> {
        let map = match resource.resource_type {
            ResourceType::Input => Some(&mut self.inputs),
            ResourceType::Output => Some(&mut self.outputs),
            ResourceType::PushConstantBuffer => Some(&mut self.push_constant_buffers),
            ResourceType::None => {
                return Err(ReflectionError::UnexpectedResourceType {
                    name: resource.name,
                    resource_type: resource.resource_type,
                    stages: resource.stages,
                })
            }
            _ => None,
        };

        match map {
            Some(map) => {
                let key = match resource.resource_type {
                    ResourceType::Input | ResourceType::Output => {
                        format!("{}:{}", resource.stages.bits(), resource.name)
                    }
                    _ => resource.name.clone(),
                };
                match map.get_mut(&key) {
                    Some(existing) => existing.merge_stages(resource.stages),
                    None => {
                        map.insert(key, resource);
                    }
                }
            }
            None => {
                let set = self
                    .descriptor_sets
                    .entry(resource.set)
                    .or_insert_with(|| {
                        Arc::new(DescriptorSetReflection::new(
                            Arc::clone(&self.device),
                            resource.set,
                        ))
                    });
                Arc::make_mut(set).add_resource(resource)?;
            }
        }

        *self.layout.get_mut() = None;
        Ok(())
    }

    pub fn descriptor_set_reflections(&self) -> &BTreeMap<u32, Arc<DescriptorSetReflection>> {
        &self.descriptor_sets
    }

    /// Resources of one kind, from whichever map holds that kind.
    pub fn resources_of_type(
        &self,
        resource_type: ResourceType,
    ) -> BTreeMap<String, PipelineResource> {
        match resource_type {
            ResourceType::Input => self.inputs.clone(),
            ResourceType::Output => self.outputs.clone(),
            ResourceType::PushConstantBuffer => self.push_constant_buffers.clone(),
            _ => self
                .descriptor_sets
                .values()
                .flat_map(|set| set.resources_of_type(resource_type))
                .collect(),
        }
    }

    /// Every resource of the pipeline.
    pub fn resources(&self) -> BTreeMap<String, PipelineResource> {
        let mut result: BTreeMap<String, PipelineResource> = BTreeMap::new();
        for set in self.descriptor_sets.values() {
            for (name, resource) in set.resources() {
                result
                    .entry(name.clone())
                    .or_insert_with(|| resource.clone());
            }
        }
        for map in [&self.inputs, &self.outputs, &self.push_constant_buffers] {
            for (key, resource) in map {
                result.entry(key.clone()).or_insert_with(|| resource.clone());
            }
        }
        result
    }

    /// Push constant ranges of all blocks that are visible to at least one stage.
    pub fn push_constant_ranges(&self) -> Vec<PushConstantRange> {
        self.push_constant_buffers
            .values()
            .filter(|r| !r.stages.is_empty())
            .map(|r| PushConstantRange {
                stages: r.stages,
                offset: r.offset,
                size: r.size,
            })
            .collect()
    }

    /// The pipeline layout made of all set layouts and push constant ranges.
    ///
    /// Set numbers without resources get an empty layout, so that set `n` is always found at
    /// index `n` of the layout.
    pub fn layout(&self) -> Result<Arc<PipelineLayout>, ReflectionError> {
        let mut cached = self.layout.lock();
        if let Some(layout) = cached.as_ref() {
            return Ok(Arc::clone(layout));
        }

        let set_count = self
            .descriptor_sets
            .keys()
            .next_back()
            .map_or(0, |last| last + 1);
        let mut set_layouts = Vec::with_capacity(set_count as usize);
        for index in 0..set_count {
            let layout = match self.descriptor_sets.get(&index) {
                Some(set) => set.layout()?,
                None => Arc::new(DescriptorSetLayout::new(Arc::clone(&self.device), Vec::new())?),
            };
            set_layouts.push(layout);
        }

        let layout = Arc::new(PipelineLayout::new(
            Arc::clone(&self.device),
            set_layouts,
            self.push_constant_ranges(),
        )?);
        log::trace!(
            "Created pipeline layout ({} sets, {} push constant ranges)",
            layout.set_layouts().len(),
            layout.push_constant_ranges().len()
        );
        *cached = Some(Arc::clone(&layout));
        Ok(layout)
    }

    /// Log a human readable dump of all resources.
    pub fn print_info(&self) {
        for line in self.to_string().lines() {
            log::info!("{line}");
        }
    }
}

fn write_member(
    f: &mut fmt::Formatter<'_>,
    member: &PipelineResourceMember,
    indent: usize,
) -> fmt::Result {
    writeln!(
        f,
        "{:indent$}- \"{}\", type: {}, dims: {}x{}[{}], size: {}, offset: {}",
        "",
        member.name,
        member.base_type.as_str(),
        member.columns,
        member.vec_size,
        member.array_size,
        member.size,
        member.offset,
        indent = indent * 2
    )?;
    for child in &member.members {
        write_member(f, child, indent + 1)?;
    }
    Ok(())
}

impl fmt::Display for PipelineReflection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (title, map) in [("Inputs", &self.inputs), ("Outputs", &self.outputs)] {
            writeln!(f, "{title}")?;
            for r in map.values() {
                writeln!(
                    f,
                    "  - \"{}\" ({:?}, binding: {}, location: {})",
                    r.name, r.stages, r.binding, r.location
                )?;
            }
        }

        writeln!(f, "PushConstants")?;
        for r in self.push_constant_buffers.values() {
            writeln!(
                f,
                "  - \"{}\" ({:?}, size: {}, offset: {})",
                r.name, r.stages, r.size, r.offset
            )?;
        }

        for (index, set) in &self.descriptor_sets {
            writeln!(f, "set: {index}")?;
            for r in set.resources().values() {
                writeln!(
                    f,
                    "  - \"{}\" ({}, {:?}, access: {:?}, set: {}, binding: {}, location: {})",
                    r.name,
                    r.resource_type.as_str(),
                    r.stages,
                    r.access,
                    r.set,
                    r.binding,
                    r.location
                )?;
                for member in &r.members {
                    write_member(f, member, 2)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for PipelineReflection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineReflection")
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("push_constant_buffers", &self.push_constant_buffers)
            .field("descriptor_sets", &self.descriptor_sets)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyDevice;
    use crate::backend::ShaderStageFlags;
    use crate::reflection::BaseType;

    fn reflection() -> (Arc<DummyDevice>, PipelineReflection) {
        let device = Arc::new(DummyDevice::new());
        let reflection = PipelineReflection::new(device.clone());
        (device, reflection)
    }

    #[test]
    fn test_inputs_are_keyed_by_stage_and_name() {
        let (_, mut reflection) = reflection();
        reflection
            .add_resource(PipelineResource::new(
                "color",
                ResourceType::Input,
                ShaderStageFlags::VERTEX,
            ))
            .unwrap();
        reflection
            .add_resource(PipelineResource::new(
                "color",
                ResourceType::Input,
                ShaderStageFlags::FRAGMENT,
            ))
            .unwrap();

        let inputs = reflection.resources_of_type(ResourceType::Input);
        assert_eq!(inputs.len(), 2);
        assert!(inputs.contains_key("1:color"));
        assert!(inputs.contains_key("16:color"));
    }

    #[test]
    fn test_descriptor_resources_are_routed_to_their_set() {
        let (_, mut reflection) = reflection();
        reflection
            .add_resource(
                PipelineResource::new(
                    "camera",
                    ResourceType::UniformBuffer,
                    ShaderStageFlags::VERTEX,
                )
                .with_set(0),
            )
            .unwrap();
        reflection
            .add_resource(
                PipelineResource::new(
                    "albedo",
                    ResourceType::CombinedImageSampler,
                    ShaderStageFlags::FRAGMENT,
                )
                .with_set(2),
            )
            .unwrap();

        let sets = reflection.descriptor_set_reflections();
        assert_eq!(sets.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert!(sets[&2].resources().contains_key("albedo"));
        assert_eq!(
            reflection
                .resources_of_type(ResourceType::UniformBuffer)
                .len(),
            1
        );
        assert_eq!(reflection.resources().len(), 2);
    }

    #[test]
    fn test_rejects_none_kind() {
        let (_, mut reflection) = reflection();
        let err = reflection
            .add_resource(PipelineResource::new("x", ResourceType::None, ShaderStageFlags::VERTEX))
            .unwrap_err();
        assert!(err.is_kind_error());
    }

    #[test]
    fn test_layout_fills_set_gaps_and_skips_stageless_push_constants() {
        let (device, mut reflection) = reflection();
        reflection
            .add_resource(
                PipelineResource::new(
                    "lights",
                    ResourceType::StorageBuffer,
                    ShaderStageFlags::FRAGMENT,
                )
                .with_set(1),
            )
            .unwrap();
        reflection
            .add_resource(
                PipelineResource::new(
                    "transform",
                    ResourceType::PushConstantBuffer,
                    ShaderStageFlags::VERTEX,
                )
                .with_range(0, 64),
            )
            .unwrap();
        reflection
            .add_resource(
                PipelineResource::new(
                    "unused",
                    ResourceType::PushConstantBuffer,
                    ShaderStageFlags::empty(),
                )
                .with_range(64, 16),
            )
            .unwrap();

        let layout = reflection.layout().unwrap();
        assert!(Arc::ptr_eq(&layout, &reflection.layout().unwrap()));

        let native = device.pipeline_layout(layout.handle()).unwrap();
        assert_eq!(native.set_layouts.len(), 2);
        assert_eq!(
            device.descriptor_set_layout(native.set_layouts[0]).unwrap(),
            Vec::new()
        );
        assert_eq!(
            native.push_constant_ranges,
            vec![PushConstantRange {
                stages: ShaderStageFlags::VERTEX,
                offset: 0,
                size: 64,
            }]
        );
    }

    #[test]
    fn test_add_resource_invalidates_layout() {
        let (_, mut reflection) = reflection();
        reflection
            .add_resource(PipelineResource::new(
                "camera",
                ResourceType::UniformBuffer,
                ShaderStageFlags::VERTEX,
            ))
            .unwrap();
        let first = reflection.layout().unwrap();
        reflection
            .add_resource(PipelineResource::new(
                "camera",
                ResourceType::UniformBuffer,
                ShaderStageFlags::FRAGMENT,
            ))
            .unwrap();
        let second = reflection.layout().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(
            second.set_layouts()[0].bindings()[0].stages,
            ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn test_shared_set_is_copied_on_write() {
        let (_, mut reflection) = reflection();
        reflection
            .add_resource(PipelineResource::new(
                "camera",
                ResourceType::UniformBuffer,
                ShaderStageFlags::VERTEX,
            ))
            .unwrap();
        let shared = Arc::clone(&reflection.descriptor_set_reflections()[&0]);
        reflection
            .add_resource(
                PipelineResource::new(
                    "lights",
                    ResourceType::UniformBuffer,
                    ShaderStageFlags::VERTEX,
                )
                .with_binding(1),
            )
            .unwrap();
        assert_eq!(shared.resources().len(), 1);
        assert_eq!(reflection.descriptor_set_reflections()[&0].resources().len(), 2);
    }

    #[test]
    fn test_display_lists_members() {
        let (_, mut reflection) = reflection();
        reflection
            .add_resource(
                PipelineResource::new(
                    "material",
                    ResourceType::UniformBuffer,
                    ShaderStageFlags::FRAGMENT,
                )
                .with_members(vec![PipelineResourceMember {
                    name: "roughness".to_string(),
                    base_type: BaseType::Float,
                    size: 4,
                    vec_size: 1,
                    columns: 1,
                    ..Default::default()
                }]),
            )
            .unwrap();
        let text = reflection.to_string();
        assert!(text.contains("set: 0"));
        assert!(text.contains("\"material\" (uniform_buffer"));
        assert!(
            text.contains("    - \"roughness\", type: float, dims: 1x1[0], size: 4, offset: 0")
        );
    }
}
