//! Shader reflection integration tests.
//!
//! Reflection data of a vertex and a fragment shader is fed into a [`PipelineReflection`] and the
//! layouts it creates are inspected on the dummy device.

#![cfg(feature = "dummy")]

mod common;

use std::sync::Arc;

use rstest::{fixture, rstest};

use frame_graph::backend::dummy::DummyDevice;
use frame_graph::backend::{DescriptorType, ShaderStageFlags};
use frame_graph::{
    DescriptorSetReflection, PipelineReflection, PipelineResource, ReflectionError, ResourceType,
};

#[fixture]
fn device() -> Arc<DummyDevice> {
    common::init_logging();
    Arc::new(DummyDevice::new())
}

/// What a typical lit mesh shader pair reports.
fn mesh_pipeline(device: &Arc<DummyDevice>) -> PipelineReflection {
    let mut reflection = PipelineReflection::new(device.clone());
    let vertex = ShaderStageFlags::VERTEX;
    let fragment = ShaderStageFlags::FRAGMENT;

    let resources = [
        PipelineResource::new("position", ResourceType::Input, vertex).with_location(0),
        PipelineResource::new("uv", ResourceType::Output, vertex).with_location(0),
        PipelineResource::new("uv", ResourceType::Input, fragment).with_location(0),
        PipelineResource::new("color", ResourceType::Output, fragment).with_location(0),
        PipelineResource::new("camera", ResourceType::UniformBuffer, vertex)
            .with_set(0)
            .with_binding(0)
            .with_range(0, 128),
        PipelineResource::new("camera", ResourceType::UniformBuffer, fragment)
            .with_set(0)
            .with_binding(0)
            .with_range(0, 128),
        PipelineResource::new("albedo", ResourceType::CombinedImageSampler, fragment)
            .with_set(2)
            .with_binding(1),
        PipelineResource::new("model", ResourceType::PushConstantBuffer, vertex)
            .with_range(0, 64),
    ];
    for resource in resources {
        reflection.add_resource(resource).unwrap();
    }
    reflection
}

#[rstest]
fn test_pipeline_layout_from_shader_pair(device: Arc<DummyDevice>) {
    let reflection = mesh_pipeline(&device);

    // The same name in different stages stays two entries for inputs and outputs.
    assert_eq!(reflection.resources_of_type(ResourceType::Input).len(), 2);
    assert_eq!(reflection.resources_of_type(ResourceType::Output).len(), 2);

    let uniforms = reflection.resources_of_type(ResourceType::UniformBuffer);
    let camera = &uniforms["camera"];
    assert_eq!(
        camera.stages,
        ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT
    );

    let layout = reflection.layout().unwrap();
    let created = device.pipeline_layout(layout.handle()).unwrap();

    // Set 1 has no resources but still gets a layout so that set 2 keeps its index.
    assert_eq!(created.set_layouts.len(), 3);
    assert!(device
        .descriptor_set_layout(created.set_layouts[1])
        .unwrap()
        .is_empty());

    let set0 = device.descriptor_set_layout(created.set_layouts[0]).unwrap();
    assert_eq!(set0.len(), 1);
    assert_eq!(set0[0].descriptor_type, DescriptorType::UniformBuffer);
    assert_eq!(set0[0].stages, camera.stages);

    let set2 = device.descriptor_set_layout(created.set_layouts[2]).unwrap();
    assert_eq!(set2[0].binding, 1);
    assert_eq!(set2[0].descriptor_type, DescriptorType::CombinedImageSampler);

    assert_eq!(created.push_constant_ranges.len(), 1);
    assert_eq!(created.push_constant_ranges[0].size, 64);
    assert_eq!(
        created.push_constant_ranges[0].stages,
        ShaderStageFlags::VERTEX
    );
}

#[rstest]
fn test_layouts_are_cached_until_resources_change(device: Arc<DummyDevice>) {
    let mut reflection = mesh_pipeline(&device);

    let first = reflection.layout().unwrap();
    let second = reflection.layout().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    reflection
        .add_resource(
            PipelineResource::new("lights", ResourceType::StorageBuffer, ShaderStageFlags::FRAGMENT)
                .with_set(0)
                .with_binding(1),
        )
        .unwrap();
    let third = reflection.layout().unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(
        device
            .descriptor_set_layout(third.set_layouts()[0].handle())
            .unwrap()
            .len(),
        2
    );

    drop((first, second, third));
    drop(reflection);
    assert_eq!(device.live_pipeline_layouts(), 0);
    assert_eq!(device.live_descriptor_set_layouts(), 0);
}

#[rstest]
#[case::input(ResourceType::Input)]
#[case::output(ResourceType::Output)]
#[case::push_constants(ResourceType::PushConstantBuffer)]
#[case::none(ResourceType::None)]
fn test_descriptor_set_rejects_non_descriptors(
    device: Arc<DummyDevice>,
    #[case] resource_type: ResourceType,
) {
    let mut set = DescriptorSetReflection::new(device, 0);
    let err = set
        .add_resource(PipelineResource::new(
            "value",
            resource_type,
            ShaderStageFlags::COMPUTE,
        ))
        .unwrap_err();

    assert!(err.is_kind_error());
    match err {
        ReflectionError::UnexpectedResourceType {
            resource_type: found,
            ..
        } => assert_eq!(found, resource_type),
        other => panic!("unexpected error: {other}"),
    }
    assert!(set.resources().is_empty());
}

#[rstest]
fn test_descriptor_set_rejects_other_sets(device: Arc<DummyDevice>) {
    let mut set = DescriptorSetReflection::new(device, 3);
    let err = set
        .add_resource(
            PipelineResource::new("globals", ResourceType::UniformBuffer, ShaderStageFlags::VERTEX)
                .with_set(1),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        ReflectionError::SetMismatch {
            expected: 3,
            found: 1,
            ..
        }
    ));
}

#[rstest]
fn test_pipeline_rejects_untyped_resources(device: Arc<DummyDevice>) {
    let mut reflection = PipelineReflection::new(device);
    let err = reflection
        .add_resource(PipelineResource::new(
            "mystery",
            ResourceType::None,
            ShaderStageFlags::VERTEX,
        ))
        .unwrap_err();
    assert!(err.is_kind_error());
    assert!(reflection.resources().is_empty());
}

#[rstest]
fn test_set_hash_ignores_names(device: Arc<DummyDevice>) {
    let build = |names: [&str; 2], stages: ShaderStageFlags| {
        let mut set = DescriptorSetReflection::new(device.clone(), 0);
        set.add_resource(
            PipelineResource::new(names[0], ResourceType::UniformBuffer, stages).with_binding(0),
        )
        .unwrap();
        set.add_resource(
            PipelineResource::new(names[1], ResourceType::SampledImage, stages)
                .with_binding(1)
                .with_array_size(4),
        )
        .unwrap();
        set
    };

    let a = build(["camera", "textures"], ShaderStageFlags::FRAGMENT);
    let b = build(["view", "images"], ShaderStageFlags::FRAGMENT);
    let c = build(["camera", "textures"], ShaderStageFlags::ALL_GRAPHICS);

    assert_eq!(a.hash(), b.hash());
    assert_ne!(a.hash(), c.hash());
    assert_eq!(a.bindings()[1].descriptor_count, 4);
}
