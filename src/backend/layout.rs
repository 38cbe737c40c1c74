//! Owned layout objects
//!
//! Both wrappers destroy their native object when the last reference goes away, so memoized
//! layouts can be handed out as `Arc`s.

use crate::backend::traits::*;
use crate::backend::types::*;
use std::fmt;
use std::sync::Arc;

/// A descriptor set layout created on a [`Device`].
pub struct DescriptorSetLayout {
    device: Arc<dyn Device>,
    handle: DescriptorSetLayoutHandle,
    bindings: Vec<DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayout {
    pub fn new(
        device: Arc<dyn Device>,
        bindings: Vec<DescriptorSetLayoutBinding>,
    ) -> BackendResult<Self> {
        let handle = device.create_descriptor_set_layout(&bindings)?;
        Ok(Self {
            device,
            handle,
            bindings,
        })
    }

    pub fn handle(&self) -> DescriptorSetLayoutHandle {
        self.handle
    }

    pub fn bindings(&self) -> &[DescriptorSetLayoutBinding] {
        &self.bindings
    }
}

impl fmt::Debug for DescriptorSetLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorSetLayout")
            .field("handle", &self.handle)
            .field("bindings", &self.bindings)
            .finish()
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        self.device.destroy_descriptor_set_layout(self.handle);
    }
}

/// A pipeline layout created on a [`Device`].
///
/// Keeps the descriptor set layouts it was built from alive.
pub struct PipelineLayout {
    device: Arc<dyn Device>,
    handle: PipelineLayoutHandle,
    set_layouts: Vec<Arc<DescriptorSetLayout>>,
    push_constant_ranges: Vec<PushConstantRange>,
}

impl PipelineLayout {
    pub fn new(
        device: Arc<dyn Device>,
        set_layouts: Vec<Arc<DescriptorSetLayout>>,
        push_constant_ranges: Vec<PushConstantRange>,
    ) -> BackendResult<Self> {
        let handles: Vec<_> = set_layouts.iter().map(|layout| layout.handle()).collect();
        let handle = device.create_pipeline_layout(&handles, &push_constant_ranges)?;
        Ok(Self {
            device,
            handle,
            set_layouts,
            push_constant_ranges,
        })
    }

    pub fn handle(&self) -> PipelineLayoutHandle {
        self.handle
    }

    /// Set layouts, indexed by descriptor set number.
    pub fn set_layouts(&self) -> &[Arc<DescriptorSetLayout>] {
        &self.set_layouts
    }

    pub fn push_constant_ranges(&self) -> &[PushConstantRange] {
        &self.push_constant_ranges
    }
}

impl fmt::Debug for PipelineLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineLayout")
            .field("handle", &self.handle)
            .field("set_layouts", &self.set_layouts)
            .field("push_constant_ranges", &self.push_constant_ranges)
            .finish()
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        self.device.destroy_pipeline_layout(self.handle);
    }
}
