//! Vulkan device implementation using ash
//!
//! The instance, physical device and logical device are created by the application; this
//! module wraps an existing `ash::Device` and one of its queues.

use crate::backend::traits::*;
use crate::backend::types::*;
use ash::vk;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Objects {
    fences: HashMap<u64, vk::Fence>,
    semaphores: HashMap<u64, vk::Semaphore>,
    descriptor_set_layouts: HashMap<u64, vk::DescriptorSetLayout>,
    pipeline_layouts: HashMap<u64, vk::PipelineLayout>,
    next_id: u64,
}

impl Objects {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

struct Shared {
    device: ash::Device,
    queue: Mutex<vk::Queue>,
    command_pool: Mutex<vk::CommandPool>,
    objects: Mutex<Objects>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                log::warn!("VulkanDevice: wait idle on drop failed: {e}");
            }

            let mut objects = self.objects.lock();
            for (_, layout) in objects.pipeline_layouts.drain() {
                self.device.destroy_pipeline_layout(layout, None);
            }
            for (_, layout) in objects.descriptor_set_layouts.drain() {
                self.device.destroy_descriptor_set_layout(layout, None);
            }
            for (_, semaphore) in objects.semaphores.drain() {
                self.device.destroy_semaphore(semaphore, None);
            }
            for (_, fence) in objects.fences.drain() {
                self.device.destroy_fence(fence, None);
            }

            self.device
                .destroy_command_pool(*self.command_pool.lock(), None);
        }
    }
}

/// Vulkan implementation of [`Device`].
///
/// Does not own the `ash::Device`; the application must keep it alive and destroy it after
/// every `VulkanDevice` and recorder is gone.
pub struct VulkanDevice {
    shared: Arc<Shared>,
}

impl VulkanDevice {
    /// Wrap `device` and the queue at (`queue_family_index`, `queue_index`).
    pub fn new(
        device: ash::Device,
        queue_family_index: u32,
        queue_index: u32,
    ) -> BackendResult<Self> {
        let queue = unsafe { device.get_device_queue(queue_family_index, queue_index) };

        let pool_info = vk::CommandPoolCreateInfo {
            flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            queue_family_index,
            ..Default::default()
        };
        let command_pool = unsafe {
            device
                .create_command_pool(&pool_info, None)
                .map_err(|e| BackendError::CommandRecorderCreationFailed(e.to_string()))?
        };

        log::debug!("VulkanDevice: using queue family {queue_family_index}, queue {queue_index}");

        Ok(Self {
            shared: Arc::new(Shared {
                device,
                queue: Mutex::new(queue),
                command_pool: Mutex::new(command_pool),
                objects: Mutex::new(Objects::default()),
            }),
        })
    }

    /// Get the wrapped ash device
    pub fn device(&self) -> &ash::Device {
        &self.shared.device
    }

    /// Native fence behind a handle, if it is still alive.
    pub fn fence(&self, fence: FenceHandle) -> Option<vk::Fence> {
        self.shared.objects.lock().fences.get(&fence.0).copied()
    }

    /// Native semaphore behind a handle, for presentation.
    pub fn semaphore(&self, semaphore: SemaphoreHandle) -> Option<vk::Semaphore> {
        self.shared
            .objects
            .lock()
            .semaphores
            .get(&semaphore.0)
            .copied()
    }

    pub fn descriptor_set_layout(
        &self,
        layout: DescriptorSetLayoutHandle,
    ) -> Option<vk::DescriptorSetLayout> {
        self.shared
            .objects
            .lock()
            .descriptor_set_layouts
            .get(&layout.0)
            .copied()
    }

    pub fn pipeline_layout(&self, layout: PipelineLayoutHandle) -> Option<vk::PipelineLayout> {
        self.shared
            .objects
            .lock()
            .pipeline_layouts
            .get(&layout.0)
            .copied()
    }

    fn convert_shader_stages(stages: ShaderStageFlags) -> vk::ShaderStageFlags {
        let mut flags = vk::ShaderStageFlags::empty();
        if stages.contains(ShaderStageFlags::VERTEX) {
            flags |= vk::ShaderStageFlags::VERTEX;
        }
        if stages.contains(ShaderStageFlags::TESSELLATION_CONTROL) {
            flags |= vk::ShaderStageFlags::TESSELLATION_CONTROL;
        }
        if stages.contains(ShaderStageFlags::TESSELLATION_EVALUATION) {
            flags |= vk::ShaderStageFlags::TESSELLATION_EVALUATION;
        }
        if stages.contains(ShaderStageFlags::GEOMETRY) {
            flags |= vk::ShaderStageFlags::GEOMETRY;
        }
        if stages.contains(ShaderStageFlags::FRAGMENT) {
            flags |= vk::ShaderStageFlags::FRAGMENT;
        }
        if stages.contains(ShaderStageFlags::COMPUTE) {
            flags |= vk::ShaderStageFlags::COMPUTE;
        }
        flags
    }

    fn convert_descriptor_type(ty: DescriptorType) -> vk::DescriptorType {
        match ty {
            DescriptorType::Sampler => vk::DescriptorType::SAMPLER,
            DescriptorType::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            DescriptorType::SampledImage => vk::DescriptorType::SAMPLED_IMAGE,
            DescriptorType::StorageImage => vk::DescriptorType::STORAGE_IMAGE,
            DescriptorType::UniformTexelBuffer => vk::DescriptorType::UNIFORM_TEXEL_BUFFER,
            DescriptorType::StorageTexelBuffer => vk::DescriptorType::STORAGE_TEXEL_BUFFER,
            DescriptorType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
            DescriptorType::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
            DescriptorType::InputAttachment => vk::DescriptorType::INPUT_ATTACHMENT,
        }
    }

    fn convert_wait_stages(stages: PipelineStageFlags) -> vk::PipelineStageFlags {
        let pairs = [
            (PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::TOP_OF_PIPE),
            (PipelineStageFlags::VERTEX_SHADER, vk::PipelineStageFlags::VERTEX_SHADER),
            (PipelineStageFlags::FRAGMENT_SHADER, vk::PipelineStageFlags::FRAGMENT_SHADER),
            (
                PipelineStageFlags::EARLY_FRAGMENT_TESTS,
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            ),
            (
                PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            ),
            (PipelineStageFlags::COMPUTE_SHADER, vk::PipelineStageFlags::COMPUTE_SHADER),
            (PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::TRANSFER),
            (PipelineStageFlags::BOTTOM_OF_PIPE, vk::PipelineStageFlags::BOTTOM_OF_PIPE),
        ];
        pairs
            .iter()
            .filter(|(ours, _)| stages.contains(*ours))
            .fold(vk::PipelineStageFlags::empty(), |acc, (_, theirs)| acc | *theirs)
    }

    fn convert_wait_error(e: vk::Result) -> BackendError {
        match e {
            vk::Result::TIMEOUT => BackendError::Timeout,
            vk::Result::ERROR_DEVICE_LOST => BackendError::DeviceLost,
            _ => BackendError::FenceWaitFailed(e.to_string()),
        }
    }
}

impl Device for VulkanDevice {
    fn name(&self) -> &str {
        "Vulkan"
    }

    fn create_fence(&self, signaled: bool) -> BackendResult<FenceHandle> {
        let fence_info = vk::FenceCreateInfo {
            flags: if signaled {
                vk::FenceCreateFlags::SIGNALED
            } else {
                vk::FenceCreateFlags::empty()
            },
            ..Default::default()
        };
        let fence = unsafe {
            self.shared
                .device
                .create_fence(&fence_info, None)
                .map_err(|e| BackendError::SyncObjectCreationFailed(e.to_string()))?
        };

        let mut objects = self.shared.objects.lock();
        let id = objects.allocate_id();
        objects.fences.insert(id, fence);
        Ok(FenceHandle(id))
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        if let Some(fence) = self.shared.objects.lock().fences.remove(&fence.0) {
            unsafe { self.shared.device.destroy_fence(fence, None) };
        }
    }

    fn wait_for_fence(&self, fence: FenceHandle, timeout_ns: u64) -> BackendResult<()> {
        let fence = self
            .fence(fence)
            .ok_or_else(|| BackendError::InvalidHandle(format!("fence {}", fence.0)))?;
        unsafe {
            self.shared
                .device
                .wait_for_fences(&[fence], true, timeout_ns)
                .map_err(Self::convert_wait_error)
        }
    }

    fn reset_fence(&self, fence: FenceHandle) -> BackendResult<()> {
        let fence = self
            .fence(fence)
            .ok_or_else(|| BackendError::InvalidHandle(format!("fence {}", fence.0)))?;
        unsafe {
            self.shared
                .device
                .reset_fences(&[fence])
                .map_err(|e| BackendError::FenceWaitFailed(e.to_string()))
        }
    }

    fn create_semaphore(&self) -> BackendResult<SemaphoreHandle> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe {
            self.shared
                .device
                .create_semaphore(&semaphore_info, None)
                .map_err(|e| BackendError::SyncObjectCreationFailed(e.to_string()))?
        };

        let mut objects = self.shared.objects.lock();
        let id = objects.allocate_id();
        objects.semaphores.insert(id, semaphore);
        Ok(SemaphoreHandle(id))
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        if let Some(semaphore) = self.shared.objects.lock().semaphores.remove(&semaphore.0) {
            unsafe { self.shared.device.destroy_semaphore(semaphore, None) };
        }
    }

    fn create_command_recorder(&self) -> BackendResult<Box<dyn CommandRecorder>> {
        let command_pool = self.shared.command_pool.lock();
        let alloc_info = vk::CommandBufferAllocateInfo {
            command_pool: *command_pool,
            level: vk::CommandBufferLevel::PRIMARY,
            command_buffer_count: 1,
            ..Default::default()
        };
        let command_buffers = unsafe {
            self.shared
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| BackendError::CommandRecorderCreationFailed(e.to_string()))?
        };
        let command_buffer = command_buffers.into_iter().next().ok_or_else(|| {
            BackendError::CommandRecorderCreationFailed("no command buffer returned".to_string())
        })?;

        log::debug!("VulkanDevice: allocated primary command buffer");

        Ok(Box::new(VulkanCommandRecorder {
            shared: Arc::clone(&self.shared),
            command_buffer,
        }))
    }

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorSetLayoutBinding],
    ) -> BackendResult<DescriptorSetLayoutHandle> {
        let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
            .iter()
            .map(|b| vk::DescriptorSetLayoutBinding {
                binding: b.binding,
                descriptor_type: Self::convert_descriptor_type(b.descriptor_type),
                descriptor_count: b.descriptor_count,
                stage_flags: Self::convert_shader_stages(b.stages),
                ..Default::default()
            })
            .collect();

        let layout_info = vk::DescriptorSetLayoutCreateInfo {
            binding_count: vk_bindings.len() as u32,
            p_bindings: vk_bindings.as_ptr(),
            ..Default::default()
        };

        let layout = unsafe {
            self.shared
                .device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(|e| BackendError::LayoutCreationFailed(e.to_string()))?
        };

        let mut objects = self.shared.objects.lock();
        let id = objects.allocate_id();
        objects.descriptor_set_layouts.insert(id, layout);
        log::debug!(
            "VulkanDevice: created descriptor set layout {id} ({} bindings)",
            bindings.len()
        );
        Ok(DescriptorSetLayoutHandle(id))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle) {
        if let Some(layout) = self
            .shared
            .objects
            .lock()
            .descriptor_set_layouts
            .remove(&layout.0)
        {
            unsafe { self.shared.device.destroy_descriptor_set_layout(layout, None) };
        }
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[DescriptorSetLayoutHandle],
        push_constant_ranges: &[PushConstantRange],
    ) -> BackendResult<PipelineLayoutHandle> {
        let vk_set_layouts = {
            let objects = self.shared.objects.lock();
            set_layouts
                .iter()
                .map(|handle| {
                    objects
                        .descriptor_set_layouts
                        .get(&handle.0)
                        .copied()
                        .ok_or_else(|| {
                            BackendError::InvalidHandle(format!(
                                "descriptor set layout {}",
                                handle.0
                            ))
                        })
                })
                .collect::<BackendResult<Vec<_>>>()?
        };

        let vk_ranges: Vec<vk::PushConstantRange> = push_constant_ranges
            .iter()
            .map(|r| vk::PushConstantRange {
                stage_flags: Self::convert_shader_stages(r.stages),
                offset: r.offset,
                size: r.size,
            })
            .collect();

        let layout_info = vk::PipelineLayoutCreateInfo {
            set_layout_count: vk_set_layouts.len() as u32,
            p_set_layouts: vk_set_layouts.as_ptr(),
            push_constant_range_count: vk_ranges.len() as u32,
            p_push_constant_ranges: vk_ranges.as_ptr(),
            ..Default::default()
        };

        let layout = unsafe {
            self.shared
                .device
                .create_pipeline_layout(&layout_info, None)
                .map_err(|e| BackendError::LayoutCreationFailed(e.to_string()))?
        };

        let mut objects = self.shared.objects.lock();
        let id = objects.allocate_id();
        objects.pipeline_layouts.insert(id, layout);
        log::debug!("VulkanDevice: created pipeline layout {id}");
        Ok(PipelineLayoutHandle(id))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle) {
        if let Some(layout) = self.shared.objects.lock().pipeline_layouts.remove(&layout.0) {
            unsafe { self.shared.device.destroy_pipeline_layout(layout, None) };
        }
    }

    fn wait_idle(&self) -> BackendResult<()> {
        unsafe {
            self.shared
                .device
                .device_wait_idle()
                .map_err(Self::convert_wait_error)
        }
    }
}

/// Primary command buffer of a [`VulkanDevice`].
pub struct VulkanCommandRecorder {
    shared: Arc<Shared>,
    command_buffer: vk::CommandBuffer,
}

impl VulkanCommandRecorder {
    /// Raw command buffer, for pass callbacks recording native commands.
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    pub fn device(&self) -> &ash::Device {
        &self.shared.device
    }
}

impl CommandRecorder for VulkanCommandRecorder {
    fn reset(&mut self) -> BackendResult<()> {
        unsafe {
            self.shared
                .device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| BackendError::RecordingFailed(e.to_string()))
        }
    }

    fn begin(&mut self) -> BackendResult<()> {
        let begin_info = vk::CommandBufferBeginInfo {
            flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
            ..Default::default()
        };
        unsafe {
            self.shared
                .device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| BackendError::RecordingFailed(e.to_string()))
        }
    }

    fn end(&mut self) -> BackendResult<()> {
        unsafe {
            self.shared
                .device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| BackendError::RecordingFailed(e.to_string()))
        }
    }

    fn submit(
        &mut self,
        wait: &[SemaphoreHandle],
        wait_stages: &[PipelineStageFlags],
        signal: &[SemaphoreHandle],
        fence: Option<FenceHandle>,
    ) -> BackendResult<()> {
        if wait.len() != wait_stages.len() {
            return Err(BackendError::SubmitFailed(format!(
                "{} wait semaphores but {} wait stages",
                wait.len(),
                wait_stages.len()
            )));
        }

        let (wait_semaphores, signal_semaphores, fence) = {
            let objects = self.shared.objects.lock();
            let lookup = |handle: &SemaphoreHandle| {
                objects.semaphores.get(&handle.0).copied().ok_or_else(|| {
                    BackendError::InvalidHandle(format!("semaphore {}", handle.0))
                })
            };
            let wait_semaphores = wait.iter().map(lookup).collect::<BackendResult<Vec<_>>>()?;
            let signal_semaphores = signal.iter().map(lookup).collect::<BackendResult<Vec<_>>>()?;
            let fence = match fence {
                Some(handle) => objects.fences.get(&handle.0).copied().ok_or_else(|| {
                    BackendError::InvalidHandle(format!("fence {}", handle.0))
                })?,
                None => vk::Fence::null(),
            };
            (wait_semaphores, signal_semaphores, fence)
        };

        let wait_stages: Vec<vk::PipelineStageFlags> = wait_stages
            .iter()
            .map(|stages| VulkanDevice::convert_wait_stages(*stages))
            .collect();
        let command_buffers = [self.command_buffer];

        let submit_info = vk::SubmitInfo {
            wait_semaphore_count: wait_semaphores.len() as u32,
            p_wait_semaphores: wait_semaphores.as_ptr(),
            p_wait_dst_stage_mask: wait_stages.as_ptr(),
            command_buffer_count: 1,
            p_command_buffers: command_buffers.as_ptr(),
            signal_semaphore_count: signal_semaphores.len() as u32,
            p_signal_semaphores: signal_semaphores.as_ptr(),
            ..Default::default()
        };

        let queue = self.shared.queue.lock();
        unsafe {
            self.shared
                .device
                .queue_submit(*queue, &[submit_info], fence)
                .map_err(|e| match e {
                    vk::Result::ERROR_DEVICE_LOST => BackendError::DeviceLost,
                    _ => BackendError::SubmitFailed(e.to_string()),
                })
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for VulkanCommandRecorder {
    fn drop(&mut self) {
        let command_pool = self.shared.command_pool.lock();
        unsafe {
            self.shared
                .device
                .free_command_buffers(*command_pool, &[self.command_buffer]);
        }
    }
}
