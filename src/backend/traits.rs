//! Core backend abstraction traits
//!
//! The frame graph and the reflection types only talk to the GPU through these traits. Both the
//! Vulkan device and the in-memory dummy device implement them.

use crate::backend::types::*;
use std::any::Any;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create sync object: {0}")]
    SyncObjectCreationFailed(String),
    #[error("Failed to create command recorder: {0}")]
    CommandRecorderCreationFailed(String),
    #[error("Failed to create layout: {0}")]
    LayoutCreationFailed(String),
    #[error("Failed to wait for fence: {0}")]
    FenceWaitFailed(String),
    #[error("Failed to record commands: {0}")]
    RecordingFailed(String),
    #[error("Failed to submit commands: {0}")]
    SubmitFailed(String),
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),
    #[error("Fence wait timed out")]
    Timeout,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a CPU-waitable fence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenceHandle(pub(crate) u64);

/// Handle to a GPU-side semaphore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemaphoreHandle(pub(crate) u64);

/// Handle to a descriptor set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorSetLayoutHandle(pub(crate) u64);

/// Handle to a pipeline layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineLayoutHandle(pub(crate) u64);

/// Device abstraction consumed by the frame graph and the reflection types.
///
/// Handles returned by one device are only valid for that device. Destroying an unknown handle
/// is a no-op.
pub trait Device: Send + Sync {
    /// Backend name for diagnostics
    fn name(&self) -> &str;

    fn create_fence(&self, signaled: bool) -> BackendResult<FenceHandle>;
    fn destroy_fence(&self, fence: FenceHandle);

    /// Block until the fence is signaled or `timeout_ns` elapses.
    fn wait_for_fence(&self, fence: FenceHandle, timeout_ns: u64) -> BackendResult<()>;
    fn reset_fence(&self, fence: FenceHandle) -> BackendResult<()>;

    fn create_semaphore(&self) -> BackendResult<SemaphoreHandle>;
    fn destroy_semaphore(&self, semaphore: SemaphoreHandle);

    /// Allocate a primary command recorder.
    fn create_command_recorder(&self) -> BackendResult<Box<dyn CommandRecorder>>;

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorSetLayoutBinding],
    ) -> BackendResult<DescriptorSetLayoutHandle>;
    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle);

    fn create_pipeline_layout(
        &self,
        set_layouts: &[DescriptorSetLayoutHandle],
        push_constant_ranges: &[PushConstantRange],
    ) -> BackendResult<PipelineLayoutHandle>;
    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle);

    /// Wait until the device has finished all submitted work.
    fn wait_idle(&self) -> BackendResult<()>;
}

/// Sequential command recording target.
pub trait CommandRecorder: Send {
    fn reset(&mut self) -> BackendResult<()>;
    fn begin(&mut self) -> BackendResult<()>;
    fn end(&mut self) -> BackendResult<()>;

    /// Submit the recorded commands.
    ///
    /// `wait_stages` pairs with `wait`. The optional fence is signaled once the submission
    /// has been retired by the GPU.
    fn submit(
        &mut self,
        wait: &[SemaphoreHandle],
        wait_stages: &[PipelineStageFlags],
        signal: &[SemaphoreHandle],
        fence: Option<FenceHandle>,
    ) -> BackendResult<()>;

    /// Access to the concrete recorder, for pass callbacks that need backend specific calls.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
