//! Dummy device for testing and development.
//!
//! This device doesn't perform actual GPU operations. It keeps every created object in memory,
//! signals fences as soon as a submission names them, and records what was submitted so tests
//! can inspect the result of a frame.

use crate::backend::traits::*;
use crate::backend::types::*;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A submission captured by the dummy device.
#[derive(Debug, Clone, PartialEq)]
pub struct DummySubmission {
    /// Labels recorded between `begin` and `end`, in order.
    pub labels: Vec<String>,
    pub wait: Vec<SemaphoreHandle>,
    pub wait_stages: Vec<PipelineStageFlags>,
    pub signal: Vec<SemaphoreHandle>,
    pub fence: Option<FenceHandle>,
}

/// A pipeline layout as seen by the dummy device.
#[derive(Debug, Clone, PartialEq)]
pub struct DummyPipelineLayout {
    pub set_layouts: Vec<DescriptorSetLayoutHandle>,
    pub push_constant_ranges: Vec<PushConstantRange>,
}

#[derive(Debug, Default)]
struct DummyState {
    next_id: u64,
    fences: HashMap<u64, bool>,
    semaphores: HashSet<u64>,
    set_layouts: HashMap<u64, Vec<DescriptorSetLayoutBinding>>,
    pipeline_layouts: HashMap<u64, DummyPipelineLayout>,
    submissions: Vec<DummySubmission>,
    lost: bool,
}

impl DummyState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Dummy GPU device.
#[derive(Debug, Default)]
pub struct DummyDevice {
    state: Arc<Mutex<DummyState>>,
}

impl DummyDevice {
    /// Create a new dummy device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a lost device. Every subsequent fence wait and submit fails.
    pub fn set_device_lost(&self, lost: bool) {
        self.state.lock().lost = lost;
    }

    /// All submissions so far, oldest first.
    pub fn submissions(&self) -> Vec<DummySubmission> {
        self.state.lock().submissions.clone()
    }

    pub fn is_fence_signaled(&self, fence: FenceHandle) -> Option<bool> {
        self.state.lock().fences.get(&fence.0).copied()
    }

    pub fn live_fences(&self) -> usize {
        self.state.lock().fences.len()
    }

    pub fn live_semaphores(&self) -> usize {
        self.state.lock().semaphores.len()
    }

    pub fn live_descriptor_set_layouts(&self) -> usize {
        self.state.lock().set_layouts.len()
    }

    pub fn live_pipeline_layouts(&self) -> usize {
        self.state.lock().pipeline_layouts.len()
    }

    /// Bindings a descriptor set layout was created with.
    pub fn descriptor_set_layout(
        &self,
        layout: DescriptorSetLayoutHandle,
    ) -> Option<Vec<DescriptorSetLayoutBinding>> {
        self.state.lock().set_layouts.get(&layout.0).cloned()
    }

    pub fn pipeline_layout(&self, layout: PipelineLayoutHandle) -> Option<DummyPipelineLayout> {
        self.state.lock().pipeline_layouts.get(&layout.0).cloned()
    }
}

impl Device for DummyDevice {
    fn name(&self) -> &str {
        "Dummy Device"
    }

    fn create_fence(&self, signaled: bool) -> BackendResult<FenceHandle> {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.fences.insert(id, signaled);
        log::trace!("DummyDevice: creating fence {id} (signaled: {signaled})");
        Ok(FenceHandle(id))
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        self.state.lock().fences.remove(&fence.0);
    }

    fn wait_for_fence(&self, fence: FenceHandle, _timeout_ns: u64) -> BackendResult<()> {
        let state = self.state.lock();
        if state.lost {
            return Err(BackendError::DeviceLost);
        }
        match state.fences.get(&fence.0) {
            Some(true) => Ok(()),
            // Nothing will ever signal this fence, so waiting would never return.
            Some(false) => Err(BackendError::Timeout),
            None => Err(BackendError::InvalidHandle(format!("fence {}", fence.0))),
        }
    }

    fn reset_fence(&self, fence: FenceHandle) -> BackendResult<()> {
        let mut state = self.state.lock();
        match state.fences.get_mut(&fence.0) {
            Some(signaled) => {
                *signaled = false;
                Ok(())
            }
            None => Err(BackendError::InvalidHandle(format!("fence {}", fence.0))),
        }
    }

    fn create_semaphore(&self) -> BackendResult<SemaphoreHandle> {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.semaphores.insert(id);
        log::trace!("DummyDevice: creating semaphore {id}");
        Ok(SemaphoreHandle(id))
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        self.state.lock().semaphores.remove(&semaphore.0);
    }

    fn create_command_recorder(&self) -> BackendResult<Box<dyn CommandRecorder>> {
        log::trace!("DummyDevice: creating command recorder");
        Ok(Box::new(DummyCommandRecorder {
            state: Arc::clone(&self.state),
            labels: Vec::new(),
            recording: false,
        }))
    }

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorSetLayoutBinding],
    ) -> BackendResult<DescriptorSetLayoutHandle> {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.set_layouts.insert(id, bindings.to_vec());
        log::trace!(
            "DummyDevice: creating descriptor set layout {id} ({} bindings)",
            bindings.len()
        );
        Ok(DescriptorSetLayoutHandle(id))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle) {
        self.state.lock().set_layouts.remove(&layout.0);
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[DescriptorSetLayoutHandle],
        push_constant_ranges: &[PushConstantRange],
    ) -> BackendResult<PipelineLayoutHandle> {
        let mut state = self.state.lock();
        if let Some(unknown) = set_layouts
            .iter()
            .find(|layout| !state.set_layouts.contains_key(&layout.0))
        {
            return Err(BackendError::InvalidHandle(format!(
                "descriptor set layout {}",
                unknown.0
            )));
        }
        let id = state.allocate_id();
        state.pipeline_layouts.insert(
            id,
            DummyPipelineLayout {
                set_layouts: set_layouts.to_vec(),
                push_constant_ranges: push_constant_ranges.to_vec(),
            },
        );
        log::trace!("DummyDevice: creating pipeline layout {id}");
        Ok(PipelineLayoutHandle(id))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle) {
        self.state.lock().pipeline_layouts.remove(&layout.0);
    }

    fn wait_idle(&self) -> BackendResult<()> {
        if self.state.lock().lost {
            return Err(BackendError::DeviceLost);
        }
        Ok(())
    }
}

/// Command recorder of the [`DummyDevice`].
///
/// Pass callbacks can downcast to it through [`CommandRecorder::as_any_mut`] and leave labels
/// that show up in the captured [`DummySubmission`].
#[derive(Debug)]
pub struct DummyCommandRecorder {
    state: Arc<Mutex<DummyState>>,
    labels: Vec<String>,
    recording: bool,
}

impl DummyCommandRecorder {
    /// Record a label.
    pub fn label(&mut self, label: impl Into<String>) {
        self.labels.push(label.into());
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }
}

impl CommandRecorder for DummyCommandRecorder {
    fn reset(&mut self) -> BackendResult<()> {
        self.labels.clear();
        self.recording = false;
        Ok(())
    }

    fn begin(&mut self) -> BackendResult<()> {
        if self.recording {
            return Err(BackendError::RecordingFailed(
                "command recorder is already recording".to_string(),
            ));
        }
        self.recording = true;
        Ok(())
    }

    fn end(&mut self) -> BackendResult<()> {
        if !self.recording {
            return Err(BackendError::RecordingFailed(
                "command recorder is not recording".to_string(),
            ));
        }
        self.recording = false;
        Ok(())
    }

    fn submit(
        &mut self,
        wait: &[SemaphoreHandle],
        wait_stages: &[PipelineStageFlags],
        signal: &[SemaphoreHandle],
        fence: Option<FenceHandle>,
    ) -> BackendResult<()> {
        if self.recording {
            return Err(BackendError::SubmitFailed(
                "command recorder is still recording".to_string(),
            ));
        }
        let mut state = self.state.lock();
        if state.lost {
            return Err(BackendError::DeviceLost);
        }
        if let Some(fence) = fence {
            match state.fences.get_mut(&fence.0) {
                Some(signaled) => *signaled = true,
                None => return Err(BackendError::InvalidHandle(format!("fence {}", fence.0))),
            }
        }
        log::trace!(
            "DummyCommandRecorder: submitting {} labels",
            self.labels.len()
        );
        state.submissions.push(DummySubmission {
            labels: self.labels.clone(),
            wait: wait.to_vec(),
            wait_stages: wait_stages.to_vec(),
            signal: signal.to_vec(),
            fence,
        });
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
