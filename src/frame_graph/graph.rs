//! The frame graph and its per-frame state

use super::pass::{LogicalPass, PassHandle};
use super::physical::{self, PhysicalPass, PhysicalResource};
use super::resource::{GraphId, LogicalResource, ResourceHandle};
use super::schedule;
use crate::backend::{CommandRecorder, Device, FenceHandle, SemaphoreHandle};
use crate::error::{GraphError, TopologyError};
use crate::frame_resource_index::{FrameResourceIndex, FrameResources};
use crate::FrameGraphConfig;
use glam::UVec2;
use std::sync::Arc;

/// State owned by one frame-in-flight slot.
struct PerFrame {
    device: Arc<dyn Device>,
    dirty: bool,
    recorder: Box<dyn CommandRecorder>,
    render_finished: SemaphoreHandle,
    frame_finished: FenceHandle,
    physical_passes: Vec<PhysicalPass>,
    physical_resources: Vec<PhysicalResource>,
}

impl PerFrame {
    fn new(device: &Arc<dyn Device>) -> Result<Self, GraphError> {
        let recorder = device.create_command_recorder()?;
        let render_finished = device.create_semaphore()?;
        let frame_finished = match device.create_fence(true) {
            Ok(fence) => fence,
            Err(e) => {
                device.destroy_semaphore(render_finished);
                return Err(e.into());
            }
        };

        Ok(Self {
            device: Arc::clone(device),
            dirty: true,
            recorder,
            render_finished,
            frame_finished,
            physical_passes: Vec::new(),
            physical_resources: Vec::new(),
        })
    }
}

impl Drop for PerFrame {
    fn drop(&mut self) {
        self.device.destroy_fence(self.frame_finished);
        self.device.destroy_semaphore(self.render_finished);
    }
}

/// A frame graph.
///
/// Resources and passes are declared once and then [`process`](Self::process) is called every
/// frame. Any change to a resource or pass is picked up on the next call: the graph is
/// validated again and every frame-in-flight slot rebuilds its physical state the next time it
/// is used.
///
/// # Example
///
/// ```ignore
/// let mut graph = FrameGraph::new(device, FrameGraphConfig::default())?;
///
/// let albedo = graph.create_resource().set_name("albedo").handle();
/// let backbuffer = graph
///     .create_resource()
///     .set_name("backbuffer")
///     .set_format(Format::B8G8R8A8Srgb)
///     .handle();
///
/// graph
///     .create_pass()
///     .set_name("geometry")
///     .assign_resource(albedo, ResourceUsage::ColorAttachment, ResourceAccess::WriteOnly, None)?
///     .set_process_callback(|recorder| { /* draw */ });
///
/// graph
///     .create_pass()
///     .set_name("composite")
///     .assign_resource(albedo, ResourceUsage::Sampled, ResourceAccess::ReadOnly, None)?
///     .assign_resource(
///         backbuffer,
///         ResourceUsage::ColorAttachment,
///         ResourceAccess::WriteOnly,
///         None,
///     )?
///     .set_output_window(window);
///
/// loop {
///     graph.process()?;
/// }
/// ```
pub struct FrameGraph {
    id: GraphId,
    device: Arc<dyn Device>,
    config: FrameGraphConfig,
    resources: Vec<LogicalResource>,
    passes: Vec<LogicalPass>,
    dirty: bool,
    window_extent: Option<UVec2>,
    frame_index: FrameResourceIndex,
    frames: FrameResources<PerFrame>,
}

impl FrameGraph {
    /// Create an empty graph with one command recorder, semaphore and fence per frame in flight.
    pub fn new(device: Arc<dyn Device>, config: FrameGraphConfig) -> Result<Self, GraphError> {
        if config.frames_in_flight == 0 {
            return Err(GraphError::InvalidConfig(
                "frames_in_flight must be at least 1".to_string(),
            ));
        }

        let frame_index = FrameResourceIndex::new(config.frames_in_flight);
        let frames = FrameResources::try_new(&frame_index, |_| PerFrame::new(&device))?;

        log::debug!(
            "Created frame graph on {} with {} frames in flight",
            device.name(),
            config.frames_in_flight
        );

        Ok(Self {
            id: GraphId::next(),
            device,
            config,
            resources: Vec::new(),
            passes: Vec::new(),
            dirty: true,
            window_extent: None,
            frame_index,
            frames,
        })
    }

    /// Add a resource with default settings.
    pub fn create_resource(&mut self) -> &mut LogicalResource {
        let handle = ResourceHandle::new(self.id, self.resources.len() as u32);
        self.dirty = true;
        self.resources.push(LogicalResource::new(handle));
        let index = self.resources.len() - 1;
        &mut self.resources[index]
    }

    /// Add a pass that uses no resources yet.
    pub fn create_pass(&mut self) -> &mut LogicalPass {
        let handle = PassHandle::new(self.id, self.passes.len() as u32);
        self.dirty = true;
        self.passes.push(LogicalPass::new(handle));
        let index = self.passes.len() - 1;
        &mut self.passes[index]
    }

    pub fn resource(&self, handle: ResourceHandle) -> Option<&LogicalResource> {
        if handle.graph() != self.id {
            return None;
        }
        self.resources.get(handle.index())
    }

    pub fn resource_mut(&mut self, handle: ResourceHandle) -> Option<&mut LogicalResource> {
        if handle.graph() != self.id {
            return None;
        }
        self.resources.get_mut(handle.index())
    }

    pub fn pass(&self, handle: PassHandle) -> Option<&LogicalPass> {
        if handle.graph() != self.id {
            return None;
        }
        self.passes.get(handle.index())
    }

    pub fn pass_mut(&mut self, handle: PassHandle) -> Option<&mut LogicalPass> {
        if handle.graph() != self.id {
            return None;
        }
        self.passes.get_mut(handle.index())
    }

    pub fn resources(&self) -> &[LogicalResource] {
        &self.resources
    }

    pub fn passes(&self) -> &[LogicalPass] {
        &self.passes
    }

    /// Whether the next [`process`](Self::process) validates the graph again.
    pub fn is_dirty(&self) -> bool {
        self.dirty
            || self.resources.iter().any(LogicalResource::is_dirty)
            || self.passes.iter().any(LogicalPass::is_dirty)
    }

    pub fn config(&self) -> &FrameGraphConfig {
        &self.config
    }

    pub fn frame_index(&self) -> &FrameResourceIndex {
        &self.frame_index
    }

    /// Physical passes of a frame slot, in recording order.
    pub fn physical_passes(&self, slot: usize) -> Option<&[PhysicalPass]> {
        self.frames
            .get(slot)
            .map(|frame| frame.physical_passes.as_slice())
    }

    pub fn physical_resources(&self, slot: usize) -> Option<&[PhysicalResource]> {
        self.frames
            .get(slot)
            .map(|frame| frame.physical_resources.as_slice())
    }

    /// Semaphore signaled when the last submission of a slot has finished rendering.
    pub fn render_finished_semaphore(&self, slot: usize) -> Option<SemaphoreHandle> {
        self.frames.get(slot).map(|frame| frame.render_finished)
    }

    /// Validate if needed, rebuild the current slot if needed, then record and submit a frame.
    ///
    /// Blocks until the GPU has finished the previous frame that used the current slot.
    pub fn process(&mut self) -> Result<(), GraphError> {
        self.track_window_extent();

        if self.is_dirty() {
            let (_, window_extent) = schedule::validate(self.id, &self.resources, &self.passes)
                .map_err(|e| GraphError::Validation(Box::new(e)))?;

            self.window_extent = Some(window_extent);
            for frame in self.frames.iter_mut() {
                frame.dirty = true;
            }
            self.clear_dirty();
        }

        let Self {
            device,
            config,
            resources,
            passes,
            window_extent,
            frame_index,
            frames,
            ..
        } = self;

        let frame = frames.current_mut(frame_index);
        device.wait_for_fence(frame.frame_finished, config.fence_timeout_ns)?;

        if frame.dirty {
            log::trace!("Reconstructing frame graph...");
            let output =
                schedule::find_output_pass(passes).ok_or(TopologyError::NoOutputWindow)?;
            let order = schedule::schedule(resources, passes, output)?;
            let (physical_passes, physical_resources) = physical::build(
                resources,
                passes,
                &order,
                window_extent.unwrap_or(UVec2::ZERO),
            );
            frame.physical_passes = physical_passes;
            frame.physical_resources = physical_resources;
            frame.dirty = false;
            log::trace!("Frame graph reconstruction done.");
        }

        frame.recorder.reset()?;
        frame.recorder.begin()?;
        for physical_pass in &frame.physical_passes {
            for handle in &physical_pass.logical_passes {
                passes[handle.index()].record(frame.recorder.as_mut());
            }
        }
        frame.recorder.end()?;

        // The fence stays signaled if anything before the submit fails.
        device.reset_fence(frame.frame_finished)?;
        frame.recorder.submit(
            &[],
            &[],
            &[frame.render_finished],
            Some(frame.frame_finished),
        )?;

        frame_index.step();
        Ok(())
    }

    /// Mark the graph dirty when the output window changed size since the last validation.
    fn track_window_extent(&mut self) {
        let Some(validated) = self.window_extent else {
            return;
        };
        let current = schedule::find_output_pass(&self.passes)
            .and_then(|index| self.passes[index].output_window())
            .map(|window| window.extent());
        if let Some(current) = current {
            if current != validated {
                log::debug!("Output window resized from {validated} to {current}");
                self.dirty = true;
            }
        }
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
        for resource in &mut self.resources {
            resource.clear_dirty();
        }
        for pass in &mut self.passes {
            pass.clear_dirty();
        }
    }
}

impl Drop for FrameGraph {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            log::warn!("Failed to wait for device idle while dropping frame graph: {e}");
        }
    }
}
