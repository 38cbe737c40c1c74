//! Common utilities for frame graph integration tests.
//!
//! Every test runs against the dummy device, which records submissions in memory instead of
//! talking to a GPU.

#![allow(dead_code)]

use std::sync::Arc;

use frame_graph::backend::dummy::{DummyCommandRecorder, DummyDevice};
use frame_graph::{
    CommandRecorder, FrameGraph, FrameGraphConfig, HeadlessWindow, PassHandle, ResourceAccess,
    ResourceHandle, ResourceUsage,
};

/// Initialize logging for test output.
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

/// A frame graph on a dummy device, with a headless output window.
pub struct TestContext {
    pub device: Arc<DummyDevice>,
    pub window: Arc<HeadlessWindow>,
    pub graph: FrameGraph,
}

impl TestContext {
    pub fn new(frames_in_flight: usize) -> Self {
        init_logging();

        let device = Arc::new(DummyDevice::new());
        let window = Arc::new(HeadlessWindow::new(64, 64));
        let config = FrameGraphConfig {
            frames_in_flight,
            ..Default::default()
        };
        let graph = FrameGraph::new(device.clone(), config).expect("dummy device never fails");

        Self {
            device,
            window,
            graph,
        }
    }

    pub fn resource(&mut self, name: &str) -> ResourceHandle {
        self.graph.create_resource().set_name(name).handle()
    }

    /// Add a pass whose callback leaves its name as a label in the recorded commands.
    ///
    /// `resources` lists `(resource, usage, access)`; the pass presents when `present` is set.
    pub fn pass(
        &mut self,
        name: &str,
        resources: &[(ResourceHandle, ResourceUsage, ResourceAccess)],
        present: bool,
    ) -> PassHandle {
        let window = self.window.clone();
        let pass = self.graph.create_pass();
        pass.set_name(name)
            .set_process_callback(labeling_callback(name));
        for &(resource, usage, access) in resources {
            pass.assign_resource(resource, usage, access, None)
                .expect("resources are assigned once");
        }
        if present {
            pass.set_output_window(window);
        }
        pass.handle()
    }

    /// Labels of every submission so far, oldest first.
    pub fn submitted_labels(&self) -> Vec<Vec<String>> {
        self.device
            .submissions()
            .into_iter()
            .map(|submission| submission.labels)
            .collect()
    }
}

/// Callback that labels the dummy recorder with `name`.
pub fn labeling_callback(name: &str) -> impl FnMut(&mut dyn CommandRecorder) + Send + 'static {
    let name = name.to_string();
    move |recorder: &mut dyn CommandRecorder| {
        if let Some(dummy) = recorder
            .as_any_mut()
            .downcast_mut::<DummyCommandRecorder>()
        {
            dummy.label(name.clone());
        }
    }
}

/// Shorthand for a color attachment the pass only writes.
pub fn write(resource: ResourceHandle) -> (ResourceHandle, ResourceUsage, ResourceAccess) {
    (
        resource,
        ResourceUsage::ColorAttachment,
        ResourceAccess::WriteOnly,
    )
}

/// Shorthand for a texture the pass samples.
pub fn read(resource: ResourceHandle) -> (ResourceHandle, ResourceUsage, ResourceAccess) {
    (resource, ResourceUsage::Sampled, ResourceAccess::ReadOnly)
}
