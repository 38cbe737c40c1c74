//! Logical passes of the frame graph

use super::resource::{GraphId, ResourceHandle};
use crate::backend::{ClearValue, CommandRecorder};
use crate::error::GraphError;
use crate::window::OutputWindow;
use std::fmt;
use std::sync::Arc;

/// Handle to a logical pass.
///
/// It is only valid within the frame graph that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassHandle {
    graph: GraphId,
    index: u32,
}

impl PassHandle {
    pub(crate) fn new(graph: GraphId, index: u32) -> Self {
        Self { graph, index }
    }

    pub(crate) fn graph(&self) -> GraphId {
        self.graph
    }

    /// Position in the creating graph's pass list.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// How a pass uses a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceUsage {
    ColorAttachment,
    DepthAttachment,
    InputAttachment,
    Sampled,
    Storage,
    TransferSource,
    TransferDestination,
}

impl ResourceUsage {
    /// Whether the resource is rendered to and therefore sized like the pass' framebuffer.
    pub fn is_attachment(self) -> bool {
        matches!(
            self,
            ResourceUsage::ColorAttachment | ResourceUsage::DepthAttachment
        )
    }
}

/// Whether a pass reads, writes or does both to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl ResourceAccess {
    pub fn writes(self) -> bool {
        matches!(self, ResourceAccess::WriteOnly | ResourceAccess::ReadWrite)
    }
}

/// Usage declaration of one resource in one pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceBinding {
    pub usage: ResourceUsage,
    pub access: ResourceAccess,
    pub clear: Option<ClearValue>,
}

/// Records the commands of a pass.
pub type PassCallback = Box<dyn FnMut(&mut dyn CommandRecorder) + Send>;

/// A unit of rendering work declared on a frame graph.
pub struct LogicalPass {
    handle: PassHandle,
    name: String,
    resources: Vec<(ResourceHandle, ResourceBinding)>,
    output_window: Option<Arc<dyn OutputWindow>>,
    callback: Option<PassCallback>,
    dirty: bool,
}

impl LogicalPass {
    pub(crate) fn new(handle: PassHandle) -> Self {
        Self {
            handle,
            name: String::new(),
            resources: Vec::new(),
            output_window: None,
            callback: None,
            dirty: true,
        }
    }

    pub fn handle(&self) -> PassHandle {
        self.handle
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self.dirty = true;
        self
    }

    /// Declare that this pass uses `resource`.
    ///
    /// Fails if the resource was already assigned to this pass.
    pub fn assign_resource(
        &mut self,
        resource: ResourceHandle,
        usage: ResourceUsage,
        access: ResourceAccess,
        clear: Option<ClearValue>,
    ) -> Result<&mut Self, GraphError> {
        if self.binding(resource).is_some() {
            return Err(GraphError::DuplicateResource {
                resource,
                pass: self.name.clone(),
            });
        }

        self.resources
            .push((resource, ResourceBinding { usage, access, clear }));
        self.dirty = true;
        Ok(self)
    }

    /// Make this the final pass, presenting to `window`.
    pub fn set_output_window(&mut self, window: Arc<dyn OutputWindow>) -> &mut Self {
        self.output_window = Some(window);
        self.dirty = true;
        self
    }

    pub fn clear_output_window(&mut self) -> &mut Self {
        self.output_window = None;
        self.dirty = true;
        self
    }

    /// Set the function recording this pass' commands.
    pub fn set_process_callback(
        &mut self,
        callback: impl FnMut(&mut dyn CommandRecorder) + Send + 'static,
    ) -> &mut Self {
        self.callback = Some(Box::new(callback));
        self.dirty = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assigned resources, in assignment order.
    pub fn resources(&self) -> &[(ResourceHandle, ResourceBinding)] {
        &self.resources
    }

    pub fn binding(&self, resource: ResourceHandle) -> Option<&ResourceBinding> {
        self.resources
            .iter()
            .find(|(handle, _)| *handle == resource)
            .map(|(_, binding)| binding)
    }

    pub fn output_window(&self) -> Option<&Arc<dyn OutputWindow>> {
        self.output_window.as_ref()
    }

    pub(crate) fn record(&mut self, recorder: &mut dyn CommandRecorder) {
        if let Some(callback) = self.callback.as_mut() {
            callback(recorder);
        }
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl fmt::Debug for LogicalPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicalPass")
            .field("handle", &self.handle)
            .field("name", &self.name)
            .field("resources", &self.resources)
            .field("output_window", &self.output_window.as_ref().map(|w| w.extent()))
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_assignment_fails() {
        let graph = GraphId::next();
        let resource = ResourceHandle::new(graph, 0);
        let mut pass = LogicalPass::new(PassHandle::new(graph, 0));
        pass.set_name("lighting");
        pass.assign_resource(
            resource,
            ResourceUsage::ColorAttachment,
            ResourceAccess::WriteOnly,
            None,
        )
        .unwrap();

        let err = pass
            .assign_resource(
                resource,
                ResourceUsage::Sampled,
                ResourceAccess::ReadOnly,
                None,
            )
            .unwrap_err();
        assert!(
            matches!(err, GraphError::DuplicateResource { ref pass, .. } if pass == "lighting")
        );
        assert_eq!(pass.resources().len(), 1);
    }

    #[test]
    fn test_assignment_keeps_order() {
        let graph = GraphId::next();
        let mut pass = LogicalPass::new(PassHandle::new(graph, 0));
        for index in [3, 1, 2] {
            pass.assign_resource(
                ResourceHandle::new(graph, index),
                ResourceUsage::Sampled,
                ResourceAccess::ReadOnly,
                None,
            )
            .unwrap();
        }
        let order: Vec<_> = pass.resources().iter().map(|(h, _)| h.index()).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn test_access_writes() {
        assert!(!ResourceAccess::ReadOnly.writes());
        assert!(ResourceAccess::WriteOnly.writes());
        assert!(ResourceAccess::ReadWrite.writes());
    }
}
