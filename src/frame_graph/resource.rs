//! Logical resources of the frame graph

use crate::backend::Format;
use glam::{UVec2, Vec2};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique id of a [`FrameGraph`](super::FrameGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GraphId(u64);

impl GraphId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle to a logical resource.
///
/// It is only valid within the frame graph that created it; passing it to a pass of another
/// graph makes validation fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    graph: GraphId,
    index: u32,
}

impl ResourceHandle {
    pub(crate) fn new(graph: GraphId, index: u32) -> Self {
        Self { graph, index }
    }

    pub(crate) fn graph(&self) -> GraphId {
        self.graph
    }

    /// Position in the creating graph's resource list.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// How the extent of a resource is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceSizing {
    /// The extent is a size in pixels.
    Absolute,
    /// The extent is a factor applied to the output window's size.
    #[default]
    RelativeToOutput,
}

/// A resource declared on a frame graph, independent of any GPU backing.
#[derive(Debug, Clone)]
pub struct LogicalResource {
    handle: ResourceHandle,
    name: String,
    format: Format,
    sizing: ResourceSizing,
    extent: Vec2,
    dirty: bool,
}

impl LogicalResource {
    pub(crate) fn new(handle: ResourceHandle) -> Self {
        Self {
            handle,
            name: String::new(),
            format: Format::default(),
            sizing: ResourceSizing::default(),
            extent: Vec2::ONE,
            dirty: true,
        }
    }

    pub fn handle(&self) -> ResourceHandle {
        self.handle
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self.dirty = true;
        self
    }

    pub fn set_format(&mut self, format: Format) -> &mut Self {
        self.format = format;
        self.dirty = true;
        self
    }

    pub fn set_sizing(&mut self, sizing: ResourceSizing) -> &mut Self {
        self.sizing = sizing;
        self.dirty = true;
        self
    }

    pub fn set_extent(&mut self, extent: Vec2) -> &mut Self {
        self.extent = extent;
        self.dirty = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn sizing(&self) -> ResourceSizing {
        self.sizing
    }

    pub fn extent(&self) -> Vec2 {
        self.extent
    }

    /// Extent in pixels for an output window of the given size.
    pub fn resolve_extent(&self, window_extent: UVec2) -> Vec2 {
        match self.sizing {
            ResourceSizing::Absolute => self.extent,
            ResourceSizing::RelativeToOutput => self.extent * window_extent.as_vec2(),
        }
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
