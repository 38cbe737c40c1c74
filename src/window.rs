//! Output window abstraction
//!
//! The frame graph only needs to know how large the window it presents to currently is, so
//! that relatively sized resources can be resolved.

use glam::UVec2;
use parking_lot::Mutex;
use winit::window::Window as WinitWindow;

/// A presentation target with a queryable size.
pub trait OutputWindow: Send + Sync {
    /// Current size in physical pixels
    fn extent(&self) -> UVec2;
}

impl OutputWindow for WinitWindow {
    fn extent(&self) -> UVec2 {
        let size = self.inner_size();
        UVec2::new(size.width, size.height)
    }
}

/// An output window without a surface, for offscreen rendering and tests.
#[derive(Debug)]
pub struct HeadlessWindow {
    extent: Mutex<UVec2>,
}

impl HeadlessWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            extent: Mutex::new(UVec2::new(width, height)),
        }
    }

    /// Change the size, as a resize event would.
    pub fn resize(&self, width: u32, height: u32) {
        *self.extent.lock() = UVec2::new(width, height);
    }
}

impl OutputWindow for HeadlessWindow {
    fn extent(&self) -> UVec2 {
        *self.extent.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_resize() {
        let window = HeadlessWindow::new(1280, 720);
        assert_eq!(window.extent(), UVec2::new(1280, 720));
        window.resize(640, 480);
        assert_eq!(window.extent(), UVec2::new(640, 480));
    }
}
