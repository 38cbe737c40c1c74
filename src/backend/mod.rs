//! Backend abstraction layer
//!
//! Provides the device traits the frame graph and reflection types are written against, plus
//! the Vulkan and dummy implementations.

pub mod format;
pub mod layout;
pub mod traits;
pub mod types;

#[cfg(feature = "dummy")]
pub mod dummy;

// Vulkan backend is only available on native platforms
#[cfg(all(feature = "vulkan", not(target_arch = "wasm32")))]
pub mod vulkan;

pub use format::*;
pub use layout::*;
pub use traits::*;
pub use types::*;
