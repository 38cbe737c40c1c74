//! Per-frame physical passes and resources derived from the logical graph

use super::pass::{LogicalPass, PassHandle, ResourceAccess, ResourceUsage};
use super::resource::{LogicalResource, ResourceHandle};
use crate::backend::{ClearValue, Format, FormatUnsupportedError};
use glam::UVec2;

/// Concrete instance of a logical resource for one frame in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalResource {
    pub resource: ResourceHandle,
    pub name: String,
    pub format: Format,
    pub extent: UVec2,
}

impl PhysicalResource {
    /// Memory needed for the texels of this resource.
    pub fn byte_size(&self) -> Result<u64, FormatUnsupportedError> {
        let texel = u64::from(self.format.byte_count()?);
        Ok(u64::from(self.extent.x) * u64::from(self.extent.y) * texel)
    }
}

/// An attachment of a physical pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalAttachment {
    pub resource: ResourceHandle,
    pub usage: ResourceUsage,
    pub access: ResourceAccess,
    pub clear: Option<ClearValue>,
}

/// Logical passes recorded together into one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalPass {
    /// Logical passes in recording order.
    pub logical_passes: Vec<PassHandle>,
    pub extent: UVec2,
    pub attachments: Vec<PhysicalAttachment>,
}

/// Derive the physical objects of a frame from the scheduled pass order.
///
/// Each logical pass gets a physical pass of its own; merging compatible neighbours into one
/// render pass with subpasses is not done yet.
pub(crate) fn build(
    resources: &[LogicalResource],
    passes: &[LogicalPass],
    order: &[usize],
    window_extent: UVec2,
) -> (Vec<PhysicalPass>, Vec<PhysicalResource>) {
    let resolve = |handle: ResourceHandle| {
        resources[handle.index()]
            .resolve_extent(window_extent)
            .round()
            .as_uvec2()
    };

    let mut physical_resources: Vec<PhysicalResource> = Vec::new();
    let mut physical_passes = Vec::with_capacity(order.len());

    for &index in order {
        let pass = &passes[index];

        for (handle, _) in pass.resources() {
            if physical_resources.iter().any(|r| r.resource == *handle) {
                continue;
            }
            let logical = &resources[handle.index()];
            physical_resources.push(PhysicalResource {
                resource: *handle,
                name: logical.name().to_string(),
                format: logical.format(),
                extent: resolve(*handle),
            });
        }

        let attachments: Vec<PhysicalAttachment> = pass
            .resources()
            .iter()
            .filter(|(_, binding)| binding.usage.is_attachment())
            .map(|(handle, binding)| PhysicalAttachment {
                resource: *handle,
                usage: binding.usage,
                access: binding.access,
                clear: binding.clear,
            })
            .collect();

        let extent = attachments
            .first()
            .map_or(window_extent, |attachment| resolve(attachment.resource));

        physical_passes.push(PhysicalPass {
            logical_passes: vec![pass.handle()],
            extent,
            attachments,
        });
    }

    (physical_passes, physical_resources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size() {
        let resource = PhysicalResource {
            resource: ResourceHandle::new(super::super::resource::GraphId::next(), 0),
            name: "hdr".to_string(),
            format: Format::R16G16B16A16Sfloat,
            extent: UVec2::new(1920, 1080),
        };
        assert_eq!(resource.byte_size(), Ok(1920 * 1080 * 8));

        let compressed = PhysicalResource {
            format: Format::Bc7UnormBlock,
            ..resource
        };
        assert!(compressed.byte_size().is_err());
    }
}
