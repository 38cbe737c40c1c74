//! Pixel formats and their per-texel sizes

use thiserror::Error;

/// Returned when a size query hits a format without a per-texel mapping.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Format {0:?} has no defined byte size or component count")]
pub struct FormatUnsupportedError(pub Format);

macro_rules! formats {
    (
        sized { $($name:ident => $bytes:expr, $components:expr;)* }
        unsized { $($other:ident,)* }
    ) => {
        /// Pixel format of a frame graph resource.
        ///
        /// Uncompressed formats carry a byte count and a component count; block-compressed
        /// formats and `Undefined` do not.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Format {
            $($name,)*
            $($other,)*
        }

        impl Format {
            /// Every format with a defined texel size.
            pub const SIZED: &'static [Format] = &[$(Format::$name,)*];

            /// Size in bytes of one texel.
            pub fn byte_count(self) -> Result<u8, FormatUnsupportedError> {
                match self {
                    $(Format::$name => Ok($bytes),)*
                    _ => Err(FormatUnsupportedError(self)),
                }
            }

            /// Number of channels in one texel.
            pub fn component_count(self) -> Result<u8, FormatUnsupportedError> {
                match self {
                    $(Format::$name => Ok($components),)*
                    _ => Err(FormatUnsupportedError(self)),
                }
            }
        }
    };
}

formats! {
    sized {
        R4G4UnormPack8 => 1, 2;
        R4G4B4A4UnormPack16 => 2, 4;
        B4G4R4A4UnormPack16 => 2, 4;
        R5G6B5UnormPack16 => 2, 3;
        B5G6R5UnormPack16 => 2, 3;
        R5G5B5A1UnormPack16 => 2, 4;
        B5G5R5A1UnormPack16 => 2, 4;
        A1R5G5B5UnormPack16 => 2, 4;
        R8Unorm => 1, 1;
        R8Snorm => 1, 1;
        R8Uscaled => 1, 1;
        R8Sscaled => 1, 1;
        R8Uint => 1, 1;
        R8Sint => 1, 1;
        R8Srgb => 1, 1;
        R8G8Unorm => 2, 2;
        R8G8Snorm => 2, 2;
        R8G8Uscaled => 2, 2;
        R8G8Sscaled => 2, 2;
        R8G8Uint => 2, 2;
        R8G8Sint => 2, 2;
        R8G8Srgb => 2, 2;
        R8G8B8Unorm => 3, 3;
        R8G8B8Snorm => 3, 3;
        R8G8B8Uscaled => 3, 3;
        R8G8B8Sscaled => 3, 3;
        R8G8B8Uint => 3, 3;
        R8G8B8Sint => 3, 3;
        R8G8B8Srgb => 3, 3;
        B8G8R8Unorm => 3, 3;
        B8G8R8Snorm => 3, 3;
        B8G8R8Uscaled => 3, 3;
        B8G8R8Sscaled => 3, 3;
        B8G8R8Uint => 3, 3;
        B8G8R8Sint => 3, 3;
        B8G8R8Srgb => 3, 3;
        R8G8B8A8Unorm => 4, 4;
        R8G8B8A8Snorm => 4, 4;
        R8G8B8A8Uscaled => 4, 4;
        R8G8B8A8Sscaled => 4, 4;
        R8G8B8A8Uint => 4, 4;
        R8G8B8A8Sint => 4, 4;
        R8G8B8A8Srgb => 4, 4;
        B8G8R8A8Unorm => 4, 4;
        B8G8R8A8Snorm => 4, 4;
        B8G8R8A8Uscaled => 4, 4;
        B8G8R8A8Sscaled => 4, 4;
        B8G8R8A8Uint => 4, 4;
        B8G8R8A8Sint => 4, 4;
        B8G8R8A8Srgb => 4, 4;
        A8B8G8R8UnormPack32 => 4, 4;
        A8B8G8R8SnormPack32 => 4, 4;
        A8B8G8R8UscaledPack32 => 4, 4;
        A8B8G8R8SscaledPack32 => 4, 4;
        A8B8G8R8UintPack32 => 4, 4;
        A8B8G8R8SintPack32 => 4, 4;
        A8B8G8R8SrgbPack32 => 4, 4;
        A2R10G10B10UnormPack32 => 4, 4;
        A2R10G10B10SnormPack32 => 4, 4;
        A2R10G10B10UscaledPack32 => 4, 4;
        A2R10G10B10SscaledPack32 => 4, 4;
        A2R10G10B10UintPack32 => 4, 4;
        A2R10G10B10SintPack32 => 4, 4;
        A2B10G10R10UnormPack32 => 4, 4;
        A2B10G10R10SnormPack32 => 4, 4;
        A2B10G10R10UscaledPack32 => 4, 4;
        A2B10G10R10SscaledPack32 => 4, 4;
        A2B10G10R10UintPack32 => 4, 4;
        A2B10G10R10SintPack32 => 4, 4;
        R16Unorm => 2, 1;
        R16Snorm => 2, 1;
        R16Uscaled => 2, 1;
        R16Sscaled => 2, 1;
        R16Uint => 2, 1;
        R16Sint => 2, 1;
        R16Sfloat => 2, 1;
        R16G16Unorm => 4, 2;
        R16G16Snorm => 4, 2;
        R16G16Uscaled => 4, 2;
        R16G16Sscaled => 4, 2;
        R16G16Uint => 4, 2;
        R16G16Sint => 4, 2;
        R16G16Sfloat => 4, 2;
        R16G16B16Unorm => 6, 3;
        R16G16B16Snorm => 6, 3;
        R16G16B16Uscaled => 6, 3;
        R16G16B16Sscaled => 6, 3;
        R16G16B16Uint => 6, 3;
        R16G16B16Sint => 6, 3;
        R16G16B16Sfloat => 6, 3;
        R16G16B16A16Unorm => 8, 4;
        R16G16B16A16Snorm => 8, 4;
        R16G16B16A16Uscaled => 8, 4;
        R16G16B16A16Sscaled => 8, 4;
        R16G16B16A16Uint => 8, 4;
        R16G16B16A16Sint => 8, 4;
        R16G16B16A16Sfloat => 8, 4;
        R32Uint => 4, 1;
        R32Sint => 4, 1;
        R32Sfloat => 4, 1;
        R32G32Uint => 8, 2;
        R32G32Sint => 8, 2;
        R32G32Sfloat => 8, 2;
        R32G32B32Uint => 12, 3;
        R32G32B32Sint => 12, 3;
        R32G32B32Sfloat => 12, 3;
        R32G32B32A32Uint => 16, 4;
        R32G32B32A32Sint => 16, 4;
        R32G32B32A32Sfloat => 16, 4;
        R64Uint => 8, 1;
        R64Sint => 8, 1;
        R64Sfloat => 8, 1;
        R64G64Uint => 16, 2;
        R64G64Sint => 16, 2;
        R64G64Sfloat => 16, 2;
        R64G64B64Uint => 24, 3;
        R64G64B64Sint => 24, 3;
        R64G64B64Sfloat => 24, 3;
        R64G64B64A64Uint => 32, 4;
        R64G64B64A64Sint => 32, 4;
        R64G64B64A64Sfloat => 32, 4;
        B10G11R11UfloatPack32 => 4, 3;
        E5B9G9R9UfloatPack32 => 4, 4;
        D16Unorm => 2, 1;
        X8D24UnormPack32 => 4, 2;
        D32Sfloat => 4, 1;
        S8Uint => 1, 1;
        D16UnormS8Uint => 3, 2;
        D24UnormS8Uint => 4, 2;
        D32SfloatS8Uint => 5, 2;
    }
    unsized {
        Undefined,
        Bc1RgbUnormBlock,
        Bc1RgbaUnormBlock,
        Bc2UnormBlock,
        Bc3UnormBlock,
        Bc4UnormBlock,
        Bc5UnormBlock,
        Bc6hUfloatBlock,
        Bc7UnormBlock,
        Bc7SrgbBlock,
        Etc2R8G8B8UnormBlock,
        Astc4x4UnormBlock,
    }
}

impl Format {
    /// Depth formats without a stencil aspect.
    pub fn is_depth_only(self) -> bool {
        matches!(self, Format::D16Unorm | Format::D32Sfloat)
    }

    /// Combined depth/stencil formats.
    pub fn is_depth_stencil(self) -> bool {
        matches!(
            self,
            Format::D16UnormS8Uint | Format::D24UnormS8Uint | Format::D32SfloatS8Uint
        )
    }

    pub fn is_depth(self) -> bool {
        self.is_depth_only() || self.is_depth_stencil()
    }

    pub fn is_color(self) -> bool {
        !self.is_depth()
    }
}

impl Default for Format {
    fn default() -> Self {
        Format::R8G8B8A8Unorm
    }
}
