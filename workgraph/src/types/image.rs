//! Image types and descriptors.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::Extent3d;

/// Image formats usable by work graph images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 32-bit red channel, float.
    R32Float,
    /// 32-bit red channel, unsigned integer.
    R32Uint,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit RGBA channels, float.
    Rgba32Float,
    /// 32-bit RGBA channels, unsigned integer.
    Rgba32Uint,
}

impl ImageFormat {
    /// Size of one texel in bytes.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::R32Float | Self::R32Uint | Self::Rgba8Unorm => 4,
            Self::Rgba16Float => 8,
            Self::Rgba32Float | Self::Rgba32Uint => 16,
        }
    }
}

bitflags! {
    /// Usage flags for images.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ImageUsage: u32 {
        /// Image can be sampled in shaders.
        const SAMPLED = 1 << 0;
        /// Image can be used for storage (read/write in compute).
        const STORAGE = 1 << 1;
        /// Image can be copied from.
        const COPY_SRC = 1 << 2;
        /// Image can be copied to.
        const COPY_DST = 1 << 3;
    }
}

impl Default for ImageUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageDescriptor {
    /// Debug label for the image.
    #[serde(default)]
    pub label: Option<String>,
    /// Size of the image.
    pub size: Extent3d,
    /// Mip level count.
    #[serde(default = "default_mip_levels")]
    pub mip_level_count: u32,
    /// Image format.
    #[serde(default)]
    pub format: ImageFormat,
    /// Usage flags.
    #[serde(default)]
    pub usage: ImageUsage,
}

fn default_mip_levels() -> u32 {
    1
}

impl ImageDescriptor {
    /// Create a new 2D image descriptor.
    pub fn new_2d(width: u32, height: u32, format: ImageFormat, usage: ImageUsage) -> Self {
        Self {
            label: None,
            size: Extent3d::new_2d(width, height),
            mip_level_count: 1,
            format,
            usage,
        }
    }

    /// Create a new 3D image descriptor.
    pub fn new_3d(extent: Extent3d, format: ImageFormat, usage: ImageUsage) -> Self {
        Self {
            label: None,
            size: extent,
            mip_level_count: 1,
            format,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_level_count = count;
        self
    }

    /// Byte size of the base mip level, or `None` if it overflows `u64`.
    pub fn byte_size(&self) -> Option<u64> {
        self.size
            .texel_count()?
            .checked_mul(self.format.block_size() as u64)
    }
}

impl Default for ImageDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            size: Extent3d::default(),
            mip_level_count: 1,
            format: ImageFormat::default(),
            usage: ImageUsage::empty(),
        }
    }
}
