//! Descriptor types for the GPU resources a work graph can allocate.

mod acceleration;
mod buffer;
mod common;
mod image;

pub use acceleration::{AccelerationStructureDescriptor, AccelerationStructureKind};
pub use buffer::{BufferDescriptor, BufferUsage, MemoryFlags};
pub use common::Extent3d;
pub use image::{ImageDescriptor, ImageFormat, ImageUsage};
