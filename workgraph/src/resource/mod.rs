//! Resources that flow between work nodes.
//!
//! [`Resource`] is a closed union over everything a node can produce or
//! consume. GPU variants are lightweight handles: cloning a resource clones
//! the handle, never the allocation behind it.

mod constant;
mod handles;
mod map;

pub use constant::ConstantValue;
pub use handles::{AccelerationStructureResource, BufferResource, ImageResource, ResourceId};
pub use map::ResourceMap;

use std::fmt;

/// Discriminant of a [`Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Constant,
    Buffer,
    Image,
    AccelerationStructure,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Constant => "constant",
            Self::Buffer => "buffer",
            Self::Image => "image",
            Self::AccelerationStructure => "acceleration structure",
        };
        f.write_str(name)
    }
}

/// A value passed between nodes through ports.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Constant(ConstantValue),
    Buffer(BufferResource),
    Image(ImageResource),
    AccelerationStructure(AccelerationStructureResource),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Constant(_) => ResourceKind::Constant,
            Self::Buffer(_) => ResourceKind::Buffer,
            Self::Image(_) => ResourceKind::Image,
            Self::AccelerationStructure(_) => ResourceKind::AccelerationStructure,
        }
    }

    /// Identity of the backing GPU object; `None` for constants.
    pub fn id(&self) -> Option<ResourceId> {
        match self {
            Self::Constant(_) => None,
            Self::Buffer(buffer) => Some(buffer.id()),
            Self::Image(image) => Some(image.id()),
            Self::AccelerationStructure(accel) => Some(accel.id()),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Constant(_) => None,
            Self::Buffer(buffer) => buffer.label(),
            Self::Image(image) => image.label(),
            Self::AccelerationStructure(accel) => accel.label(),
        }
    }

    /// Whether this resource is backed by a GPU object.
    pub fn is_gpu(&self) -> bool {
        !matches!(self, Self::Constant(_))
    }

    pub fn as_constant(&self) -> Option<&ConstantValue> {
        match self {
            Self::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&BufferResource> {
        match self {
            Self::Buffer(buffer) => Some(buffer),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageResource> {
        match self {
            Self::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_acceleration_structure(&self) -> Option<&AccelerationStructureResource> {
        match self {
            Self::AccelerationStructure(accel) => Some(accel),
            _ => None,
        }
    }
}

impl From<ConstantValue> for Resource {
    fn from(value: ConstantValue) -> Self {
        Self::Constant(value)
    }
}

impl From<BufferResource> for Resource {
    fn from(buffer: BufferResource) -> Self {
        Self::Buffer(buffer)
    }
}

impl From<ImageResource> for Resource {
    fn from(image: ImageResource) -> Self {
        Self::Image(image)
    }
}

impl From<AccelerationStructureResource> for Resource {
    fn from(accel: AccelerationStructureResource) -> Self {
        Self::AccelerationStructure(accel)
    }
}

static_assertions::assert_impl_all!(Resource: Send, Sync, Clone);
