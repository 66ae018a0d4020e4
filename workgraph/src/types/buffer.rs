//! Buffer types and descriptors.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a uniform buffer.
        const UNIFORM = 1 << 0;
        /// Buffer can be used as a storage buffer.
        const STORAGE = 1 << 1;
        /// Buffer can be used as an indirect dispatch argument buffer.
        const INDIRECT = 1 << 2;
        /// Buffer can be copied from.
        const COPY_SRC = 1 << 3;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 4;
        /// Buffer can back an acceleration structure build.
        const ACCELERATION_STRUCTURE_INPUT = 1 << 5;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Memory placement flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct MemoryFlags: u32 {
        /// Memory lives on the device.
        const DEVICE_LOCAL = 1 << 0;
        /// Memory is visible to the host.
        const HOST_VISIBLE = 1 << 1;
        /// Host writes are visible without an explicit flush.
        const HOST_COHERENT = 1 << 2;
    }
}

impl Default for MemoryFlags {
    fn default() -> Self {
        Self::DEVICE_LOCAL
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    #[serde(default)]
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    #[serde(default)]
    pub usage: BufferUsage,
    /// Memory placement.
    #[serde(default)]
    pub memory: MemoryFlags,
}

impl BufferDescriptor {
    /// Create a new device-local buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
            memory: MemoryFlags::DEVICE_LOCAL,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the memory placement flags.
    pub fn with_memory(mut self, memory: MemoryFlags) -> Self {
        self.memory = memory;
        self
    }
}
