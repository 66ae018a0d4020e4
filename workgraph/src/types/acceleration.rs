//! Acceleration structure descriptors.

use serde::{Deserialize, Serialize};

/// Level of an acceleration structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccelerationStructureKind {
    /// Instance-level structure referencing bottom-level structures.
    TopLevel,
    /// Geometry-level structure.
    #[default]
    BottomLevel,
}

/// Descriptor for creating an acceleration structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AccelerationStructureDescriptor {
    /// Debug label.
    #[serde(default)]
    pub label: Option<String>,
    /// Structure level.
    #[serde(default)]
    pub kind: AccelerationStructureKind,
    /// Size of the backing storage in bytes.
    pub size: u64,
}

impl AccelerationStructureDescriptor {
    pub fn new(kind: AccelerationStructureKind, size: u64) -> Self {
        Self {
            label: None,
            kind,
            size,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
