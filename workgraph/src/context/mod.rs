//! The execution context seam.
//!
//! Node bodies never talk to a GPU API directly. Everything they need
//! (allocation, copies, fills, barriers, program loading, dispatch and the
//! device timeline) is reached through [`ExecutionContext`], which a backend
//! implements. [`DummyContext`] is an in-memory implementation used by tests,
//! benchmarks and headless tooling.
//!
//! # Timeline
//!
//! The context exposes a monotonically increasing timeline counter.
//! [`completed_value`](ExecutionContext::completed_value) is the last value
//! the device is known to have reached and must never block.
//! [`next_signal_value`](ExecutionContext::next_signal_value) is the value the
//! device will reach once the work currently being recorded completes.

mod dummy;

pub use dummy::{DummyContext, RecordedCommand};

use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::resource::{
    AccelerationStructureResource, BufferResource, ConstantValue, ImageResource, Resource,
};
use crate::types::{AccelerationStructureDescriptor, BufferDescriptor, ImageDescriptor};

/// Value of the device timeline counter.
pub type TimelineValue = u64;

/// How a command accesses a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    #[default]
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub fn writes(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// A resource bound to a named program parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub resource: Resource,
    pub access: Access,
}

impl Binding {
    pub fn new(name: impl Into<String>, resource: Resource, access: Access) -> Self {
        Self {
            name: name.into(),
            resource,
            access,
        }
    }
}

/// Where a compute program lives: a source path and an entry point in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ProgramLocation {
    pub path: String,
    pub entry_point: String,
}

impl ProgramLocation {
    pub fn new(path: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            entry_point: entry_point.into(),
        }
    }
}

impl std::fmt::Display for ProgramLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.path, self.entry_point)
    }
}

/// A loaded program.
///
/// `revision` identifies the source revision the program was built from;
/// contexts use it to answer [`ExecutionContext::is_program_stale`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramHandle {
    id: u64,
    location: ProgramLocation,
    revision: u64,
}

impl ProgramHandle {
    pub fn new(id: u64, location: ProgramLocation, revision: u64) -> Self {
        Self {
            id,
            location,
            revision,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn location(&self) -> &ProgramLocation {
        &self.location
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Device capabilities consumed by work nodes.
pub trait ExecutionContext {
    /// Last timeline value the device has reached. Never blocks.
    fn completed_value(&self) -> TimelineValue;

    /// Timeline value signalled once the work being recorded completes.
    fn next_signal_value(&self) -> TimelineValue;

    fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
    ) -> Result<BufferResource, ContextError>;

    fn create_image(&mut self, descriptor: &ImageDescriptor)
        -> Result<ImageResource, ContextError>;

    fn create_acceleration_structure(
        &mut self,
        descriptor: &AccelerationStructureDescriptor,
    ) -> Result<AccelerationStructureResource, ContextError>;

    /// Make prior writes to `resource` visible to a following `access`.
    fn barrier(&mut self, resource: &Resource, access: Access);

    /// Copy the contents of `src` into `dst`.
    fn copy(&mut self, src: &Resource, dst: &Resource) -> Result<(), ContextError>;

    /// Fill `dst` by repeating the byte pattern of `value`.
    fn fill(&mut self, dst: &Resource, value: &ConstantValue) -> Result<(), ContextError>;

    fn load_program(&mut self, location: &ProgramLocation) -> Result<ProgramHandle, ContextError>;

    /// Whether the source behind `program` changed since it was loaded.
    fn is_program_stale(&self, program: &ProgramHandle) -> bool;

    fn dispatch(
        &mut self,
        program: &ProgramHandle,
        bindings: &[Binding],
        workgroups: [u32; 3],
    ) -> Result<(), ContextError>;
}
