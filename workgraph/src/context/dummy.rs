//! Dummy execution context for testing and development.
//!
//! Resources are backed by host byte vectors, so copies and fills have real,
//! observable effects. Dispatches are recorded but not executed. The device
//! timeline is simulated: [`DummyContext::submit`] closes the current batch
//! and [`DummyContext::signal`] / [`DummyContext::complete_all`] advance the
//! completed value.

use std::collections::HashMap;

use crate::error::ContextError;
use crate::resource::{
    AccelerationStructureResource, BufferResource, ConstantValue, ImageResource, Resource,
    ResourceId,
};
use crate::types::{AccelerationStructureDescriptor, BufferDescriptor, ImageDescriptor};

use super::{Access, Binding, ExecutionContext, ProgramHandle, ProgramLocation, TimelineValue};

/// A command recorded by [`DummyContext`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    CreateBuffer {
        id: ResourceId,
        size: u64,
    },
    CreateImage {
        id: ResourceId,
        size: u64,
    },
    CreateAccelerationStructure {
        id: ResourceId,
        size: u64,
    },
    Barrier {
        id: ResourceId,
        access: Access,
    },
    Copy {
        src: ResourceId,
        dst: ResourceId,
    },
    Fill {
        dst: ResourceId,
        value: ConstantValue,
    },
    LoadProgram {
        location: ProgramLocation,
        revision: u64,
    },
    Dispatch {
        location: ProgramLocation,
        bindings: Vec<String>,
        workgroups: [u32; 3],
    },
}

#[derive(Debug)]
struct ProgramSource {
    source: String,
    revision: u64,
}

/// In-memory [`ExecutionContext`].
#[derive(Debug)]
pub struct DummyContext {
    completed: TimelineValue,
    next_signal: TimelineValue,
    storage: HashMap<ResourceId, Vec<u8>>,
    programs: HashMap<String, ProgramSource>,
    next_program_id: u64,
    commands: Vec<RecordedCommand>,
    allocation_failure: Option<String>,
}

impl Default for DummyContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyContext {
    /// Create a context whose timeline has completed nothing yet.
    pub fn new() -> Self {
        Self {
            completed: 0,
            next_signal: 1,
            storage: HashMap::new(),
            programs: HashMap::new(),
            next_program_id: 1,
            commands: Vec::new(),
            allocation_failure: None,
        }
    }

    /// Get the context name.
    pub fn name(&self) -> &'static str {
        "Dummy Context"
    }

    /// Close the batch being recorded and return the value it will signal.
    pub fn submit(&mut self) -> TimelineValue {
        let value = self.next_signal;
        self.next_signal += 1;
        log::trace!("DummyContext: submitted batch signalling {}", value);
        value
    }

    /// Mark the device as having reached `value`.
    ///
    /// The completed value never moves backwards and never passes the last
    /// submitted batch.
    pub fn signal(&mut self, value: TimelineValue) {
        let submitted = self.next_signal - 1;
        self.completed = self.completed.max(value.min(submitted));
    }

    /// Complete every submitted batch.
    pub fn complete_all(&mut self) {
        self.signal(self.next_signal - 1);
    }

    /// Register or replace program source at `path`.
    ///
    /// Replacing the source bumps its revision, which makes every program
    /// loaded from the previous revision stale.
    pub fn set_program_source(&mut self, path: impl Into<String>, source: impl Into<String>) {
        let path = path.into();
        let source = source.into();
        match self.programs.get_mut(&path) {
            Some(program) => {
                program.source = source;
                program.revision += 1;
                log::trace!(
                    "DummyContext: program {} now at revision {}",
                    path,
                    program.revision
                );
            }
            None => {
                self.programs.insert(path, ProgramSource { source, revision: 1 });
            }
        }
    }

    /// Make every following allocation fail with `reason`, or clear the
    /// failure with `None`.
    pub fn set_allocation_failure(&mut self, reason: Option<String>) {
        self.allocation_failure = reason;
    }

    /// Contents of a GPU resource.
    pub fn read_bytes(&self, resource: &Resource) -> Option<&[u8]> {
        resource
            .id()
            .and_then(|id| self.storage.get(&id))
            .map(Vec::as_slice)
    }

    /// Contents of a GPU resource as little-endian `u32` words.
    pub fn read_u32s(&self, resource: &Resource) -> Option<Vec<u32>> {
        self.read_bytes(resource).map(|bytes| {
            bytes
                .chunks_exact(4)
                .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect()
        })
    }

    /// Overwrite the start of a GPU resource's contents.
    pub fn write_bytes(&mut self, resource: &Resource, data: &[u8]) -> Result<(), ContextError> {
        let bytes = self.storage_mut(resource)?;
        if data.len() > bytes.len() {
            return Err(ContextError::IncompatibleResources(format!(
                "write of {} bytes into a {}-byte resource",
                data.len(),
                bytes.len()
            )));
        }
        bytes[..data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Number of resources allocated so far.
    pub fn allocation_count(&self) -> usize {
        self.storage.len()
    }

    /// Number of dispatches recorded so far.
    pub fn dispatch_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RecordedCommand::Dispatch { .. }))
            .count()
    }

    fn check_allocation(&self) -> Result<(), ContextError> {
        match &self.allocation_failure {
            Some(reason) => Err(ContextError::ResourceCreationFailed(reason.clone())),
            None => Ok(()),
        }
    }

    fn allocate(&mut self, id: ResourceId, size: u64) -> Result<(), ContextError> {
        let size = usize::try_from(size).map_err(|_| {
            ContextError::ResourceCreationFailed(format!("{size} bytes exceeds host memory"))
        })?;
        self.storage.insert(id, vec![0; size]);
        Ok(())
    }

    fn storage_mut(&mut self, resource: &Resource) -> Result<&mut Vec<u8>, ContextError> {
        let id = resource.id().ok_or_else(|| {
            ContextError::UnsupportedResource("constants have no device storage".into())
        })?;
        self.storage
            .get_mut(&id)
            .ok_or_else(|| ContextError::Internal(format!("{id} was not created by this context")))
    }
}

impl ExecutionContext for DummyContext {
    fn completed_value(&self) -> TimelineValue {
        self.completed
    }

    fn next_signal_value(&self) -> TimelineValue {
        self.next_signal
    }

    fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
    ) -> Result<BufferResource, ContextError> {
        self.check_allocation()?;
        log::trace!(
            "DummyContext: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        let buffer = BufferResource::new(descriptor.clone());
        self.allocate(buffer.id(), descriptor.size)?;
        self.commands.push(RecordedCommand::CreateBuffer {
            id: buffer.id(),
            size: descriptor.size,
        });
        Ok(buffer)
    }

    fn create_image(
        &mut self,
        descriptor: &ImageDescriptor,
    ) -> Result<ImageResource, ContextError> {
        self.check_allocation()?;
        log::trace!(
            "DummyContext: creating image {:?} ({}x{}x{})",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth
        );
        let size = descriptor.byte_size().ok_or_else(|| {
            ContextError::ResourceCreationFailed(format!(
                "image extent {:?} of {:?} overflows its byte size",
                descriptor.size, descriptor.format
            ))
        })?;
        let image = ImageResource::new(descriptor.clone());
        self.allocate(image.id(), size)?;
        self.commands.push(RecordedCommand::CreateImage {
            id: image.id(),
            size,
        });
        Ok(image)
    }

    fn create_acceleration_structure(
        &mut self,
        descriptor: &AccelerationStructureDescriptor,
    ) -> Result<AccelerationStructureResource, ContextError> {
        self.check_allocation()?;
        log::trace!(
            "DummyContext: creating {:?} acceleration structure {:?} (size: {})",
            descriptor.kind,
            descriptor.label,
            descriptor.size
        );
        let accel = AccelerationStructureResource::new(descriptor.clone());
        self.allocate(accel.id(), descriptor.size)?;
        self.commands
            .push(RecordedCommand::CreateAccelerationStructure {
                id: accel.id(),
                size: descriptor.size,
            });
        Ok(accel)
    }

    fn barrier(&mut self, resource: &Resource, access: Access) {
        if let Some(id) = resource.id() {
            self.commands.push(RecordedCommand::Barrier { id, access });
        }
    }

    fn copy(&mut self, src: &Resource, dst: &Resource) -> Result<(), ContextError> {
        let (Some(src_id), Some(dst_id)) = (src.id(), dst.id()) else {
            return Err(ContextError::UnsupportedResource(
                "copy requires two device resources".into(),
            ));
        };
        if src.kind() != dst.kind() {
            return Err(ContextError::IncompatibleResources(format!(
                "cannot copy {} into {}",
                src.kind(),
                dst.kind()
            )));
        }
        let data = self
            .read_bytes(src)
            .ok_or_else(|| ContextError::Internal(format!("{src_id} was not created by this context")))?
            .to_vec();
        self.write_bytes(dst, &data)?;
        log::trace!("DummyContext: copied {} bytes {} -> {}", data.len(), src_id, dst_id);
        self.commands.push(RecordedCommand::Copy {
            src: src_id,
            dst: dst_id,
        });
        Ok(())
    }

    fn fill(&mut self, dst: &Resource, value: &ConstantValue) -> Result<(), ContextError> {
        let pattern = value.to_bytes();
        let bytes = self.storage_mut(dst)?;
        let mut chunks = bytes.chunks_exact_mut(pattern.len());
        for chunk in &mut chunks {
            chunk.copy_from_slice(&pattern);
        }
        // Unaligned tail gets the leading bytes of the pattern.
        let tail = chunks.into_remainder();
        let len = tail.len();
        tail.copy_from_slice(&pattern[..len]);
        if let Some(dst) = dst.id() {
            log::trace!("DummyContext: filled {} with {:?}", dst, value);
            self.commands.push(RecordedCommand::Fill { dst, value: *value });
        }
        Ok(())
    }

    fn load_program(&mut self, location: &ProgramLocation) -> Result<ProgramHandle, ContextError> {
        let program = self.programs.get(&location.path).ok_or_else(|| {
            ContextError::ProgramLoadFailed(format!("no program source at `{}`", location.path))
        })?;
        if !program.source.contains(location.entry_point.as_str()) {
            return Err(ContextError::ProgramLoadFailed(format!(
                "entry point `{}` not found in `{}`",
                location.entry_point, location.path
            )));
        }
        let handle = ProgramHandle::new(self.next_program_id, location.clone(), program.revision);
        self.next_program_id += 1;
        log::trace!(
            "DummyContext: loaded program {} (revision {})",
            location,
            handle.revision()
        );
        self.commands.push(RecordedCommand::LoadProgram {
            location: location.clone(),
            revision: handle.revision(),
        });
        Ok(handle)
    }

    fn is_program_stale(&self, program: &ProgramHandle) -> bool {
        self.programs
            .get(&program.location().path)
            .map_or(true, |source| source.revision != program.revision())
    }

    fn dispatch(
        &mut self,
        program: &ProgramHandle,
        bindings: &[Binding],
        workgroups: [u32; 3],
    ) -> Result<(), ContextError> {
        for binding in bindings {
            if let Some(id) = binding.resource.id() {
                if !self.storage.contains_key(&id) {
                    return Err(ContextError::Internal(format!(
                        "binding `{}` refers to unknown {id}",
                        binding.name
                    )));
                }
            }
        }
        log::trace!(
            "DummyContext: dispatch {} with {} bindings, groups {:?}",
            program.location(),
            bindings.len(),
            workgroups
        );
        self.commands.push(RecordedCommand::Dispatch {
            location: program.location().clone(),
            bindings: bindings.iter().map(|b| b.name.clone()).collect(),
            workgroups,
        });
        Ok(())
    }
}
