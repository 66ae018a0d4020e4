//! Resource creation node.

use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, SlotCaches};
use crate::context::ExecutionContext;
use crate::error::{ContextError, NodeError, WorkGraphError};
use crate::profiling::profile_scope;
use crate::resource::Resource;
use crate::types::{AccelerationStructureDescriptor, BufferDescriptor, ImageDescriptor};

use super::{NodeIo, PortDesc};

/// What a node allocates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceShape {
    Buffer(BufferDescriptor),
    Image(ImageDescriptor),
    AccelerationStructure(AccelerationStructureDescriptor),
}

impl ResourceShape {
    /// Allocate a new resource of this shape.
    pub fn create(&self, ctx: &mut dyn ExecutionContext) -> Result<Resource, ContextError> {
        Ok(match self {
            Self::Buffer(desc) => ctx.create_buffer(desc)?.into(),
            Self::Image(desc) => ctx.create_image(desc)?.into(),
            Self::AccelerationStructure(desc) => ctx.create_acceleration_structure(desc)?.into(),
        })
    }
}

/// Allocates `copies` resources of one shape, one per output port.
///
/// Each output slot keeps its own transient cache, so a resource allocated in
/// one invocation is handed out again once the device timeline shows the
/// work that used it has completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResourceNode {
    name: String,
    shape: ResourceShape,
    #[serde(default = "default_copies")]
    copies: usize,
    #[serde(skip)]
    caches: SlotCaches,
}

fn default_copies() -> usize {
    1
}

impl CreateResourceNode {
    pub const KIND: &'static str = "create_resource";
    /// Output port name when the node produces a single resource.
    pub const OUTPUT: &'static str = "out";

    pub fn new(name: impl Into<String>, shape: ResourceShape) -> Self {
        Self {
            name: name.into(),
            shape,
            copies: 1,
            caches: SlotCaches::default(),
        }
    }

    pub fn buffer(name: impl Into<String>, descriptor: BufferDescriptor) -> Self {
        Self::new(name, ResourceShape::Buffer(descriptor))
    }

    pub fn image(name: impl Into<String>, descriptor: ImageDescriptor) -> Self {
        Self::new(name, ResourceShape::Image(descriptor))
    }

    /// Fan out to `copies` outputs named `output0..output{copies-1}`.
    pub fn with_copies(mut self, copies: usize) -> Self {
        self.set_copies(copies);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &ResourceShape {
        &self.shape
    }

    pub fn copies(&self) -> usize {
        self.copies
    }

    /// Change the allocated shape. Pooled resources of the old shape are
    /// dropped.
    pub fn set_shape(&mut self, shape: ResourceShape) {
        if self.shape != shape {
            self.shape = shape;
            self.caches.clear();
        }
    }

    /// Change the number of outputs. Caches of removed slots are dropped.
    pub fn set_copies(&mut self, copies: usize) {
        self.copies = copies;
        let names = self.output_names();
        self.caches.retain_slots(|slot| names.iter().any(|n| n == slot));
    }

    /// Output port names for the current configuration.
    pub fn output_names(&self) -> Vec<String> {
        if self.copies == 1 {
            vec![Self::OUTPUT.to_owned()]
        } else {
            (0..self.copies).map(|i| format!("output{i}")).collect()
        }
    }

    pub(super) fn ports(&self) -> Vec<PortDesc> {
        self.output_names().into_iter().map(PortDesc::output).collect()
    }

    pub(super) fn validate(&self) -> Result<(), WorkGraphError> {
        if self.copies == 0 {
            return Err(WorkGraphError::InvalidNode(format!(
                "`{}` must create at least one resource",
                self.name
            )));
        }
        Ok(())
    }

    pub(super) fn set_cache_capacity(&mut self, capacity: usize) {
        self.caches.set_capacity(capacity);
    }

    pub(super) fn clear_caches(&mut self) {
        self.caches.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.caches.stats()
    }

    /// Resources currently pooled across all slots.
    pub fn pooled(&self) -> usize {
        self.caches.pooled()
    }

    pub(super) fn execute(
        &mut self,
        ctx: &mut dyn ExecutionContext,
        io: &mut NodeIo<'_>,
    ) -> Result<(), NodeError> {
        profile_scope!("create_resource");

        for port in self.output_names() {
            let completed = ctx.completed_value();
            let shape = &self.shape;
            let cache = self.caches.slot(&port);
            let resource = cache.pop_or_create(completed, || shape.create(&mut *ctx))?;
            cache.push(resource.clone(), ctx.next_signal_value());
            io.publish(&port, resource);
        }
        Ok(())
    }
}
