//! Compute dispatch node.

use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, SlotCaches};
use crate::context::{Access, Binding, ExecutionContext, ProgramHandle, ProgramLocation};
use crate::error::{NodeError, WorkGraphError};
use crate::profiling::profile_scope;
use crate::resource::Resource;

use super::{NodeIo, PortDesc, ResourceShape};

/// A named program parameter fed through an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchInput {
    pub name: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub access: Access,
}

fn default_required() -> bool {
    true
}

impl DispatchInput {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            access: Access::Read,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            access: Access::Read,
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }
}

/// Where an output's resource comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSource {
    /// Republish the resource bound to this input once the program wrote it.
    Input(String),
    /// A pooled scratch resource owned by the node.
    Transient(ResourceShape),
}

/// An output port of a dispatch node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutput {
    pub name: String,
    pub source: OutputSource,
}

impl DispatchOutput {
    pub fn from_input(name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: OutputSource::Input(input.into()),
        }
    }

    pub fn transient(name: impl Into<String>, shape: ResourceShape) -> Self {
        Self {
            name: name.into(),
            source: OutputSource::Transient(shape),
        }
    }
}

/// Number of workgroups to dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkgroupCount {
    Fixed([u32; 3]),
    /// Derive the count from an element-count constant on an input port,
    /// rounding up to whole groups of `group_size`.
    FromConstant { port: String, group_size: [u32; 3] },
}

impl Default for WorkgroupCount {
    fn default() -> Self {
        Self::Fixed([1, 1, 1])
    }
}

impl WorkgroupCount {
    fn resolve(&self, io: &NodeIo<'_>) -> Result<[u32; 3], NodeError> {
        match self {
            Self::Fixed(groups) => Ok(*groups),
            Self::FromConstant { port, group_size } => {
                let extent = io
                    .require(port)?
                    .as_constant()
                    .and_then(|value| value.as_extent())
                    .ok_or_else(|| NodeError::InvalidInput {
                        port: port.clone(),
                        reason: "expected a non-negative integer constant".into(),
                    })?;
                Ok([0, 1, 2].map(|axis| extent[axis].div_ceil(group_size[axis].max(1))))
            }
        }
    }
}

/// Runs a compute program over its bound inputs.
///
/// The program is loaded the first time the node runs and reloaded whenever
/// the context reports the loaded revision as stale. A failed load leaves a
/// status message on the node and fails only this node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchNode {
    name: String,
    program: ProgramLocation,
    #[serde(default)]
    inputs: Vec<DispatchInput>,
    #[serde(default)]
    outputs: Vec<DispatchOutput>,
    #[serde(default)]
    workgroups: WorkgroupCount,
    #[serde(skip)]
    compiled: Option<ProgramHandle>,
    #[serde(skip)]
    status: Option<String>,
    #[serde(skip)]
    caches: SlotCaches,
}

impl DispatchNode {
    pub const KIND: &'static str = "dispatch";

    pub fn new(name: impl Into<String>, program: ProgramLocation) -> Self {
        Self {
            name: name.into(),
            program,
            inputs: Vec::new(),
            outputs: Vec::new(),
            workgroups: WorkgroupCount::default(),
            compiled: None,
            status: None,
            caches: SlotCaches::default(),
        }
    }

    pub fn with_input(mut self, input: DispatchInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_output(mut self, output: DispatchOutput) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn with_workgroups(mut self, workgroups: WorkgroupCount) -> Self {
        self.workgroups = workgroups;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> &ProgramLocation {
        &self.program
    }

    /// Point the node at another program. The next run loads it.
    pub fn set_program(&mut self, program: ProgramLocation) {
        if self.program != program {
            self.program = program;
            self.compiled = None;
        }
    }

    pub fn inputs(&self) -> &[DispatchInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[DispatchOutput] {
        &self.outputs
    }

    pub fn workgroups(&self) -> &WorkgroupCount {
        &self.workgroups
    }

    /// The currently loaded program, if any.
    pub fn compiled(&self) -> Option<&ProgramHandle> {
        self.compiled.as_ref()
    }

    /// Message left by the last failed program load.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub(super) fn ports(&self) -> Vec<PortDesc> {
        let inputs = self.inputs.iter().map(|input| {
            if input.required {
                PortDesc::required(input.name.clone())
            } else {
                PortDesc::optional(input.name.clone())
            }
        });
        let outputs = self
            .outputs
            .iter()
            .map(|output| PortDesc::output(output.name.clone()));
        inputs.chain(outputs).collect()
    }

    pub(super) fn validate(&self) -> Result<(), WorkGraphError> {
        let has_input = |port: &str| self.inputs.iter().any(|input| input.name == port);

        if let WorkgroupCount::FromConstant { port, .. } = &self.workgroups {
            if !has_input(port) {
                return Err(WorkGraphError::InvalidNode(format!(
                    "`{}` derives its workgroup count from undeclared input `{port}`",
                    self.name
                )));
            }
        }
        for output in &self.outputs {
            if let OutputSource::Input(port) = &output.source {
                if !has_input(port) {
                    return Err(WorkGraphError::InvalidNode(format!(
                        "`{}` output `{}` republishes undeclared input `{port}`",
                        self.name, output.name
                    )));
                }
            }
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

    fn ensure_program(&mut self, ctx: &mut dyn ExecutionContext) -> Result<ProgramHandle, NodeError> {
        if let Some(program) = &self.compiled {
            if !ctx.is_program_stale(program) {
                return Ok(program.clone());
            }
            log::debug!("Dispatch `{}`: {} is stale, reloading", self.name, self.program);
        }

        match ctx.load_program(&self.program) {
            Ok(program) => {
                self.status = None;
                self.compiled = Some(program.clone());
                Ok(program)
            }
            Err(err) => {
                let message = err.to_string();
                log::warn!("Dispatch `{}`: {}", self.name, message);
                self.compiled = None;
                self.status = Some(message.clone());
                Err(NodeError::CompileFailed(message))
            }
        }
    }

    pub(super) fn execute(
        &mut self,
        ctx: &mut dyn ExecutionContext,
        io: &mut NodeIo<'_>,
    ) -> Result<(), NodeError> {
        profile_scope!("dispatch");

        let program = self.ensure_program(ctx)?;

        let mut bindings = Vec::with_capacity(self.inputs.len() + self.outputs.len());
        for input in &self.inputs {
            match io.input(&input.name) {
                Some(resource) => {
                    bindings.push(Binding::new(&input.name, resource.clone(), input.access))
                }
                None if input.required => {
                    return Err(NodeError::MissingInput {
                        port: input.name.clone(),
                    })
                }
                None => {}
            }
        }

        let workgroups = self.workgroups.resolve(io)?;

        let mut published: Vec<(String, Resource)> = Vec::with_capacity(self.outputs.len());
        for output in &self.outputs {
            match &output.source {
                OutputSource::Input(port) => {
                    if let Some(resource) = io.input(port) {
                        published.push((output.name.clone(), resource.clone()));
                    }
                }
                OutputSource::Transient(shape) => {
                    let completed = ctx.completed_value();
                    let cache = self.caches.slot(&output.name);
                    let resource = cache.pop_or_create(completed, || shape.create(&mut *ctx))?;
                    cache.push(resource.clone(), ctx.next_signal_value());
                    bindings.push(Binding::new(&output.name, resource.clone(), Access::Write));
                    published.push((output.name.clone(), resource));
                }
            }
        }

        for binding in bindings.iter().filter(|b| b.resource.is_gpu()) {
            ctx.barrier(&binding.resource, binding.access);
        }
        ctx.dispatch(&program, &bindings, workgroups)?;

        for (port, resource) in published {
            io.publish(&port, resource);
        }
        Ok(())
    }
}
