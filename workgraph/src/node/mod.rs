//! Work nodes.
//!
//! A [`WorkNode`] is one schedulable unit of work. Each variant declares a set
//! of named ports (derived from its configuration) and an execution body that
//! reads resolved inputs and publishes outputs through [`NodeIo`].
//!
//! | Variant | Inputs | Outputs |
//! |---------|--------|---------|
//! | [`CreateResourceNode`] | none | `out`, or `output0..N` |
//! | [`CopyResourceNode`] | `dst` (required), `src` (optional) | `out` |
//! | [`DispatchNode`] | configured | configured |
//! | [`ConstantNode`] | none | `value` |

mod constant;
mod copy;
mod create;
mod dispatch;

pub use constant::ConstantNode;
pub use copy::CopyResourceNode;
pub use create::{CreateResourceNode, ResourceShape};
pub use dispatch::{DispatchInput, DispatchNode, DispatchOutput, OutputSource, WorkgroupCount};

use std::collections::HashSet;

use crate::cache::CacheStats;
use crate::context::ExecutionContext;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{NodeError, WorkGraphError};
use crate::graph::NodeId;
use crate::resource::{Resource, ResourceMap};

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Output,
    RequiredInput,
    OptionalInput,
}

impl PortDirection {
    pub fn is_input(&self) -> bool {
        !matches!(self, Self::Output)
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Self::RequiredInput)
    }
}

/// A named port on a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortDesc {
    pub name: String,
    pub direction: PortDirection,
}

impl PortDesc {
    pub fn output(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Output,
        }
    }

    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::RequiredInput,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::OptionalInput,
        }
    }
}

/// A node's view of the invocation while its body runs.
pub struct NodeIo<'a> {
    node: NodeId,
    ports: &'a [PortDesc],
    resources: &'a mut ResourceMap,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> NodeIo<'a> {
    pub fn new(
        node: NodeId,
        ports: &'a [PortDesc],
        resources: &'a mut ResourceMap,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            node,
            ports,
            resources,
            diagnostics,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Resolved resource on an input port, if any.
    pub fn input(&self, port: &str) -> Option<&Resource> {
        self.resources.get(self.node, port)
    }

    /// Resolved resource on an input port, failing when absent.
    pub fn require(&self, port: &str) -> Result<&Resource, NodeError> {
        self.input(port).ok_or_else(|| NodeError::MissingInput {
            port: port.to_owned(),
        })
    }

    /// Publish a resource on an output port.
    ///
    /// Writes to a port the node does not declare as an output are dropped
    /// and reported. Returns whether the write landed.
    pub fn publish(&mut self, port: &str, resource: Resource) -> bool {
        let declared = self
            .ports
            .iter()
            .any(|p| p.name == port && p.direction == PortDirection::Output);
        if !declared {
            self.diagnostics.report(
                Diagnostic::new(
                    DiagnosticKind::UndeclaredOutput,
                    format!("write to undeclared output `{port}` dropped"),
                )
                .with_node(self.node)
                .with_port(port),
            );
            return false;
        }
        self.resources.insert(self.node, port, resource);
        true
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.report(diagnostic.with_node(self.node));
    }
}

/// A node in the work graph.
#[derive(Debug, Clone)]
pub enum WorkNode {
    /// Allocates (or reuses) GPU resources.
    CreateResource(CreateResourceNode),
    /// Copies into or fills a destination resource.
    CopyResource(CopyResourceNode),
    /// Runs a compute program.
    Dispatch(DispatchNode),
    /// Publishes a constant value.
    Constant(ConstantNode),
}

impl WorkNode {
    /// Get the debug name.
    pub fn name(&self) -> &str {
        match self {
            WorkNode::CreateResource(n) => n.name(),
            WorkNode::CopyResource(n) => n.name(),
            WorkNode::Dispatch(n) => n.name(),
            WorkNode::Constant(n) => n.name(),
        }
    }

    /// Variant tag used by the graph definition format.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkNode::CreateResource(_) => CreateResourceNode::KIND,
            WorkNode::CopyResource(_) => CopyResourceNode::KIND,
            WorkNode::Dispatch(_) => DispatchNode::KIND,
            WorkNode::Constant(_) => ConstantNode::KIND,
        }
    }

    /// Ports declared by the node's current configuration.
    pub fn ports(&self) -> Vec<PortDesc> {
        match self {
            WorkNode::CreateResource(n) => n.ports(),
            WorkNode::CopyResource(n) => n.ports(),
            WorkNode::Dispatch(n) => n.ports(),
            WorkNode::Constant(n) => n.ports(),
        }
    }

    pub fn port(&self, name: &str) -> Option<PortDesc> {
        self.ports().into_iter().find(|p| p.name == name)
    }

    /// Check the configuration: port names must be unique and
    /// variant-specific settings consistent.
    pub fn validate(&self) -> Result<(), WorkGraphError> {
        let mut seen = HashSet::new();
        for port in self.ports() {
            if !seen.insert(port.name.clone()) {
                return Err(WorkGraphError::InvalidNode(format!(
                    "`{}` declares port `{}` more than once",
                    self.name(),
                    port.name
                )));
            }
        }
        match self {
            WorkNode::CreateResource(n) => n.validate(),
            WorkNode::Dispatch(n) => n.validate(),
            WorkNode::CopyResource(_) | WorkNode::Constant(_) => Ok(()),
        }
    }

    /// Run the node body.
    pub fn execute(
        &mut self,
        ctx: &mut dyn ExecutionContext,
        io: &mut NodeIo<'_>,
    ) -> Result<(), NodeError> {
        match self {
            WorkNode::CreateResource(n) => n.execute(ctx, io),
            WorkNode::CopyResource(n) => n.execute(ctx, io),
            WorkNode::Dispatch(n) => n.execute(ctx, io),
            WorkNode::Constant(n) => n.execute(io),
        }
    }

    /// Apply the per-slot pool bound to the node's caches.
    pub fn set_cache_capacity(&mut self, capacity: usize) {
        match self {
            WorkNode::CreateResource(n) => n.set_cache_capacity(capacity),
            WorkNode::Dispatch(n) => n.set_cache_capacity(capacity),
            WorkNode::CopyResource(_) | WorkNode::Constant(_) => {}
        }
    }

    /// Drop every pooled resource the node holds.
    pub fn clear_caches(&mut self) {
        match self {
            WorkNode::CreateResource(n) => n.clear_caches(),
            WorkNode::Dispatch(n) => n.clear_caches(),
            WorkNode::CopyResource(_) | WorkNode::Constant(_) => {}
        }
    }

    /// Combined cache statistics of the node.
    pub fn cache_stats(&self) -> CacheStats {
        match self {
            WorkNode::CreateResource(n) => n.cache_stats(),
            WorkNode::Dispatch(n) => n.cache_stats(),
            WorkNode::CopyResource(_) | WorkNode::Constant(_) => CacheStats::default(),
        }
    }

    pub fn as_create_resource(&self) -> Option<&CreateResourceNode> {
        if let WorkNode::CreateResource(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_create_resource_mut(&mut self) -> Option<&mut CreateResourceNode> {
        if let WorkNode::CreateResource(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_copy_resource(&self) -> Option<&CopyResourceNode> {
        if let WorkNode::CopyResource(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_copy_resource_mut(&mut self) -> Option<&mut CopyResourceNode> {
        if let WorkNode::CopyResource(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_dispatch(&self) -> Option<&DispatchNode> {
        if let WorkNode::Dispatch(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_dispatch_mut(&mut self) -> Option<&mut DispatchNode> {
        if let WorkNode::Dispatch(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_constant(&self) -> Option<&ConstantNode> {
        if let WorkNode::Constant(n) = self {
            Some(n)
        } else {
            None
        }
    }

    pub fn as_constant_mut(&mut self) -> Option<&mut ConstantNode> {
        if let WorkNode::Constant(n) = self {
            Some(n)
        } else {
            None
        }
    }
}

impl From<CreateResourceNode> for WorkNode {
    fn from(node: CreateResourceNode) -> Self {
        WorkNode::CreateResource(node)
    }
}

impl From<CopyResourceNode> for WorkNode {
    fn from(node: CopyResourceNode) -> Self {
        WorkNode::CopyResource(node)
    }
}

impl From<DispatchNode> for WorkNode {
    fn from(node: DispatchNode) -> Self {
        WorkNode::Dispatch(node)
    }
}

impl From<ConstantNode> for WorkNode {
    fn from(node: ConstantNode) -> Self {
        WorkNode::Constant(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ConstantValue;

    #[test]
    fn test_publish_to_undeclared_port_is_dropped() {
        let node = NodeId::from_raw(1);
        let ports = vec![PortDesc::output("out")];
        let mut resources = ResourceMap::new();
        let mut diagnostics = Diagnostics::new();

        let mut io = NodeIo::new(node, &ports, &mut resources, &mut diagnostics);
        assert!(!io.publish("bogus", ConstantValue::U32(1).into()));
        assert!(io.publish("out", ConstantValue::U32(2).into()));

        assert!(!resources.contains(node, "bogus"));
        assert!(resources.contains(node, "out"));
        assert!(diagnostics.contains(DiagnosticKind::UndeclaredOutput));
    }

    #[test]
    fn test_publish_to_input_port_is_dropped() {
        let node = NodeId::from_raw(1);
        let ports = vec![PortDesc::required("dst"), PortDesc::output("out")];
        let mut resources = ResourceMap::new();
        let mut diagnostics = Diagnostics::new();

        let mut io = NodeIo::new(node, &ports, &mut resources, &mut diagnostics);
        assert!(!io.publish("dst", ConstantValue::U32(1).into()));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_require_reports_missing_port() {
        let node = NodeId::from_raw(1);
        let ports = vec![PortDesc::required("dst")];
        let mut resources = ResourceMap::new();
        let mut diagnostics = Diagnostics::new();

        let io = NodeIo::new(node, &ports, &mut resources, &mut diagnostics);
        assert_eq!(
            io.require("dst"),
            Err(NodeError::MissingInput { port: "dst".into() })
        );
    }

    #[test]
    fn test_kind_tags() {
        let node = WorkNode::from(ConstantNode::new("k", ConstantValue::U32(1)));
        assert_eq!(node.kind(), "constant");
        assert_eq!(node.name(), "k");
        assert!(node.as_constant().is_some());
        assert!(node.as_dispatch().is_none());
    }

    #[test]
    fn test_duplicate_port_names_rejected() {
        let node = WorkNode::from(
            DispatchNode::new(
                "dup",
                crate::context::ProgramLocation::new("p.wgsl", "main"),
            )
            .with_input(DispatchInput::required("data"))
            .with_input(DispatchInput::optional("data")),
        );
        assert!(matches!(
            node.validate(),
            Err(WorkGraphError::InvalidNode(_))
        ));
    }
}
