//! Results of one graph invocation.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{NodeError, WorkGraphError};
use crate::resource::{Resource, ResourceMap};

use super::NodeId;

/// A node that could not run during an invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFailure {
    pub node: NodeId,
    pub name: String,
    pub error: NodeError,
}

/// Everything an invocation produced.
///
/// The resource map holds every port resolved during the run. Nodes that
/// failed are listed in [`failures`](Self::failures) and have no outputs in
/// the map; nodes that depended on them through optional inputs still ran.
#[derive(Debug)]
pub struct ExecutionReport {
    pub(super) target: NodeId,
    pub(super) resources: ResourceMap,
    pub(super) executed: Vec<NodeId>,
    pub(super) failures: Vec<NodeFailure>,
    pub(super) diagnostics: Vec<Diagnostic>,
}

impl ExecutionReport {
    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn resources(&self) -> &ResourceMap {
        &self.resources
    }

    pub fn into_resources(self) -> ResourceMap {
        self.resources
    }

    /// Resource published on `port` of `node`.
    pub fn output(&self, node: NodeId, port: &str) -> Option<&Resource> {
        self.resources.get(node, port)
    }

    /// Resource published on `port` of the target node.
    pub fn target_output(&self, port: &str) -> Option<&Resource> {
        self.output(self.target, port)
    }

    /// Nodes whose bodies ran successfully, in execution order.
    pub fn executed(&self) -> &[NodeId] {
        &self.executed
    }

    pub fn was_executed(&self, node: NodeId) -> bool {
        self.executed.contains(&node)
    }

    /// How many times `node` ran during the invocation (0 or 1).
    pub fn execution_count(&self, node: NodeId) -> usize {
        self.executed.iter().filter(|&&id| id == node).count()
    }

    pub fn failures(&self) -> &[NodeFailure] {
        &self.failures
    }

    pub fn failure(&self, node: NodeId) -> Option<&NodeFailure> {
        self.failures.iter().find(|f| f.node == node)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_diagnostic(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }

    /// Whether every visited node ran.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn a failed target into an error; partial failures upstream of a
    /// target that still ran are kept in the report.
    pub fn into_result(mut self) -> Result<Self, WorkGraphError> {
        match self.failures.iter().position(|f| f.node == self.target) {
            Some(index) => {
                let failure = self.failures.swap_remove(index);
                Err(WorkGraphError::NodeFailed {
                    node: failure.node,
                    name: failure.name,
                    source: failure.error,
                })
            }
            None => Ok(self),
        }
    }
}
