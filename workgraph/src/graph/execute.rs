//! Dependency-driven execution.
//!
//! Resolution uses an explicit stack instead of recursion. The top of the
//! stack is inspected without popping; a node whose inputs are all available
//! runs and is popped, while a node waiting on upstream outputs pushes those
//! sources above itself and is revisited once they finish.
//!
//! Two sets track progress within one invocation:
//!
//! - `finished`: nodes that ran or failed. A finished node found on top of the
//!   stack is a stale entry and is popped before anything else happens.
//! - `expanding`: nodes that pushed dependencies and are waiting on them. A
//!   pending source that is already expanding sits below the current node on
//!   the stack, which means the edges form a cycle.
//!
//! The graph's own mutators keep edges and nodes consistent, so a scheduled
//! node that is not registered or an edge fed by a removed node only shows up
//! when that bookkeeping is bypassed. Both are reported as diagnostics rather
//! than trusted.

use std::collections::HashSet;

use crate::config::FailurePolicy;
use crate::context::ExecutionContext;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{NodeError, WorkGraphError};
use crate::node::{NodeIo, PortDesc};
use crate::profiling::{profile_scope, profile_scope_dynamic};
use crate::resource::{Resource, ResourceMap};

use super::{ExecutionReport, NodeFailure, NodeId, PortRef, WorkGraph};

/// Outcome of inspecting a node's inputs.
enum Readiness {
    /// Every input is resolved; carries the resources to bind.
    Ready(Vec<(String, Resource)>),
    /// These sources must run first.
    Waiting(Vec<NodeId>),
    /// A required input can never be resolved in this invocation.
    Failed(NodeError),
}

struct Invocation {
    resources: ResourceMap,
    diagnostics: Diagnostics,
    executed: Vec<NodeId>,
    failures: Vec<NodeFailure>,
    finished: HashSet<NodeId>,
    expanding: HashSet<NodeId>,
    stack: Vec<NodeId>,
}

impl Invocation {
    fn new(target: NodeId) -> Self {
        Self {
            resources: ResourceMap::new(),
            diagnostics: Diagnostics::new(),
            executed: Vec::new(),
            failures: Vec::new(),
            finished: HashSet::new(),
            expanding: HashSet::new(),
            stack: vec![target],
        }
    }
}

impl WorkGraph {
    /// Run `target` and every node it transitively depends on.
    ///
    /// Each reachable node runs at most once, after all of its sources. Soft
    /// failures are reported through the returned report's diagnostics. With
    /// [`FailurePolicy::SkipDependents`] a failing node only affects nodes that
    /// require its outputs; with [`FailurePolicy::Abort`] the first failure is
    /// returned as [`WorkGraphError::NodeFailed`].
    ///
    /// Fails with [`WorkGraphError::UnknownNode`] if `target` is not in the
    /// graph and [`WorkGraphError::CycleDetected`] if resolution reaches a
    /// dependency cycle.
    pub fn execute(
        &mut self,
        target: NodeId,
        ctx: &mut dyn ExecutionContext,
    ) -> Result<ExecutionReport, WorkGraphError> {
        profile_scope!("work_graph_execute");

        if !self.nodes.contains_key(&target) {
            return Err(WorkGraphError::UnknownNode(target));
        }
        log::debug!("Executing work graph for {}", target);

        let mut run = Invocation::new(target);
        self.drive(&mut run, ctx)?;

        log::debug!(
            "Work graph for {} finished: {} executed, {} failed",
            target,
            run.executed.len(),
            run.failures.len()
        );

        Ok(ExecutionReport {
            target,
            resources: run.resources,
            executed: run.executed,
            failures: run.failures,
            diagnostics: run.diagnostics.into_vec(),
        })
    }

    /// Resolve nodes until the invocation's stack is empty.
    fn drive(
        &mut self,
        run: &mut Invocation,
        ctx: &mut dyn ExecutionContext,
    ) -> Result<(), WorkGraphError> {
        while let Some(&current) = run.stack.last() {
            if run.finished.contains(&current) {
                run.stack.pop();
                continue;
            }

            let Some(node) = self.nodes.get(&current) else {
                run.diagnostics.report(
                    Diagnostic::new(DiagnosticKind::UnknownNode, "scheduled node is not registered")
                        .with_node(current),
                );
                run.stack.pop();
                continue;
            };
            let ports = node.ports();

            match self.readiness(current, &ports, run)? {
                Readiness::Failed(error) => {
                    run.stack.pop();
                    run.finished.insert(current);
                    self.fail(current, error, run)?;
                }
                Readiness::Waiting(sources) => {
                    log::trace!("{} waits on {:?}", current, sources);
                    run.expanding.insert(current);
                    run.stack.extend(sources);
                }
                Readiness::Ready(inputs) => {
                    run.stack.pop();
                    run.finished.insert(current);
                    for (port, resource) in inputs {
                        run.resources.insert(current, port, resource);
                    }
                    self.run_node(current, &ports, ctx, run)?;
                }
            }
        }
        Ok(())
    }

    fn readiness(
        &self,
        current: NodeId,
        ports: &[PortDesc],
        run: &mut Invocation,
    ) -> Result<Readiness, WorkGraphError> {
        let mut inputs = Vec::new();
        let mut pending: Vec<NodeId> = Vec::new();

        for port in ports.iter().filter(|p| p.direction.is_input()) {
            let required = port.direction.is_required();
            let Some(source) = self.edges.get(&PortRef::new(current, port.name.clone())) else {
                if required {
                    return Ok(Readiness::Failed(NodeError::MissingInput {
                        port: port.name.clone(),
                    }));
                }
                continue;
            };

            if !self.nodes.contains_key(&source.node) {
                run.diagnostics.report(
                    Diagnostic::new(
                        DiagnosticKind::DanglingEdge,
                        format!("input is fed by {source}, which is not registered"),
                    )
                    .with_node(current)
                    .with_port(port.name.clone()),
                );
                if required {
                    return Ok(Readiness::Failed(NodeError::MissingInput {
                        port: port.name.clone(),
                    }));
                }
                continue;
            }

            if let Some(resource) = run.resources.get(source.node, &source.port) {
                inputs.push((port.name.clone(), resource.clone()));
            } else if run.finished.contains(&source.node) {
                // The source already ran (or failed) without publishing this port.
                if required {
                    return Ok(Readiness::Failed(NodeError::MissingUpstreamOutput {
                        port: port.name.clone(),
                        upstream: source.node,
                        upstream_port: source.port.clone(),
                    }));
                }
            } else if source.node == current || run.expanding.contains(&source.node) {
                return Err(WorkGraphError::CycleDetected {
                    cycle: cycle_path(&run.stack, &run.expanding, source.node),
                });
            } else if !pending.contains(&source.node) {
                pending.push(source.node);
            }
        }

        if pending.is_empty() {
            Ok(Readiness::Ready(inputs))
        } else {
            Ok(Readiness::Waiting(pending))
        }
    }

    fn run_node(
        &mut self,
        current: NodeId,
        ports: &[PortDesc],
        ctx: &mut dyn ExecutionContext,
        run: &mut Invocation,
    ) -> Result<(), WorkGraphError> {
        let Some(node) = self.nodes.get_mut(&current) else {
            return Ok(());
        };
        profile_scope_dynamic!(node.name());
        log::trace!("Running {} `{}`", current, node.name());

        let mut io = NodeIo::new(current, ports, &mut run.resources, &mut run.diagnostics);
        match node.execute(ctx, &mut io) {
            Ok(()) => {
                run.executed.push(current);
                Ok(())
            }
            Err(error) => self.fail(current, error, run),
        }
    }

    fn fail(
        &self,
        node: NodeId,
        error: NodeError,
        run: &mut Invocation,
    ) -> Result<(), WorkGraphError> {
        run.diagnostics
            .report(Diagnostic::from_node_error(node, &error));
        let name = self
            .nodes
            .get(&node)
            .map(|n| n.name().to_owned())
            .unwrap_or_default();

        match self.config.execution.failure_policy {
            FailurePolicy::Abort => Err(WorkGraphError::NodeFailed {
                node,
                name,
                source: error,
            }),
            FailurePolicy::SkipDependents => {
                run.failures.push(NodeFailure { node, name, error });
                Ok(())
            }
        }
    }
}

/// The chain of waiting nodes from `start` up to the top of the stack, closed
/// back at `start`.
fn cycle_path(stack: &[NodeId], expanding: &HashSet<NodeId>, start: NodeId) -> Vec<NodeId> {
    let top = stack.len().saturating_sub(1);
    let from = stack.iter().rposition(|&id| id == start).unwrap_or(top);
    let mut cycle: Vec<NodeId> = Vec::new();
    for (index, &id) in stack.iter().enumerate().skip(from) {
        let on_path = id == start || index == top || expanding.contains(&id);
        if on_path && !cycle.contains(&id) {
            cycle.push(id);
        }
    }
    cycle.push(start);
    cycle
}
