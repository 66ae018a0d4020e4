//! Error types for the work graph.

use thiserror::Error;

use crate::graph::NodeId;

/// Graph-level errors returned by [`WorkGraph`](crate::WorkGraph) operations.
#[derive(Error, Debug)]
pub enum WorkGraphError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("node {node} has no port `{port}`")]
    UnknownPort { node: NodeId, port: String },
    #[error("port `{port}` on node {node} is not an {expected} port")]
    PortDirectionMismatch {
        node: NodeId,
        port: String,
        expected: &'static str,
    },
    #[error("dependency cycle detected: {}", format_cycle(.cycle))]
    CycleDetected { cycle: Vec<NodeId> },
    #[error("node {node} (`{name}`) failed: {source}")]
    NodeFailed {
        node: NodeId,
        name: String,
        #[source]
        source: NodeError,
    },
    #[error("invalid node: {0}")]
    InvalidNode(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error("invalid graph definition: {0}")]
    Definition(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_cycle(cycle: &[NodeId]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Why a single node could not execute.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("required input `{port}` is not connected")]
    MissingInput { port: String },
    #[error("required input `{port}` expects output `{upstream_port}` of {upstream}, which was not produced")]
    MissingUpstreamOutput {
        port: String,
        upstream: NodeId,
        upstream_port: String,
    },
    #[error("input `{port}` is invalid: {reason}")]
    InvalidInput { port: String, reason: String },
    #[error("program compilation failed: {0}")]
    CompileFailed(String),
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Errors raised by an [`ExecutionContext`](crate::ExecutionContext).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("failed to create resource: {0}")]
    ResourceCreationFailed(String),
    #[error("incompatible resources: {0}")]
    IncompatibleResources(String),
    #[error("failed to load program: {0}")]
    ProgramLoadFailed(String),
    #[error("unsupported resource: {0}")]
    UnsupportedResource(String),
    #[error("internal error: {0}")]
    Internal(String),
}
