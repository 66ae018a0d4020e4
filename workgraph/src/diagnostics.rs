//! Diagnostics channel for soft failures.
//!
//! Structural problems (dangling edges, writes to undeclared ports) and node
//! failures never raise out of the scheduler on their own. They are reported
//! here, logged through `log`, and handed back to the caller in the
//! [`ExecutionReport`](crate::ExecutionReport).

use std::fmt;

use crate::error::NodeError;
use crate::graph::NodeId;

/// Broad class of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Graph shape problems; the affected port or edge is treated as absent.
    Structural,
    /// A node's input contract was not met; the node does not run.
    ContractViolation,
    /// The execution context rejected an operation; contained to the node.
    Backend,
}

/// Specific kind of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    UnknownNode,
    DanglingEdge,
    UndeclaredOutput,
    UnknownNodeKind,
    InvalidNodeConfig,
    MissingRequiredInput,
    MissingUpstreamOutput,
    InvalidInput,
    CompileFailed,
    ContextFailure,
}

impl DiagnosticKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownNode
            | Self::DanglingEdge
            | Self::UndeclaredOutput
            | Self::UnknownNodeKind
            | Self::InvalidNodeConfig => ErrorCategory::Structural,
            Self::MissingRequiredInput | Self::MissingUpstreamOutput | Self::InvalidInput => {
                ErrorCategory::ContractViolation
            }
            Self::CompileFailed | Self::ContextFailure => ErrorCategory::Backend,
        }
    }

    /// The diagnostic kind that describes a node failure.
    pub fn for_node_error(error: &NodeError) -> Self {
        match error {
            NodeError::MissingInput { .. } => Self::MissingRequiredInput,
            NodeError::MissingUpstreamOutput { .. } => Self::MissingUpstreamOutput,
            NodeError::InvalidInput { .. } => Self::InvalidInput,
            NodeError::CompileFailed(_) => Self::CompileFailed,
            NodeError::Context(_) => Self::ContextFailure,
        }
    }
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub node: Option<NodeId>,
    pub port: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            node: None,
            port: None,
            message: message.into(),
        }
    }

    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// Build the diagnostic describing a failed node.
    pub fn from_node_error(node: NodeId, error: &NodeError) -> Self {
        let diagnostic =
            Self::new(DiagnosticKind::for_node_error(error), error.to_string()).with_node(node);
        match error {
            NodeError::MissingInput { port }
            | NodeError::MissingUpstreamOutput { port, .. }
            | NodeError::InvalidInput { port, .. } => diagnostic.with_port(port.clone()),
            _ => diagnostic,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}]", self.kind)?;
        if let Some(node) = self.node {
            write!(f, " {node}")?;
        }
        if let Some(port) = &self.port {
            write!(f, " port `{port}`")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Collecting sink for diagnostics.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record a diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.category() {
            ErrorCategory::Backend => log::error!("{diagnostic}"),
            ErrorCategory::Structural | ErrorCategory::ContractViolation => {
                log::warn!("{diagnostic}")
            }
        }
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.entries.iter().any(|d| d.kind == kind)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
