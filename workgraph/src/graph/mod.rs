//! Work graph infrastructure.
//!
//! A [`WorkGraph`] owns a set of [`WorkNode`]s keyed by [`NodeId`] and a set of
//! explicit edges, each binding one input port to the output port that feeds
//! it. Executing a target node lazily runs every node it transitively depends
//! on, exactly once, in dependency order.
//!
//! # Example
//!
//! ```ignore
//! use redlilium_workgraph::{
//!     BufferDescriptor, BufferUsage, ConstantValue, CopyResourceNode, CreateResourceNode,
//!     DummyContext, WorkGraph,
//! };
//!
//! let mut graph = WorkGraph::new();
//! let create = graph.add_node(CreateResourceNode::buffer(
//!     "grid",
//!     BufferDescriptor::new(1024, BufferUsage::STORAGE | BufferUsage::COPY_DST),
//! ))?;
//! let clear = graph.add_node(
//!     CopyResourceNode::new("clear").with_fill_value(ConstantValue::U32(0)),
//! )?;
//! graph.connect(clear, "dst", create, "out")?;
//!
//! let mut ctx = DummyContext::new();
//! let report = graph.execute(clear, &mut ctx)?;
//! let grid = report.target_output("out");
//! ```

mod definition;
mod execute;
mod report;

pub use definition::{EdgeDefinition, GraphDefinition, LoadReport, NodeDefinition, PortDefinition};
pub use report::{ExecutionReport, NodeFailure};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::WorkGraphConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::WorkGraphError;
use crate::node::WorkNode;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a node in a work graph.
///
/// `NodeId` is `Copy` and unique for the lifetime of the process, so ids from
/// removed nodes are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw id. Ids that were not handed out by a graph simply refer to
    /// no node.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A port on a specific node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortRef {
    pub node: NodeId,
    pub port: String,
}

impl PortRef {
    pub fn new(node: NodeId, port: impl Into<String>) -> Self {
        Self {
            node,
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.port)
    }
}

/// The work graph: nodes plus destination-to-source edges.
#[derive(Debug, Default)]
pub struct WorkGraph {
    nodes: BTreeMap<NodeId, WorkNode>,
    /// Input port -> the output port feeding it.
    edges: HashMap<PortRef, PortRef>,
    config: WorkGraphConfig,
}

impl WorkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WorkGraphConfig) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &WorkGraphConfig {
        &self.config
    }

    /// Replace the configuration and apply the new cache bound to every node.
    pub fn set_config(&mut self, config: WorkGraphConfig) {
        for node in self.nodes.values_mut() {
            node.set_cache_capacity(config.cache.max_entries_per_slot);
        }
        self.config = config;
    }

    /// Add a node and return its id.
    pub fn add_node(&mut self, node: impl Into<WorkNode>) -> Result<NodeId, WorkGraphError> {
        let mut node = node.into();
        node.validate()?;
        node.set_cache_capacity(self.config.cache.max_entries_per_slot);

        let id = NodeId::next();
        log::debug!("Adding {} node `{}` as {}", node.kind(), node.name(), id);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Remove a node together with every edge that touches it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<WorkNode> {
        let node = self.nodes.remove(&id)?;
        self.edges
            .retain(|dst, src| dst.node != id && src.node != id);
        Some(node)
    }

    pub fn node(&self, id: NodeId) -> Option<&WorkNode> {
        self.nodes.get(&id)
    }

    /// Mutable access to a node's configuration.
    ///
    /// Edges are not revalidated; use [`validate`](Self::validate) after
    /// changing a node's ports.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut WorkNode> {
        self.nodes.get_mut(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &WorkNode)> + '_ {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Feed input `dst_port` of `dst` from output `src_port` of `src`.
    ///
    /// An input has at most one source; connecting an already connected input
    /// replaces the edge and returns the previous source.
    pub fn connect(
        &mut self,
        dst: NodeId,
        dst_port: &str,
        src: NodeId,
        src_port: &str,
    ) -> Result<Option<PortRef>, WorkGraphError> {
        self.check_port(dst, dst_port, true)?;
        self.check_port(src, src_port, false)?;

        let previous = self
            .edges
            .insert(PortRef::new(dst, dst_port), PortRef::new(src, src_port));
        if let Some(previous) = &previous {
            log::debug!("Rewired {}.{} (was fed by {})", dst, dst_port, previous);
        }
        Ok(previous)
    }

    fn check_port(&self, id: NodeId, port: &str, input: bool) -> Result<(), WorkGraphError> {
        let node = self.nodes.get(&id).ok_or(WorkGraphError::UnknownNode(id))?;
        let desc = node.port(port).ok_or_else(|| WorkGraphError::UnknownPort {
            node: id,
            port: port.to_owned(),
        })?;
        if desc.direction.is_input() != input {
            return Err(WorkGraphError::PortDirectionMismatch {
                node: id,
                port: port.to_owned(),
                expected: if input { "input" } else { "output" },
            });
        }
        Ok(())
    }

    /// Remove the edge feeding `dst_port` of `dst`, returning its source.
    pub fn disconnect(&mut self, dst: NodeId, dst_port: &str) -> Option<PortRef> {
        self.edges.remove(&PortRef::new(dst, dst_port))
    }

    /// The output port feeding `dst_port` of `dst`.
    pub fn source_of(&self, dst: NodeId, dst_port: &str) -> Option<&PortRef> {
        self.edges.get(&PortRef::new(dst, dst_port))
    }

    /// All edges as `(destination, source)`, in a stable order.
    pub fn edges(&self) -> Vec<(&PortRef, &PortRef)> {
        let mut edges: Vec<_> = self.edges.iter().collect();
        edges.sort();
        edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Report edges that reference missing nodes or ports that the nodes no
    /// longer declare with the right direction.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for (dst, src) in self.edges() {
            for (end, input) in [(dst, true), (src, false)] {
                let problem = match self.nodes.get(&end.node) {
                    None => Some(format!("edge {src} -> {dst} references missing {}", end.node)),
                    Some(node) => match node.port(&end.port) {
                        None => Some(format!(
                            "edge {src} -> {dst}: `{}` has no port `{}`",
                            node.name(),
                            end.port
                        )),
                        Some(desc) if desc.direction.is_input() != input => Some(format!(
                            "edge {src} -> {dst}: port `{}` of `{}` has the wrong direction",
                            end.port,
                            node.name()
                        )),
                        Some(_) => None,
                    },
                };
                if let Some(message) = problem {
                    diagnostics.push(
                        Diagnostic::new(DiagnosticKind::DanglingEdge, message)
                            .with_node(end.node)
                            .with_port(end.port.clone()),
                    );
                }
            }
        }
        diagnostics
    }

    /// Drop every pooled resource held by every node.
    pub fn clear_caches(&mut self) {
        for node in self.nodes.values_mut() {
            node.clear_caches();
        }
    }

    /// Remove all nodes and edges.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }
}

// Graphs are moved between threads but executed by one at a time.
static_assertions::assert_impl_all!(WorkGraph: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ConstantNode, CopyResourceNode, CreateResourceNode};
    use crate::resource::ConstantValue;
    use crate::types::{BufferDescriptor, BufferUsage};

    fn create() -> CreateResourceNode {
        CreateResourceNode::buffer("buffer", BufferDescriptor::new(64, BufferUsage::STORAGE))
    }

    #[test]
    fn test_add_node() {
        let mut graph = WorkGraph::new();
        let id = graph.add_node(create()).unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node(id).unwrap().name(), "buffer");
        assert!(graph.contains_node(id));
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut graph = WorkGraph::new();
        let a = graph.add_node(create()).unwrap();
        graph.remove_node(a);
        let b = graph.add_node(create()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_connect_replaces_existing_edge() {
        let mut graph = WorkGraph::new();
        let a = graph.add_node(create()).unwrap();
        let b = graph.add_node(create()).unwrap();
        let copy = graph.add_node(CopyResourceNode::new("copy")).unwrap();

        assert_eq!(graph.connect(copy, "dst", a, "out").unwrap(), None);
        let previous = graph.connect(copy, "dst", b, "out").unwrap();

        assert_eq!(previous, Some(PortRef::new(a, "out")));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.source_of(copy, "dst"), Some(&PortRef::new(b, "out")));
    }

    #[test]
    fn test_connect_validates_ports() {
        let mut graph = WorkGraph::new();
        let a = graph.add_node(create()).unwrap();
        let copy = graph.add_node(CopyResourceNode::new("copy")).unwrap();
        let missing = NodeId::from_raw(u64::MAX);

        assert!(matches!(
            graph.connect(copy, "dst", missing, "out"),
            Err(WorkGraphError::UnknownNode(id)) if id == missing
        ));
        assert!(matches!(
            graph.connect(copy, "nope", a, "out"),
            Err(WorkGraphError::UnknownPort { .. })
        ));
        assert!(matches!(
            graph.connect(copy, "out", a, "out"),
            Err(WorkGraphError::PortDirectionMismatch { expected: "input", .. })
        ));
        assert!(matches!(
            graph.connect(a, "out", copy, "dst"),
            Err(WorkGraphError::PortDirectionMismatch { .. })
        ));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_remove_node_removes_edges() {
        let mut graph = WorkGraph::new();
        let a = graph.add_node(create()).unwrap();
        let copy = graph.add_node(CopyResourceNode::new("copy")).unwrap();
        let fill = graph
            .add_node(ConstantNode::new("fill", ConstantValue::U32(1)))
            .unwrap();
        let copy2 = graph.add_node(CopyResourceNode::new("copy2")).unwrap();

        graph.connect(copy, "dst", a, "out").unwrap();
        graph.connect(copy, "src", fill, "value").unwrap();
        graph.connect(copy2, "dst", copy, "out").unwrap();
        assert_eq!(graph.edge_count(), 3);

        let removed = graph.remove_node(copy).unwrap();
        assert_eq!(removed.name(), "copy");
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.remove_node(copy).is_none());
    }

    #[test]
    fn test_disconnect() {
        let mut graph = WorkGraph::new();
        let a = graph.add_node(create()).unwrap();
        let copy = graph.add_node(CopyResourceNode::new("copy")).unwrap();
        graph.connect(copy, "dst", a, "out").unwrap();

        assert_eq!(graph.disconnect(copy, "dst"), Some(PortRef::new(a, "out")));
        assert_eq!(graph.disconnect(copy, "dst"), None);
    }

    #[test]
    fn test_validate_reports_stale_ports() {
        let mut graph = WorkGraph::new();
        let a = graph.add_node(create().with_copies(2)).unwrap();
        let copy = graph.add_node(CopyResourceNode::new("copy")).unwrap();
        graph.connect(copy, "dst", a, "output1").unwrap();
        assert!(graph.validate().is_empty());

        graph
            .node_mut(a)
            .and_then(WorkNode::as_create_resource_mut)
            .unwrap()
            .set_copies(1);

        let diagnostics = graph.validate();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::DanglingEdge);
        assert_eq!(diagnostics[0].port.as_deref(), Some("output1"));
    }

    #[test]
    fn test_invalid_node_rejected() {
        let mut graph = WorkGraph::new();
        assert!(matches!(
            graph.add_node(create().with_copies(0)),
            Err(WorkGraphError::InvalidNode(_))
        ));
        assert_eq!(graph.node_count(), 0);
    }
}
