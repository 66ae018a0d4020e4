//! Serializable graph definitions.
//!
//! A [`GraphDefinition`] is the persistence and editing-tool format of a work
//! graph: a node list (definition-local id, variant tag, variant configuration)
//! and an edge list. It is stored as JSON:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": 1, "kind": "create_resource",
//!       "config": { "name": "grid", "shape": { "type": "buffer", "size": 256 } } },
//!     { "id": 2, "kind": "copy_resource",
//!       "config": { "name": "clear", "fill_value": { "type": "u32", "value": 7 } } }
//!   ],
//!   "edges": [
//!     { "destination": { "node": 2, "port": "dst" },
//!       "source": { "node": 1, "port": "out" } }
//!   ]
//! }
//! ```
//!
//! Loading is lenient: unknown kinds, invalid configurations and edges that
//! cannot be connected are skipped and reported as diagnostics.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::WorkGraphError;
use crate::node::{ConstantNode, CopyResourceNode, CreateResourceNode, DispatchNode, WorkNode};
use crate::profiling::profile_function;

use super::{NodeId, WorkGraph};

/// One node of a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Definition-local id referenced by edges.
    pub id: u64,
    /// Variant tag, e.g. `"copy_resource"`.
    pub kind: String,
    /// Variant-specific configuration.
    #[serde(default)]
    pub config: serde_json::Value,
}

/// One end of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDefinition {
    pub node: u64,
    pub port: String,
}

/// Binding of a destination input to a source output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    pub destination: PortDefinition,
    pub source: PortDefinition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,
}

impl GraphDefinition {
    pub fn from_json(json: &str) -> Result<Self, WorkGraphError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, WorkGraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a definition from a JSON file.
    pub fn load(path: &Path) -> Result<Self, WorkGraphError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Write the definition to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), WorkGraphError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Outcome of loading a definition into a graph.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Definition-local id -> id assigned by the graph.
    pub id_map: HashMap<u64, NodeId>,
    /// Everything that was skipped, and why.
    pub diagnostics: Vec<Diagnostic>,
}

impl LoadReport {
    /// Graph id of the node defined as `id`.
    pub fn node(&self, id: u64) -> Option<NodeId> {
        self.id_map.get(&id).copied()
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    fn skip(&mut self, diagnostic: Diagnostic) {
        log::warn!("Skipping while loading graph definition: {}", diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

fn node_config(node: &WorkNode) -> Result<serde_json::Value, serde_json::Error> {
    match node {
        WorkNode::CreateResource(n) => serde_json::to_value(n),
        WorkNode::CopyResource(n) => serde_json::to_value(n),
        WorkNode::Dispatch(n) => serde_json::to_value(n),
        WorkNode::Constant(n) => serde_json::to_value(n),
    }
}

/// Rebuild a node from its tag; `Ok(None)` for an unknown tag.
fn node_from_definition(def: &NodeDefinition) -> Result<Option<WorkNode>, serde_json::Error> {
    let config = def.config.clone();
    let node: WorkNode = match def.kind.as_str() {
        CreateResourceNode::KIND => serde_json::from_value::<CreateResourceNode>(config)?.into(),
        CopyResourceNode::KIND => serde_json::from_value::<CopyResourceNode>(config)?.into(),
        DispatchNode::KIND => serde_json::from_value::<DispatchNode>(config)?.into(),
        ConstantNode::KIND => serde_json::from_value::<ConstantNode>(config)?.into(),
        _ => return Ok(None),
    };
    Ok(Some(node))
}

impl WorkGraph {
    /// Snapshot the graph's nodes and edges. Node ids in the definition are
    /// the raw graph ids.
    pub fn to_definition(&self) -> Result<GraphDefinition, WorkGraphError> {
        profile_function!();
        let nodes = self
            .nodes()
            .map(|(id, node)| {
                Ok(NodeDefinition {
                    id: id.raw(),
                    kind: node.kind().to_owned(),
                    config: node_config(node)?,
                })
            })
            .collect::<Result<Vec<_>, serde_json::Error>>()?;

        let edges = self
            .edges()
            .into_iter()
            .map(|(dst, src)| EdgeDefinition {
                destination: PortDefinition {
                    node: dst.node.raw(),
                    port: dst.port.clone(),
                },
                source: PortDefinition {
                    node: src.node.raw(),
                    port: src.port.clone(),
                },
            })
            .collect();

        Ok(GraphDefinition { nodes, edges })
    }

    /// Build a graph from a definition.
    pub fn from_definition(definition: &GraphDefinition) -> (Self, LoadReport) {
        let mut graph = Self::new();
        let report = graph.load_definition(definition);
        (graph, report)
    }

    /// Add the nodes and edges of a definition to this graph.
    ///
    /// Every loaded node gets a fresh id; the mapping is in the returned
    /// report. Nothing in the definition makes loading fail as a whole.
    pub fn load_definition(&mut self, definition: &GraphDefinition) -> LoadReport {
        profile_function!();
        let mut report = LoadReport::default();

        for def in &definition.nodes {
            if report.id_map.contains_key(&def.id) {
                report.skip(Diagnostic::new(
                    DiagnosticKind::InvalidNodeConfig,
                    format!("duplicate node id {}", def.id),
                ));
                continue;
            }

            let node = match node_from_definition(def) {
                Ok(Some(node)) => node,
                Ok(None) => {
                    report.skip(Diagnostic::new(
                        DiagnosticKind::UnknownNodeKind,
                        format!("node {} has unknown kind `{}`", def.id, def.kind),
                    ));
                    continue;
                }
                Err(err) => {
                    report.skip(Diagnostic::new(
                        DiagnosticKind::InvalidNodeConfig,
                        format!("node {} (`{}`): {}", def.id, def.kind, err),
                    ));
                    continue;
                }
            };

            match self.add_node(node) {
                Ok(id) => {
                    report.id_map.insert(def.id, id);
                }
                Err(err) => report.skip(Diagnostic::new(
                    DiagnosticKind::InvalidNodeConfig,
                    format!("node {}: {}", def.id, err),
                )),
            }
        }

        for edge in &definition.edges {
            let ends = (
                report.node(edge.destination.node),
                report.node(edge.source.node),
            );
            let (Some(dst), Some(src)) = ends else {
                report.skip(Diagnostic::new(
                    DiagnosticKind::DanglingEdge,
                    format!(
                        "edge {}.{} <- {}.{} references a node that was not loaded",
                        edge.destination.node,
                        edge.destination.port,
                        edge.source.node,
                        edge.source.port
                    ),
                ));
                continue;
            };

            if let Err(err) = self.connect(dst, &edge.destination.port, src, &edge.source.port) {
                report.skip(
                    Diagnostic::new(DiagnosticKind::DanglingEdge, err.to_string())
                        .with_node(dst)
                        .with_port(edge.destination.port.clone()),
                );
            }
        }

        log::info!(
            "Loaded graph definition: {} nodes, {} edges, {} skipped",
            report.id_map.len(),
            definition.edges.len(),
            report.diagnostics.len()
        );
        report
    }
}
