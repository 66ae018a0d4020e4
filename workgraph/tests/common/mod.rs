//! Shared helpers for work graph integration tests.

#![allow(dead_code)]

use redlilium_workgraph::{
    BufferDescriptor, BufferUsage, ConstantValue, CopyResourceNode, CreateResourceNode, NodeId,
    WorkGraph, WorkGraphConfig,
};

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Descriptor of a buffer nodes can copy into and out of.
pub fn storage_buffer(size: u64) -> BufferDescriptor {
    BufferDescriptor::new(
        size,
        BufferUsage::STORAGE | BufferUsage::COPY_SRC | BufferUsage::COPY_DST,
    )
}

/// A `create -> fill` pair: `fill` clears the created buffer with `value`.
pub struct FillGraph {
    pub graph: WorkGraph,
    pub create: NodeId,
    pub fill: NodeId,
}

impl FillGraph {
    pub fn new(size: u64, value: ConstantValue) -> Self {
        Self::with_config(size, value, WorkGraphConfig::default())
    }

    pub fn with_config(size: u64, value: ConstantValue, config: WorkGraphConfig) -> Self {
        let mut graph = WorkGraph::with_config(config);
        let create = graph
            .add_node(CreateResourceNode::buffer("buffer", storage_buffer(size)))
            .unwrap();
        let fill = graph
            .add_node(CopyResourceNode::new("fill").with_fill_value(value))
            .unwrap();
        graph.connect(fill, "dst", create, "out").unwrap();
        Self {
            graph,
            create,
            fill,
        }
    }
}

/// Add a copy node whose destination is fed by `dst_source.out`.
pub fn add_copy(graph: &mut WorkGraph, name: &str, dst_source: NodeId) -> NodeId {
    let node = graph.add_node(CopyResourceNode::new(name)).unwrap();
    let port = source_port(graph, dst_source);
    graph.connect(node, "dst", dst_source, &port).unwrap();
    node
}

/// Name of the single output of nodes used as sources in these tests.
pub fn source_port(graph: &WorkGraph, node: NodeId) -> String {
    graph
        .node(node)
        .and_then(|n| n.ports().into_iter().find(|p| !p.direction.is_input()))
        .map(|p| p.name)
        .unwrap()
}

/// Position of `node` in the execution order.
pub fn position(order: &[NodeId], node: NodeId) -> usize {
    order
        .iter()
        .position(|&id| id == node)
        .unwrap_or_else(|| panic!("{node} did not execute"))
}
