//! # RedLilium Work Graph
//!
//! Dependency-driven scheduling of GPU work with transient resource pooling.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`WorkGraph`] - Nodes connected port-to-port; executing a target runs
//!   everything it depends on exactly once, in dependency order
//! - [`WorkNode`] - Resource creation, copy/fill, compute dispatch and
//!   constant nodes
//! - [`TransientResourceCache`] - Per-slot pools that reuse GPU resources once
//!   the device timeline proves them idle
//! - [`ExecutionContext`] - The seam to a GPU backend, with [`DummyContext`]
//!   for testing
//! - [`GraphDefinition`] - JSON persistence format for editing tools
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_workgraph::*;
//!
//! let mut graph = WorkGraph::new();
//! let create = graph.add_node(CreateResourceNode::buffer(
//!     "counts",
//!     BufferDescriptor::new(256, BufferUsage::STORAGE | BufferUsage::COPY_DST),
//! ))?;
//! let clear = graph.add_node(CopyResourceNode::new("clear").with_fill_value(ConstantValue::U32(7)))?;
//! graph.connect(clear, "dst", create, "out")?;
//!
//! let mut ctx = DummyContext::new();
//! let report = graph.execute(clear, &mut ctx)?.into_result()?;
//! assert!(report.target_output("out").is_some());
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod node;
pub mod profiling;
pub mod resource;
pub mod types;

// Re-export main types for convenience
pub use cache::{CacheStats, TransientResourceCache};
pub use config::{CacheConfig, ExecutionConfig, FailurePolicy, WorkGraphConfig};
pub use context::{
    Access, Binding, DummyContext, ExecutionContext, ProgramHandle, ProgramLocation,
    RecordedCommand, TimelineValue,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, ErrorCategory};
pub use error::{ContextError, NodeError, WorkGraphError};
pub use graph::{
    ExecutionReport, GraphDefinition, LoadReport, NodeFailure, NodeId, PortRef, WorkGraph,
};
pub use node::{
    ConstantNode, CopyResourceNode, CreateResourceNode, DispatchInput, DispatchNode,
    DispatchOutput, OutputSource, PortDesc, PortDirection, ResourceShape, WorkNode,
    WorkgroupCount,
};
pub use resource::{
    AccelerationStructureResource, BufferResource, ConstantValue, ImageResource, Resource,
    ResourceKind, ResourceMap,
};
pub use types::{
    AccelerationStructureDescriptor, AccelerationStructureKind, BufferDescriptor, BufferUsage,
    Extent3d, ImageDescriptor, ImageFormat, ImageUsage, MemoryFlags,
};

/// Work graph library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the work graph subsystem.
pub fn init() {
    log::info!("RedLilium Work Graph v{} initialized", VERSION);
}
