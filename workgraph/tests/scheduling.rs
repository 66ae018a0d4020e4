//! Scheduler integration tests.
//!
//! These tests drive [`WorkGraph::execute`] end to end against the dummy
//! context and check the scheduling guarantees: every reachable node runs
//! exactly once per invocation, after all of its sources, and failures stay
//! contained according to the configured policy.

mod common;

use rstest::rstest;

use common::{add_copy, init_logging, position, storage_buffer, FillGraph};
use redlilium_workgraph::{
    Access, ConstantNode, ConstantValue, ContextError, CopyResourceNode, CreateResourceNode,
    DiagnosticKind, DispatchInput, DispatchNode, DispatchOutput, DummyContext, Extent3d,
    FailurePolicy, ImageDescriptor, ImageFormat, ImageUsage, NodeError, NodeId, ProgramLocation,
    RecordedCommand, WorkGraph, WorkGraphConfig, WorkGraphError, WorkgroupCount,
};

// ============================================================================
// End-to-end
// ============================================================================

#[rstest]
#[case::single_word(4)]
#[case::small(64)]
#[case::large(4096)]
#[case::unaligned(6)]
fn test_fill_without_source(#[case] size: u64) {
    init_logging();
    let FillGraph {
        mut graph,
        create,
        fill,
    } = FillGraph::new(size, ConstantValue::U32(7));
    let mut ctx = DummyContext::new();

    let report = graph.execute(fill, &mut ctx).unwrap();

    assert!(report.is_success());
    assert_eq!(report.execution_count(create), 1);
    assert_eq!(report.execution_count(fill), 1);

    let out = report.target_output("out").unwrap();
    let bytes = ctx.read_bytes(out).unwrap();
    let pattern = 7u32.to_le_bytes();
    assert_eq!(bytes.len() as u64, size);
    assert!(bytes.iter().enumerate().all(|(i, &b)| b == pattern[i % 4]));
}

#[test]
fn test_copy_between_created_buffers() {
    init_logging();
    let mut graph = WorkGraph::new();
    let src_buffer = graph
        .add_node(CreateResourceNode::buffer("src", storage_buffer(32)))
        .unwrap();
    let dst_buffer = graph
        .add_node(CreateResourceNode::buffer("dst", storage_buffer(32)))
        .unwrap();
    let seed = graph
        .add_node(CopyResourceNode::new("seed").with_fill_value(ConstantValue::U32(42)))
        .unwrap();
    let copy = graph.add_node(CopyResourceNode::new("copy")).unwrap();

    graph.connect(seed, "dst", src_buffer, "out").unwrap();
    graph.connect(copy, "dst", dst_buffer, "out").unwrap();
    graph.connect(copy, "src", seed, "out").unwrap();

    let mut ctx = DummyContext::new();
    let report = graph.execute(copy, &mut ctx).unwrap();

    assert_eq!(report.executed().len(), 4);
    let out = report.target_output("out").unwrap();
    assert_eq!(ctx.read_u32s(out).unwrap(), vec![42; 8]);
    assert_eq!(report.output(dst_buffer, "out"), Some(out));
    assert_ne!(report.output(src_buffer, "out"), Some(out));
}

#[test]
fn test_constant_source_overrides_fill_value() {
    let FillGraph {
        mut graph, fill, ..
    } = FillGraph::new(16, ConstantValue::U32(7));
    let constant = graph
        .add_node(ConstantNode::new("pattern", ConstantValue::U32(9)))
        .unwrap();
    graph.connect(fill, "src", constant, "value").unwrap();

    let mut ctx = DummyContext::new();
    let report = graph.execute(fill, &mut ctx).unwrap();

    let out = report.target_output("out").unwrap();
    assert_eq!(ctx.read_u32s(out).unwrap(), vec![9; 4]);
}

// ============================================================================
// Ordering and single execution
// ============================================================================

#[test]
fn test_diamond_runs_shared_ancestor_once() {
    init_logging();
    let mut graph = WorkGraph::new();
    let root = graph
        .add_node(CreateResourceNode::buffer("root", storage_buffer(16)))
        .unwrap();
    let left = add_copy(&mut graph, "left", root);
    let right = add_copy(&mut graph, "right", root);
    let join = add_copy(&mut graph, "join", left);
    graph.connect(join, "src", right, "out").unwrap();

    let mut ctx = DummyContext::new();
    let report = graph.execute(join, &mut ctx).unwrap();

    for node in [root, left, right, join] {
        assert_eq!(report.execution_count(node), 1);
    }
    assert_eq!(report.executed().len(), 4);
    assert_eq!(ctx.allocation_count(), 1);

    let order = report.executed();
    assert!(position(order, root) < position(order, left));
    assert!(position(order, root) < position(order, right));
    assert!(position(order, left) < position(order, join));
    assert!(position(order, right) < position(order, join));
}

#[rstest]
#[case::chain(1)]
#[case::narrow(2)]
#[case::wide(6)]
fn test_layered_graph_respects_every_edge(#[case] width: usize) {
    init_logging();
    let mut graph = WorkGraph::new();
    let root = graph
        .add_node(CreateResourceNode::buffer("root", storage_buffer(16)))
        .unwrap();

    // Each layer copies from two nodes of the previous layer.
    let mut previous = vec![root];
    for layer in 0..5 {
        let mut current = Vec::new();
        for i in 0..width {
            let dst_source = previous[i % previous.len()];
            let node = add_copy(&mut graph, &format!("l{layer}_{i}"), dst_source);
            let src_source = previous[(i + 1) % previous.len()];
            graph.connect(node, "src", src_source, "out").unwrap();
            current.push(node);
        }
        previous = current;
    }
    let sink = add_copy(&mut graph, "sink", previous[0]);

    let mut ctx = DummyContext::new();
    let report = graph.execute(sink, &mut ctx).unwrap();

    assert!(report.is_success());
    let order = report.executed();
    for (dst, src) in graph.edges() {
        if report.was_executed(dst.node) {
            assert!(
                position(order, src.node) < position(order, dst.node),
                "{} ran before its source {}",
                dst.node,
                src.node
            );
        }
    }
    let unique: std::collections::HashSet<NodeId> = order.iter().copied().collect();
    assert_eq!(unique.len(), order.len());
}

#[test]
fn test_unrelated_nodes_do_not_run() {
    let FillGraph {
        mut graph,
        create,
        fill,
    } = FillGraph::new(16, ConstantValue::U32(1));
    let unrelated = add_copy(&mut graph, "unrelated", create);

    let mut ctx = DummyContext::new();
    let report = graph.execute(fill, &mut ctx).unwrap();

    assert!(!report.was_executed(unrelated));
    assert_eq!(report.executed().len(), 2);
}

#[test]
fn test_each_invocation_runs_nodes_again() {
    let FillGraph {
        mut graph,
        create,
        fill,
    } = FillGraph::new(16, ConstantValue::U32(1));
    let mut ctx = DummyContext::new();

    let first = graph.execute(fill, &mut ctx).unwrap();
    let second = graph.execute(fill, &mut ctx).unwrap();

    assert_eq!(first.execution_count(create), 1);
    assert_eq!(second.execution_count(create), 1);
}

#[test]
fn test_unknown_target() {
    let mut graph = WorkGraph::new();
    let mut ctx = DummyContext::new();
    let missing = NodeId::from_raw(u64::MAX);

    let result = graph.execute(missing, &mut ctx);
    assert!(matches!(result, Err(WorkGraphError::UnknownNode(id)) if id == missing));
}

// ============================================================================
// Missing inputs and failure policy
// ============================================================================

#[rstest]
#[case::skip_dependents(FailurePolicy::SkipDependents)]
#[case::abort(FailurePolicy::Abort)]
fn test_missing_required_input_never_runs_body(#[case] policy: FailurePolicy) {
    init_logging();
    let config = WorkGraphConfig::default().with_failure_policy(policy);
    let mut graph = WorkGraph::with_config(config);
    let copy = graph
        .add_node(CopyResourceNode::new("orphan").with_fill_value(ConstantValue::U32(3)))
        .unwrap();
    let mut ctx = DummyContext::new();

    let result = graph.execute(copy, &mut ctx);

    assert!(ctx.commands().is_empty());
    match policy {
        FailurePolicy::SkipDependents => {
            let report = result.unwrap();
            assert!(!report.was_executed(copy));
            assert!(report.target_output("out").is_none());
            assert_eq!(
                report.failure(copy).map(|f| &f.error),
                Some(&NodeError::MissingInput { port: "dst".into() })
            );
            assert!(report.has_diagnostic(DiagnosticKind::MissingRequiredInput));
            assert!(matches!(
                report.into_result(),
                Err(WorkGraphError::NodeFailed { node, .. }) if node == copy
            ));
        }
        FailurePolicy::Abort => {
            assert!(matches!(
                result,
                Err(WorkGraphError::NodeFailed {
                    node,
                    source: NodeError::MissingInput { .. },
                    ..
                }) if node == copy
            ));
        }
    }
}

#[test]
fn test_missing_optional_input_is_not_fatal() {
    let FillGraph {
        mut graph, fill, ..
    } = FillGraph::new(16, ConstantValue::U32(5));
    assert!(graph.source_of(fill, "src").is_none());

    let mut ctx = DummyContext::new();
    let report = graph.execute(fill, &mut ctx).unwrap().into_result().unwrap();

    assert!(report.was_executed(fill));
    assert!(report.diagnostics().is_empty());
}

/// Dispatch node whose program never loads.
fn broken_dispatch(graph: &mut WorkGraph, data_source: NodeId) -> NodeId {
    let dispatch = graph
        .add_node(
            DispatchNode::new("broken", ProgramLocation::new("shaders/missing.wgsl", "main"))
                .with_input(DispatchInput::required("data").with_access(Access::ReadWrite))
                .with_output(DispatchOutput::from_input("out", "data")),
        )
        .unwrap();
    graph.connect(dispatch, "data", data_source, "out").unwrap();
    dispatch
}

#[test]
fn test_failure_skips_only_dependents() {
    init_logging();
    let mut graph = WorkGraph::new();
    let buffer = graph
        .add_node(CreateResourceNode::buffer("buffer", storage_buffer(16)))
        .unwrap();
    let dispatch = broken_dispatch(&mut graph, buffer);

    // Requires the failed output.
    let strict = add_copy(&mut graph, "strict", dispatch);
    // Only optionally reads it.
    let lenient = add_copy(&mut graph, "lenient", buffer);
    graph.connect(lenient, "src", dispatch, "out").unwrap();
    // Depends on both.
    let sink = add_copy(&mut graph, "sink", lenient);
    graph.connect(sink, "src", strict, "out").unwrap();

    let mut ctx = DummyContext::new();
    let report = graph.execute(sink, &mut ctx).unwrap();

    assert!(report.was_executed(buffer));
    assert!(report.was_executed(lenient));
    assert!(report.was_executed(sink));
    assert!(!report.was_executed(dispatch));
    assert!(!report.was_executed(strict));

    assert!(matches!(
        report.failure(dispatch).map(|f| &f.error),
        Some(NodeError::CompileFailed(_))
    ));
    assert!(matches!(
        report.failure(strict).map(|f| &f.error),
        Some(NodeError::MissingUpstreamOutput { upstream, .. }) if *upstream == dispatch
    ));
    assert!(report.has_diagnostic(DiagnosticKind::CompileFailed));
    assert!(report.has_diagnostic(DiagnosticKind::MissingUpstreamOutput));

    // The target itself ran, so the report converts to Ok.
    assert!(report.into_result().is_ok());
    assert!(graph
        .node(dispatch)
        .and_then(|n| n.as_dispatch())
        .and_then(|d| d.status())
        .is_some());
}

#[test]
fn test_abort_stops_at_first_failure() {
    let config = WorkGraphConfig::default().with_failure_policy(FailurePolicy::Abort);
    let mut graph = WorkGraph::with_config(config);
    let buffer = graph
        .add_node(CreateResourceNode::buffer("buffer", storage_buffer(16)))
        .unwrap();
    let dispatch = broken_dispatch(&mut graph, buffer);
    let lenient = add_copy(&mut graph, "lenient", buffer);
    graph.connect(lenient, "src", dispatch, "out").unwrap();

    let mut ctx = DummyContext::new();
    let result = graph.execute(lenient, &mut ctx);

    assert!(matches!(
        result,
        Err(WorkGraphError::NodeFailed {
            node,
            source: NodeError::CompileFailed(_),
            ..
        }) if node == dispatch
    ));
    assert_eq!(ctx.dispatch_count(), 0);
    assert!(!ctx
        .commands()
        .iter()
        .any(|c| matches!(c, RecordedCommand::Fill { .. } | RecordedCommand::Copy { .. })));
}

#[test]
fn test_context_failure_is_contained() {
    let FillGraph {
        mut graph,
        create,
        fill,
    } = FillGraph::new(16, ConstantValue::U32(5));
    let mut ctx = DummyContext::new();
    ctx.set_allocation_failure(Some("out of device memory".into()));

    let report = graph.execute(fill, &mut ctx).unwrap();

    assert!(matches!(
        report.failure(create).map(|f| &f.error),
        Some(NodeError::Context(_))
    ));
    assert!(report.failure(fill).is_some());
    assert!(report.has_diagnostic(DiagnosticKind::ContextFailure));
}

#[test]
fn test_oversized_image_fails_node() {
    init_logging();
    let mut graph = WorkGraph::new();
    let create = graph
        .add_node(CreateResourceNode::image(
            "huge",
            ImageDescriptor::new_3d(
                Extent3d::new(u32::MAX, u32::MAX, u32::MAX),
                ImageFormat::Rgba32Float,
                ImageUsage::STORAGE,
            ),
        ))
        .unwrap();
    let mut ctx = DummyContext::new();

    let report = graph.execute(create, &mut ctx).unwrap();

    assert!(!report.is_success());
    assert!(matches!(
        report.failure(create).map(|f| &f.error),
        Some(NodeError::Context(ContextError::ResourceCreationFailed(_)))
    ));
    assert!(report.has_diagnostic(DiagnosticKind::ContextFailure));
    assert_eq!(ctx.allocation_count(), 0);
}

#[test]
fn test_reconfigured_source_port_is_missing_upstream() {
    let mut graph = WorkGraph::new();
    let create = graph
        .add_node(CreateResourceNode::buffer("pair", storage_buffer(16)).with_copies(2))
        .unwrap();
    let copy = graph.add_node(CopyResourceNode::new("copy")).unwrap();
    graph.connect(copy, "dst", create, "output1").unwrap();

    graph
        .node_mut(create)
        .and_then(|n| n.as_create_resource_mut())
        .unwrap()
        .set_copies(1);
    assert_eq!(graph.validate().len(), 1);

    let mut ctx = DummyContext::new();
    let report = graph.execute(copy, &mut ctx).unwrap();

    assert!(report.was_executed(create));
    assert!(matches!(
        report.failure(copy).map(|f| &f.error),
        Some(NodeError::MissingUpstreamOutput { upstream_port, .. }) if upstream_port == "output1"
    ));
}

// ============================================================================
// Cycles
// ============================================================================

#[test]
fn test_two_node_cycle_is_detected() {
    init_logging();
    let mut graph = WorkGraph::new();
    let a = graph.add_node(CopyResourceNode::new("a")).unwrap();
    let b = graph.add_node(CopyResourceNode::new("b")).unwrap();
    graph.connect(a, "dst", b, "out").unwrap();
    graph.connect(b, "dst", a, "out").unwrap();

    let mut ctx = DummyContext::new();
    match graph.execute(a, &mut ctx) {
        Err(WorkGraphError::CycleDetected { cycle }) => {
            assert_eq!(cycle.first(), Some(&a));
            assert_eq!(cycle.last(), Some(&a));
            assert!(cycle.contains(&b));
        }
        other => panic!("expected a cycle error, got {other:?}"),
    }
    assert!(ctx.commands().is_empty());
}

#[test]
fn test_self_loop_is_detected() {
    let mut graph = WorkGraph::new();
    let a = graph.add_node(CopyResourceNode::new("a")).unwrap();
    graph.connect(a, "dst", a, "out").unwrap();

    let mut ctx = DummyContext::new();
    assert!(matches!(
        graph.execute(a, &mut ctx),
        Err(WorkGraphError::CycleDetected { cycle }) if cycle == vec![a, a]
    ));
}

#[test]
fn test_cycle_behind_optional_input_is_detected() {
    let mut graph = WorkGraph::new();
    let buffer = graph
        .add_node(CreateResourceNode::buffer("buffer", storage_buffer(16)))
        .unwrap();
    let a = add_copy(&mut graph, "a", buffer);
    let b = add_copy(&mut graph, "b", buffer);
    let c = add_copy(&mut graph, "c", buffer);
    graph.connect(a, "src", b, "out").unwrap();
    graph.connect(b, "src", c, "out").unwrap();
    graph.connect(c, "src", a, "out").unwrap();

    let mut ctx = DummyContext::new();
    assert!(matches!(
        graph.execute(a, &mut ctx),
        Err(WorkGraphError::CycleDetected { .. })
    ));
}

// ============================================================================
// Dispatch pipelines
// ============================================================================

#[test]
fn test_dispatch_pipeline() {
    init_logging();
    let mut graph = WorkGraph::new();
    let buffer = graph
        .add_node(CreateResourceNode::buffer("keys", storage_buffer(1024)))
        .unwrap();
    let count = graph
        .add_node(ConstantNode::new("count", ConstantValue::U32(256)))
        .unwrap();
    let sort = graph
        .add_node(
            DispatchNode::new("sort", ProgramLocation::new("shaders/sort.wgsl", "radix_pass"))
                .with_input(DispatchInput::required("keys").with_access(Access::ReadWrite))
                .with_input(DispatchInput::required("count"))
                .with_output(DispatchOutput::from_input("sorted", "keys"))
                .with_workgroups(WorkgroupCount::FromConstant {
                    port: "count".into(),
                    group_size: [64, 1, 1],
                }),
        )
        .unwrap();
    graph.connect(sort, "keys", buffer, "out").unwrap();
    graph.connect(sort, "count", count, "value").unwrap();

    let mut ctx = DummyContext::new();
    ctx.set_program_source("shaders/sort.wgsl", "fn radix_pass() {}");
    let report = graph.execute(sort, &mut ctx).unwrap().into_result().unwrap();

    assert_eq!(report.target_output("sorted"), report.output(buffer, "out"));
    assert!(ctx.commands().contains(&RecordedCommand::Dispatch {
        location: ProgramLocation::new("shaders/sort.wgsl", "radix_pass"),
        bindings: vec!["keys".into(), "count".into()],
        workgroups: [4, 1, 1],
    }));
}
