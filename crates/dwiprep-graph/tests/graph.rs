//! Tests for graph building, validation and export.

use dwiprep_graph::{
    DryRun, Edge, ExecutorError, GraphBuilder, GraphError, GraphExecutor, GraphWiringError,
    PipelineGraph, PlanDocument, PlanWriter, PortDirection, ProcessingNode, StepKind, build_graph,
};

fn step(name: &str) -> ProcessingNode {
    ProcessingNode::new(name, StepKind::new("test.Step"))
        .optional_input("in_file")
        .output("out_file")
}

fn chain(names: &[&str]) -> Vec<Edge> {
    names
        .windows(2)
        .map(|pair| Edge::new(pair[0], "out_file", pair[1], "in_file"))
        .collect()
}

fn sub_graph(name: &str) -> PipelineGraph {
    let mut builder = GraphBuilder::new(name);
    builder
        .add_node(ProcessingNode::identity("inputnode", &["in_file"]))
        .add_node(step("mean"))
        .add_node(ProcessingNode::identity("outputnode", &["out_file"]))
        .connect("inputnode", "in_file", "mean", "in_file")
        .connect("mean", "out_file", "outputnode", "out_file");
    builder.build().expect("sub-graph")
}

#[test]
fn chain_sorts_topologically() {
    let graph = build_graph("wf", [step("c"), step("a"), step("b")], chain(&["a", "b", "c"]))
        .expect("acyclic graph");
    assert_eq!(graph.topological_order(), ["a", "b", "c"]);
    assert_eq!(graph.entry_points(), vec!["a"]);
}

#[test]
fn cycle_is_rejected() {
    let error = build_graph(
        "wf",
        [step("a"), step("b"), step("c")],
        chain(&["a", "b", "c"])
            .into_iter()
            .chain([Edge::new("c", "out_file", "a", "in_file")]),
    )
    .unwrap_err();
    match error {
        GraphError::Cycle(cycle) => assert_eq!(cycle.nodes, ["a", "b", "c"]),
        other => panic!("expected a cycle error, got {other:?}"),
    }
}

#[test]
fn self_loop_is_a_cycle() {
    let error = build_graph("wf", [step("a")], [Edge::new("a", "out_file", "a", "in_file")])
        .unwrap_err();
    assert!(matches!(error, GraphError::Cycle(_)));
}

#[test]
fn dangling_references_are_reported() {
    let error = build_graph("wf", [step("a")], [Edge::new("a", "out_file", "b", "in_file")])
        .unwrap_err();
    assert_eq!(
        error,
        GraphError::Wiring(GraphWiringError::UnknownNode {
            graph: "wf".to_string(),
            node: "b".to_string(),
        })
    );

    let error = build_graph(
        "wf",
        [step("a"), step("b")],
        [Edge::new("a", "out_mask", "b", "in_file")],
    )
    .unwrap_err();
    assert!(matches!(
        error,
        GraphError::Wiring(GraphWiringError::UnknownPort {
            direction: PortDirection::Output,
            ..
        })
    ));
}

#[test]
fn inputs_are_fed_once() {
    let error = build_graph(
        "wf",
        [step("a"), step("b"), step("c")],
        [
            Edge::new("a", "out_file", "c", "in_file"),
            Edge::new("b", "out_file", "c", "in_file"),
        ],
    )
    .unwrap_err();
    assert!(matches!(
        error,
        GraphError::Wiring(GraphWiringError::DuplicateFeed { .. })
    ));

    let bound = step("b").bind("in_file", "/data/dwi.nii.gz");
    let error = build_graph("wf", [step("a"), bound], chain(&["a", "b"])).unwrap_err();
    assert!(matches!(
        error,
        GraphError::Wiring(GraphWiringError::DuplicateFeed { .. })
    ));
}

#[test]
fn duplicate_and_empty_graphs_are_rejected() {
    let error = build_graph("wf", [step("a"), step("a")], Vec::<Edge>::new()).unwrap_err();
    assert!(matches!(
        error,
        GraphError::Wiring(GraphWiringError::DuplicateNode { .. })
    ));
    let error = build_graph("wf", Vec::<ProcessingNode>::new(), Vec::<Edge>::new()).unwrap_err();
    assert!(matches!(error, GraphError::Wiring(GraphWiringError::Empty { .. })));
}

#[test]
fn required_inputs_must_be_wired() {
    let node = ProcessingNode::new("denoise", StepKind::new("mrtrix3.DWIDenoise"))
        .input("in_file")
        .output("out_file");
    let graph = build_graph("wf", [node], Vec::<Edge>::new()).expect("graph");
    assert_eq!(graph.unresolved_inputs().len(), 1);
    assert!(matches!(
        graph.ensure_fully_wired(),
        Err(GraphError::Wiring(GraphWiringError::Unwired { .. }))
    ));
}

#[test]
fn embedded_graphs_are_namespaced() {
    let template = sub_graph("epi_ref_wf");
    let post = template.clone_as("post_epi_ref_wf");
    assert_eq!(post.node_names(), template.node_names());

    let mut builder = GraphBuilder::new("dwi_preproc_wf");
    builder
        .add_node(ProcessingNode::identity("inputnode", &["dwi"]))
        .add_graph(&template)
        .add_graph(&post)
        .connect("inputnode", "dwi", "epi_ref_wf.inputnode", "in_file")
        .connect("epi_ref_wf.outputnode", "out_file", "post_epi_ref_wf.inputnode", "in_file");
    assert!(builder.contains("post_epi_ref_wf.mean"));
    let graph = builder.build().expect("parent graph");

    assert_eq!(graph.len(), 7);
    assert_eq!(
        graph.units().into_iter().collect::<Vec<_>>(),
        ["epi_ref_wf", "post_epi_ref_wf"]
    );
    let order = graph.topological_order();
    let position = |name: &str| order.iter().position(|node| node == name).expect("node");
    assert!(position("epi_ref_wf.mean") < position("post_epi_ref_wf.mean"));
}

#[test]
fn dot_rendering() {
    let graph = build_graph("wf", [step("a"), step("b")], chain(&["a", "b"])).expect("graph");
    insta::assert_snapshot!(graph.to_dot(), @r#"
    digraph "wf" {
      rankdir=LR;
      "a" [label="a\ntest.Step"];
      "b" [label="b\ntest.Step"];
      "a" -> "b" [label="out_file:in_file"];
    }
    "#);
}

#[test]
fn plan_document_round_trips() {
    let graph = sub_graph("epi_ref_wf");
    let document = PlanDocument::from_graph(&graph, chrono::Utc::now());
    let json = serde_json::to_string(&document).expect("serialize");
    let parsed: PlanDocument = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed, document);
    assert_eq!(parsed.into_graph().expect("rebuild"), graph);
}

#[test]
fn plan_writer_writes_json_and_dot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let writer = PlanWriter::new(dir.path().join("plans"));
    let graph = sub_graph("epi_ref_wf");
    let handle = writer.dispatch(&graph).expect("dispatch");

    let json_path = handle.plan_path.expect("plan path");
    assert_eq!(json_path, dir.path().join("plans/epi_ref_wf.json"));
    assert!(dir.path().join("plans/epi_ref_wf.dot").is_file());
    let document: PlanDocument =
        serde_json::from_str(&std::fs::read_to_string(json_path).expect("read")).expect("parse");
    assert_eq!(document.order.len(), 3);
    assert_eq!(handle.node_count, 3);
}

#[test]
fn plan_writer_reports_unwritable_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("plans");
    std::fs::write(&blocker, "not a directory").expect("write");
    let error = PlanWriter::new(&blocker)
        .dispatch(&sub_graph("wf"))
        .unwrap_err();
    assert!(matches!(error, ExecutorError::CreateDir { .. }));
}

#[test]
fn dry_run_reports_units() {
    let mut builder = GraphBuilder::new("single_subject_01_wf");
    builder.add_graph(&sub_graph("run_a_wf")).add_graph(&sub_graph("run_b_wf"));
    let graph = builder.build().expect("graph");
    let handle = DryRun.dispatch(&graph).expect("dispatch");
    assert_eq!(handle.units, ["run_a_wf", "run_b_wf"]);
    assert!(handle.dispatch_id.starts_with("single_subject_01_wf-"));
    assert_eq!(handle.restricted_to(&["run_b_wf".to_string()]).units, ["run_b_wf"]);
}
