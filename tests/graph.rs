//! Structural validation and indexed lookups over version graphs.

use serde_json::json;

use scriptflow::graph::{GraphDefinition, GraphError, VersionBuilder, VersionGraph};
use scriptflow::model::{Edge, Node, NodeKind};
use scriptflow::rules::{ChoiceConfig, Group, Rule};

fn graph_of(definition: &GraphDefinition) -> VersionGraph<'_> {
    VersionGraph::from_parts(
        &definition.entry_node_id,
        &definition.nodes,
        &definition.edges,
    )
}

#[test]
fn builder_ids_resolve_and_validate() {
    let definition = VersionBuilder::new()
        .start("s0")
        .question("age")
        .end("done")
        .edge("s0", "age")
        .edge("age", "done")
        .build();

    assert_eq!(definition.entry_node_id, "n-s0");
    let graph = graph_of(&definition);
    graph.validate().expect("well-formed graph");

    assert_eq!(graph.entry_node().unwrap().key, "s0");
    assert_eq!(graph.node_by_key("age").unwrap().id, "n-age");
    assert_eq!(graph.node_by_id("n-done").unwrap().kind, NodeKind::End);
    assert!(graph.node_by_key("ghost").is_none());
    assert!(graph.node_by_id("n-ghost").is_none());
}

#[test]
fn outgoing_edges_keep_definition_order() {
    let definition = VersionBuilder::new()
        .start("s0")
        .end("a")
        .end("b")
        .end("c")
        .edge("s0", "b")
        .edge("s0", "a")
        .edge("s0", "c")
        .build();

    let graph = graph_of(&definition);
    let targets: Vec<&str> = graph
        .outgoing_edges("n-s0")
        .iter()
        .map(|edge| edge.target.as_str())
        .collect();
    assert_eq!(targets, vec!["n-b", "n-a", "n-c"]);
    assert!(graph.outgoing_edges("n-a").is_empty());
}

#[test]
fn missing_entry_is_rejected() {
    let definition = VersionBuilder::new()
        .question("q1")
        .entry("n-ghost")
        .build();
    let err = graph_of(&definition).validate().unwrap_err();
    assert!(matches!(err, GraphError::NoStart));

    // With a START present the dangling entry id itself is the problem.
    let definition = VersionBuilder::new().start("s0").entry("n-ghost").build();
    let err = graph_of(&definition).validate().unwrap_err();
    assert!(matches!(err, GraphError::EntryMissing { .. }));
}

#[test]
fn entry_must_be_a_start_node() {
    let definition = VersionBuilder::new()
        .start("s0")
        .question("q1")
        .entry(VersionBuilder::id_for("q1"))
        .build();
    let err = graph_of(&definition).validate().unwrap_err();
    assert!(matches!(err, GraphError::EntryNotStart { .. }));
}

#[test]
fn multiple_starts_are_rejected() {
    let definition = VersionBuilder::new().start("s0").start("s1").build();
    let err = graph_of(&definition).validate().unwrap_err();
    assert!(matches!(err, GraphError::MultipleStarts { count: 2 }));
}

#[test]
fn duplicate_ids_and_keys_are_rejected() {
    let definition = VersionBuilder::new()
        .start("s0")
        .node(Node::new("n-s0", "other", NodeKind::End))
        .build();
    let err = graph_of(&definition).validate().unwrap_err();
    assert!(matches!(err, GraphError::DuplicateNodeId { .. }));

    let definition = VersionBuilder::new()
        .start("s0")
        .node(Node::new("n-x", "s0", NodeKind::End))
        .build();
    let err = graph_of(&definition).validate().unwrap_err();
    assert!(matches!(err, GraphError::DuplicateNodeKey { .. }));
}

#[test]
fn edges_must_reference_existing_nodes() {
    let mut definition = VersionBuilder::new().start("s0").end("done").build();
    definition.edges.push(Edge::new("n-ghost", "n-done"));
    let err = graph_of(&definition).validate().unwrap_err();
    assert!(matches!(err, GraphError::UnknownEdgeSource { .. }));

    let mut definition = VersionBuilder::new().start("s0").end("done").build();
    definition.edges.push(Edge::new("n-s0", "n-ghost"));
    let err = graph_of(&definition).validate().unwrap_err();
    assert!(matches!(err, GraphError::UnknownEdgeTarget { .. }));
}

#[test]
fn unparseable_choice_config_is_rejected() {
    let definition = VersionBuilder::new()
        .start("s0")
        .node(Node::new("n-route", "route", NodeKind::Choice))
        .build();
    // NodeKind::Choice with a null config payload cannot deserialize.
    let err = graph_of(&definition).validate().unwrap_err();
    assert!(matches!(err, GraphError::InvalidChoiceConfig { .. }));

    let definition = VersionBuilder::new()
        .start("s0")
        .node(
            Node::new("n-route", "route", NodeKind::Choice)
                .with_config(json!({"groups": "not-a-list"})),
        )
        .build();
    let err = graph_of(&definition).validate().unwrap_err();
    assert!(matches!(err, GraphError::InvalidChoiceConfig { .. }));
}

#[test]
fn choice_targets_must_resolve() {
    let dangling_rule = ChoiceConfig::new(
        vec![Group::new(vec![Rule::new(
            Some("n-ghost".to_string()),
            vec![],
        )])],
        None,
    );
    let definition = VersionBuilder::new()
        .start("s0")
        .choice("route", &dangling_rule)
        .build();
    let err = graph_of(&definition).validate().unwrap_err();
    assert!(matches!(
        err,
        GraphError::UnknownChoiceTarget { ref target, .. } if target == "n-ghost"
    ));

    let dangling_default = ChoiceConfig::new(vec![], Some("n-ghost".to_string()));
    let definition = VersionBuilder::new()
        .start("s0")
        .choice("route", &dangling_default)
        .build();
    let err = graph_of(&definition).validate().unwrap_err();
    assert!(matches!(err, GraphError::UnknownChoiceTarget { .. }));
}

#[test]
fn cyclic_graphs_are_valid() {
    let definition = VersionBuilder::new()
        .start("s0")
        .question("retry")
        .end("done")
        .edge("s0", "retry")
        .edge("retry", "retry")
        .edge("retry", "done")
        .build();

    let graph = graph_of(&definition);
    graph.validate().expect("self-loops are representable");
    assert_eq!(graph.outgoing_edges("n-retry").len(), 2);
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 3);
}
