//! Indexed view over one version's flat node/edge collections.
//!
//! [`VersionGraph`] is built once per operation from a borrowed
//! [`ScriptVersion`] and answers the traversal questions the engine asks:
//! entry resolution, id/key lookup, and outgoing edges in definition order.
//! Because nodes and edges are addressed by opaque ids held in maps, cyclic
//! and self-referential graphs are representable without ownership cycles.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::model::{Edge, Node, NodeKind, ScriptVersion};

/// Structural problems in a version's graph definition.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// `entry_node_id` does not resolve to a node.
    #[error("entry node {entry_node_id} not found in version")]
    #[diagnostic(
        code(scriptflow::graph::entry_missing),
        help("Check that entry_node_id references an existing node id.")
    )]
    EntryMissing { entry_node_id: String },

    /// The entry node exists but is not a START node.
    #[error("entry node {entry_node_id} is {kind}, not START")]
    #[diagnostic(code(scriptflow::graph::entry_not_start))]
    EntryNotStart { entry_node_id: String, kind: String },

    /// No node of kind START exists.
    #[error("version has no START node")]
    #[diagnostic(code(scriptflow::graph::no_start))]
    NoStart,

    /// More than one node of kind START exists.
    #[error("version has {count} START nodes, expected exactly one")]
    #[diagnostic(code(scriptflow::graph::multiple_starts))]
    MultipleStarts { count: usize },

    /// Two nodes share an id.
    #[error("duplicate node id {id}")]
    #[diagnostic(code(scriptflow::graph::duplicate_node_id))]
    DuplicateNodeId { id: String },

    /// Two nodes share a key.
    #[error("duplicate node key {key}")]
    #[diagnostic(code(scriptflow::graph::duplicate_node_key))]
    DuplicateNodeKey { key: String },

    /// An edge's source node id does not resolve.
    ///
    /// The field is `source_id` rather than `source` because thiserror
    /// reserves the name `source` for error chaining.
    #[error("edge source {source_id} not found in version")]
    #[diagnostic(code(scriptflow::graph::unknown_edge_source))]
    UnknownEdgeSource { source_id: String },

    /// An edge's target node id does not resolve.
    #[error("edge target {target} not found in version")]
    #[diagnostic(code(scriptflow::graph::unknown_edge_target))]
    UnknownEdgeTarget { target: String },

    /// A CHOICE node's config payload does not parse.
    #[error("choice config on node {node_id} is invalid: {message}")]
    #[diagnostic(code(scriptflow::graph::invalid_choice_config))]
    InvalidChoiceConfig { node_id: String, message: String },

    /// A rule target or default target does not resolve.
    #[error("choice node {node_id} references unknown target {target}")]
    #[diagnostic(code(scriptflow::graph::unknown_choice_target))]
    UnknownChoiceTarget { node_id: String, target: String },
}

/// Borrowed id/key indices plus adjacency for one version.
///
/// Construction never fails; structural problems surface through
/// [`entry_node`](Self::entry_node) and [`validate`](Self::validate).
pub struct VersionGraph<'a> {
    entry_node_id: &'a str,
    nodes: &'a [Node],
    edges: &'a [Edge],
    by_id: FxHashMap<&'a str, &'a Node>,
    by_key: FxHashMap<&'a str, &'a Node>,
    outgoing: FxHashMap<&'a str, Vec<&'a Edge>>,
}

impl<'a> VersionGraph<'a> {
    /// Index a stored version.
    pub fn new(version: &'a ScriptVersion) -> Self {
        Self::from_parts(&version.entry_node_id, &version.nodes, &version.edges)
    }

    /// Index loose graph parts (used by validation before a version record
    /// exists).
    pub fn from_parts(entry_node_id: &'a str, nodes: &'a [Node], edges: &'a [Edge]) -> Self {
        let mut by_id: FxHashMap<&str, &Node> = FxHashMap::default();
        let mut by_key: FxHashMap<&str, &Node> = FxHashMap::default();
        for node in nodes {
            by_id.entry(node.id.as_str()).or_insert(node);
            by_key.entry(node.key.as_str()).or_insert(node);
        }

        let mut outgoing: FxHashMap<&str, Vec<&Edge>> = FxHashMap::default();
        for edge in edges {
            outgoing.entry(edge.source.as_str()).or_default().push(edge);
        }

        Self {
            entry_node_id,
            nodes,
            edges,
            by_id,
            by_key,
            outgoing,
        }
    }

    /// The node referenced by `entry_node_id`; it must exist and be START.
    pub fn entry_node(&self) -> Result<&'a Node, GraphError> {
        let node = self
            .by_id
            .get(self.entry_node_id)
            .copied()
            .ok_or_else(|| GraphError::EntryMissing {
                entry_node_id: self.entry_node_id.to_string(),
            })?;
        if !node.kind.is_start() {
            return Err(GraphError::EntryNotStart {
                entry_node_id: self.entry_node_id.to_string(),
                kind: node.kind.to_string(),
            });
        }
        Ok(node)
    }

    /// Lookup by opaque id.
    pub fn node_by_id(&self, id: &str) -> Option<&'a Node> {
        self.by_id.get(id).copied()
    }

    /// Lookup by stable key.
    pub fn node_by_key(&self, key: &str) -> Option<&'a Node> {
        self.by_key.get(key).copied()
    }

    /// Outgoing edges of a node, in definition order.
    pub fn outgoing_edges(&self, node_id: &str) -> &[&'a Edge] {
        self.outgoing
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Full structural validation, run before a version is published.
    ///
    /// Checks, in order: node id/key uniqueness, exactly one START, entry
    /// resolution, edge endpoint resolution, and CHOICE config parseability
    /// including rule/default target resolution. The first violation is
    /// returned.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen_ids: FxHashMap<&str, ()> = FxHashMap::default();
        let mut seen_keys: FxHashMap<&str, ()> = FxHashMap::default();
        for node in self.nodes {
            if seen_ids.insert(node.id.as_str(), ()).is_some() {
                return Err(GraphError::DuplicateNodeId {
                    id: node.id.clone(),
                });
            }
            if seen_keys.insert(node.key.as_str(), ()).is_some() {
                return Err(GraphError::DuplicateNodeKey {
                    key: node.key.clone(),
                });
            }
        }

        let starts = self
            .nodes
            .iter()
            .filter(|node| node.kind.is_start())
            .count();
        match starts {
            0 => return Err(GraphError::NoStart),
            1 => {}
            count => return Err(GraphError::MultipleStarts { count }),
        }
        self.entry_node()?;

        for edge in self.edges {
            if !self.by_id.contains_key(edge.source.as_str()) {
                return Err(GraphError::UnknownEdgeSource {
                    source_id: edge.source.clone(),
                });
            }
            if !self.by_id.contains_key(edge.target.as_str()) {
                return Err(GraphError::UnknownEdgeTarget {
                    target: edge.target.clone(),
                });
            }
        }

        for node in self.nodes {
            if node.kind != NodeKind::Choice {
                continue;
            }
            let config = node
                .choice_config()
                .map_err(|err| GraphError::InvalidChoiceConfig {
                    node_id: node.id.clone(),
                    message: err.to_string(),
                })?;
            for group in &config.groups {
                for rule in &group.rules {
                    if let Some(target) = &rule.target {
                        if !self.by_id.contains_key(target.as_str()) {
                            return Err(GraphError::UnknownChoiceTarget {
                                node_id: node.id.clone(),
                                target: target.clone(),
                            });
                        }
                    }
                }
            }
            if let Some(target) = &config.default_target {
                if !self.by_id.contains_key(target.as_str()) {
                    return Err(GraphError::UnknownChoiceTarget {
                        node_id: node.id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
