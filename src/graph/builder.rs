//! Fluent builder for assembling version graphs in code.
//!
//! The builder is the authoring-side counterpart of [`VersionGraph`]: it
//! accumulates nodes and edges in definition order and produces the
//! [`GraphDefinition`] that `create_draft` persists. It deliberately does
//! not validate; drafts may be incomplete, and structural checks run at
//! publish time.
//!
//! Node ids are derived from keys (`"n-" + key`) so edges and choice
//! targets can be written in terms of keys. [`VersionBuilder::id_for`]
//! exposes the derivation for choice configs assembled alongside the
//! builder.

use serde_json::{Value, json};

use crate::model::{Edge, Node, NodeKind};
use crate::rules::{ChoiceConfig, Condition};

/// The loose graph parts a draft version is created from.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphDefinition {
    pub entry_node_id: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Builder for version graphs with a fluent API.
///
/// # Examples
///
/// ```
/// use scriptflow::graph::VersionBuilder;
/// use scriptflow::rules::Condition;
///
/// let definition = VersionBuilder::new()
///     .start("s0")
///     .question("age")
///     .end("done")
///     .edge("s0", "age")
///     .edge_when("age", "done", Condition::equals("age", 42))
///     .build();
///
/// assert_eq!(definition.entry_node_id, "n-s0");
/// assert_eq!(definition.nodes.len(), 3);
/// assert_eq!(definition.edges.len(), 2);
/// ```
pub struct VersionBuilder {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    entry: Option<String>,
}

impl Default for VersionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionBuilder {
    /// Creates a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            entry: None,
        }
    }

    /// The node id derived for a key.
    #[must_use]
    pub fn id_for(key: &str) -> String {
        format!("n-{key}")
    }

    /// Adds the START node and marks it as the entry.
    #[must_use]
    pub fn start(self, key: &str) -> Self {
        let id = Self::id_for(key);
        let mut builder = self.push(Node::new(&id, key, NodeKind::Start));
        builder.entry = Some(id);
        builder
    }

    /// Adds a QUESTION node.
    #[must_use]
    pub fn question(self, key: &str) -> Self {
        self.push(Node::new(Self::id_for(key), key, NodeKind::Question))
    }

    /// Adds a CHOICE node carrying the given routing config.
    #[must_use]
    pub fn choice(self, key: &str, config: &ChoiceConfig) -> Self {
        let node = Node::new(Self::id_for(key), key, NodeKind::Choice)
            .with_config(serde_json::to_value(config).unwrap_or(Value::Null));
        self.push(node)
    }

    /// Adds an ACTION node with its action identifier and args.
    #[must_use]
    pub fn action(self, key: &str, action: &str, args: Value) -> Self {
        let node = Node::new(Self::id_for(key), key, NodeKind::Action)
            .with_config(json!({"action": action, "args": args}));
        self.push(node)
    }

    /// Adds an END node.
    #[must_use]
    pub fn end(self, key: &str) -> Self {
        self.push(Node::new(Self::id_for(key), key, NodeKind::End))
    }

    /// Adds a CONNECTOR node.
    #[must_use]
    pub fn connector(self, key: &str) -> Self {
        self.push(Node::new(Self::id_for(key), key, NodeKind::Connector))
    }

    /// Adds a node as constructed, without key-derived ids.
    #[must_use]
    pub fn node(self, node: Node) -> Self {
        self.push(node)
    }

    /// Adds an unconditional edge between two keys.
    #[must_use]
    pub fn edge(mut self, from_key: &str, to_key: &str) -> Self {
        self.edges
            .push(Edge::new(Self::id_for(from_key), Self::id_for(to_key)));
        self
    }

    /// Adds a guarded edge between two keys.
    #[must_use]
    pub fn edge_when(mut self, from_key: &str, to_key: &str, condition: Condition) -> Self {
        self.edges.push(
            Edge::new(Self::id_for(from_key), Self::id_for(to_key)).with_condition(condition),
        );
        self
    }

    /// Overrides the entry node id, for graphs built from raw [`node`](Self::node) calls.
    #[must_use]
    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.entry = Some(node_id.into());
        self
    }

    /// Produce the graph definition. Unset entry becomes the empty id and
    /// is caught by publish-time validation.
    #[must_use]
    pub fn build(self) -> GraphDefinition {
        GraphDefinition {
            entry_node_id: self.entry.unwrap_or_default(),
            nodes: self.nodes,
            edges: self.edges,
        }
    }

    fn push(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }
}
