//! Graph model: indexed traversal and authoring for version graphs.
//!
//! A [`ScriptVersion`](crate::model::ScriptVersion) stores its nodes and
//! edges as flat `Vec`s; this module provides the two views the rest of the
//! crate works with:
//!
//! - [`VersionGraph`]: a borrowed index answering entry/lookup/adjacency
//!   queries during run execution, plus publish-time structural
//!   [`validation`](VersionGraph::validate).
//! - [`VersionBuilder`]: a fluent authoring API producing the
//!   [`GraphDefinition`] that draft versions are created from.
//!
//! # Quick Start
//!
//! ```
//! use scriptflow::graph::{VersionBuilder, VersionGraph};
//!
//! let definition = VersionBuilder::new()
//!     .start("s0")
//!     .connector("hub")
//!     .end("done")
//!     .edge("s0", "hub")
//!     .edge("hub", "done")
//!     .build();
//!
//! let graph = VersionGraph::from_parts(
//!     &definition.entry_node_id,
//!     &definition.nodes,
//!     &definition.edges,
//! );
//! assert!(graph.validate().is_ok());
//! assert_eq!(graph.entry_node().unwrap().key, "s0");
//! ```

mod builder;
mod index;

pub use builder::{GraphDefinition, VersionBuilder};
pub use index::{GraphError, VersionGraph};
