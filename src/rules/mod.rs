//! Typed rule evaluation for routing decisions.
//!
//! This module is the decision core of the engine: given a variable bag
//! (the run's collected answers) and a routing structure, it produces a
//! [`Decision`] naming the next node, or none.
//!
//! Two routing mechanisms coexist:
//!
//! - **Edge-condition routing** ([`decide_edges`]) for plain nodes: the
//!   first outgoing edge whose [`Condition`] holds wins, with the first
//!   edge as fallback when none hold.
//! - **ChoiceConfig routing** ([`decide_choice`]) for CHOICE nodes: ordered
//!   [`Group`]s of [`Rule`]s of typed [`Clause`]s, AND-combined at every
//!   level, with a default target when no group passes.
//!
//! Evaluation is pure and synchronous; no clause or condition ever performs
//! I/O.
//!
//! # Quick Start
//!
//! ```
//! use scriptflow::rules::{
//!     decide_choice, Clause, ClauseKind, ClauseOperator, ChoiceConfig, Decision, Group, Rule,
//!     VariableBag,
//! };
//! use serde_json::json;
//!
//! let config = ChoiceConfig::new(
//!     vec![Group::new(vec![Rule::new(
//!         Some("n-adult".into()),
//!         vec![Clause::new("age", ClauseKind::Number, ClauseOperator::GreaterOrEqual, json!(18))],
//!     )])],
//!     Some("n-minor".into()),
//! );
//!
//! let mut vars = VariableBag::default();
//! vars.insert("age".into(), json!(21));
//! assert_eq!(decide_choice(&config, &vars), Decision::to("n-adult"));
//!
//! vars.insert("age".into(), json!(15));
//! assert_eq!(decide_choice(&config, &vars), Decision::to("n-minor"));
//! ```

mod clause;
mod condition;
mod decision;
mod value;

pub use clause::{ChoiceConfig, Clause, ClauseKind, ClauseOperator, Group, Rule};
pub use condition::Condition;
pub use decision::{decide_choice, decide_edges, Decision};

/// The variable bag rules evaluate against: the run's answers keyed by node
/// key.
pub type VariableBag = rustc_hash::FxHashMap<String, serde_json::Value>;
