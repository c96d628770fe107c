//! Routing decisions over edges and choice configs.
//!
//! Both mechanisms are pure functions from a routing structure and a
//! variable bag to a [`Decision`]. Emptiness and tie-breaks are resolved
//! here, in one place, so the engine only has to interpret
//! `Decision::target`.

use tracing::trace;

use super::clause::ChoiceConfig;
use super::VariableBag;
use crate::model::Edge;

/// Outcome of evaluating a routing structure.
///
/// `target` is the node id to move to; `None` means "no valid transition"
/// and is a caller-side failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    pub target: Option<String>,
}

impl Decision {
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
        }
    }

    pub fn none() -> Self {
        Self { target: None }
    }
}

/// Edge-condition routing for plain (non-CHOICE) nodes.
///
/// Walks `edges` in definition order and takes the first edge whose
/// condition evaluates true; an absent condition is always true. When no
/// condition holds, the first edge is the fallback. No edges at all yields
/// [`Decision::none`].
pub fn decide_edges(edges: &[&Edge], vars: &VariableBag) -> Decision {
    for edge in edges {
        let holds = edge
            .condition
            .as_ref()
            .map(|condition| condition.eval(vars))
            .unwrap_or(true);
        if holds {
            trace!(target_node = %edge.target, "edge condition matched");
            return Decision::to(edge.target.clone());
        }
    }
    match edges.first() {
        Some(first) => {
            trace!(target_node = %first.target, "falling back to first edge");
            Decision::to(first.target.clone())
        }
        None => Decision::none(),
    }
}

/// ChoiceConfig routing for CHOICE nodes.
///
/// Groups are evaluated in order; a group passes only when every rule in it
/// passes (rules AND-combine, exactly like clauses within a rule). On the
/// first passing group the first rule with a non-null target wins, falling
/// back to the group's first rule. When no group passes the decision is the
/// config's default target, which may itself be absent.
pub fn decide_choice(config: &ChoiceConfig, vars: &VariableBag) -> Decision {
    for (index, group) in config.groups.iter().enumerate() {
        if !group.passes(vars) {
            continue;
        }
        trace!(group = index, "choice group passed");
        let chosen = group
            .rules
            .iter()
            .find(|rule| rule.target.is_some())
            .or_else(|| group.rules.first());
        return Decision {
            target: chosen.and_then(|rule| rule.target.clone()),
        };
    }
    trace!("no choice group passed, using default target");
    Decision {
        target: config.default_target.clone(),
    }
}
