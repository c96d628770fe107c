//! Boolean condition AST for edge guards.
//!
//! Edge conditions are a closed, tagged enum evaluated by exhaustive match.
//! Unknown operator tags fail at deserialization rather than at evaluation,
//! so a stored version either routes deterministically or never loads.
//!
//! Wire shape, discriminated by `op`:
//!
//! ```json
//! {"op": "equals", "var": "segment", "value": "premium"}
//! {"op": "all", "conditions": [ ... ]}
//! {"op": "not", "condition": { ... }}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::value::values_equal;
use super::VariableBag;

/// A boolean expression over the variable bag.
///
/// An absent variable equals nothing: `equals` on a missing variable is
/// false and `notEquals` is true, for every literal including `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Condition {
    /// `var == value`, with numeric normalization.
    Equals { var: String, value: Value },
    /// `var != value`.
    NotEquals { var: String, value: Value },
    /// Conjunction; true when empty.
    All { conditions: Vec<Condition> },
    /// Disjunction; false when empty.
    Any { conditions: Vec<Condition> },
    /// Negation.
    Not { condition: Box<Condition> },
}

impl Condition {
    pub fn equals(var: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Equals {
            var: var.into(),
            value: value.into(),
        }
    }

    pub fn not_equals(var: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::NotEquals {
            var: var.into(),
            value: value.into(),
        }
    }

    pub fn all(conditions: Vec<Condition>) -> Self {
        Condition::All { conditions }
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Condition::Any { conditions }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        Condition::Not {
            condition: Box::new(condition),
        }
    }

    /// Evaluate against the variable bag. Pure and total.
    pub fn eval(&self, vars: &VariableBag) -> bool {
        match self {
            Condition::Equals { var, value } => vars
                .get(var)
                .map(|looked_up| values_equal(looked_up, value))
                .unwrap_or(false),
            Condition::NotEquals { var, value } => vars
                .get(var)
                .map(|looked_up| !values_equal(looked_up, value))
                .unwrap_or(true),
            Condition::All { conditions } => conditions.iter().all(|c| c.eval(vars)),
            Condition::Any { conditions } => conditions.iter().any(|c| c.eval(vars)),
            Condition::Not { condition } => !condition.eval(vars),
        }
    }
}
