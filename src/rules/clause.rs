//! Typed clause language used by CHOICE routing.
//!
//! A [`ChoiceConfig`] is an ordered list of [`Group`]s; a group is an
//! ordered list of [`Rule`]s; a rule is an ordered list of [`Clause`]s with
//! an optional target node. Each clause compares one named variable against
//! a literal using an operator drawn from the set its [`ClauseKind`] allows.
//!
//! The wire shape matches the editor's JSON:
//!
//! ```json
//! {
//!   "groups": [{
//!     "id": "g1",
//!     "rules": [{
//!       "id": "r1",
//!       "target": "n-adult",
//!       "clauses": [{
//!         "id": "c1", "variable": "age", "type": "number",
//!         "operator": ">=", "value": 18
//!       }]
//!     }]
//!   }],
//!   "defaultTarget": "n-minor"
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::value::{array_contains, to_array, to_epoch_millis, to_number, truthy};
use super::VariableBag;

/// Value domain a clause operates in. Determines the operator set and the
/// coercion applied to the looked-up variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseKind {
    String,
    Number,
    Date,
    Array,
    Boolean,
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClauseKind::String => "string",
            ClauseKind::Number => "number",
            ClauseKind::Date => "date",
            ClauseKind::Array => "array",
            ClauseKind::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

/// Comparison operator carried by a clause.
///
/// The wire form is the operator's literal spelling (`">="`, `"equals"`,
/// `"isTrue"`, ...). Operators are only meaningful for the kinds listed in
/// their doc line; a clause pairing an operator with a foreign kind
/// evaluates to false rather than failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClauseOperator {
    /// string: exact match.
    Equals,
    /// string: negated exact match.
    NotEquals,
    /// string: substring present.
    Contains,
    /// string: substring absent.
    NotContains,
    /// string: prefix match.
    StartsWith,
    /// string: suffix match.
    EndsWith,
    /// number/date.
    #[serde(rename = ">")]
    Greater,
    /// number/date.
    #[serde(rename = ">=")]
    GreaterOrEqual,
    /// number/date.
    #[serde(rename = "<")]
    Less,
    /// number/date.
    #[serde(rename = "<=")]
    LessOrEqual,
    /// number/date.
    #[serde(rename = "=")]
    NumericEqual,
    /// number/date.
    #[serde(rename = "!=")]
    NumericNotEqual,
    /// boolean: looked-up value is truthy.
    IsTrue,
    /// boolean: looked-up value is falsy.
    IsFalse,
    /// array: every requested item present.
    Includes,
    /// array: every requested item absent.
    NotIncludes,
    /// array: at least one shared item.
    Intersects,
    /// array: no shared items.
    NotIntersects,
}

/// A single typed comparison between a named variable and a literal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    #[serde(default)]
    pub id: String,
    pub variable: String,
    #[serde(rename = "type")]
    pub kind: ClauseKind,
    pub operator: ClauseOperator,
    #[serde(default)]
    pub value: Value,
}

impl Clause {
    pub fn new(
        variable: impl Into<String>,
        kind: ClauseKind,
        operator: ClauseOperator,
        value: Value,
    ) -> Self {
        Self {
            id: String::new(),
            variable: variable.into(),
            kind,
            operator,
            value,
        }
    }

    /// Evaluate this clause against the variable bag.
    ///
    /// Evaluation is total: type mismatches, unparseable numbers, and
    /// operator/kind pairings outside the defined sets all yield `false`.
    pub fn matches(&self, vars: &VariableBag) -> bool {
        let looked_up = vars.get(&self.variable);
        match self.kind {
            ClauseKind::String => self.matches_string(looked_up),
            ClauseKind::Number => {
                self.matches_numeric(to_number(looked_up), to_number(Some(&self.value)))
            }
            ClauseKind::Date => self.matches_numeric(
                to_epoch_millis(looked_up),
                to_epoch_millis(Some(&self.value)),
            ),
            ClauseKind::Boolean => match self.operator {
                ClauseOperator::IsTrue => truthy(looked_up),
                ClauseOperator::IsFalse => !truthy(looked_up),
                _ => false,
            },
            ClauseKind::Array => self.matches_array(looked_up),
        }
    }

    fn matches_string(&self, looked_up: Option<&Value>) -> bool {
        let Some(actual) = looked_up.and_then(Value::as_str) else {
            return false;
        };
        let Some(expected) = self.value.as_str() else {
            return false;
        };
        match self.operator {
            ClauseOperator::Equals => actual == expected,
            ClauseOperator::NotEquals => actual != expected,
            ClauseOperator::Contains => actual.contains(expected),
            ClauseOperator::NotContains => !actual.contains(expected),
            ClauseOperator::StartsWith => actual.starts_with(expected),
            ClauseOperator::EndsWith => actual.ends_with(expected),
            _ => false,
        }
    }

    fn matches_numeric(&self, left: f64, right: f64) -> bool {
        if !left.is_finite() || !right.is_finite() {
            return false;
        }
        match self.operator {
            ClauseOperator::Greater => left > right,
            ClauseOperator::GreaterOrEqual => left >= right,
            ClauseOperator::Less => left < right,
            ClauseOperator::LessOrEqual => left <= right,
            ClauseOperator::NumericEqual => left == right,
            ClauseOperator::NumericNotEqual => left != right,
            _ => false,
        }
    }

    fn matches_array(&self, looked_up: Option<&Value>) -> bool {
        let actual = to_array(looked_up);
        let requested = to_array(Some(&self.value));
        match self.operator {
            ClauseOperator::Includes => requested.iter().all(|item| array_contains(&actual, item)),
            ClauseOperator::NotIncludes => {
                requested.iter().all(|item| !array_contains(&actual, item))
            }
            ClauseOperator::Intersects => {
                requested.iter().any(|item| array_contains(&actual, item))
            }
            ClauseOperator::NotIntersects => {
                !requested.iter().any(|item| array_contains(&actual, item))
            }
            _ => false,
        }
    }
}

/// An AND-combination of clauses, optionally carrying a target node id.
///
/// A rule with no clauses passes vacuously.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub clauses: Vec<Clause>,
}

impl Rule {
    pub fn new(target: Option<String>, clauses: Vec<Clause>) -> Self {
        Self {
            id: String::new(),
            name: None,
            target,
            clauses,
        }
    }

    /// A rule passes only if every clause evaluates true.
    pub fn passes(&self, vars: &VariableBag) -> bool {
        self.clauses.iter().all(|clause| clause.matches(vars))
    }
}

/// An ordered collection of rules evaluated for a CHOICE node.
///
/// A group passes only if every rule in it passes. This is the observed
/// routing behavior: rules within a group are AND-combined, exactly like
/// clauses within a rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Group {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            id: String::new(),
            title: None,
            rules,
        }
    }

    /// A group passes only if every rule passes.
    pub fn passes(&self, vars: &VariableBag) -> bool {
        self.rules.iter().all(|rule| rule.passes(vars))
    }
}

/// Routing structure carried by CHOICE nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub default_target: Option<String>,
}

impl ChoiceConfig {
    pub fn new(groups: Vec<Group>, default_target: Option<String>) -> Self {
        Self {
            description: None,
            groups,
            default_target,
        }
    }
}
