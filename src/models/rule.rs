//! Topology label rules.
//!
//! A rule is one match expression of a label selector: a key, an
//! operator, and a set of values. The same shape backs pod affinity
//! (require), pod anti-affinity (exclude) and node affinity rules.
//!
//! # Reference
//! Kubernetes documentation, "Assigning Pods to Nodes", operators `In` / `NotIn`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Label key used by every pod-level rule.
pub const APP_LABEL: &str = "app";

/// Topology key for pod (anti-)affinity: co-location is judged per host.
pub const HOSTNAME_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";

/// Selector operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Label value must be one of the values (`In`).
    #[serde(rename = "In")]
    Include,
    /// Label value must be none of the values (`NotIn`).
    #[serde(rename = "NotIn")]
    Exclude,
}

impl Operator {
    /// The selector operator as written in a manifest.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Include => "In",
            Operator::Exclude => "NotIn",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a rule constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    /// Pod affinity: co-locate with matching pods.
    Require,
    /// Pod anti-affinity: keep apart from matching pods.
    Exclude,
    /// Node affinity: run on matching nodes.
    Node,
}

/// One label match expression.
///
/// `values` is ordered so that serialization is stable for a given population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Label key.
    pub key: String,
    /// Match operator.
    pub operator: Operator,
    /// Deduplicated label values.
    pub values: BTreeSet<String>,
}

impl Rule {
    /// Creates a rule with no values.
    pub fn new(key: impl Into<String>, operator: Operator) -> Self {
        Self {
            key: key.into(),
            operator,
            values: BTreeSet::new(),
        }
    }

    /// Creates a pod-level rule keyed on [`APP_LABEL`].
    pub fn app(operator: Operator) -> Self {
        Self::new(APP_LABEL, operator)
    }

    /// Adds a value (duplicates collapse).
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.values.insert(value.into());
        self
    }

    /// Adds a value in place. Returns `false` if it was already present.
    pub fn insert_value(&mut self, value: impl Into<String>) -> bool {
        self.values.insert(value.into())
    }

    /// Whether the value set is empty (the rule would be degenerate).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in stable order.
    pub fn value_list(&self) -> Vec<String> {
        self.values.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_wire_names() {
        assert_eq!(Operator::Include.as_str(), "In");
        assert_eq!(Operator::Exclude.to_string(), "NotIn");
        let json = serde_json::to_string(&Operator::Exclude).unwrap();
        assert_eq!(json, "\"NotIn\"");
    }

    #[test]
    fn test_values_deduplicate() {
        let mut rule = Rule::app(Operator::Include)
            .with_value("app3")
            .with_value("app1");
        assert!(!rule.insert_value("app3"));
        assert_eq!(rule.values.len(), 2);
        assert_eq!(rule.value_list(), vec!["app1".to_string(), "app3".to_string()]);
        assert_eq!(rule.key, APP_LABEL);
    }

    #[test]
    fn test_empty_rule() {
        let rule = Rule::new("tag2", Operator::Exclude);
        assert!(rule.is_empty());
    }
}
