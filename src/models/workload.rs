//! Workload model.
//!
//! A workload is one named Deployment with a replica count and three
//! ordered rule categories. Categories are plain vectors; an empty
//! vector means the category is absent from the manifest.

use serde::{Deserialize, Serialize};

use super::{Rule, RuleKind};

/// A named unit of deployment with optional topology constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    /// Unique name within a run (`app{i}`).
    pub name: String,
    /// Number of pod replicas.
    pub replicas: u32,
    /// Pod affinity rules.
    pub requires: Vec<Rule>,
    /// Pod anti-affinity rules.
    pub excludes: Vec<Rule>,
    /// Node affinity rules.
    pub node_rules: Vec<Rule>,
}

impl Workload {
    /// Creates a single-replica workload with no rules.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replicas: 1,
            requires: Vec::new(),
            excludes: Vec::new(),
            node_rules: Vec::new(),
        }
    }

    /// Sets the replica count.
    pub fn with_replicas(mut self, replicas: u32) -> Self {
        self.replicas = replicas;
        self
    }

    /// Adds a pod affinity rule.
    pub fn with_require(mut self, rule: Rule) -> Self {
        self.requires.push(rule);
        self
    }

    /// Adds a pod anti-affinity rule.
    pub fn with_exclude(mut self, rule: Rule) -> Self {
        self.excludes.push(rule);
        self
    }

    /// Adds a node affinity rule.
    pub fn with_node_rule(mut self, rule: Rule) -> Self {
        self.node_rules.push(rule);
        self
    }

    /// Rules of one category.
    pub fn rules(&self, kind: RuleKind) -> &[Rule] {
        match kind {
            RuleKind::Require => &self.requires,
            RuleKind::Exclude => &self.excludes,
            RuleKind::Node => &self.node_rules,
        }
    }

    /// Drops every rule whose value set came out empty.
    ///
    /// Returns the number of rules removed.
    pub fn prune_empty_rules(&mut self) -> usize {
        let before = self.rule_count();
        self.requires.retain(|r| !r.is_empty());
        self.excludes.retain(|r| !r.is_empty());
        self.node_rules.retain(|r| !r.is_empty());
        before - self.rule_count()
    }

    /// Total rules across all categories.
    pub fn rule_count(&self) -> usize {
        self.requires.len() + self.excludes.len() + self.node_rules.len()
    }
}
