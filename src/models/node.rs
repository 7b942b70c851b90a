//! Simulated node model.
//!
//! Nodes are fabricated on the fake cluster. Capacity is descriptive
//! only; what matters for scheduling is the hostname (the pod affinity
//! topology key) and the extra tag labels that node rules select on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::HOSTNAME_TOPOLOGY_KEY;

/// Fixed capacity advertised by every fake node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCapacity {
    /// CPU cores.
    pub cpu: String,
    /// Memory quantity.
    pub memory: String,
    /// Maximum pods.
    pub pods: String,
}

impl Default for NodeCapacity {
    fn default() -> Self {
        Self {
            cpu: "32".to_owned(),
            memory: "256Gi".to_owned(),
            pods: "110".to_owned(),
        }
    }
}

/// A fake node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedNode {
    /// Node name (`node{i}`), also its hostname label.
    pub name: String,
    /// Randomly assigned tag labels (`tag{k}` → `val{v}`).
    pub tags: BTreeMap<String, String>,
    /// Capacity and allocatable (identical).
    pub capacity: NodeCapacity,
}

impl SimulatedNode {
    /// Creates an untagged node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
            capacity: NodeCapacity::default(),
        }
    }

    /// Adds or overwrites a tag label.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Full label set: the fixed kwok labels, the hostname, then the tags.
    ///
    /// Tags never shadow the base labels since they are all `tag*` keys.
    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels: BTreeMap<String, String> = [
            ("beta.kubernetes.io/arch", "amd64"),
            ("beta.kubernetes.io/os", "linux"),
            ("kubernetes.io/arch", "amd64"),
            ("kubernetes.io/os", "linux"),
            ("kubernetes.io/role", "agent"),
            ("node-role.kubernetes.io/agent", ""),
            ("type", "kwok"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
        labels.insert(HOSTNAME_TOPOLOGY_KEY.to_owned(), self.name.clone());
        labels.extend(self.tags.clone());
        labels
    }

    /// Recovers a node from a label map, keeping only `tag*` labels as tags.
    pub fn from_labels(name: impl Into<String>, labels: &BTreeMap<String, String>) -> Self {
        let tags = labels
            .iter()
            .filter(|(k, _)| k.starts_with("tag"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            name: name.into(),
            tags,
            capacity: NodeCapacity::default(),
        }
    }
}
