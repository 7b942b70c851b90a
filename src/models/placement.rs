//! Observed placement model.
//!
//! A placement is a point-in-time classification of every pod in the
//! cluster into Pending or Running, keyed back to its owning workload.
//! It is rebuilt from scratch on every poll.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, SimError};

/// Raw pod state as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodObservation {
    /// Generated pod name (`<workload>-<hash>-<suffix>`).
    pub name: String,
    /// Pod namespace.
    pub namespace: String,
    /// Reported phase, if any.
    pub phase: Option<String>,
    /// Hosting node, if bound.
    pub node_name: Option<String>,
}

impl PodObservation {
    /// Creates an observation.
    pub fn new(name: impl Into<String>, phase: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: "default".to_owned(),
            phase: Some(phase.into()),
            node_name: None,
        }
    }

    /// Sets the hosting node.
    pub fn on_node(mut self, node: impl Into<String>) -> Self {
        self.node_name = Some(node.into());
        self
    }
}

/// The modeled pod phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    /// Accepted but not (yet) bound and started.
    Pending,
    /// Bound to a node and running.
    Running,
}

impl PodPhase {
    /// Parses a reported phase. Anything else is outside the model.
    pub fn parse(phase: &str) -> Option<Self> {
        match phase {
            "Pending" => Some(PodPhase::Pending),
            "Running" => Some(PodPhase::Running),
            _ => None,
        }
    }
}

/// Owning workload of a pod: everything before the first `-`.
pub fn workload_of_pod(pod_name: &str) -> &str {
    pod_name.split('-').next().unwrap_or(pod_name)
}

/// A classified pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodRecord {
    /// Pod name.
    pub pod: String,
    /// Owning workload.
    pub workload: String,
    /// Classified phase.
    pub phase: PodPhase,
    /// Hosting node when running.
    pub node: Option<String>,
}

/// Classified snapshot of every pod.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservedPlacement {
    /// Classified pods in listing order.
    pub pods: Vec<PodRecord>,
}

impl ObservedPlacement {
    /// Creates an empty placement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies a pod listing.
    ///
    /// # Errors
    /// [`SimError::UnknownPodPhase`] on the first pod whose phase is missing
    /// or not one of Pending/Running.
    pub fn classify(observations: &[PodObservation]) -> Result<Self> {
        let mut placement = Self::new();
        for obs in observations {
            let raw = obs.phase.as_deref().unwrap_or("");
            let phase = PodPhase::parse(raw).ok_or_else(|| SimError::UnknownPodPhase {
                pod: obs.name.clone(),
                phase: raw.to_owned(),
            })?;
            placement.pods.push(PodRecord {
                pod: obs.name.clone(),
                workload: workload_of_pod(&obs.name).to_owned(),
                phase,
                node: obs.node_name.clone(),
            });
        }
        Ok(placement)
    }

    fn workloads_in(&self, phase: PodPhase) -> BTreeSet<String> {
        self.pods
            .iter()
            .filter(|p| p.phase == phase)
            .map(|p| p.workload.clone())
            .collect()
    }

    /// Workloads with at least one pod seen Pending.
    pub fn pending(&self) -> BTreeSet<String> {
        self.workloads_in(PodPhase::Pending)
    }

    /// Workloads with at least one pod seen Running.
    pub fn running(&self) -> BTreeSet<String> {
        self.workloads_in(PodPhase::Running)
    }

    /// Workloads that never reached Running: `pending - running`.
    pub fn unplaced(&self) -> BTreeSet<String> {
        let running = self.running();
        self.pending()
            .into_iter()
            .filter(|w| !running.contains(w))
            .collect()
    }

    /// Running pod → hosting node.
    pub fn distribution(&self) -> BTreeMap<String, String> {
        self.pods
            .iter()
            .filter(|p| p.phase == PodPhase::Running)
            .filter_map(|p| p.node.as_ref().map(|n| (p.pod.clone(), n.clone())))
            .collect()
    }

    /// Number of Running pods per node.
    pub fn pods_per_node(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for node in self.distribution().into_values() {
            *counts.entry(node).or_insert(0) += 1;
        }
        counts
    }

    /// Number of classified pods.
    pub fn pod_count(&self) -> usize {
        self.pods.len()
    }
}
