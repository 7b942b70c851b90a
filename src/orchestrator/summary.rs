//! Placement quality indicators.
//!
//! Computes headline numbers from an observed placement for the run log.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Workloads observed | Distinct workloads with at least one pod |
//! | Placed | Workloads with at least one Running pod |
//! | Unplaced | Workloads that never reached Running |
//! | Placement rate | placed / observed |
//! | Nodes used | Nodes hosting at least one Running pod |
//! | Max pods per node | Largest Running pod count on one node |

use crate::models::ObservedPlacement;

/// Placement indicators for one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementSummary {
    /// Distinct workloads seen.
    pub workloads_observed: usize,
    /// Workloads with a Running pod.
    pub placed: usize,
    /// Workloads without any Running pod.
    pub unplaced: usize,
    /// Total pods classified.
    pub pods: usize,
    /// Pods in the Running phase.
    pub running_pods: usize,
    /// Fraction of observed workloads that were placed (0.0..1.0).
    pub placement_rate: f64,
    /// Nodes hosting at least one Running pod.
    pub nodes_used: usize,
    /// Largest number of Running pods on a single node.
    pub max_pods_per_node: usize,
}

impl PlacementSummary {
    /// Computes indicators from a placement.
    pub fn calculate(placement: &ObservedPlacement) -> Self {
        let pending = placement.pending();
        let running = placement.running();
        let observed = pending.union(&running).count();
        let unplaced = placement.unplaced().len();
        let per_node = placement.pods_per_node();

        let placement_rate = if observed == 0 {
            1.0
        } else {
            running.len() as f64 / observed as f64
        };

        Self {
            workloads_observed: observed,
            placed: running.len(),
            unplaced,
            pods: placement.pod_count(),
            running_pods: per_node.values().sum(),
            placement_rate,
            nodes_used: per_node.len(),
            max_pods_per_node: per_node.values().copied().max().unwrap_or(0),
        }
    }
}
