//! Deployment orchestration.
//!
//! Drives one simulation run against a [`ClusterApi`]:
//!
//! ```text
//! Resetting → Provisioning → Submitting → Settling → Polling{1..n} → Done
//!                                                          └──────→ Failed
//! ```
//!
//! Any error moves the run to `Failed`. Only an empty pod listing is
//! retried; every other failure aborts immediately. With `skip_setup`
//! the run starts at `Polling`, against whatever is already deployed.

mod settle;
mod summary;

pub use settle::{settle, SettleOutcome, SettleStrategy};
pub use summary::PlacementSummary;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::cluster::ClusterApi;
use crate::config::{ClusterConfig, TagVocabulary};
use crate::error::{Result, SimError};
use crate::models::{ObservedPlacement, SimulatedNode};
use crate::sampler::ConstraintSampler;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Not started.
    Idle,
    /// Deleting all pods and nodes.
    Resetting,
    /// Creating fake nodes.
    Provisioning,
    /// Submitting workload manifests.
    Submitting,
    /// Waiting for the scheduler.
    Settling,
    /// Observing pod phases; `attempt` is 1-based.
    Polling { attempt: u32 },
    /// Observation succeeded.
    Done,
    /// The run aborted.
    Failed,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final observation.
    pub placement: ObservedPlacement,
    /// Workloads left unplaced.
    pub unplaced: BTreeSet<String>,
    /// Headline indicators.
    pub summary: PlacementSummary,
}

impl RunOutcome {
    fn new(placement: ObservedPlacement) -> Self {
        Self {
            unplaced: placement.unplaced(),
            summary: PlacementSummary::calculate(&placement),
            placement,
        }
    }

    /// Writes the unplaced list and the pod distribution as JSON.
    pub fn write_reports(&self, unplaced_path: &Path, distribution_path: &Path) -> Result<()> {
        let unplaced: Vec<&String> = self.unplaced.iter().collect();
        write_json(unplaced_path, &unplaced)?;
        let distribution: BTreeMap<String, String> = self.placement.distribution();
        write_json(distribution_path, &distribution)?;
        info!(
            unplaced = %unplaced_path.display(),
            distribution = %distribution_path.display(),
            "Reports written"
        );
        Ok(())
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Plans `count` fake nodes with randomly drawn tag labels.
///
/// Each node gets `uniform(0, label_limit)` tag draws; a repeated key
/// overwrites, so a node may end up with fewer distinct tags.
pub fn plan_nodes(
    count: u32,
    label_limit: u32,
    vocabulary: TagVocabulary,
    sampler: &mut ConstraintSampler,
) -> Vec<SimulatedNode> {
    (0..count)
        .map(|i| {
            let mut node = SimulatedNode::new(format!("node{i}"));
            let draws = if label_limit == 0 {
                0
            } else {
                sampler.uniform(0, label_limit)
            };
            for _ in 0..draws {
                let tag = sampler.uniform(1, vocabulary.tag_types);
                let value = sampler.uniform(1, vocabulary.tag_values);
                node.tags.insert(format!("tag{tag}"), format!("val{value}"));
            }
            node
        })
        .collect()
}

/// Lists the manifest files of a dataset directory in name order.
pub fn dataset_manifests(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "yaml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Drives a simulation run.
pub struct DeploymentOrchestrator<'a, C: ClusterApi + ?Sized> {
    cluster: &'a C,
    sampler: &'a mut ConstraintSampler,
    config: ClusterConfig,
    vocabulary: TagVocabulary,
    dataset_dir: PathBuf,
    phase: RunPhase,
    transitions: Vec<RunPhase>,
}

impl<'a, C: ClusterApi + ?Sized> DeploymentOrchestrator<'a, C> {
    /// Creates an orchestrator for one run.
    pub fn new(
        cluster: &'a C,
        sampler: &'a mut ConstraintSampler,
        config: ClusterConfig,
        vocabulary: TagVocabulary,
        dataset_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cluster,
            sampler,
            config,
            vocabulary,
            dataset_dir: dataset_dir.into(),
            phase: RunPhase::Idle,
            transitions: Vec::new(),
        }
    }

    /// Current state.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Every state entered so far, in order.
    pub fn transitions(&self) -> &[RunPhase] {
        &self.transitions
    }

    fn enter(&mut self, phase: RunPhase) {
        info!(from = ?self.phase, to = ?phase, "Run phase");
        self.phase = phase;
        self.transitions.push(phase);
    }

    /// Runs the full state machine.
    ///
    /// # Errors
    /// Any cluster error, an unknown pod phase, a missing dataset
    /// directory, or [`SimError::PollingExhausted`]. The orchestrator
    /// is left in [`RunPhase::Failed`].
    pub async fn run(&mut self, skip_setup: bool) -> Result<RunOutcome> {
        match self.drive(skip_setup).await {
            Ok(outcome) => {
                self.enter(RunPhase::Done);
                let s = &outcome.summary;
                info!(
                    workloads = s.workloads_observed,
                    placed = s.placed,
                    unplaced = s.unplaced,
                    nodes_used = s.nodes_used,
                    max_pods_per_node = s.max_pods_per_node,
                    "Run complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(phase = ?self.phase, error = %e, "Run failed");
                self.enter(RunPhase::Failed);
                Err(e)
            }
        }
    }

    async fn drive(&mut self, skip_setup: bool) -> Result<RunOutcome> {
        if skip_setup {
            info!("Skipping setup, observing the deployed cluster");
        } else {
            info!("Starting fake deployment");

            self.enter(RunPhase::Resetting);
            self.cluster.reset_all().await?;

            self.enter(RunPhase::Provisioning);
            self.provision().await?;

            self.enter(RunPhase::Submitting);
            self.submit().await?;

            self.enter(RunPhase::Settling);
            let strategy = SettleStrategy::from(&self.config.settle);
            settle(self.cluster, &strategy).await?;
        }

        let placement = self.poll().await?;
        Ok(RunOutcome::new(placement))
    }

    async fn provision(&mut self) -> Result<()> {
        let nodes = plan_nodes(
            self.config.node_count,
            self.config.node_label_limit,
            self.vocabulary,
            self.sampler,
        );
        for node in &nodes {
            self.cluster.create_node(node).await?;
        }
        let registered = self.cluster.list_nodes().await?.len();
        info!(nodes = nodes.len(), registered, "Nodes created");
        Ok(())
    }

    async fn submit(&mut self) -> Result<()> {
        let files = dataset_manifests(&self.dataset_dir)?;
        for path in &files {
            let manifest = fs::read_to_string(path)?;
            self.cluster.create_from_manifest(&manifest).await?;
        }
        info!(manifests = files.len(), dir = %self.dataset_dir.display(), "Workloads submitted");
        Ok(())
    }

    async fn poll(&mut self) -> Result<ObservedPlacement> {
        let attempts = self.config.poll_attempts;
        for attempt in 1..=attempts {
            self.enter(RunPhase::Polling { attempt });
            match self.observe().await {
                Ok(placement) => return Ok(placement),
                Err(e) if e.is_transient() => {
                    warn!(
                        attempt,
                        attempts,
                        "No pods found; the fake node runtime may have faulted"
                    );
                    if attempt < attempts {
                        sleep(self.config.retry_delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(SimError::PollingExhausted { attempts })
    }

    async fn observe(&self) -> Result<ObservedPlacement> {
        let pods = self.cluster.list_pods().await?;
        if pods.is_empty() {
            return Err(SimError::NoPodsObserved);
        }
        ObservedPlacement::classify(&pods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_nodes_names_and_vocabulary() {
        let mut sampler = ConstraintSampler::new(2);
        let nodes = plan_nodes(6, 20, TagVocabulary::default(), &mut sampler);
        assert_eq!(nodes.len(), 6);
        assert_eq!(nodes[0].name, "node0");
        assert_eq!(nodes[5].name, "node5");
        for node in &nodes {
            assert!(node.tags.len() <= 4);
            for (k, v) in &node.tags {
                assert!(["tag1", "tag2", "tag3", "tag4"].contains(&k.as_str()));
                assert!(["val1", "val2", "val3"].contains(&v.as_str()));
            }
        }
    }

    #[test]
    fn test_plan_nodes_deterministic() {
        let mut a = ConstraintSampler::new(8);
        let mut b = ConstraintSampler::new(8);
        assert_eq!(
            plan_nodes(10, 20, TagVocabulary::default(), &mut a),
            plan_nodes(10, 20, TagVocabulary::default(), &mut b)
        );
    }

    #[test]
    fn test_plan_nodes_without_labels() {
        let mut sampler = ConstraintSampler::new(1);
        let nodes = plan_nodes(3, 0, TagVocabulary::default(), &mut sampler);
        assert!(nodes.iter().all(|n| n.tags.is_empty()));
    }

    #[test]
    fn test_dataset_manifests_sorted_yaml_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["app2.yaml", "app10.yaml", "app1.yaml", "notes.txt"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let files = dataset_manifests(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["app1.yaml", "app10.yaml", "app2.yaml"]);
    }

    #[test]
    fn test_write_reports() {
        let dir = tempfile::tempdir().unwrap();
        let placement = ObservedPlacement::classify(&[
            crate::models::PodObservation::new("app1-x-1", "Pending"),
            crate::models::PodObservation::new("app2-x-1", "Running").on_node("node3"),
        ])
        .unwrap();
        let outcome = RunOutcome::new(placement);
        let unplaced = dir.path().join("out/pending_pods.json");
        let distribution = dir.path().join("out/pod_distribution.json");

        outcome.write_reports(&unplaced, &distribution).unwrap();

        let names: Vec<String> =
            serde_json::from_str(&fs::read_to_string(&unplaced).unwrap()).unwrap();
        assert_eq!(names, vec!["app1"]);
        let dist: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&distribution).unwrap()).unwrap();
        assert_eq!(dist.get("app2-x-1"), Some(&"node3".to_string()));
    }
}
