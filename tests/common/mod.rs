//! Common test utilities for harness integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use affinity_sim::cluster::{parse_manifest, ClusterApi, ResetStep, RESET_ORDER};
use affinity_sim::config::{ClusterConfig, GeneratorConfig, SettleConfig};
use affinity_sim::generator::generate_to_dir;
use affinity_sim::models::{PodObservation, SimulatedNode};
use affinity_sim::sampler::ConstraintSampler;
use affinity_sim::{Result, SimError};

#[derive(Default)]
struct FakeState {
    resets: usize,
    nodes: Vec<SimulatedNode>,
    submitted: Vec<String>,
    list_calls: usize,
    scripted: VecDeque<Vec<PodObservation>>,
    steady: Vec<PodObservation>,
}

/// In-memory cluster that records calls and replays scripted pod listings.
///
/// Each `list_pods` call pops the next scripted listing; once the script
/// is exhausted the steady listing is returned.
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<FakeState>,
}

impl FakeCluster {
    /// Creates a cluster that always lists `pods`.
    pub fn steady(pods: Vec<PodObservation>) -> Self {
        let cluster = Self::default();
        cluster.state.lock().unwrap().steady = pods;
        cluster
    }

    /// Queues listings to be returned before the steady listing.
    pub fn with_script(self, listings: Vec<Vec<PodObservation>>) -> Self {
        self.state.lock().unwrap().scripted.extend(listings);
        self
    }

    pub fn resets(&self) -> usize {
        self.state.lock().unwrap().resets
    }

    pub fn nodes(&self) -> Vec<SimulatedNode> {
        self.state.lock().unwrap().nodes.clone()
    }

    /// Names of submitted objects, in submission order.
    pub fn submitted(&self) -> Vec<String> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    /// Whether any setup call reached the cluster.
    pub fn touched(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.resets > 0 || !state.nodes.is_empty() || !state.submitted.is_empty()
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn reset_all(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.resets += 1;
        for step in RESET_ORDER {
            match step {
                ResetStep::Deployments => state.submitted.clear(),
                ResetStep::Pods => {}
                ResetStep::Nodes => state.nodes.clear(),
            }
        }
        Ok(())
    }

    async fn create_node(&self, node: &SimulatedNode) -> Result<()> {
        self.state.lock().unwrap().nodes.push(node.clone());
        Ok(())
    }

    async fn create_from_manifest(&self, manifest: &str) -> Result<()> {
        let (object, _) = parse_manifest(manifest)?;
        let name = object.metadata.name.unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        // Mirrors the API server's AlreadyExists rejection
        if state.submitted.contains(&name) {
            return Err(SimError::Manifest(format!("{name} already exists")));
        }
        state.submitted.push(name);
        Ok(())
    }

    async fn list_pods(&self) -> Result<Vec<PodObservation>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        let listing = match state.scripted.pop_front() {
            Some(listing) => listing,
            None => state.steady.clone(),
        };
        Ok(listing)
    }

    async fn list_nodes(&self) -> Result<Vec<SimulatedNode>> {
        Ok(self.nodes())
    }
}

/// A small mixed listing: app1 and app3 placed, app2 stuck.
pub fn mixed_pods() -> Vec<PodObservation> {
    vec![
        PodObservation::new("app1-6b7d9-aaaaa", "Running").on_node("node0"),
        PodObservation::new("app2-5c4f8-bbbbb", "Pending"),
        PodObservation::new("app3-9e1a2-ccccc", "Running").on_node("node1"),
        PodObservation::new("app3-9e1a2-ddddd", "Pending"),
    ]
}

/// Cluster settings sized for tests: few nodes, one minute waits.
pub fn test_cluster_config() -> ClusterConfig {
    ClusterConfig {
        node_count: 4,
        settle: SettleConfig {
            delay: Duration::from_secs(60),
            ..SettleConfig::default()
        },
        ..ClusterConfig::default()
    }
}

/// Writes a generated dataset of `population - 1` manifests into `dir`.
pub fn write_dataset(dir: &Path, population: u32, seed: u64) {
    let config = GeneratorConfig::with_population(population);
    let mut sampler = ConstraintSampler::new(seed);
    generate_to_dir(&config, &mut sampler, dir).unwrap();
}
