//! Cluster harness boundary.
//!
//! [`ClusterApi`] is the only way the orchestrator touches a cluster.
//! Implementations surface API failures unchanged and never retry;
//! retry policy belongs to the orchestrator.

mod client;
mod objects;

pub use client::{KubeCluster, ResetStep, RESET_ORDER};
pub use objects::{node_object, parse_manifest};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{PodObservation, SimulatedNode};

/// Declarative cluster operations needed by a simulation run.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Deletes every Deployment and pod (all namespaces) and then every node,
    /// so nothing from an earlier run is recreated or collides on submit.
    ///
    /// Safe to call on an empty cluster.
    async fn reset_all(&self) -> Result<()>;

    /// Creates one fake node.
    async fn create_node(&self, node: &SimulatedNode) -> Result<()>;

    /// Creates the object described by one YAML manifest.
    async fn create_from_manifest(&self, manifest: &str) -> Result<()>;

    /// Lists every pod with its phase and hosting node.
    async fn list_pods(&self) -> Result<Vec<PodObservation>>;

    /// Lists every node.
    async fn list_nodes(&self) -> Result<Vec<SimulatedNode>>;
}
