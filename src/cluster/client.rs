//! `kube`-backed cluster harness.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, PostParams};
use kube::discovery::{self, Scope};
use kube::{Client, ResourceExt};
use tracing::{debug, info};

use super::objects::{node_object, parse_manifest};
use super::ClusterApi;
use crate::error::Result;
use crate::models::{PodObservation, SimulatedNode};

/// Namespace used for manifests that do not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// What a reset deletes, in deletion order.
///
/// Deployments go first so their ReplicaSets cannot recreate the pods
/// deleted next; nodes go last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStep {
    /// `apps/v1` Deployments in every namespace.
    Deployments,
    /// Pods in every namespace.
    Pods,
    /// Cluster-scoped nodes.
    Nodes,
}

/// Deletion order used by [`KubeCluster`]'s reset.
pub const RESET_ORDER: [ResetStep; 3] = [ResetStep::Deployments, ResetStep::Pods, ResetStep::Nodes];

/// Cluster harness over a live API server.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Wraps an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connects using the ambient kubeconfig or in-cluster configuration.
    pub async fn connect() -> Result<Self> {
        let client = Client::try_default().await?;
        info!("Connected to cluster API");
        Ok(Self::new(client))
    }

    async fn drop_all_deployments(&self) -> Result<usize> {
        let all: Api<Deployment> = Api::all(self.client.clone());
        let deployments = all.list(&ListParams::default()).await?;
        let count = deployments.items.len();
        for deployment in deployments.items {
            let namespace = deployment
                .namespace()
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());
            let api: Api<Deployment> = Api::namespaced(self.client.clone(), &namespace);
            api.delete(&deployment.name_any(), &DeleteParams::background())
                .await?;
        }
        Ok(count)
    }

    async fn drop_all_pods(&self) -> Result<usize> {
        let all: Api<Pod> = Api::all(self.client.clone());
        let pods = all.list(&ListParams::default()).await?;
        let count = pods.items.len();
        for pod in pods.items {
            let namespace = pod.namespace().unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());
            let api: Api<Pod> = Api::namespaced(self.client.clone(), &namespace);
            api.delete(&pod.name_any(), &DeleteParams::default()).await?;
        }
        Ok(count)
    }

    async fn drop_all_nodes(&self) -> Result<usize> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api.list(&ListParams::default()).await?;
        let count = nodes.items.len();
        for node in nodes.items {
            api.delete(&node.name_any(), &DeleteParams::default()).await?;
        }
        Ok(count)
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn reset_all(&self) -> Result<()> {
        for step in RESET_ORDER {
            let deleted = match step {
                ResetStep::Deployments => self.drop_all_deployments().await?,
                ResetStep::Pods => self.drop_all_pods().await?,
                ResetStep::Nodes => self.drop_all_nodes().await?,
            };
            debug!(?step, deleted, "Reset step done");
        }
        info!("Cluster reset");
        Ok(())
    }

    async fn create_node(&self, node: &SimulatedNode) -> Result<()> {
        let api: Api<Node> = Api::all(self.client.clone());
        api.create(&PostParams::default(), &node_object(node)).await?;
        debug!(node = %node.name, tags = node.tags.len(), "Node created");
        Ok(())
    }

    async fn create_from_manifest(&self, manifest: &str) -> Result<()> {
        let (object, gvk) = parse_manifest(manifest)?;
        let (resource, caps) = discovery::pinned_kind(&self.client, &gvk).await?;

        let api: Api<DynamicObject> = match caps.scope {
            Scope::Namespaced => {
                let namespace = object
                    .metadata
                    .namespace
                    .clone()
                    .unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());
                Api::namespaced_with(self.client.clone(), &namespace, &resource)
            }
            Scope::Cluster => Api::all_with(self.client.clone(), &resource),
        };
        api.create(&PostParams::default(), &object).await?;
        debug!(kind = %gvk.kind, name = %object.name_any(), "Object created");
        Ok(())
    }

    async fn list_pods(&self) -> Result<Vec<PodObservation>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let pods = api.list(&ListParams::default()).await?;
        Ok(pods
            .items
            .into_iter()
            .map(|pod| PodObservation {
                name: pod.name_any(),
                namespace: pod.namespace().unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned()),
                phase: pod.status.as_ref().and_then(|s| s.phase.clone()),
                node_name: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
            })
            .collect())
    }

    async fn list_nodes(&self) -> Result<Vec<SimulatedNode>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api.list(&ListParams::default()).await?;
        Ok(nodes
            .items
            .iter()
            .map(|node| SimulatedNode::from_labels(node.name_any(), node.labels()))
            .collect())
    }
}
