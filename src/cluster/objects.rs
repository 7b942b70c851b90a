//! Cluster object construction and manifest decoding.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Node, NodeStatus, NodeSystemInfo};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DynamicObject, GroupVersionKind};

use crate::error::{Result, SimError};
use crate::models::SimulatedNode;

/// Builds the kwok fake Node object for a simulated node.
pub fn node_object(node: &SimulatedNode) -> Node {
    let annotations = BTreeMap::from([
        ("node.alpha.kubernetes.io/ttl".to_owned(), "0".to_owned()),
        ("kwok.x-k8s.io/node".to_owned(), "fake".to_owned()),
    ]);
    let resources = BTreeMap::from([
        ("cpu".to_owned(), Quantity(node.capacity.cpu.clone())),
        ("memory".to_owned(), Quantity(node.capacity.memory.clone())),
        ("pods".to_owned(), Quantity(node.capacity.pods.clone())),
    ]);

    Node {
        metadata: ObjectMeta {
            name: Some(node.name.clone()),
            labels: Some(node.labels()),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: None,
        status: Some(NodeStatus {
            allocatable: Some(resources.clone()),
            capacity: Some(resources),
            node_info: Some(NodeSystemInfo {
                architecture: "amd64".to_owned(),
                kube_proxy_version: "fake".to_owned(),
                kubelet_version: "fake".to_owned(),
                operating_system: "linux".to_owned(),
                ..Default::default()
            }),
            phase: Some("Running".to_owned()),
            ..Default::default()
        }),
    }
}

/// Decodes one YAML manifest into a dynamic object and its kind.
///
/// # Errors
/// [`SimError::Yaml`] if the text is not an object, [`SimError::Manifest`]
/// if `apiVersion`/`kind` or `metadata.name` are missing.
pub fn parse_manifest(manifest: &str) -> Result<(DynamicObject, GroupVersionKind)> {
    let object: DynamicObject = serde_yaml::from_str(manifest)?;
    let types = object
        .types
        .as_ref()
        .ok_or_else(|| SimError::Manifest("missing apiVersion/kind".into()))?;
    if object.metadata.name.is_none() {
        return Err(SimError::Manifest(format!(
            "{} without metadata.name",
            types.kind
        )));
    }

    let (group, version) = match types.api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", types.api_version.as_str()),
    };
    let gvk = GroupVersionKind::gvk(group, version, &types.kind);
    Ok((object, gvk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::render_yaml;
    use crate::models::Workload;

    #[test]
    fn test_node_object() {
        let node = node_object(&SimulatedNode::new("node4").with_tag("tag3", "val1"));
        assert_eq!(node.metadata.name.as_deref(), Some("node4"));
        let labels = node.metadata.labels.unwrap();
        assert_eq!(labels.get("kubernetes.io/hostname"), Some(&"node4".to_string()));
        assert_eq!(labels.get("tag3"), Some(&"val1".to_string()));
        let status = node.status.unwrap();
        assert_eq!(status.phase.as_deref(), Some("Running"));
        assert_eq!(
            status.capacity.unwrap().get("memory"),
            Some(&Quantity("256Gi".into()))
        );
    }

    #[test]
    fn test_parse_generated_manifest() {
        let yaml = render_yaml(&Workload::new("app3").with_replicas(2), false).unwrap();
        let (object, gvk) = parse_manifest(&yaml).unwrap();
        assert_eq!(gvk.group, "apps");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.kind, "Deployment");
        assert_eq!(object.metadata.name.as_deref(), Some("app3"));
        assert_eq!(object.data["spec"]["replicas"], 2);
    }

    #[test]
    fn test_parse_core_group() {
        let yaml = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: p\n";
        let (_, gvk) = parse_manifest(yaml).unwrap();
        assert_eq!(gvk.group, "");
        assert_eq!(gvk.version, "v1");
    }

    #[test]
    fn test_parse_rejects_untyped() {
        let yaml = "metadata:\n  name: p\n";
        assert!(parse_manifest(yaml).is_err());
        let unnamed = "apiVersion: v1\nkind: Pod\nmetadata: {}\n";
        assert!(matches!(parse_manifest(unnamed), Err(SimError::Manifest(_))));
    }
}
