//! Deployment manifest rendering.
//!
//! Turns a [`Workload`] into an `apps/v1` Deployment. Rule categories
//! with no rules produce no clause at all, and the `affinity` block is
//! left out entirely when no clause applies.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Affinity, Container, NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm,
    PodAffinity, PodAffinityTerm, PodAntiAffinity, PodSpec, PodTemplateSpec, Toleration,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    LabelSelector, LabelSelectorRequirement, ObjectMeta,
};

use crate::error::Result;
use crate::models::{Rule, Workload, APP_LABEL, HOSTNAME_TOPOLOGY_KEY};

/// Container image for every generated workload. Never actually run.
pub const PAUSE_IMAGE: &str = "registry.k8s.io/pause:2.0";

/// Renders a workload as a Deployment.
///
/// `node_affinity` gates emission of node rules.
pub fn deployment_for(workload: &Workload, node_affinity: bool) -> Deployment {
    let labels = BTreeMap::from([(APP_LABEL.to_owned(), workload.name.clone())]);

    let pod_spec = PodSpec {
        containers: vec![Container {
            name: workload.name.clone(),
            image: Some(PAUSE_IMAGE.to_owned()),
            ..Default::default()
        }],
        tolerations: Some(vec![Toleration {
            key: Some("node.kubernetes.io/not-ready".to_owned()),
            operator: Some("Exists".to_owned()),
            effect: Some("NoSchedule".to_owned()),
            ..Default::default()
        }]),
        affinity: affinity_for(workload, node_affinity),
        ..Default::default()
    };

    Deployment {
        metadata: ObjectMeta {
            name: Some(workload.name.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(workload.replicas as i32),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    name: Some(workload.name.clone()),
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(pod_spec),
            },
            ..Default::default()
        }),
        status: None,
    }
}

/// Renders a workload as manifest YAML.
pub fn render_yaml(workload: &Workload, node_affinity: bool) -> Result<String> {
    Ok(serde_yaml::to_string(&deployment_for(workload, node_affinity))?)
}

fn affinity_for(workload: &Workload, node_affinity: bool) -> Option<Affinity> {
    let pod_affinity = pod_term(&workload.requires).map(|term| PodAffinity {
        required_during_scheduling_ignored_during_execution: Some(vec![term]),
        ..Default::default()
    });
    let pod_anti_affinity = pod_term(&workload.excludes).map(|term| PodAntiAffinity {
        required_during_scheduling_ignored_during_execution: Some(vec![term]),
        ..Default::default()
    });
    let node_affinity = if node_affinity {
        node_selector(&workload.node_rules).map(|selector| NodeAffinity {
            required_during_scheduling_ignored_during_execution: Some(selector),
            ..Default::default()
        })
    } else {
        None
    };

    if pod_affinity.is_none() && pod_anti_affinity.is_none() && node_affinity.is_none() {
        return None;
    }
    Some(Affinity {
        pod_affinity,
        pod_anti_affinity,
        node_affinity,
    })
}

/// One required term whose expressions are all non-empty rules.
fn pod_term(rules: &[Rule]) -> Option<PodAffinityTerm> {
    let expressions: Vec<LabelSelectorRequirement> = rules
        .iter()
        .filter(|r| !r.is_empty())
        .map(|r| LabelSelectorRequirement {
            key: r.key.clone(),
            operator: r.operator.as_str().to_owned(),
            values: Some(r.value_list()),
        })
        .collect();
    if expressions.is_empty() {
        return None;
    }
    Some(PodAffinityTerm {
        label_selector: Some(LabelSelector {
            match_expressions: Some(expressions),
            ..Default::default()
        }),
        topology_key: HOSTNAME_TOPOLOGY_KEY.to_owned(),
        ..Default::default()
    })
}

fn node_selector(rules: &[Rule]) -> Option<NodeSelector> {
    let expressions: Vec<NodeSelectorRequirement> = rules
        .iter()
        .filter(|r| !r.is_empty())
        .map(|r| NodeSelectorRequirement {
            key: r.key.clone(),
            operator: r.operator.as_str().to_owned(),
            values: Some(r.value_list()),
        })
        .collect();
    if expressions.is_empty() {
        return None;
    }
    Some(NodeSelector {
        node_selector_terms: vec![NodeSelectorTerm {
            match_expressions: Some(expressions),
            ..Default::default()
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Operator;

    fn constrained() -> Workload {
        Workload::new("app1")
            .with_replicas(4)
            .with_require(Rule::app(Operator::Include).with_value("app3").with_value("app2"))
            .with_exclude(Rule::app(Operator::Exclude).with_value("app5"))
            .with_node_rule(Rule::new("tag2", Operator::Include).with_value("val1"))
    }

    #[test]
    fn test_basic_shape() {
        let d = deployment_for(&Workload::new("app7").with_replicas(3), false);
        assert_eq!(d.metadata.name.as_deref(), Some("app7"));
        let spec = d.spec.unwrap();
        assert_eq!(spec.replicas, Some(3));
        let pod = spec.template.spec.unwrap();
        assert_eq!(pod.containers.len(), 1);
        assert_eq!(pod.containers[0].image.as_deref(), Some(PAUSE_IMAGE));
        assert!(pod.affinity.is_none());
    }

    #[test]
    fn test_no_affinity_key_without_rules() {
        let yaml = render_yaml(&Workload::new("app7"), true).unwrap();
        assert!(yaml.contains("kind: Deployment"));
        assert!(yaml.contains("apiVersion: apps/v1"));
        assert!(!yaml.contains("affinity"));
    }

    #[test]
    fn test_pod_affinity_clauses() {
        let d = deployment_for(&constrained(), false);
        let affinity = d.spec.unwrap().template.spec.unwrap().affinity.unwrap();

        let terms = affinity
            .pod_affinity
            .unwrap()
            .required_during_scheduling_ignored_during_execution
            .unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].topology_key, HOSTNAME_TOPOLOGY_KEY);
        let exprs = terms[0]
            .label_selector
            .as_ref()
            .unwrap()
            .match_expressions
            .as_ref()
            .unwrap();
        assert_eq!(exprs[0].key, "app");
        assert_eq!(exprs[0].operator, "In");
        assert_eq!(
            exprs[0].values.as_deref(),
            Some(&["app2".to_string(), "app3".to_string()][..])
        );

        assert!(affinity.pod_anti_affinity.is_some());
        // Node affinity stays off unless enabled
        assert!(affinity.node_affinity.is_none());
    }

    #[test]
    fn test_node_affinity_when_enabled() {
        let d = deployment_for(&constrained(), true);
        let affinity = d.spec.unwrap().template.spec.unwrap().affinity.unwrap();
        let selector = affinity
            .node_affinity
            .unwrap()
            .required_during_scheduling_ignored_during_execution
            .unwrap();
        let exprs = selector.node_selector_terms[0].match_expressions.as_ref().unwrap();
        assert_eq!(exprs[0].key, "tag2");
    }

    #[test]
    fn test_only_node_rules_disabled_means_no_affinity() {
        let w = Workload::new("app2")
            .with_node_rule(Rule::new("tag1", Operator::Exclude).with_value("val2"));
        let yaml = render_yaml(&w, false).unwrap();
        assert!(!yaml.contains("affinity"));
    }

    #[test]
    fn test_empty_rules_never_emitted() {
        let w = Workload::new("app3").with_exclude(Rule::app(Operator::Include));
        let yaml = render_yaml(&w, true).unwrap();
        assert!(!yaml.contains("podAntiAffinity"));
        assert!(!yaml.contains("affinity"));
    }
}
