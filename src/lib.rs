//! Affinity conflict simulation harness.
//!
//! Generates synthetic Kubernetes workloads with random inter-pod and node
//! affinity rules, deploys them onto a fake cluster of simulated nodes,
//! observes which workloads stay unplaced, and checks that prediction
//! against a conflict detector's report.
//!
//! # Modules
//!
//! - **`sampler`**: Seeded random source for every draw of a run
//! - **`models`**: Domain types: `Rule`, `Workload`, `SimulatedNode`,
//!   `PodObservation`, `ObservedPlacement`
//! - **`validation`**: Structural checks on a generated population
//! - **`generator`**: Workload population and Deployment manifests
//! - **`cluster`**: Cluster API seam and its `kube` implementation
//! - **`orchestrator`**: Reset → provision → submit → settle → poll
//! - **`verifier`**: Predicted ⊆ observed check
//! - **`process`**: External command execution with timeout
//! - **`config`**: Layered configuration
//!
//! # Pipeline
//!
//! ```text
//! generate ──► dataset/*.yaml ──► deploy ──► pending_pods.json ─┐
//!                   │                                          ├─► verify
//!                   └──────────► detect ──► conflicts-node.yaml ┘
//! ```
//!
//! # References
//!
//! - Kubernetes, "Assigning Pods to Nodes" (inter-pod affinity and anti-affinity)
//! - KWOK, "Kubernetes WithOut Kubelet"

pub mod cluster;
pub mod config;
pub mod error;
pub mod generator;
pub mod models;
pub mod orchestrator;
pub mod process;
pub mod sampler;
pub mod validation;
pub mod verifier;

pub use error::{Result, SimError};
