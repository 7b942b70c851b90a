//! Simulation domain models.
//!
//! Provides the data types shared by the generator, the cluster harness
//! and the orchestrator.
//!
//! # Domain Mappings
//!
//! | affinity-sim | Kubernetes |
//! |--------------|------------|
//! | Workload | Deployment |
//! | Rule (Require) | podAffinity match expression |
//! | Rule (Exclude) | podAntiAffinity match expression |
//! | Rule (Node) | nodeAffinity match expression |
//! | SimulatedNode | kwok fake Node |
//! | ObservedPlacement | pod list snapshot |

mod node;
mod placement;
mod rule;
mod workload;

pub use node::{NodeCapacity, SimulatedNode};
pub use placement::{workload_of_pod, ObservedPlacement, PodObservation, PodPhase, PodRecord};
pub use rule::{Operator, Rule, RuleKind, APP_LABEL, HOSTNAME_TOPOLOGY_KEY};
pub use workload::Workload;
