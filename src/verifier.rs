//! Predicted-versus-observed conflict check.
//!
//! The detector predicts which workloads cannot be placed; the deployment
//! run observes which workloads stayed unplaced. The prediction holds when
//! every predicted workload was indeed observed unplaced.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::error::{Result, SimError};

/// Detector report layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Entities the detector could not schedule. The key spelling is
    /// fixed by the detector.
    #[serde(rename = "unscheduable_entities", default)]
    pub entities: Vec<ConflictEntity>,
}

/// One unschedulable entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictEntity {
    /// Detector name, `<namespace>=<workload>_<suffix>`.
    pub name: String,
    /// Conflicting entity names.
    #[serde(default)]
    pub conflicts: Vec<String>,
}

/// Recovers a workload name from a detector entity name.
///
/// Takes the part after the first `=`, then the part before the first `_`.
///
/// # Errors
/// [`SimError::MalformedEntityName`] if the name has no `=`.
pub fn normalize_entity_name(name: &str) -> Result<String> {
    let (_, rest) = name
        .split_once('=')
        .ok_or_else(|| SimError::MalformedEntityName(name.to_owned()))?;
    let workload = rest.split('_').next().unwrap_or(rest);
    Ok(workload.to_owned())
}

/// Loads predicted conflicts. An absent report means nothing was predicted.
pub fn load_predicted(path: &Path) -> Result<BTreeSet<String>> {
    if !path.exists() {
        return Ok(BTreeSet::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    let report: ConflictReport = serde_yaml::from_str(&content)?;
    report
        .entities
        .iter()
        .map(|e| normalize_entity_name(&e.name))
        .collect()
}

/// Loads observed unplaced workloads.
///
/// Entries are reduced to the part before the first `-`, so pod names and
/// workload names are both accepted.
///
/// # Errors
/// [`SimError::MissingArtifact`] if the report does not exist.
pub fn load_observed(path: &Path) -> Result<BTreeSet<String>> {
    if !path.exists() {
        return Err(SimError::MissingArtifact(path.to_path_buf()));
    }
    let entries: Vec<String> = serde_json::from_str(&fs::read_to_string(path)?)?;
    Ok(entries
        .iter()
        .map(|e| e.split('-').next().unwrap_or(e).to_owned())
        .collect())
}

/// Outcome of a subset check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Predicted unplaceable workloads.
    pub predicted: BTreeSet<String>,
    /// Observed unplaced workloads.
    pub observed: BTreeSet<String>,
    /// Predicted but not observed.
    pub missing: BTreeSet<String>,
}

impl Verification {
    /// Whether `predicted ⊆ observed`.
    pub fn holds(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Checks that every predicted conflict was observed.
pub fn verify(predicted: BTreeSet<String>, observed: BTreeSet<String>) -> Verification {
    let missing = predicted.difference(&observed).cloned().collect();
    Verification {
        predicted,
        observed,
        missing,
    }
}
