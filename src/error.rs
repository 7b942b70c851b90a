//! Error types for the simulation harness.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::validation::ValidationError;

/// Harness errors.
///
/// Every variant except [`SimError::NoPodsObserved`] is fatal to a run.
#[derive(Error, Debug)]
pub enum SimError {
    /// The generated population failed structural validation.
    #[error("generated population is invalid: {} error(s), first: {}", .0.len(), first_message(.0))]
    InvalidPopulation(Vec<ValidationError>),

    /// A pod listing came back empty while pods were expected.
    #[error("no pods observed in the cluster")]
    NoPodsObserved,

    /// Every polling attempt failed.
    #[error("no successful pod observation after {attempts} attempt(s)")]
    PollingExhausted { attempts: u32 },

    /// A pod reported a phase outside {Pending, Running}.
    #[error("pod {pod} is in unmodeled phase {phase:?}")]
    UnknownPodPhase { pod: String, phase: String },

    /// A spawned command exited unsuccessfully.
    #[error("command {program} failed with exit code {code:?}")]
    CommandFailed { program: String, code: Option<i32> },

    /// A spawned command outlived its timeout and was killed.
    #[error("command {program} timed out after {timeout:?}")]
    CommandTimeout { program: String, timeout: Duration },

    /// A required report file does not exist.
    #[error("required artifact is missing: {}", .0.display())]
    MissingArtifact(PathBuf),

    /// A detector entity name lacks the expected `<prefix>=<workload>` shape.
    #[error("malformed entity name in conflict report: {0}")]
    MalformedEntityName(String),

    /// A manifest cannot be submitted.
    #[error("invalid manifest: {0}")]
    Manifest(String),

    /// Cluster API error.
    #[error(transparent)]
    Kube(#[from] kube::Error),

    /// YAML (de)serialization error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration loaded but holds unusable values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn first_message(errors: &[ValidationError]) -> &str {
    errors.first().map(|e| e.message.as_str()).unwrap_or("none")
}

impl SimError {
    /// Whether the orchestrator may retry after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, SimError::NoPodsObserved)
    }
}

impl From<figment::Error> for SimError {
    fn from(err: figment::Error) -> Self {
        SimError::Config(Box::new(err))
    }
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_only_empty_listing_is_transient() {
        assert!(SimError::NoPodsObserved.is_transient());
        assert!(!SimError::PollingExhausted { attempts: 3 }.is_transient());
        assert!(!SimError::UnknownPodPhase {
            pod: "app1-abc".into(),
            phase: "Failed".into()
        }
        .is_transient());
    }

    #[test]
    fn test_invalid_population_message() {
        let err = SimError::InvalidPopulation(vec![ValidationError {
            kind: ValidationErrorKind::DuplicateName,
            message: "Duplicate workload name: app1".into(),
        }]);
        let msg = err.to_string();
        assert!(msg.contains("1 error(s)"));
        assert!(msg.contains("app1"));
    }
}
