//! Structural validation for generated populations.
//!
//! Checks a workload population before it is written to disk. Detects:
//! - Duplicate workload names
//! - Rules with an empty value set
//! - Pod rules targeting a workload outside the population
//! - Zero-replica workloads
//!
//! All problems are collected rather than stopping at the first one.

use crate::models::{RuleKind, Workload};
use std::collections::HashSet;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two workloads share the same name.
    DuplicateName,
    /// A rule has no values and would serialize to a degenerate clause.
    EmptyRule,
    /// A pod rule names a workload that is not part of the population.
    UnknownTarget,
    /// A workload asks for zero replicas.
    ZeroReplicas,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a generated population.
///
/// Checks:
/// 1. No duplicate workload names
/// 2. Every workload has at least one replica
/// 3. No rule in any category has an empty value set
/// 4. Every require/exclude value names a workload in the population
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_population(workloads: &[Workload]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut names = HashSet::new();
    for w in workloads {
        if !names.insert(w.name.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateName,
                format!("Duplicate workload name: {}", w.name),
            ));
        }
        if w.replicas == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::ZeroReplicas,
                format!("Workload '{}' has zero replicas", w.name),
            ));
        }
    }

    for w in workloads {
        for kind in [RuleKind::Require, RuleKind::Exclude, RuleKind::Node] {
            for (idx, rule) in w.rules(kind).iter().enumerate() {
                if rule.is_empty() {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::EmptyRule,
                        format!("Workload '{}' {:?} rule #{} has no values", w.name, kind, idx),
                    ));
                }
                if kind == RuleKind::Node {
                    continue;
                }
                for target in &rule.values {
                    if !names.contains(target.as_str()) {
                        errors.push(ValidationError::new(
                            ValidationErrorKind::UnknownTarget,
                            format!(
                                "Workload '{}' references unknown workload '{}'",
                                w.name, target
                            ),
                        ));
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Operator, Rule};

    fn sample_population() -> Vec<Workload> {
        vec![
            Workload::new("app1")
                .with_replicas(2)
                .with_require(Rule::app(Operator::Include).with_value("app2")),
            Workload::new("app2")
                .with_exclude(Rule::app(Operator::Exclude).with_value("app1"))
                .with_node_rule(Rule::new("tag1", Operator::Include).with_value("val3")),
        ]
    }

    #[test]
    fn test_valid_population() {
        assert!(validate_population(&sample_population()).is_ok());
    }

    #[test]
    fn test_duplicate_name() {
        let population = vec![Workload::new("app1"), Workload::new("app1")];
        let errors = validate_population(&population).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateName));
    }

    #[test]
    fn test_empty_rule() {
        let population = vec![Workload::new("app1").with_exclude(Rule::app(Operator::Include))];
        let errors = validate_population(&population).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::EmptyRule);
    }

    #[test]
    fn test_unknown_target() {
        let population =
            vec![Workload::new("app1").with_require(Rule::app(Operator::Include).with_value("app7"))];
        let errors = validate_population(&population).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownTarget && e.message.contains("app7")));
    }

    #[test]
    fn test_node_values_are_not_targets() {
        // Node rule values are tag values, not workload names
        let population =
            vec![Workload::new("app1").with_node_rule(Rule::new("tag2", Operator::Exclude).with_value("val1"))];
        assert!(validate_population(&population).is_ok());
    }

    #[test]
    fn test_multiple_errors() {
        let population = vec![
            Workload::new("app1").with_replicas(0),
            Workload::new("app2").with_require(Rule::app(Operator::Include)),
        ];
        let errors = validate_population(&population).unwrap_err();
        assert!(errors.len() >= 2);
    }
}
