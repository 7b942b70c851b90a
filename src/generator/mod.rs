//! Randomized constraint-workload generation.
//!
//! Builds a population of `N - 1` workloads (`app1 .. app{N-1}`), each
//! with Poisson-distributed numbers of require, exclude and node rules,
//! and writes one Deployment manifest per workload.
//!
//! # Algorithm
//!
//! For each workload, in order:
//! 1. Draw a replica count in `[1, max_replicas)`.
//! 2. Draw the number of require rules; per rule draw the operator, then
//!    a Poisson number of target names `app{uniform(1, N)}`, deduplicated.
//! 3. Same for exclude rules.
//! 4. Same for node rules, over the `tag{k}` / `val{v}` vocabulary.
//! 5. Drop rules whose value set is empty.
//!
//! The draw order is fixed, so one seed always yields one population.

mod manifest;

pub use manifest::{deployment_for, render_yaml, PAUSE_IMAGE};

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::error::{Result, SimError};
use crate::models::{Operator, Rule, RuleKind, Workload};
use crate::sampler::ConstraintSampler;
use crate::validation::validate_population;

/// Generates workload populations from a sampler.
#[derive(Debug)]
pub struct WorkloadGenerator<'a> {
    config: GeneratorConfig,
    sampler: &'a mut ConstraintSampler,
}

impl<'a> WorkloadGenerator<'a> {
    /// Creates a generator drawing from `sampler`.
    pub fn new(config: GeneratorConfig, sampler: &'a mut ConstraintSampler) -> Self {
        Self { config, sampler }
    }

    /// Generates `population - 1` workloads with empty rules pruned.
    pub fn generate(&mut self) -> Vec<Workload> {
        let n = self.config.population;
        let mut workloads = Vec::with_capacity(n.saturating_sub(1) as usize);
        let mut pruned = 0;

        for i in 1..n {
            let mut workload = self.sample_workload(format!("app{i}"));
            pruned += workload.prune_empty_rules();
            workloads.push(workload);
        }

        debug!(workloads = workloads.len(), pruned, "Population sampled");
        workloads
    }

    fn sample_workload(&mut self, name: String) -> Workload {
        let replicas = self.sampler.uniform(1, self.config.replica_limit());
        let mut workload = Workload::new(name).with_replicas(replicas);

        workload.requires = self.sample_pod_rules(
            self.config.mean_require_rules,
            self.config.mean_require_values,
        );
        workload.excludes = self.sample_pod_rules(
            self.config.mean_exclude_rules,
            self.config.mean_exclude_values,
        );
        workload.node_rules = self.sample_node_rules();
        workload
    }

    fn sample_operator(&mut self, inverse_percent: u32) -> Operator {
        if self.sampler.keep_unless(inverse_percent) {
            Operator::Include
        } else {
            Operator::Exclude
        }
    }

    fn sample_pod_rules(&mut self, mean_rules: f64, mean_values: f64) -> Vec<Rule> {
        let count = self.sampler.poisson_count(mean_rules);
        (0..count)
            .map(|_| {
                let operator = self.sample_operator(self.config.inverse_percent);
                let mut rule = Rule::app(operator);
                for _ in 0..self.sampler.poisson_count(mean_values) {
                    let target = self.sampler.uniform(1, self.config.population);
                    rule.insert_value(format!("app{target}"));
                }
                rule
            })
            .collect()
    }

    fn sample_node_rules(&mut self) -> Vec<Rule> {
        let vocabulary = self.config.vocabulary;
        let count = self.sampler.poisson_count(self.config.mean_node_rules);
        (0..count)
            .map(|_| {
                let key = format!("tag{}", self.sampler.uniform(1, vocabulary.tag_types));
                let operator = self.sample_operator(self.config.node_inverse_percent);
                let mut rule = Rule::new(key, operator);
                for _ in 0..self.sampler.poisson_count(self.config.mean_node_values) {
                    let value = self.sampler.uniform(1, vocabulary.tag_values);
                    rule.insert_value(format!("val{value}"));
                }
                rule
            })
            .collect()
    }
}

/// Summary of a written population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    /// Manifest files written, in population order.
    pub files: Vec<PathBuf>,
    /// Workloads with at least one require rule.
    pub with_requires: usize,
    /// Workloads with at least one exclude rule.
    pub with_excludes: usize,
    /// Workloads with at least one node rule.
    pub with_node_rules: usize,
}

/// Validates `workloads` and replaces the contents of `dir` with their manifests.
///
/// Everything already in `dir` is removed first, so manifests from an
/// earlier population never survive into this one.
pub fn write_population(
    workloads: &[Workload],
    dir: &Path,
    node_affinity: bool,
) -> Result<GenerationReport> {
    validate_population(workloads).map_err(SimError::InvalidPopulation)?;

    // Render everything before touching the directory
    let rendered = workloads
        .iter()
        .map(|w| Ok((w.name.as_str(), render_yaml(w, node_affinity)?)))
        .collect::<Result<Vec<_>>>()?;

    clear_dir(dir)?;

    let mut files = Vec::with_capacity(rendered.len());
    for (name, yaml) in rendered {
        let path = dir.join(format!("{name}.yaml"));
        fs::write(&path, yaml)?;
        files.push(path);
    }

    let count = |kind: RuleKind| workloads.iter().filter(|w| !w.rules(kind).is_empty()).count();
    let report = GenerationReport {
        files,
        with_requires: count(RuleKind::Require),
        with_excludes: count(RuleKind::Exclude),
        with_node_rules: count(RuleKind::Node),
    };

    info!(
        dir = %dir.display(),
        manifests = report.files.len(),
        with_requires = report.with_requires,
        with_excludes = report.with_excludes,
        with_node_rules = report.with_node_rules,
        node_affinity,
        "Population written"
    );
    Ok(report)
}

/// Generates a population from `config` and writes it to `dir`.
pub fn generate_to_dir(
    config: &GeneratorConfig,
    sampler: &mut ConstraintSampler,
    dir: &Path,
) -> Result<GenerationReport> {
    config.check()?;
    let workloads = WorkloadGenerator::new(config.clone(), sampler).generate();
    write_population(&workloads, dir, config.enable_node_affinity)
}

fn clear_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
