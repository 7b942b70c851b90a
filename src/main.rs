//! affinity-sim: generate, deploy and verify affinity conflict scenarios.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use affinity_sim::cluster::KubeCluster;
use affinity_sim::config::SimConfig;
use affinity_sim::generator::generate_to_dir;
use affinity_sim::orchestrator::DeploymentOrchestrator;
use affinity_sim::process::{run_command, CommandSpec};
use affinity_sim::sampler::ConstraintSampler;
use affinity_sim::verifier::{load_observed, load_predicted, verify};
use affinity_sim::{Result, SimError};

#[derive(Parser)]
#[command(name = "affinity-sim")]
#[command(about = "Simulate affinity conflicts on a fake Kubernetes cluster")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to affinity-sim.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the workload dataset
    Generate,

    /// Deploy the dataset onto fake nodes and record unplaced workloads
    Deploy {
        /// Observe the current cluster without resetting or submitting
        #[arg(long)]
        skip_setup: bool,
    },

    /// Run the configured conflict detector
    Detect,

    /// Check predicted conflicts against observed unplaced workloads
    Verify,
}

/// Filter used when `RUST_LOG` is unset or empty.
const DEFAULT_LOG_DIRECTIVE: &str = "affinity_sim=info";

/// `RUST_LOG` directives verbatim when given, otherwise crate-scoped info.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(DEFAULT_LOG_DIRECTIVE),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();

    let cli = Cli::parse();

    let result = match SimConfig::load(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Generate => generate(&config),
            Commands::Deploy { skip_setup } => deploy(&config, skip_setup).await,
            Commands::Detect => detect(&config).await,
            Commands::Verify => verify_reports(&config),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn generate(config: &SimConfig) -> Result<bool> {
    let mut sampler = ConstraintSampler::new(config.seed);
    info!(seed = sampler.seed(), population = config.generator.population, "Generating dataset");
    generate_to_dir(&config.generator, &mut sampler, &config.paths.dataset_dir)?;
    Ok(true)
}

async fn deploy(config: &SimConfig, skip_setup: bool) -> Result<bool> {
    let cluster = KubeCluster::connect().await?;
    // Node tags draw from a stream separate from generation
    let mut sampler = ConstraintSampler::new(config.seed);
    let mut orchestrator = DeploymentOrchestrator::new(
        &cluster,
        &mut sampler,
        config.cluster.clone(),
        config.generator.vocabulary,
        config.paths.dataset_dir.clone(),
    );
    let outcome = orchestrator.run(skip_setup).await?;
    outcome.write_reports(
        &config.paths.unplaced_report,
        &config.paths.distribution_report,
    )?;
    println!("Unplaced workloads: {:?}", outcome.unplaced);
    Ok(true)
}

async fn detect(config: &SimConfig) -> Result<bool> {
    let detector = config.detector.as_ref().ok_or_else(|| {
        SimError::InvalidConfig("no [detector] section configured".into())
    })?;
    run_command(&CommandSpec::from(detector), None).await?;
    Ok(true)
}

fn verify_reports(config: &SimConfig) -> Result<bool> {
    let predicted = load_predicted(&config.paths.conflict_report)?;
    let observed = load_observed(&config.paths.unplaced_report)?;
    let verification = verify(predicted, observed);

    println!("Predicted conflicts: {:?}", verification.predicted);
    println!("Observed unplaced:   {:?}", verification.observed);
    if verification.holds() {
        println!("PASS: every predicted conflict was observed");
    } else {
        println!("Predicted but not observed: {:?}", verification.missing);
        println!("FAIL: prediction is not a subset of the observation");
    }
    Ok(verification.holds())
}
