//! Waiting for the scheduler to converge.
//!
//! The default is a flat sleep. The quiescent strategy samples pod
//! state and returns once nothing has changed for a quiet window, with
//! an upper bound on the total wait.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::cluster::ClusterApi;
use crate::config::{SettleConfig, SettleMode};
use crate::error::Result;

/// How to wait after submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleStrategy {
    /// Sleep for a fixed duration without observing the cluster.
    Fixed(Duration),
    /// Sample pod state until it stops changing.
    Quiescent {
        /// Required time without any change.
        quiet_window: Duration,
        /// Sampling interval.
        poll_interval: Duration,
        /// Upper bound on the whole wait.
        timeout: Duration,
    },
}

impl From<&SettleConfig> for SettleStrategy {
    fn from(config: &SettleConfig) -> Self {
        match config.mode {
            SettleMode::Fixed => SettleStrategy::Fixed(config.delay),
            SettleMode::Quiescent => SettleStrategy::Quiescent {
                quiet_window: config.quiet_window,
                poll_interval: config.poll_interval,
                timeout: config.timeout,
            },
        }
    }
}

/// How a settle wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Fixed sleep completed.
    Slept(Duration),
    /// Pod state was stable for the quiet window.
    Converged(Duration),
    /// The upper bound was reached while pods were still changing.
    TimedOut(Duration),
}

type PodState = BTreeSet<(String, Option<String>, Option<String>)>;

async fn snapshot<C: ClusterApi + ?Sized>(cluster: &C) -> Result<PodState> {
    Ok(cluster
        .list_pods()
        .await?
        .into_iter()
        .map(|p| (p.name, p.phase, p.node_name))
        .collect())
}

/// Waits according to `strategy`.
///
/// Reaching the quiescent timeout is not an error; polling decides
/// what the final state is.
pub async fn settle<C: ClusterApi + ?Sized>(
    cluster: &C,
    strategy: &SettleStrategy,
) -> Result<SettleOutcome> {
    match *strategy {
        SettleStrategy::Fixed(delay) => {
            info!(delay_secs = delay.as_secs(), "Waiting for scheduling");
            sleep(delay).await;
            Ok(SettleOutcome::Slept(delay))
        }
        SettleStrategy::Quiescent {
            quiet_window,
            poll_interval,
            timeout,
        } => {
            info!(
                quiet_window_secs = quiet_window.as_secs(),
                timeout_secs = timeout.as_secs(),
                "Waiting for pod phases to settle"
            );
            let start = Instant::now();
            let mut last = snapshot(cluster).await?;
            let mut last_change = start;

            loop {
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    warn!(elapsed_secs = elapsed.as_secs(), "Pods still changing at settle timeout");
                    return Ok(SettleOutcome::TimedOut(elapsed));
                }
                sleep(poll_interval).await;

                let current = snapshot(cluster).await?;
                if current != last {
                    debug!(pods = current.len(), "Pod state changed");
                    last = current;
                    last_change = Instant::now();
                } else if last_change.elapsed() >= quiet_window {
                    let elapsed = start.elapsed();
                    info!(elapsed_secs = elapsed.as_secs(), pods = last.len(), "Scheduling settled");
                    return Ok(SettleOutcome::Converged(elapsed));
                }
            }
        }
    }
}
