use crate::{
    common::{
        constants::{
            release_label_selector, POD_RUNNING_PHASE, READINESS_POLL_INTERVAL, READINESS_TIMEOUT,
        },
        error::{NoPodsFound, ReadinessTimeout, Result},
    },
    manifest::ChartEntry,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Name and phase of a Pod.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodPhase {
    pub name: String,
    /// The Pod's .status.phase, if the API server reported one.
    pub phase: Option<String>,
}

impl PodPhase {
    /// Returns true if the Pod is in the Running phase.
    pub fn is_running(&self) -> bool {
        self.phase.as_deref() == Some(POD_RUNNING_PHASE)
    }
}

/// Reports the phases of the Pods matching a label selector.
#[async_trait]
pub trait WorkloadStatus: Send + Sync {
    async fn pod_phases(&self, namespace: &str, label_selector: &str) -> Result<Vec<PodPhase>>;
}

/// Timing of the readiness poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between two checks.
    pub interval: Duration,
    /// Time after which waiting is abandoned.
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: READINESS_POLL_INTERVAL,
            timeout: READINESS_TIMEOUT,
        }
    }
}

/// States of the readiness poll. Everything but Polling is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Ready,
    NoPods,
    TimedOut,
}

impl PollState {
    /// Decides the next state from one observation of the release's Pods. An empty list is a
    /// hard failure and is never retried.
    pub fn observe(pods: &[PodPhase], elapsed: Duration, timeout: Duration) -> Self {
        if pods.is_empty() {
            return PollState::NoPods;
        }
        if pods.iter().all(PodPhase::is_running) {
            return PollState::Ready;
        }
        if elapsed > timeout {
            return PollState::TimedOut;
        }
        PollState::Polling
    }
}

/// Waits until every Pod labelled with the entry's release name is Running.
pub async fn wait_for_release_ready<W>(
    workloads: &W,
    entry: &ChartEntry,
    settings: &PollSettings,
) -> Result<()>
where
    W: WorkloadStatus + ?Sized,
{
    let label = release_label_selector(entry.release_name.as_str());
    let namespace = entry.namespace.as_str();
    info!(
        release = %entry.release_name,
        %namespace,
        %label,
        "Waiting for release Pods to be Running"
    );

    let started = Instant::now();
    loop {
        let pods = workloads.pod_phases(namespace, label.as_str()).await?;

        match PollState::observe(pods.as_slice(), started.elapsed(), settings.timeout) {
            PollState::Ready => {
                info!(
                    release = %entry.release_name,
                    pods = pods.len(),
                    "All release Pods are Running"
                );
                return Ok(());
            }
            PollState::NoPods => {
                return NoPodsFound {
                    release_name: entry.release_name.clone(),
                    namespace: entry.namespace.clone(),
                    label,
                }
                .fail();
            }
            PollState::TimedOut => {
                return ReadinessTimeout {
                    release_name: entry.release_name.clone(),
                    namespace: entry.namespace.clone(),
                    timeout: settings.timeout,
                }
                .fail();
            }
            PollState::Polling => {
                let pending: Vec<&str> = pods
                    .iter()
                    .filter(|pod| !pod.is_running())
                    .map(|pod| pod.name.as_str())
                    .collect();
                debug!(
                    release = %entry.release_name,
                    ?pending,
                    "Release Pods are not Running yet"
                );
                sleep(settings.interval).await;
            }
        }
    }
}
