//! Reporter: turns probe cycles into `POST /api/report` calls, driven by
//! status-flip / quorum rules.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use sentinel_types::{HealthCheckResult, HealthStatus, ReportStatus, ReportSubmission};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::consensus::ConsensusCoordinator;

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("collector rejected the report: {status}")]
    Rejected { status: reqwest::StatusCode },
    #[error("transport error talking to the collector: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct Reporter {
    client: reqwest::Client,
    backend_api_url: String,
    agent_id: String,
    agent_api_key: String,
    validator_id: String,
    max_retries: u32,
    request_timeout: Duration,
    consensus_timeout: Duration,
    consensus_threshold: usize,
    coordinator: Arc<ConsensusCoordinator>,
    /// `s_prev`: the last status successfully reported to the collector. `None`
    /// initially, meaning undefined until the first report goes out.
    last_reported: Mutex<Option<HealthStatus>>,
}

impl Reporter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        backend_api_url: String,
        agent_id: String,
        agent_api_key: String,
        validator_id: String,
        max_retries: u32,
        request_timeout: Duration,
        consensus_timeout: Duration,
        consensus_threshold: usize,
        coordinator: Arc<ConsensusCoordinator>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            backend_api_url,
            agent_id,
            agent_api_key,
            validator_id,
            max_retries,
            request_timeout,
            consensus_timeout,
            consensus_threshold,
            coordinator,
            last_reported: Default::default(),
        }
    }

    /// One reporter cycle, driven by a single probe result.
    pub async fn on_probe_result(&self, result: HealthCheckResult) {
        let s = result.status;
        let s_prev = *self.last_reported.lock().unwrap();

        if s == HealthStatus::Unhealthy {
            if self.consensus_threshold > 1 {
                let outcome = self
                    .coordinator
                    .request_consensus(vec![result.clone()], self.consensus_timeout)
                    .await;
                let proceeds = outcome.total_peers == 0 || outcome.quorum_reached(self.consensus_threshold);
                if !proceeds {
                    info!(
                        agree_count = outcome.agree_count,
                        total_peers = outcome.total_peers,
                        "consensus not reached, suppressing unhealthy report"
                    );
                    return;
                }
            } else {
                info!("consensus threshold is 1, self-vote alone reaches quorum, skipping peer RTT");
            }
            let message = result.error.clone().unwrap_or_else(|| "beacon node health check failed".to_string());
            self.submit(ReportStatus::Unhealthy, Some(message)).await;
            return;
        }

        // s == HEALTHY
        if s_prev == Some(HealthStatus::Healthy) {
            return; // suppressed: no change since last successful report
        }
        self.submit(ReportStatus::Healthy, None).await;
    }

    async fn submit(&self, status: ReportStatus, message: Option<String>) {
        let submission = ReportSubmission {
            agent_id: self.agent_id.clone(),
            agent_api_key: self.agent_api_key.clone(),
            validator_id: self.validator_id.clone(),
            status,
            message,
            signature: None,
        };

        for attempt in 0..self.max_retries {
            match self.post_report(&submission).await {
                Ok(()) => {
                    *self.last_reported.lock().unwrap() = Some(match status {
                        ReportStatus::Healthy => HealthStatus::Healthy,
                        _ => HealthStatus::Unhealthy,
                    });
                    return;
                }
                Err(ReporterError::Rejected { status }) => {
                    // Auth/scope/malformed failures are not retried.
                    warn!(%status, "collector rejected report, not retrying");
                    return;
                }
                Err(error) => {
                    let backoff = Duration::from_secs(2u64.saturating_pow(attempt));
                    warn!(%error, attempt, "report submission failed, backing off");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
        error!("report submission exhausted all retries; state left unmutated for the next cycle");
    }

    async fn post_report(&self, submission: &ReportSubmission) -> Result<(), ReporterError> {
        let url = format!("{}/api/report", self.backend_api_url.trim_end_matches('/'));
        let response = self.client.post(&url).timeout(self.request_timeout).json(submission).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ReporterError::Rejected { status: response.status() })
        }
    }
}
