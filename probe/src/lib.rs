//! Timed beacon-node health checks with retry and backoff.
//!
//! One [`BeaconProbe`] is pinned to exactly one validator, same ownership rule as
//! everywhere else in this system. The [`ProbeScheduler`] runs it on a fixed
//! interval and keeps the most recent [`HealthCheckResult`] available for the
//! consensus responder and the reporter to read without re-probing.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use sentinel_types::{HealthCheckResult, ValidatorId};
use serde::Deserialize;
use tokio::{sync::watch, task::JoinHandle, time::Instant};
use tracing::{debug, trace, warn};

/// Default per-request timeout.
pub const DEFAULT_HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
/// Default retry count on 4xx/5xx/transport error before returning unhealthy.
pub const DEFAULT_HEALTH_CHECK_RETRIES: u32 = 3;
/// Fixed delay between retry attempts.
const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug)]
pub struct ProbeConfig {
    pub health_check_timeout: Duration,
    pub health_check_retries: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { health_check_timeout: DEFAULT_HEALTH_CHECK_TIMEOUT, health_check_retries: DEFAULT_HEALTH_CHECK_RETRIES }
    }
}

/// One health-check cycle against a validator's beacon node.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, validator_id: &ValidatorId, beacon_node_url: &str) -> HealthCheckResult;
}

/// Shape of `GET /eth/v1/beacon/blocks/head`'s body; only the slot is read.
#[derive(Deserialize)]
struct BlockHeadResponse {
    data: BlockHeadData,
}

#[derive(Deserialize)]
struct BlockHeadData {
    message: BlockHeadMessage,
}

#[derive(Deserialize)]
struct BlockHeadMessage {
    slot: String,
}

/// Probes `GET <beaconNodeUrl>/eth/v1/node/health`, retrying on failure before
/// giving up and reporting unhealthy.
pub struct BeaconProbe {
    client: reqwest::Client,
    config: ProbeConfig,
}

impl BeaconProbe {
    pub fn new(config: ProbeConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }

    async fn health_once(&self, url: &str) -> Result<(), String> {
        let endpoint = format!("{}/eth/v1/node/health", url.trim_end_matches('/'));
        let response = self
            .client
            .get(&endpoint)
            .timeout(self.config.health_check_timeout)
            .send()
            .await
            .map_err(|error| error.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("beacon node returned {}", response.status()))
        }
    }

    /// Best-effort: a failure here never downgrades an otherwise-healthy result.
    async fn fetch_block_height(&self, url: &str) -> Option<u64> {
        let endpoint = format!("{}/eth/v1/beacon/blocks/head", url.trim_end_matches('/'));
        let half_timeout = self.config.health_check_timeout / 2;
        let response = match self.client.get(&endpoint).timeout(half_timeout).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                trace!(status = %response.status(), "block height fetch returned non-success");
                return None;
            }
            Err(error) => {
                trace!(%error, "block height fetch failed");
                return None;
            }
        };
        match response.json::<BlockHeadResponse>().await {
            Ok(body) => body.data.message.slot.parse().ok(),
            Err(error) => {
                trace!(%error, "block height response did not parse");
                None
            }
        }
    }
}

#[async_trait]
impl Probe for BeaconProbe {
    async fn check(&self, validator_id: &ValidatorId, beacon_node_url: &str) -> HealthCheckResult {
        let start = Instant::now();
        let mut last_error = String::new();

        for attempt in 0..=self.config.health_check_retries {
            match self.health_once(beacon_node_url).await {
                Ok(()) => {
                    let response_time_ms = start.elapsed().as_millis() as u64;
                    let block_height = self.fetch_block_height(beacon_node_url).await;
                    return HealthCheckResult::healthy(validator_id.clone(), response_time_ms, block_height);
                }
                Err(error) => {
                    last_error = error;
                    if attempt < self.config.health_check_retries {
                        debug!(validator_id, attempt, error = %last_error, "health check attempt failed, retrying");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }

        let response_time_ms = start.elapsed().as_millis() as u64;
        HealthCheckResult::unhealthy(validator_id.clone(), response_time_ms, last_error)
    }
}

/// Runs a [`Probe`] on a fixed interval and publishes the latest result: a spawned
/// loop with a shutdown flag checked right after each tick, before a new probe
/// cycle starts. `stop()` only sets the flag, so an in-flight probe always runs
/// to completion; the `JoinHandle` is aborted only as a last resort on `Drop`.
pub struct ProbeScheduler {
    handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
    latest_rx: watch::Receiver<Option<HealthCheckResult>>,
}

impl ProbeScheduler {
    /// Starts probing `beacon_node_url` for `validator_id` every `interval`.
    pub fn start(
        probe: Arc<dyn Probe>,
        validator_id: ValidatorId,
        beacon_node_url: String,
        interval: Duration,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let (latest_tx, latest_rx) = watch::channel(None);

        let task_shutdown = shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if task_shutdown.load(Ordering::Relaxed) {
                    break;
                }
                let cycle_start = Instant::now();
                let result = probe.check(&validator_id, &beacon_node_url).await;
                trace!(validator_id, healthy = result.is_healthy(), "probe cycle complete");
                metrics::gauge!(
                    sentinel_metrics::names::probe::LAST_RESPONSE_TIME_MS,
                    result.response_time_ms as f64,
                    sentinel_metrics::names::probe::labels::VALIDATOR_ID => validator_id.clone()
                );
                metrics::histogram!(
                    sentinel_metrics::names::probe::CYCLE_DURATION_SECS,
                    cycle_start.elapsed().as_secs_f64(),
                    sentinel_metrics::names::probe::labels::VALIDATOR_ID => validator_id.clone()
                );
                if latest_tx.send(Some(result)).is_err() {
                    break;
                }
            }
        });

        Self { handle: parking_lot::Mutex::new(Some(handle)), shutdown, latest_rx }
    }

    /// The most recent result, if the scheduler has completed at least one cycle.
    pub fn latest(&self) -> Option<HealthCheckResult> {
        self.latest_rx.borrow().clone()
    }

    /// A receiver that resolves every time a new result is published; used by
    /// callers that want to react to probe cycles rather than poll [`Self::latest`].
    pub fn subscribe(&self) -> watch::Receiver<Option<HealthCheckResult>> {
        self.latest_rx.clone()
    }

    /// Cancels the next tick. Does not interrupt a probe already in flight — the
    /// spawned task checks the flag right after `ticker.tick().await`, before
    /// starting a new cycle, and lets any in-progress `probe.check(...)` run to
    /// completion.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for ProbeScheduler {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysHealthy;

    #[async_trait]
    impl Probe for AlwaysHealthy {
        async fn check(&self, validator_id: &ValidatorId, _beacon_node_url: &str) -> HealthCheckResult {
            HealthCheckResult::healthy(validator_id.clone(), 5, Some(42))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_publishes_results_on_each_tick() {
        let scheduler = ProbeScheduler::start(
            Arc::new(AlwaysHealthy),
            "validator-1".to_string(),
            "http://localhost:5052".to_string(),
            Duration::from_secs(1),
        );

        let mut rx = scheduler.subscribe();
        rx.changed().await.unwrap();
        let result = rx.borrow().clone().unwrap();
        assert!(result.is_healthy());
        assert_eq!(result.beacon_block_height, Some(42));

        scheduler.stop();
    }

    #[tokio::test]
    async fn unreachable_beacon_node_reports_unhealthy_after_retries() {
        let probe = BeaconProbe::new(ProbeConfig {
            health_check_timeout: Duration::from_millis(200),
            health_check_retries: 1,
        });
        let result = probe.check(&"validator-1".to_string(), "http://127.0.0.1:1").await;
        assert!(!result.is_healthy());
        assert!(result.error.is_some());
    }
}
