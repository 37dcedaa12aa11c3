//! Aggregator: one ConsensusWindow per validator, driving quorum/cancel/age-out
//! transitions.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use sentinel_types::{Alert, AgentReport, ConsensusWindow, ReportStatus, Validator, ValidatorId, WebhookEvent};
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use crate::{broadcaster::StatusBroadcast, store::{AlertStore, ReportStore}, webhook::WebhookCapability};

/// A window is older than this without reaching quorum → AGED_OUT.
const WINDOW_AGE_BOUND: time::Duration = time::Duration::minutes(10);
/// How often the aging sweep runs.
pub const AGING_SWEEP_PERIOD: Duration = Duration::from_secs(5 * 60);

pub struct Aggregator {
    windows: DashMap<ValidatorId, Arc<AsyncMutex<Option<ConsensusWindow>>>>,
    reports: Arc<ReportStore>,
    alerts: Arc<AlertStore>,
    broadcaster: Arc<dyn StatusBroadcast>,
    webhooks: Arc<dyn WebhookCapability>,
}

impl Aggregator {
    pub fn new(
        reports: Arc<ReportStore>,
        alerts: Arc<AlertStore>,
        broadcaster: Arc<dyn StatusBroadcast>,
        webhooks: Arc<dyn WebhookCapability>,
    ) -> Self {
        Self { windows: DashMap::new(), reports, alerts, broadcaster, webhooks }
    }

    fn window_lock(&self, validator_id: &ValidatorId) -> Arc<AsyncMutex<Option<ConsensusWindow>>> {
        self.windows.entry(validator_id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(None))).clone()
    }

    /// Applies one accepted [`AgentReport`] to its validator's window. Report
    /// updates within a window are serialized by the per-validator lock so the
    /// `consensusReached` latch is observed at most once.
    pub async fn handle_report(&self, report: AgentReport, validator: &Validator) {
        let lock = self.window_lock(&report.validator_id);
        let mut guard = lock.lock().await;

        if report.status == ReportStatus::Healthy {
            if let Some(window) = guard.take() {
                self.cancel_window(validator, window).await;
                drop(guard);
                self.record_open_windows();
            }
            return;
        }

        let window = guard.get_or_insert_with(|| ConsensusWindow::new(validator_threshold(validator), report.clone()));
        window.upsert(report.clone());

        let total_reports = window.reports.len();
        let unhealthy_reports = window.unhealthy_count();
        let threshold = window.threshold;

        if !window.consensus_reached && window.has_reached_quorum() {
            window.consensus_reached = true;
            let report_ids: Vec<_> = window.reports.iter().map(|r| r.id.clone()).collect();
            let window_owned = guard.take().expect("window present, just mutated above");
            drop(guard);
            self.reach_quorum(validator, window_owned, report_ids).await;
            self.record_open_windows();
            return;
        }

        drop(guard);
        self.record_open_windows();
        self.broadcaster.send_consensus_update(&report.validator_id, total_reports, unhealthy_reports, threshold, false);
    }

    async fn reach_quorum(&self, validator: &Validator, window: ConsensusWindow, report_ids: Vec<sentinel_types::ReportId>) {
        let report_count = window.reports.len();
        let alert = Alert::quorum_reached(validator.id.clone(), validator.user_id.clone(), &validator.name, report_count);

        self.alerts.insert(alert.clone());
        self.reports.rewrite_statuses(&report_ids, ReportStatus::ConsensusReached, true);

        info!(validator_id = %validator.id, report_count, alert_id = %alert.id, "consensus reached, alert created");
        metrics::increment_counter!(
            sentinel_metrics::names::consensus::ALERTS_CREATED,
            sentinel_metrics::names::consensus::labels::VALIDATOR_ID => validator.id.clone()
        );

        self.broadcaster.send_validator_update(
            &validator.id,
            "unhealthy",
            json!({ "alertId": alert.id, "reportCount": report_count }),
        );
        self.broadcaster.send_alert_notification(&alert);

        self.webhooks
            .dispatch(
                &validator.user_id,
                WebhookEvent::ValidatorUnhealthy,
                json!({ "validator": validator, "alert": alert, "consensusData": { "reportCount": report_count, "threshold": window.threshold } }),
            )
            .await;
    }

    async fn cancel_window(&self, validator: &Validator, window: ConsensusWindow) {
        let report_ids: Vec<_> = window.reports.iter().map(|r| r.id.clone()).collect();
        self.reports.rewrite_statuses(&report_ids, ReportStatus::ConsensusFailed, false);
        debug!(validator_id = %validator.id, "window cancelled by healthy report");
        metrics::increment_counter!(
            sentinel_metrics::names::consensus::WINDOWS_CANCELLED,
            sentinel_metrics::names::consensus::labels::VALIDATOR_ID => validator.id.clone()
        );
        self.broadcaster.send_validator_update(&validator.id, "healthy", json!({ "consensusCancelled": true }));
    }

    /// Background sweep (every 5 minutes): ages out any window whose earliest
    /// report predates the 10-minute bound without reaching quorum. No broadcast.
    pub async fn run_aging_sweep_once(&self) {
        let validator_ids: Vec<_> = self.windows.iter().map(|entry| entry.key().clone()).collect();
        for validator_id in validator_ids {
            let lock = self.window_lock(&validator_id);
            let mut guard = lock.lock().await;
            let Some(window) = guard.as_ref() else { continue };
            if window.consensus_reached {
                continue;
            }
            if window.age() > WINDOW_AGE_BOUND {
                let window = guard.take().unwrap();
                let report_ids: Vec<_> = window.reports.iter().map(|r| r.id.clone()).collect();
                self.reports.rewrite_statuses(&report_ids, ReportStatus::ConsensusFailed, false);
                debug!(%validator_id, "window aged out without reaching quorum");
                metrics::increment_counter!(
                    sentinel_metrics::names::consensus::WINDOWS_AGED_OUT,
                    sentinel_metrics::names::consensus::labels::VALIDATOR_ID => validator_id.clone()
                );
            }
        }
        self.record_open_windows();
    }

    /// Best-effort gauge read: windows currently held by another task are counted
    /// as open, since a lock only stays held for the duration of one synchronous
    /// state transition.
    pub fn open_window_count(&self) -> usize {
        self.windows.iter().filter(|entry| entry.value().try_lock().map(|w| w.is_some()).unwrap_or(true)).count()
    }

    fn record_open_windows(&self) {
        metrics::gauge!(sentinel_metrics::names::consensus::OPEN_WINDOWS, self.open_window_count() as f64);
    }
}

fn validator_threshold(_validator: &Validator) -> usize {
    // Not currently a per-validator field in the data model; the process-wide
    // `consensusThreshold` default (2) applies uniformly.
    DEFAULT_CONSENSUS_THRESHOLD
}

pub const DEFAULT_CONSENSUS_THRESHOLD: usize = 2;

/// Spawns the periodic aging sweep.
pub fn spawn_aging_sweep(aggregator: Arc<Aggregator>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(AGING_SWEEP_PERIOD);
        loop {
            ticker.tick().await;
            aggregator.run_aging_sweep_once().await;
        }
    })
}
