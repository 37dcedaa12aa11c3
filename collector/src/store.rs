//! Durable-in-spirit storage for reports, alerts, and webhook configs. Backed by
//! in-memory maps here; swapping in a real database means reimplementing these
//! trait methods.

use dashmap::DashMap;
use sentinel_types::{Alert, AgentReport, ReportId, ReportStatus, UserId, WebhookConfig, WebhookEvent};

#[derive(Default)]
pub struct ReportStore {
    reports: DashMap<ReportId, AgentReport>,
}

impl ReportStore {
    pub fn insert(&self, report: AgentReport) {
        self.reports.insert(report.id.clone(), report);
    }

    /// Rewrites every report belonging to `validator_id` whose id is in `report_ids`
    /// to `status`, setting `consensus` as directed. Used by the aggregator's
    /// quorum-reached and cancellation transitions, which must leave every report
    /// attached to a terminated window with a terminal status.
    pub fn rewrite_statuses(&self, report_ids: &[ReportId], status: ReportStatus, consensus: bool) {
        for id in report_ids {
            if let Some(mut report) = self.reports.get_mut(id) {
                report.status = status;
                report.consensus = consensus;
            }
        }
    }

    /// Looks up a single report by id. Used by tests asserting on a report's
    /// terminal status; the HTTP surface never needs to read a report back.
    pub fn get(&self, id: &ReportId) -> Option<AgentReport> {
        self.reports.get(id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn all(&self) -> Vec<AgentReport> {
        self.reports.iter().map(|entry| entry.clone()).collect()
    }
}

#[derive(Default)]
pub struct AlertStore {
    alerts: DashMap<sentinel_types::AlertId, Alert>,
}

impl AlertStore {
    pub fn insert(&self, alert: Alert) {
        self.alerts.insert(alert.id.clone(), alert);
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn all(&self) -> Vec<Alert> {
        self.alerts.iter().map(|entry| entry.clone()).collect()
    }
}

#[derive(Default)]
pub struct WebhookConfigStore {
    configs: DashMap<sentinel_types::WebhookConfigId, WebhookConfig>,
}

impl WebhookConfigStore {
    pub fn insert(&self, config: WebhookConfig) {
        self.configs.insert(config.id.clone(), config);
    }

    /// Active configs for `user_id` subscribed to `event`.
    pub fn active_for_user_event(&self, user_id: &UserId, event: WebhookEvent) -> Vec<WebhookConfig> {
        self.configs
            .iter()
            .filter(|entry| &entry.user_id == user_id && entry.subscribes_to(event))
            .map(|entry| entry.clone())
            .collect()
    }

    /// Looks up one config by id, regardless of its active/subscription state.
    /// Used by the test-delivery endpoint, which should reach a config even if
    /// it isn't currently subscribed to anything.
    pub fn get(&self, id: &sentinel_types::WebhookConfigId) -> Option<WebhookConfig> {
        self.configs.get(id).map(|entry| entry.clone())
    }
}
