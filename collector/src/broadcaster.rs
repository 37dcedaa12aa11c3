//! Broadcaster: a set of observer WebSocket sessions, fanned out to with
//! best-effort, no-queueing delivery.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use sentinel_types::{BroadcastEnvelope, BroadcastEventType};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::trace;

/// Bound per-session mailbox. A session that can't keep up is evicted rather than
/// allowed to pile up an unbounded backlog.
const SESSION_MAILBOX_CAPACITY: usize = 32;

pub type ClientId = u64;

/// The narrow `(validatorId, status, extra) -> ()`-shaped capability spec.md §9
/// asks the aggregator to depend on, instead of the whole observer-session
/// registry. Covers the three broadcast shapes the aggregator itself emits;
/// `send_welcome`/`register`/`deregister` stay on the concrete [`Broadcaster`]
/// since they belong to the WebSocket route, not the aggregator.
pub trait StatusBroadcast: Send + Sync {
    fn send_validator_update(&self, validator_id: &str, status: &str, extra: serde_json::Value);
    fn send_alert_notification(&self, alert: &sentinel_types::Alert);
    fn send_consensus_update(&self, validator_id: &str, total_reports: usize, unhealthy_reports: usize, threshold: usize, consensus_reached: bool);
}

#[derive(Default)]
pub struct Broadcaster {
    sessions: DashMap<ClientId, mpsc::Sender<axum::extract::ws::Message>>,
    next_client_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new observer session and returns its id and mailbox receiver;
    /// the caller's websocket task should forward everything it receives to the
    /// socket and drop the registration on disconnect.
    pub fn register(&self) -> (ClientId, mpsc::Receiver<axum::extract::ws::Message>) {
        let client_id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SESSION_MAILBOX_CAPACITY);
        self.sessions.insert(client_id, tx);
        (client_id, rx)
    }

    pub fn deregister(&self, client_id: ClientId) {
        self.sessions.remove(&client_id);
    }

    /// Sends `{type: welcome, data: {clientId}}` to exactly the new session.
    pub fn send_welcome(&self, client_id: ClientId) {
        let envelope = BroadcastEnvelope::new(BroadcastEventType::Welcome, json!({ "clientId": client_id }));
        self.send_to(client_id, &envelope);
    }

    pub fn send_validator_update(&self, validator_id: &str, status: &str, extra: serde_json::Value) {
        let mut data = json!({ "validatorId": validator_id, "status": status });
        merge(&mut data, extra);
        self.broadcast(BroadcastEnvelope::new(BroadcastEventType::ValidatorUpdate, data));
    }

    pub fn send_alert_notification(&self, alert: &sentinel_types::Alert) {
        let data = serde_json::to_value(alert).unwrap_or(serde_json::Value::Null);
        self.broadcast(BroadcastEnvelope::new(BroadcastEventType::Alert, data));
    }

    pub fn send_consensus_update(&self, validator_id: &str, total_reports: usize, unhealthy_reports: usize, threshold: usize, consensus_reached: bool) {
        let data = json!({
            "validatorId": validator_id,
            "totalReports": total_reports,
            "unhealthyReports": unhealthy_reports,
            "threshold": threshold,
            "consensusReached": consensus_reached,
        });
        self.broadcast(BroadcastEnvelope::new(BroadcastEventType::ConsensusUpdate, data));
    }

    /// Sends `envelope` to every currently connected session. Best-effort: a
    /// session whose mailbox is full or whose receiver has dropped is skipped and
    /// the message is simply lost for it.
    pub fn broadcast(&self, envelope: BroadcastEnvelope) {
        let text = match serde_json::to_string(&envelope) {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(%error, "failed to serialize broadcast envelope");
                return;
            }
        };
        let message = axum::extract::ws::Message::Text(text);
        for entry in self.sessions.iter() {
            if entry.value().try_send(message.clone()).is_err() {
                trace!(client_id = *entry.key(), "dropped broadcast to slow or closed session");
            }
        }
    }

    fn send_to(&self, client_id: ClientId, envelope: &BroadcastEnvelope) {
        if let Some(sender) = self.sessions.get(&client_id) {
            if let Ok(text) = serde_json::to_string(envelope) {
                let _ = sender.try_send(axum::extract::ws::Message::Text(text));
            }
        }
    }

    pub fn connected_sessions(&self) -> usize {
        self.sessions.len()
    }
}

impl StatusBroadcast for Broadcaster {
    fn send_validator_update(&self, validator_id: &str, status: &str, extra: serde_json::Value) {
        Broadcaster::send_validator_update(self, validator_id, status, extra);
    }

    fn send_alert_notification(&self, alert: &sentinel_types::Alert) {
        Broadcaster::send_alert_notification(self, alert);
    }

    fn send_consensus_update(&self, validator_id: &str, total_reports: usize, unhealthy_reports: usize, threshold: usize, consensus_reached: bool) {
        Broadcaster::send_consensus_update(self, validator_id, total_reports, unhealthy_reports, threshold, consensus_reached);
    }
}

fn merge(base: &mut serde_json::Value, extra: serde_json::Value) {
    if let (Some(base_obj), serde_json::Value::Object(extra_obj)) = (base.as_object_mut(), extra) {
        base_obj.extend(extra_obj);
    }
}
