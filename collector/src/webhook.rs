//! Webhook dispatcher: concurrent, mutually independent HTTP delivery to
//! every active subscriber of an event.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use sentinel_types::{UserId, WebhookConfig, WebhookEvent};
use serde_json::json;
use tracing::{debug, warn};

use crate::store::WebhookConfigStore;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "Sentinel-Webhook/1.0";

/// The narrow `(userId, eventName, payload) -> ()` capability spec.md §9 asks the
/// aggregator to depend on, instead of the concrete HTTP dispatcher. Lets tests
/// substitute a fake that records dispatches without making real requests.
#[async_trait::async_trait]
pub trait WebhookCapability: Send + Sync {
    async fn dispatch(&self, user_id: &UserId, event: WebhookEvent, payload: serde_json::Value);
}

pub struct WebhookDispatcher {
    client: reqwest::Client,
    inflight: AtomicU64,
}

impl WebhookDispatcher {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new(), inflight: AtomicU64::new(0) }
    }

    /// `(userId, eventName, payload)` → fans out to every active, subscribed
    /// config concurrently; one delivery's failure never affects another's.
    pub async fn dispatch(&self, store: &WebhookConfigStore, user_id: &UserId, event: WebhookEvent, payload: serde_json::Value) {
        let configs = store.active_for_user_event(user_id, event);
        if configs.is_empty() {
            return;
        }

        let Some(body_bytes) = self.encode_body(event, payload) else { return };
        let deliveries = configs.into_iter().map(|config| self.deliver(config, body_bytes.clone()));
        futures::future::join_all(deliveries).await;
    }

    /// Sends a single `webhook.test` delivery directly to `config`, bypassing the
    /// event-subscription filter — used by the `/api/webhooks/:id/test` endpoint
    /// so a user can verify an endpoint is reachable before relying on it.
    pub async fn dispatch_test(&self, config: WebhookConfig) {
        let payload = json!({ "webhookId": config.id, "message": "this is a test delivery from Sentinel" });
        if let Some(body) = self.encode_body(WebhookEvent::WebhookTest, payload) {
            self.deliver(config, body).await;
        }
    }

    fn encode_body(&self, event: WebhookEvent, payload: serde_json::Value) -> Option<Vec<u8>> {
        let body = json!({
            "event": event.as_str(),
            "timestamp": time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_default(),
            "data": payload,
        });
        match serde_json::to_vec(&body) {
            Ok(bytes) => Some(bytes),
            Err(error) => {
                warn!(%error, "failed to serialize webhook body");
                None
            }
        }
    }

    async fn deliver(&self, config: WebhookConfig, body: Vec<u8>) {
        let inflight = self.inflight.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::gauge!(sentinel_metrics::names::webhooks::INFLIGHT_DELIVERIES, inflight as f64);

        let mut request = self
            .client
            .post(&config.url)
            .timeout(WEBHOOK_TIMEOUT)
            .header("Content-Type", "application/json")
            .header("Content-Length", body.len())
            .header("User-Agent", USER_AGENT);

        if let Some(secret) = &config.secret {
            let signature = sentinel_credentials::sign(&body, secret);
            // The raw-secret header is a legacy anti-pattern; this build drops it
            // and signs with HMAC alone.
            request = request.header("X-Sentinel-Signature", signature);
        }

        let outcome = request.body(body).send().await;

        let inflight = self.inflight.fetch_sub(1, Ordering::Relaxed) - 1;
        metrics::gauge!(sentinel_metrics::names::webhooks::INFLIGHT_DELIVERIES, inflight as f64);

        match outcome {
            Ok(response) if response.status().is_success() => {
                debug!(webhook_id = %config.id, "webhook delivered");
                metrics::increment_counter!(
                    sentinel_metrics::names::webhooks::DELIVERED,
                    sentinel_metrics::names::webhooks::labels::STATUS => "success"
                );
            }
            Ok(response) => {
                warn!(webhook_id = %config.id, status = %response.status(), "webhook delivery failed");
                metrics::increment_counter!(
                    sentinel_metrics::names::webhooks::DELIVERED,
                    sentinel_metrics::names::webhooks::labels::STATUS => "failure"
                );
            }
            Err(error) => {
                warn!(webhook_id = %config.id, %error, "webhook delivery errored");
                metrics::increment_counter!(
                    sentinel_metrics::names::webhooks::DELIVERED,
                    sentinel_metrics::names::webhooks::labels::STATUS => "failure"
                );
            }
        }
    }
}

impl Default for WebhookDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Binds a [`WebhookDispatcher`] to one [`WebhookConfigStore`] so the pair can be
/// handed to the aggregator as a single `WebhookCapability` — the dispatcher itself
/// stays store-agnostic, since `/api/webhooks/:id/test` dispatches against one
/// config looked up directly, not the store's subscription filter.
pub struct BoundWebhookDispatcher {
    dispatcher: Arc<WebhookDispatcher>,
    configs: Arc<WebhookConfigStore>,
}

impl BoundWebhookDispatcher {
    pub fn new(dispatcher: Arc<WebhookDispatcher>, configs: Arc<WebhookConfigStore>) -> Self {
        Self { dispatcher, configs }
    }
}

#[async_trait::async_trait]
impl WebhookCapability for BoundWebhookDispatcher {
    async fn dispatch(&self, user_id: &UserId, event: WebhookEvent, payload: serde_json::Value) {
        self.dispatcher.dispatch(&self.configs, user_id, event, payload).await;
    }
}
