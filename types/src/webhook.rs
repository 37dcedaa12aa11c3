use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{ids::WebhookConfigId, UserId};

/// Events the webhook dispatcher knows how to emit. `validator.healthy`,
/// `validator.consensus_reached`, `validator.consensus_failed`, `alert.*` and
/// `agent.*` are reserved for future use and are deliberately absent from this
/// enum's emitted set; they are not dispatched by this core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEvent {
    #[serde(rename = "validator.unhealthy")]
    ValidatorUnhealthy,
    #[serde(rename = "webhook.test")]
    WebhookTest,
}

impl WebhookEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidatorUnhealthy => "validator.unhealthy",
            Self::WebhookTest => "webhook.test",
        }
    }
}

/// A user-configured HTTP sink. `events` is the subscription filter: a config
/// only receives dispatches for event names present in this set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    pub id: WebhookConfigId,
    pub user_id: UserId,
    pub url: String,
    pub secret: Option<String>,
    pub events: HashSet<String>,
    pub is_active: bool,
}

impl WebhookConfig {
    pub fn subscribes_to(&self, event: WebhookEvent) -> bool {
        self.is_active && self.events.contains(event.as_str())
    }
}
