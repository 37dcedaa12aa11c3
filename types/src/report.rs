use serde::{Deserialize, Serialize};

use crate::{ids::ReportId, status::ReportStatus, AgentId, ValidatorId};

/// A persisted record of one agent's observation of one validator. Status is
/// monotonic per consensus window: an `UNHEALTHY` report may later be rewritten to
/// `CONSENSUS_REACHED` (on quorum) or `CONSENSUS_FAILED` (on cancellation or aging),
/// but never back to `HEALTHY`/`UNHEALTHY`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReport {
    pub id: ReportId,
    pub agent_id: AgentId,
    pub validator_id: ValidatorId,
    pub status: ReportStatus,
    pub message: Option<String>,
    pub consensus: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
}

impl AgentReport {
    pub fn new(agent_id: AgentId, validator_id: ValidatorId, status: ReportStatus, message: Option<String>) -> Self {
        Self {
            id: ReportId::new(),
            agent_id,
            validator_id,
            status,
            message,
            consensus: false,
            created_at: time::OffsetDateTime::now_utc(),
        }
    }
}

/// The body of `POST /api/report`. Distinct from [`AgentReport`]: this is what
/// crosses the wire before the collector assigns an id and a `createdAt`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSubmission {
    pub agent_id: AgentId,
    pub agent_api_key: String,
    pub validator_id: ValidatorId,
    pub status: ReportStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}
