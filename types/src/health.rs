use serde::{Deserialize, Serialize};

use crate::{status::HealthStatus, ValidatorId};

/// The output of a single probe cycle. Produced by the probe, consumed by the
/// agent consensus responder and the reporter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub validator_id: ValidatorId,
    pub status: HealthStatus,
    /// Wall-clock duration of the probe cycle, measured from its start, not per
    /// individual attempt.
    pub response_time_ms: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: time::OffsetDateTime,
    pub error: Option<String>,
    pub beacon_block_height: Option<u64>,
}

impl HealthCheckResult {
    pub fn healthy(validator_id: ValidatorId, response_time_ms: u64, beacon_block_height: Option<u64>) -> Self {
        Self {
            validator_id,
            status: HealthStatus::Healthy,
            response_time_ms,
            timestamp: time::OffsetDateTime::now_utc(),
            error: None,
            beacon_block_height,
        }
    }

    pub fn unhealthy(validator_id: ValidatorId, response_time_ms: u64, error: String) -> Self {
        Self {
            validator_id,
            status: HealthStatus::Unhealthy,
            response_time_ms,
            timestamp: time::OffsetDateTime::now_utc(),
            error: Some(error),
            beacon_block_height: None,
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.status, HealthStatus::Healthy)
    }
}
