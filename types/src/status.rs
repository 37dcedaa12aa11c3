use serde::{Deserialize, Serialize};

/// The outcome of a single probe cycle or the status carried by an [`crate::AgentReport`].
///
/// `CONSENSUS_REACHED` and `CONSENSUS_FAILED` are produced exclusively by the
/// aggregator; an incoming report from an agent should only ever be `HEALTHY` or
/// `UNHEALTHY`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Healthy,
    Unhealthy,
    ConsensusReached,
    ConsensusFailed,
}

impl ReportStatus {
    /// True for the two statuses an agent may legitimately submit.
    pub fn is_agent_originated(self) -> bool {
        matches!(self, Self::Healthy | Self::Unhealthy)
    }
}

/// The binary result of a beacon-node probe. A strict subset of [`ReportStatus`]
/// used wherever only a health signal (not a terminal consensus outcome) makes sense.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl From<HealthStatus> for ReportStatus {
    fn from(status: HealthStatus) -> Self {
        match status {
            HealthStatus::Healthy => ReportStatus::Healthy,
            HealthStatus::Unhealthy => ReportStatus::Unhealthy,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Lifecycle of an [`crate::Alert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Pending,
    Acknowledged,
    Resolved,
}
