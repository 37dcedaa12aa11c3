//! Shared data model and wire types for the Sentinel health-consensus core.
//!
//! This crate is pure data: no I/O, no storage, no networking. Every other crate in
//! the workspace depends on it so that the wire contract (field names, enum casing,
//! JSON shapes) is defined exactly once.

pub mod alert;
pub mod envelope;
pub mod error;
pub mod health;
pub mod ids;
pub mod peer;
pub mod report;
pub mod status;
pub mod validator;
pub mod webhook;
pub mod window;

pub use alert::Alert;
pub use envelope::{
    BroadcastEnvelope,
    BroadcastEventType,
    ConsensusRequestPayload,
    ConsensusResponsePayload,
    PeerEnvelope,
    PeerHelloPayload,
};
pub use error::ReportValidationError;
pub use health::HealthCheckResult;
pub use ids::{AgentId, AlertId, ConsensusId, ReportId, UserId, ValidatorId, WebhookConfigId};
pub use peer::PeerDescriptor;
pub use report::{AgentReport, ReportSubmission};
pub use status::{AlertStatus, HealthStatus, ReportStatus};
pub use validator::{Agent, Validator};
pub use webhook::{WebhookConfig, WebhookEvent};
pub use window::ConsensusWindow;

/// Validates a [`ReportSubmission`]: all required fields present, and the status
/// one an agent is actually allowed to originate. Does not
/// check authentication — that is the collector's job, since it requires a lookup.
pub fn validate_submission(submission: &ReportSubmission) -> Result<(), ReportValidationError> {
    if submission.agent_id.is_empty() {
        return Err(ReportValidationError::MissingField("agentId"));
    }
    if submission.agent_api_key.is_empty() {
        return Err(ReportValidationError::MissingField("agentApiKey"));
    }
    if submission.validator_id.is_empty() {
        return Err(ReportValidationError::MissingField("validatorId"));
    }
    if !submission.status.is_agent_originated() {
        return Err(ReportValidationError::NotAgentOriginated(submission.status));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_submission() -> ReportSubmission {
        ReportSubmission {
            agent_id: "agent-1".to_string(),
            agent_api_key: "key".to_string(),
            validator_id: "validator-1".to_string(),
            status: ReportStatus::Unhealthy,
            message: None,
            signature: None,
        }
    }

    #[test]
    fn accepts_healthy_and_unhealthy() {
        assert!(validate_submission(&sample_submission()).is_ok());
        let mut healthy = sample_submission();
        healthy.status = ReportStatus::Healthy;
        assert!(validate_submission(&healthy).is_ok());
    }

    #[test]
    fn rejects_consensus_statuses_from_agents() {
        let mut submission = sample_submission();
        submission.status = ReportStatus::ConsensusReached;
        assert!(matches!(
            validate_submission(&submission),
            Err(ReportValidationError::NotAgentOriginated(ReportStatus::ConsensusReached))
        ));
    }

    #[test]
    fn rejects_missing_fields() {
        let mut submission = sample_submission();
        submission.validator_id.clear();
        assert!(matches!(validate_submission(&submission), Err(ReportValidationError::MissingField("validatorId"))));
    }

    #[test]
    fn peer_envelope_round_trips_consensus_request() {
        let payload = ConsensusRequestPayload {
            validator_id: "validator-1".to_string(),
            status: HealthStatus::Unhealthy,
            agent_id: "agent-1".to_string(),
            timestamp: time::OffsetDateTime::now_utc(),
            evidence: vec![],
            consensus_id: ConsensusId::new(),
        };
        let envelope = PeerEnvelope::consensus_request("agent-1".to_string(), &payload);
        let json = serde_json::to_string(&envelope).unwrap();
        let decoded: PeerEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.as_consensus_request().unwrap(), payload);
        assert!(!decoded.is_unrecognized());
    }

    #[test]
    fn peer_envelope_flags_unknown_types() {
        let json = r#"{"type":"something_new","from":"agent-1","timestamp":"2024-01-01T00:00:00Z","data":{}}"#;
        let decoded: PeerEnvelope = serde_json::from_str(json).unwrap();
        assert!(decoded.is_unrecognized());
        assert!(decoded.as_hello().is_none());
    }

    #[test]
    fn consensus_window_upsert_keeps_latest_per_agent() {
        let first = AgentReport::new("agent-1".to_string(), "validator-1".to_string(), ReportStatus::Unhealthy, None);
        let mut window = ConsensusWindow::new(2, first);
        let replacement =
            AgentReport::new("agent-1".to_string(), "validator-1".to_string(), ReportStatus::Unhealthy, Some("retry".into()));
        window.upsert(replacement.clone());
        assert_eq!(window.reports.len(), 1);
        assert_eq!(window.reports[0].id, replacement.id);
    }
}
