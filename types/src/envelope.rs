use serde::{Deserialize, Serialize};

use crate::{health::HealthCheckResult, ids::ConsensusId, status::HealthStatus, AgentId, ValidatorId};

/// The `{validatorId, status=UNHEALTHY, agentId, timestamp, evidence, consensusId}`
/// payload of a `consensus_request` message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusRequestPayload {
    pub validator_id: ValidatorId,
    pub status: HealthStatus,
    pub agent_id: AgentId,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: time::OffsetDateTime,
    pub evidence: Vec<HealthCheckResult>,
    pub consensus_id: ConsensusId,
}

/// The `{validatorId, consensusId, agree, agentId, requesterId, timestamp, evidence?}`
/// payload of a `consensus_response` message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResponsePayload {
    pub validator_id: ValidatorId,
    pub consensus_id: ConsensusId,
    pub agree: bool,
    pub agent_id: AgentId,
    pub requester_id: AgentId,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: time::OffsetDateTime,
    #[serde(default)]
    pub evidence: Option<HealthCheckResult>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerHelloPayload {
    pub validator_id: ValidatorId,
}

/// Recognized `type` values on the peer fabric. `health_report` is reserved
/// and not currently produced; it is modeled so a receiver can name it without
/// treating it as unknown.
pub const PEER_HELLO: &str = "peer_hello";
pub const PEER_CONSENSUS_REQUEST: &str = "consensus_request";
pub const PEER_CONSENSUS_RESPONSE: &str = "consensus_response";
pub const PEER_HEALTH_REPORT: &str = "health_report";

/// The JSON envelope exchanged over the persistent peer socket:
/// `{type, from, timestamp, data}`. `message_type` is a plain string rather than a
/// closed enum so that an envelope carrying an unrecognized type still decodes —
/// the peer transport is required to ignore unknown types rather than reject them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeerEnvelope {
    #[serde(rename = "type")]
    pub message_type: String,
    pub from: AgentId,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: time::OffsetDateTime,
    pub data: serde_json::Value,
}

impl PeerEnvelope {
    fn new(message_type: &str, from: AgentId, data: serde_json::Value) -> Self {
        Self { message_type: message_type.to_string(), from, timestamp: time::OffsetDateTime::now_utc(), data }
    }

    pub fn hello(from: AgentId, validator_id: ValidatorId) -> Self {
        let payload = PeerHelloPayload { validator_id };
        Self::new(PEER_HELLO, from, serde_json::to_value(payload).expect("PeerHelloPayload always serializes"))
    }

    pub fn consensus_request(from: AgentId, payload: &ConsensusRequestPayload) -> Self {
        Self::new(
            PEER_CONSENSUS_REQUEST,
            from,
            serde_json::to_value(payload).expect("ConsensusRequestPayload always serializes"),
        )
    }

    pub fn consensus_response(from: AgentId, payload: &ConsensusResponsePayload) -> Self {
        Self::new(
            PEER_CONSENSUS_RESPONSE,
            from,
            serde_json::to_value(payload).expect("ConsensusResponsePayload always serializes"),
        )
    }

    pub fn as_hello(&self) -> Option<PeerHelloPayload> {
        (self.message_type == PEER_HELLO).then(|| serde_json::from_value(self.data.clone()).ok()).flatten()
    }

    pub fn as_consensus_request(&self) -> Option<ConsensusRequestPayload> {
        (self.message_type == PEER_CONSENSUS_REQUEST)
            .then(|| serde_json::from_value(self.data.clone()).ok())
            .flatten()
    }

    pub fn as_consensus_response(&self) -> Option<ConsensusResponsePayload> {
        (self.message_type == PEER_CONSENSUS_RESPONSE)
            .then(|| serde_json::from_value(self.data.clone()).ok())
            .flatten()
    }

    /// True for any `type` this build does not recognize — callers must drop these
    /// rather than error.
    pub fn is_unrecognized(&self) -> bool {
        !matches!(
            self.message_type.as_str(),
            PEER_HELLO | PEER_CONSENSUS_REQUEST | PEER_CONSENSUS_RESPONSE | PEER_HEALTH_REPORT
        )
    }
}

/// The broadcast envelope pushed to observers: `{type, data, timestamp}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEnvelope {
    #[serde(rename = "type")]
    pub event_type: BroadcastEventType,
    pub data: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: time::OffsetDateTime,
}

impl BroadcastEnvelope {
    pub fn new(event_type: BroadcastEventType, data: serde_json::Value) -> Self {
        Self { event_type, data, timestamp: time::OffsetDateTime::now_utc() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastEventType {
    Welcome,
    ValidatorUpdate,
    Alert,
    AgentUpdate,
    ConsensusUpdate,
}
