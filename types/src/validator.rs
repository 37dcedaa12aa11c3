use serde::{Deserialize, Serialize};

use crate::{UserId, ValidatorId};

/// The externally-owned entity this whole system exists to watch. CRUD and
/// ownership transfer for validators live outside this crate; only the fields the
/// health-consensus core reads are modeled here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validator {
    pub id: ValidatorId,
    pub user_id: UserId,
    pub name: String,
    pub beacon_node_url: String,
    /// Shared by every agent that monitors this validator; compared in constant time
    /// against the `agentApiKey` of an inbound report.
    pub validator_api_key: String,
    pub is_active: bool,
}

/// A probing process pinned to exactly one [`Validator`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: crate::AgentId,
    pub validator_id: ValidatorId,
    pub is_active: bool,
    /// Updated on every accepted report; monotonically non-decreasing.
    pub last_seen: time::OffsetDateTime,
}
