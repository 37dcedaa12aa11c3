use serde::{Deserialize, Serialize};

use crate::{ids::AlertId, status::AlertStatus, UserId, ValidatorId};

/// Created exactly once per consensus event. Resolution is an external concern —
/// this crate never transitions `Acknowledged`/`Resolved` itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: AlertId,
    pub validator_id: ValidatorId,
    pub user_id: UserId,
    pub status: AlertStatus,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<time::OffsetDateTime>,
}

impl Alert {
    pub fn quorum_reached(validator_id: ValidatorId, user_id: UserId, validator_name: &str, report_count: usize) -> Self {
        Self {
            id: AlertId::new(),
            validator_id,
            user_id,
            status: AlertStatus::Pending,
            message: format!(
                "Validator {validator_name} is unhealthy. Consensus reached with {report_count} agent reports."
            ),
            created_at: time::OffsetDateTime::now_utc(),
            resolved_at: None,
        }
    }
}
