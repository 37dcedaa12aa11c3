use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! opaque_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generates a fresh, random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(ReportId, "Identifies a single `AgentReport`.");
opaque_id!(AlertId, "Identifies a single `Alert`.");
opaque_id!(ConsensusId, "Identifies one in-flight agent-to-agent consensus round.");
opaque_id!(WebhookConfigId, "Identifies a single `WebhookConfig`.");

/// Identifies a `Validator`. Validators are managed outside of this crate; the id is
/// an opaque string handed down from the registration system.
pub type ValidatorId = String;

/// Identifies an `Agent`. Like [`ValidatorId`], managed externally.
pub type AgentId = String;

/// Identifies the user that owns a `Validator` and its `Alert`s/`WebhookConfig`s.
pub type UserId = String;
