//! In-memory Validator/Agent registry.
//!
//! The external provisioning system that owns Validator/Agent lifecycle is out
//! of scope for this core; this crate seeds its
//! view of that data from its config file at startup and keeps it in memory for
//! the process lifetime. A production deployment would back this with the real
//! store instead of replacing this type — callers only see the trait.

use dashmap::DashMap;
use sentinel_types::{Agent, AgentId, Validator, ValidatorId};

#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    async fn get_validator(&self, validator_id: &ValidatorId) -> Option<Validator>;
    async fn get_agent(&self, agent_id: &AgentId) -> Option<Agent>;
    async fn touch_agent_last_seen(&self, agent_id: &AgentId);
}

#[derive(Default)]
pub struct InMemoryRegistry {
    validators: DashMap<ValidatorId, Validator>,
    agents: DashMap<AgentId, Agent>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_validator(&self, validator: Validator) {
        self.validators.insert(validator.id.clone(), validator);
    }

    pub fn insert_agent(&self, agent: Agent) {
        self.agents.insert(agent.id.clone(), agent);
    }
}

#[async_trait::async_trait]
impl Registry for InMemoryRegistry {
    async fn get_validator(&self, validator_id: &ValidatorId) -> Option<Validator> {
        self.validators.get(validator_id).map(|entry| entry.clone())
    }

    async fn get_agent(&self, agent_id: &AgentId) -> Option<Agent> {
        self.agents.get(agent_id).map(|entry| entry.clone())
    }

    async fn touch_agent_last_seen(&self, agent_id: &AgentId) {
        if let Some(mut agent) = self.agents.get_mut(agent_id) {
            agent.last_seen = time::OffsetDateTime::now_utc();
        }
    }
}
