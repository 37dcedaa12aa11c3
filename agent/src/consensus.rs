//! Agent consensus requester and responder.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use sentinel_p2p::{InboundMessage, P2pTransport};
use sentinel_probe::{Probe, ProbeScheduler};
use sentinel_types::{
    AgentId, ConsensusId, ConsensusRequestPayload, ConsensusResponsePayload, HealthCheckResult, HealthStatus,
    PeerEnvelope, ValidatorId, PEER_CONSENSUS_REQUEST, PEER_CONSENSUS_RESPONSE,
};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Result of [`ConsensusCoordinator::request_consensus`].
#[derive(Clone, Debug, Default)]
pub struct ConsensusOutcome {
    pub agree_count: usize,
    pub total_peers: usize,
    pub responses: Vec<ConsensusResponsePayload>,
}

impl ConsensusOutcome {
    /// Self-inclusive quorum rule: the requester counts itself as a vote.
    /// Absent peers (`total_peers == 0`) never block alerting.
    pub fn quorum_reached(&self, threshold: usize) -> bool {
        self.agree_count + 1 >= threshold
    }
}

/// Owns the single inbound-message receiver from the peer transport and multiplexes
/// it between in-flight consensus requests (by `consensusId`) and the responder.
pub struct ConsensusCoordinator {
    agent_id: AgentId,
    validator_id: ValidatorId,
    transport: P2pTransport,
    probe: Arc<dyn Probe>,
    probe_scheduler: Arc<ProbeScheduler>,
    beacon_node_url: String,
    pending: Arc<DashMap<ConsensusId, mpsc::UnboundedSender<ConsensusResponsePayload>>>,
}

impl ConsensusCoordinator {
    pub fn new(
        agent_id: AgentId,
        validator_id: ValidatorId,
        transport: P2pTransport,
        probe: Arc<dyn Probe>,
        probe_scheduler: Arc<ProbeScheduler>,
        beacon_node_url: String,
    ) -> Self {
        Self { agent_id, validator_id, transport, probe, probe_scheduler, beacon_node_url, pending: Arc::new(DashMap::new()) }
    }

    /// Spawns the task that owns `inbound` and dispatches every received envelope to
    /// either a pending consensus request or the responder.
    pub fn spawn_dispatch_loop(self: &Arc<Self>, mut inbound: mpsc::UnboundedReceiver<InboundMessage>) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            while let Some(InboundMessage { envelope }) = inbound.recv().await {
                match envelope.message_type.as_str() {
                    PEER_CONSENSUS_REQUEST => coordinator.clone().handle_request(envelope).await,
                    PEER_CONSENSUS_RESPONSE => coordinator.handle_response(envelope),
                    _ => trace!(message_type = %envelope.message_type, "dispatch loop ignoring non-consensus envelope"),
                }
            }
        });
    }

    /// `requestConsensus(validatorId, evidence, timeout)`.
    pub async fn request_consensus(&self, evidence: Vec<HealthCheckResult>, timeout: Duration) -> ConsensusOutcome {
        let total_peers = self.transport.connected_peer_count();
        if total_peers == 0 {
            return ConsensusOutcome::default();
        }

        let consensus_id = ConsensusId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.pending.insert(consensus_id.clone(), tx);

        let payload = ConsensusRequestPayload {
            validator_id: self.validator_id.clone(),
            status: HealthStatus::Unhealthy,
            agent_id: self.agent_id.clone(),
            timestamp: time::OffsetDateTime::now_utc(),
            evidence,
            consensus_id: consensus_id.clone(),
        };
        let envelope = PeerEnvelope::consensus_request(self.agent_id.clone(), &payload);
        self.transport.broadcast(&envelope);

        // Wait exactly `timeout` — the window never closes early.
        let mut responses: std::collections::HashMap<AgentId, ConsensusResponsePayload> = std::collections::HashMap::new();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                maybe_response = rx.recv() => {
                    match maybe_response {
                        Some(response) => {
                            // Duplicate responses from the same agentId overwrite earlier ones.
                            responses.insert(response.agent_id.clone(), response);
                        }
                        None => break,
                    }
                }
            }
        }

        self.pending.remove(&consensus_id);

        let agree_count = responses.values().filter(|r| r.agree).count();
        ConsensusOutcome { agree_count, total_peers, responses: responses.into_values().collect() }
    }

    fn handle_response(&self, envelope: PeerEnvelope) {
        let Some(payload) = envelope.as_consensus_response() else {
            trace!("dropped malformed consensus_response");
            return;
        };
        if payload.requester_id != self.agent_id {
            return; // not ours to collect
        }
        if let Some(sender) = self.pending.get(&payload.consensus_id) {
            // Late responses after the requester has already unsubscribed find no
            // entry here and are silently discarded.
            let _ = sender.send(payload);
        }
    }

    /// Responder half: answers an inbound `consensus_request` for our validator.
    async fn handle_request(self: Arc<Self>, envelope: PeerEnvelope) {
        let Some(request) = envelope.as_consensus_request() else {
            debug!("dropped consensus_request missing a consensusId or otherwise malformed");
            return;
        };
        if request.validator_id != self.validator_id {
            return; // requests for unrelated validators are silently dropped
        }

        let latest = self.probe_scheduler.latest();
        let evidence = match latest {
            Some(result) => result,
            None => self.probe.check(&self.validator_id, &self.beacon_node_url).await,
        };
        let agree = !evidence.is_healthy();

        let response = ConsensusResponsePayload {
            validator_id: self.validator_id.clone(),
            consensus_id: request.consensus_id,
            agree,
            agent_id: self.agent_id.clone(),
            requester_id: request.agent_id,
            timestamp: time::OffsetDateTime::now_utc(),
            evidence: agree.then_some(evidence),
        };
        let envelope = PeerEnvelope::consensus_response(self.agent_id.clone(), &response);
        self.transport.broadcast(&envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct AlwaysUnhealthy;

    #[async_trait]
    impl Probe for AlwaysUnhealthy {
        async fn check(&self, validator_id: &ValidatorId, _url: &str) -> HealthCheckResult {
            HealthCheckResult::unhealthy(validator_id.clone(), 1, "down".to_string())
        }
    }

    #[tokio::test]
    async fn no_peers_returns_zero_outcome_immediately() {
        let (transport, inbound) = P2pTransport::new("alice".to_string(), "validator-1".to_string());
        let scheduler = Arc::new(ProbeScheduler::start(
            Arc::new(AlwaysUnhealthy),
            "validator-1".to_string(),
            "http://localhost:5052".to_string(),
            Duration::from_secs(3600),
        ));
        let coordinator = Arc::new(ConsensusCoordinator::new(
            "alice".to_string(),
            "validator-1".to_string(),
            transport,
            Arc::new(AlwaysUnhealthy),
            scheduler,
            "http://localhost:5052".to_string(),
        ));
        coordinator.spawn_dispatch_loop(inbound);

        let outcome = coordinator.request_consensus(vec![], Duration::from_millis(10)).await;
        assert_eq!(outcome.total_peers, 0);
        assert!(!outcome.quorum_reached(2));
    }
}
