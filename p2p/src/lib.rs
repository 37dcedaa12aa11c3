//! Bidirectional peer message fabric over persistent sockets, with reconnection.
//!
//! Built around a `Router(Arc<InnerRouter>)` core holding a connected-peer table
//! and a handles vec for spawned tasks; the wire codec and handshake below are a
//! from-scratch JSON-lines implementation in that same structural idiom.

mod peer;

pub use peer::{PeerHandle, PeerMailbox, PeerReader};

use std::{
    net::SocketAddr,
    ops::Deref,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use dashmap::DashMap;
use sentinel_types::{AgentId, PeerEnvelope, ValidatorId, PEER_HELLO};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc,
    task::JoinHandle,
};
use tracing::{debug, info, trace, warn};

/// A received envelope together with the socket address it arrived on, for callers
/// that want to log or rate-limit by peer.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub envelope: PeerEnvelope,
}

#[derive(Clone)]
pub struct P2pTransport(Arc<Inner>);

struct Inner {
    agent_id: AgentId,
    validator_id: ValidatorId,
    peers: DashMap<AgentId, PeerHandle>,
    inbound_tx: mpsc::UnboundedSender<InboundMessage>,
    handles: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    shutdown: AtomicBool,
}

impl Deref for P2pTransport {
    type Target = Arc<Inner>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl P2pTransport {
    /// Binds `bind_addr` and returns the transport alongside the channel of
    /// decoded inbound messages (hellos are handled internally and never
    /// forwarded; everything else — `consensus_request`/`consensus_response`, and
    /// anything this build doesn't recognize — is handed to the caller).
    pub fn new(agent_id: AgentId, validator_id: ValidatorId) -> (Self, mpsc::UnboundedReceiver<InboundMessage>) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let transport = Self(Arc::new(Inner {
            agent_id,
            validator_id,
            peers: DashMap::new(),
            inbound_tx,
            handles: parking_lot::Mutex::new(Vec::new()),
            shutdown: AtomicBool::new(false),
        }));
        (transport, inbound_rx)
    }

    /// Starts accepting inbound connections on `bind_addr`. Returns once the
    /// listener is bound; accepting itself runs in a background task.
    pub async fn listen(&self, bind_addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(bind_addr).await?;
        info!(%bind_addr, "peer transport listening");
        let transport = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                if transport.shutdown.load(Ordering::Relaxed) {
                    break;
                }
                match listener.accept().await {
                    Ok((stream, addr)) => transport.accept_connection(stream, addr),
                    Err(error) => {
                        warn!(%error, "failed to accept peer connection");
                    }
                }
            }
        });
        self.handles.lock().push(handle);
        Ok(())
    }

    /// Dials `addr` and, on success, performs the same handshake an inbound
    /// connection goes through.
    pub async fn dial(&self, addr: SocketAddr) -> std::io::Result<()> {
        let stream = TcpStream::connect(addr).await?;
        self.accept_connection(stream, addr);
        Ok(())
    }

    fn accept_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let transport = self.clone();
        let handle = tokio::spawn(async move { transport.handshake_and_serve(stream, addr).await });
        self.handles.lock().push(handle);
    }

    async fn handshake_and_serve(&self, stream: TcpStream, addr: SocketAddr) {
        let (mailbox, mut reader) = peer::spawn_peer(addr, stream);

        // Both sides send peer_hello immediately on open.
        let hello = PeerEnvelope::hello(self.agent_id.clone(), self.validator_id.clone());
        let _ = mailbox.try_send(hello);

        let peer_agent_id = match reader.next_envelope().await {
            Some(envelope) if envelope.message_type == PEER_HELLO => match envelope.as_hello() {
                Some(_) => envelope.from,
                None => {
                    debug!(%addr, "malformed peer_hello, dropping connection");
                    return;
                }
            },
            Some(_) => {
                debug!(%addr, "first message from peer was not peer_hello, dropping connection");
                return;
            }
            None => return,
        };

        if peer_agent_id == self.agent_id {
            debug!(%addr, "dropped self-dial");
            return;
        }

        // A peer registering a duplicate agentId terminates the older socket.
        if let Some((_, old)) = self.peers.remove(&peer_agent_id) {
            debug!(agent_id = %peer_agent_id, old_addr = %old.addr, "duplicate peer hello, replacing older socket");
        }
        self.peers.insert(peer_agent_id.clone(), mailbox.into_handle(peer_agent_id.clone()));
        metrics::gauge!(sentinel_metrics::names::p2p::CONNECTED_PEERS, self.peers.len() as f64);

        loop {
            match reader.next_envelope().await {
                Some(envelope) if envelope.message_type == PEER_HELLO => {
                    trace!(agent_id = %peer_agent_id, "ignoring repeat peer_hello on established socket");
                }
                Some(envelope) if envelope.from == self.agent_id => {
                    trace!(agent_id = %peer_agent_id, "dropped self-originated message");
                }
                Some(envelope) => {
                    if self.inbound_tx.send(InboundMessage { envelope }).is_err() {
                        break;
                    }
                }
                None => break,
            }
        }

        self.peers.remove(&peer_agent_id);
        metrics::gauge!(sentinel_metrics::names::p2p::CONNECTED_PEERS, self.peers.len() as f64);
        debug!(agent_id = %peer_agent_id, "peer disconnected");
    }

    /// Sends `envelope` to every currently open peer socket. Best-effort: a closed
    /// or saturated socket is skipped, never buffered or retried.
    pub fn broadcast(&self, envelope: &PeerEnvelope) {
        for peer in self.peers.iter() {
            if !peer.try_send(envelope.clone()) {
                trace!(agent_id = %peer.agent_id, "dropped broadcast to slow or closed peer");
            }
        }
    }

    pub fn connected_peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn is_connected(&self, agent_id: &AgentId) -> bool {
        self.peers.contains_key(agent_id)
    }

    /// True if some registered peer's socket address matches `addr`. Used by the
    /// reconnect sweep, which only knows bootstrap peers by address — their
    /// `agentId` isn't known until after a successful handshake.
    fn is_connected_addr(&self, addr: &SocketAddr) -> bool {
        self.peers.iter().any(|entry| &entry.addr == addr)
    }

    /// Spawns the periodic bootstrap reconnection sweep (default 60s): any
    /// bootstrap address not currently connected is re-dialed.
    pub fn start_reconnect_sweep(&self, bootstrap_peers: Vec<SocketAddr>, interval: Duration) {
        let transport = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if transport.shutdown.load(Ordering::Relaxed) {
                    break;
                }
                for addr in &bootstrap_peers {
                    if transport.is_connected_addr(addr) {
                        continue;
                    }
                    trace!(%addr, "reconnect sweep dialing bootstrap peer");
                    if let Err(error) = transport.dial(*addr).await {
                        debug!(%addr, %error, "reconnect attempt failed");
                    }
                }
            }
        });
        self.handles.lock().push(handle);
    }

    pub fn shut_down(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
        self.peers.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sentinel_types::ConsensusRequestPayload;

    use super::*;

    async fn local_addr(transport: &P2pTransport) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        transport.listen(addr).await.unwrap();
        addr
    }

    #[tokio::test]
    async fn two_transports_complete_handshake_and_exchange_messages() {
        let (alice, mut alice_inbound) = P2pTransport::new("alice".to_string(), "validator-1".to_string());
        let (bob, mut bob_inbound) = P2pTransport::new("bob".to_string(), "validator-1".to_string());

        let bob_addr = local_addr(&bob).await;
        alice.dial(bob_addr).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(alice.connected_peer_count(), 1);
        assert_eq!(bob.connected_peer_count(), 1);

        let payload = ConsensusRequestPayload {
            validator_id: "validator-1".to_string(),
            status: sentinel_types::HealthStatus::Unhealthy,
            agent_id: "alice".to_string(),
            timestamp: time::OffsetDateTime::now_utc(),
            evidence: vec![],
            consensus_id: sentinel_types::ConsensusId::new(),
        };
        let envelope = PeerEnvelope::consensus_request("alice".to_string(), &payload);
        alice.broadcast(&envelope);

        let received = tokio::time::timeout(Duration::from_secs(1), bob_inbound.recv()).await.unwrap().unwrap();
        assert_eq!(received.envelope.as_consensus_request().unwrap(), payload);

        assert!(tokio::time::timeout(Duration::from_millis(100), alice_inbound.recv()).await.is_err());
    }

    #[tokio::test]
    async fn broadcast_with_no_peers_is_a_no_op() {
        let (alice, _inbound) = P2pTransport::new("alice".to_string(), "validator-1".to_string());
        let envelope = PeerEnvelope::hello("alice".to_string(), "validator-1".to_string());
        alice.broadcast(&envelope);
        assert_eq!(alice.connected_peer_count(), 0);
    }
}
