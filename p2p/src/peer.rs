use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use sentinel_types::{AgentId, PeerEnvelope};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, trace, warn};

/// Capacity of a peer's outbound mailbox. `broadcast` is best-effort: once this
/// fills up, further sends to a slow peer are dropped rather than buffered.
const MAILBOX_CAPACITY: usize = 64;

/// A handle to one open peer socket, held in the transport's peer table once its
/// `peer_hello` has been received. Dropping it closes the peer's write half once
/// its mailbox drains.
pub struct PeerHandle {
    pub agent_id: AgentId,
    pub addr: SocketAddr,
    outbound: mpsc::Sender<PeerEnvelope>,
}

impl PeerHandle {
    /// Enqueues `envelope` for delivery. Never blocks: a full mailbox means a slow
    /// or stalled peer, and the message is simply dropped for that peer.
    pub fn try_send(&self, envelope: PeerEnvelope) -> bool {
        self.outbound.try_send(envelope).is_ok()
    }
}

/// Splits `stream` into a JSON-lines [`Framed`] transport and spawns a write-side
/// task fed by an mpsc mailbox. The peer's `agentId` is not yet known at this
/// point — it arrives in the first `peer_hello` the caller reads from
/// [`PeerReader`] — so [`PeerHandle`] is only constructed once that arrives, via
/// [`PeerMailbox::into_handle`].
pub fn spawn_peer(addr: SocketAddr, stream: TcpStream) -> (PeerMailbox, PeerReader) {
    let framed = Framed::new(stream, LinesCodec::new_with_max_length(1 << 20));
    let (writer, reader) = framed.split();
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);

    tokio::spawn(write_loop(addr, writer, rx));

    (PeerMailbox { addr, outbound: tx }, PeerReader { inner: reader })
}

/// The live write side of a not-yet-registered peer connection.
pub struct PeerMailbox {
    addr: SocketAddr,
    outbound: mpsc::Sender<PeerEnvelope>,
}

impl PeerMailbox {
    pub fn into_handle(self, agent_id: AgentId) -> PeerHandle {
        PeerHandle { agent_id, addr: self.addr, outbound: self.outbound }
    }

    /// Enqueues `envelope` before the peer's `agentId` is known, e.g. the initial
    /// `peer_hello` both sides send immediately on socket open.
    pub fn try_send(&self, envelope: PeerEnvelope) -> bool {
        self.outbound.try_send(envelope).is_ok()
    }
}

async fn write_loop(
    addr: SocketAddr,
    mut writer: futures::stream::SplitSink<Framed<TcpStream, LinesCodec>, String>,
    mut rx: mpsc::Receiver<PeerEnvelope>,
) {
    while let Some(envelope) = rx.recv().await {
        let line = match serde_json::to_string(&envelope) {
            Ok(line) => line,
            Err(error) => {
                warn!(%addr, %error, "failed to serialize outbound peer envelope");
                continue;
            }
        };
        if let Err(error) = writer.send(line).await {
            debug!(%addr, %error, "peer write failed, closing socket");
            break;
        }
    }
    trace!(%addr, "peer write loop exiting");
}

/// The read half of a peer socket, yielding decoded envelopes. Lines that fail to
/// parse as JSON are logged and skipped rather than terminating the connection —
/// only a `peer_hello` mismatch or a recognized protocol violation closes a socket.
pub struct PeerReader {
    inner: futures::stream::SplitStream<Framed<TcpStream, LinesCodec>>,
}

impl PeerReader {
    pub async fn next_envelope(&mut self) -> Option<PeerEnvelope> {
        loop {
            let line = match self.inner.next().await {
                Some(Ok(line)) => line,
                Some(Err(error)) => {
                    debug!(%error, "peer socket read error, closing");
                    return None;
                }
                None => return None,
            };
            match serde_json::from_str::<PeerEnvelope>(&line) {
                Ok(envelope) => return Some(envelope),
                Err(error) => {
                    trace!(%error, "dropped malformed peer envelope line");
                    continue;
                }
            }
        }
    }
}
