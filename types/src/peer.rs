use crate::AgentId;

/// A connected agent in the peer fabric. The socket itself is owned
/// by the `p2p` crate; this type exists only to describe the invariant: at most one
/// live socket per `peerId`, a newer registration terminating the older.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerDescriptor {
    pub peer_id: AgentId,
    pub bootstrap_url: Option<String>,
}

impl PeerDescriptor {
    pub fn new(peer_id: AgentId) -> Self {
        Self { peer_id, bootstrap_url: None }
    }

    pub fn from_bootstrap(peer_id: AgentId, bootstrap_url: String) -> Self {
        Self { peer_id, bootstrap_url: Some(bootstrap_url) }
    }
}
