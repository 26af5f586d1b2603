//! Role-typed in-process endpoints
//!
//! This module implements the transport contract the proxy consumes:
//! create an endpoint of a given role, bind it to an opaque address,
//! connect to a bound address, and exchange multi-frame messages with
//! role-specific distribution semantics.
//!
//! Bound addresses live in a process-global registry. Every link between
//! a connected endpoint and a bound endpoint is a pair of unbounded
//! channels tagged with a unique peer identity; the identity is what the
//! `Router` role exposes as a routing frame.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use log::debug;
use once_cell::sync::Lazy;
use tokio::sync::mpsc;

use crate::common::{ProxyError, Result};
use crate::config::SocketRole;

use super::message::Message;

/// Identity of one side of a link. Unique per process.
pub type PeerId = u64;

static NEXT_PEER_ID: AtomicU64 = AtomicU64::new(1);

fn next_peer_id() -> PeerId {
    NEXT_PEER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Sending half of a link to a peer endpoint.
struct Peer {
    id: PeerId,
    tx: mpsc::UnboundedSender<(PeerId, Message)>,
}

/// Registry entry for a bound address.
struct BoundEntry {
    /// Hands new links to the bound endpoint
    link_tx: mpsc::UnboundedSender<Peer>,
    /// Fan-in sender feeding the bound endpoint's receive queue
    incoming_tx: mpsc::UnboundedSender<(PeerId, Message)>,
}

static REGISTRY: Lazy<Mutex<HashMap<String, BoundEntry>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// A bound or connected communication endpoint.
///
/// Send and receive availability depend on the role; calling the
/// unsupported direction is a transport error. All receive paths are
/// fan-in FIFO; send distribution is role-specific (broadcast,
/// round-robin, or identity-routed).
pub struct Endpoint {
    role: SocketRole,
    incoming: mpsc::UnboundedReceiver<(PeerId, Message)>,
    peers: Vec<Peer>,
    /// Pending link registrations; present only on bound endpoints
    accept_rx: Option<mpsc::UnboundedReceiver<Peer>>,
    /// Registered address; present only on bound endpoints
    bound_addr: Option<String>,
    /// Round-robin cursor for load-balancing roles
    rr_next: usize,
}

impl Endpoint {
    /// Create an endpoint of the given role and bind it at `addr`.
    ///
    /// Fails if the address is already bound in this process.
    pub fn bind(role: SocketRole, addr: &str) -> Result<Self> {
        let mut registry = REGISTRY
            .lock()
            .map_err(|_| ProxyError::Transport("endpoint registry poisoned".to_string()))?;

        if registry.contains_key(addr) {
            return Err(ProxyError::Transport(format!(
                "address already bound: {}",
                addr
            )));
        }

        let (incoming_tx, incoming) = mpsc::unbounded_channel();
        let (link_tx, accept_rx) = mpsc::unbounded_channel();
        registry.insert(
            addr.to_string(),
            BoundEntry {
                link_tx,
                incoming_tx,
            },
        );

        debug!("Bound {} endpoint at {}", role, addr);
        Ok(Self {
            role,
            incoming,
            peers: Vec::new(),
            accept_rx: Some(accept_rx),
            bound_addr: Some(addr.to_string()),
            rr_next: 0,
        })
    }

    /// Create an endpoint of the given role and connect it to the
    /// endpoint bound at `addr`.
    pub fn connect(role: SocketRole, addr: &str) -> Result<Self> {
        let registry = REGISTRY
            .lock()
            .map_err(|_| ProxyError::Transport("endpoint registry poisoned".to_string()))?;

        let entry = registry.get(addr).ok_or_else(|| {
            ProxyError::Transport(format!("no endpoint bound at: {}", addr))
        })?;

        let id = next_peer_id();
        let (peer_tx, incoming) = mpsc::unbounded_channel();
        entry
            .link_tx
            .send(Peer { id, tx: peer_tx })
            .map_err(|_| ProxyError::Transport(format!("endpoint at {} is gone", addr)))?;

        debug!("Connected {} endpoint to {} (peer {})", role, addr, id);
        Ok(Self {
            role,
            incoming,
            peers: vec![Peer {
                id,
                tx: entry.incoming_tx.clone(),
            }],
            accept_rx: None,
            bound_addr: None,
            rr_next: 0,
        })
    }

    /// The role of this endpoint.
    pub fn role(&self) -> SocketRole {
        self.role
    }

    /// Pick up links registered since the last call.
    fn drain_links(&mut self) {
        if let Some(rx) = &mut self.accept_rx {
            while let Ok(peer) = rx.try_recv() {
                self.peers.push(peer);
            }
        }
    }

    /// Drop peers whose receiving side has gone away.
    fn prune_closed(&mut self) {
        self.peers.retain(|peer| !peer.tx.is_closed());
    }

    /// Send one message.
    ///
    /// Distribution depends on the role: broadcast for `Pub`/`XPub`/`XSub`,
    /// round-robin for `Push`/`Dealer` (waiting until at least one peer is
    /// linked), identity-routed for `Router` (unroutable messages are
    /// dropped). Frame boundaries are preserved.
    pub async fn send(&mut self, msg: Message) -> Result<()> {
        if !self.role.can_send() {
            return Err(ProxyError::Transport(format!(
                "{} endpoints cannot send",
                self.role
            )));
        }

        self.drain_links();
        self.prune_closed();

        match self.role {
            SocketRole::Pub | SocketRole::XPub | SocketRole::XSub => {
                // Broadcast, best-effort: no peers means the message is dropped.
                for peer in &self.peers {
                    let _ = peer.tx.send((peer.id, msg.clone()));
                }
                Ok(())
            }
            SocketRole::Push | SocketRole::Dealer => self.send_round_robin(msg).await,
            SocketRole::Router => self.send_routed(msg),
            _ => unreachable!("role checked above"),
        }
    }

    /// Round-robin delivery, waiting for a peer if none is linked yet.
    async fn send_round_robin(&mut self, msg: Message) -> Result<()> {
        loop {
            self.drain_links();

            if !self.peers.is_empty() {
                let idx = self.rr_next % self.peers.len();
                self.rr_next = self.rr_next.wrapping_add(1);
                let peer = &self.peers[idx];
                if peer.tx.send((peer.id, msg.clone())).is_ok() {
                    return Ok(());
                }
                // Peer vanished between prune and send; drop it and retry.
                self.peers.remove(idx);
                continue;
            }

            let Some(rx) = self.accept_rx.as_mut() else {
                return Err(ProxyError::Transport(
                    "peer endpoint disconnected".to_string(),
                ));
            };
            match rx.recv().await {
                Some(peer) => self.peers.push(peer),
                None => {
                    return Err(ProxyError::Transport(
                        "endpoint closed while waiting for a peer".to_string(),
                    ))
                }
            }
        }
    }

    /// Route by the identity carried in the first frame.
    fn send_routed(&mut self, mut msg: Message) -> Result<()> {
        let identity = msg.pop_front().ok_or_else(|| {
            ProxyError::Transport("routed message is missing an identity frame".to_string())
        })?;

        let peer_id = match decode_identity(&identity) {
            Some(id) => id,
            None => {
                debug!("Dropping message with malformed identity frame");
                return Ok(());
            }
        };

        match self.peers.iter().find(|peer| peer.id == peer_id) {
            Some(peer) => {
                let _ = peer.tx.send((peer.id, msg));
            }
            // Unknown identity: silently dropped, as a router does.
            None => debug!("Dropping message for unknown peer {}", peer_id),
        }
        Ok(())
    }

    /// Receive one message, blocking until one arrives.
    ///
    /// `Router` endpoints prepend the sending peer's identity frame.
    pub async fn recv(&mut self) -> Result<Message> {
        if !self.role.can_receive() {
            return Err(ProxyError::Transport(format!(
                "{} endpoints cannot receive",
                self.role
            )));
        }

        let (peer_id, mut msg) = self
            .incoming
            .recv()
            .await
            .ok_or_else(|| ProxyError::Transport("endpoint closed".to_string()))?;

        if self.role == SocketRole::Router {
            msg.push_front(encode_identity(peer_id));
        }
        Ok(msg)
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        if let Some(addr) = &self.bound_addr {
            if let Ok(mut registry) = REGISTRY.lock() {
                registry.remove(addr);
            }
        }
    }
}

fn encode_identity(id: PeerId) -> Bytes {
    Bytes::copy_from_slice(&id.to_be_bytes())
}

fn decode_identity(frame: &Bytes) -> Option<PeerId> {
    let bytes: [u8; 8] = frame.as_ref().try_into().ok()?;
    Some(PeerId::from_be_bytes(bytes))
}
