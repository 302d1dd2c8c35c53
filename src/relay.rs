//! Broadcast hub for the remote-control channel.
//!
//! One task owns the set of connected peers and processes join, publish and
//! leave events one at a time. Peers only ever see it through a
//! [`RelayConnection`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::metrics;
use crate::protocol::RemoteMessage;

/// Messages queued per peer before further ones are dropped.
const PEER_QUEUE: usize = 64;

enum RelayEvent {
    Join {
        id: u64,
        outbox: mpsc::Sender<String>,
    },
    Publish {
        from: u64,
        payload: String,
    },
    Leave {
        id: u64,
    },
}

#[derive(Clone)]
pub struct Relay {
    events: mpsc::UnboundedSender<RelayEvent>,
    next_id: Arc<AtomicU64>,
    peers: watch::Receiver<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// One peer's membership in the relay. Dropping it leaves the relay.
pub struct RelayConnection {
    id: u64,
    state: ConnectionState,
    events: mpsc::UnboundedSender<RelayEvent>,
    inbox: mpsc::Receiver<String>,
}

impl Relay {
    /// Start the hub task on the current tokio runtime.
    pub fn spawn() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (peers_tx, peers_rx) = watch::channel(0);
        metrics::RELAY_PEERS.set(0);
        tokio::spawn(run(events_rx, peers_tx));
        Self {
            events: events_tx,
            next_id: Arc::new(AtomicU64::new(0)),
            peers: peers_rx,
        }
    }

    /// Join the relay. The first message delivered to the new connection is
    /// the `connected` greeting.
    pub fn connect(&self) -> RelayConnection {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (outbox, inbox) = mpsc::channel(PEER_QUEUE);
        let state = match self.events.send(RelayEvent::Join { id, outbox }) {
            Ok(()) => ConnectionState::Open,
            Err(_) => ConnectionState::Closed,
        };
        RelayConnection {
            id,
            state,
            events: self.events.clone(),
            inbox,
        }
    }

    /// Number of peers as of the last processed event.
    pub fn peer_count(&self) -> usize {
        *self.peers.borrow()
    }

    /// Wait until the peer count satisfies `predicate`.
    pub async fn wait_for_peers(&self, predicate: impl FnMut(&usize) -> bool) -> usize {
        let mut peers = self.peers.clone();
        let count = match peers.wait_for(predicate).await {
            Ok(count) => *count,
            Err(_) => 0,
        };
        count
    }
}

impl RelayConnection {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Forward `payload` verbatim to every other peer. No-op once closed.
    pub fn publish(&self, payload: impl Into<String>) {
        if self.state == ConnectionState::Closed {
            return;
        }
        let _ = self.events.send(RelayEvent::Publish {
            from: self.id,
            payload: payload.into(),
        });
    }

    /// Next message from another peer, in the order the relay forwarded
    /// them. `None` once closed.
    pub async fn recv(&mut self) -> Option<String> {
        if self.state == ConnectionState::Closed {
            return None;
        }
        self.inbox.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.inbox.try_recv().ok()
    }

    /// Leave the relay. Remaining peers are not notified.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Open {
            self.state = ConnectionState::Closed;
            self.inbox.close();
            let _ = self.events.send(RelayEvent::Leave { id: self.id });
        }
    }
}

impl Drop for RelayConnection {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run(mut events: mpsc::UnboundedReceiver<RelayEvent>, peer_count: watch::Sender<usize>) {
    let mut peers: BTreeMap<u64, mpsc::Sender<String>> = BTreeMap::new();
    let greeting = RemoteMessage::Connected.to_json();

    while let Some(event) = events.recv().await {
        match event {
            RelayEvent::Join { id, outbox } => {
                let _ = outbox.try_send(greeting.clone());
                peers.insert(id, outbox);
                info!("Remote connected. Total: {}", peers.len());
            }
            RelayEvent::Publish { from, payload } => {
                for (id, outbox) in &peers {
                    if *id == from || outbox.is_closed() {
                        continue;
                    }
                    if outbox.try_send(payload.clone()).is_err() {
                        debug!("Relay dropped message: peer={} (queue full)", id);
                    }
                }
            }
            RelayEvent::Leave { id } => {
                if peers.remove(&id).is_some() {
                    info!("Remote disconnected. Total: {}", peers.len());
                }
            }
        }
        metrics::RELAY_PEERS.set(peers.len() as i64);
        peer_count.send_replace(peers.len());
    }
}
