//! Write-once peer address for UDP sessions.
//!
//! UDP has no connection to tell us who the peer is. A listening session
//! learns it from the first inbound datagram and keeps it for good: later
//! datagrams from other senders are still relayed to output, but outbound
//! datagrams only ever go to the first sender.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared, write-once peer address cell.
///
/// Cloning shares the same cell.
#[derive(Debug, Clone)]
pub struct Rendezvous {
    peer: Arc<watch::Sender<Option<SocketAddr>>>,
}

impl Rendezvous {
    /// An empty cell, waiting for the first sender (listening mode).
    pub fn pending() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { peer: Arc::new(tx) }
    }

    /// A cell already holding the dialed peer (dialing mode).
    pub fn fixed(addr: SocketAddr) -> Self {
        let (tx, _rx) = watch::channel(Some(addr));
        Self { peer: Arc::new(tx) }
    }

    /// Record `addr` as the peer unless one is already recorded.
    ///
    /// Returns `true` for the single call that set the peer.
    pub fn offer(&self, addr: SocketAddr) -> bool {
        self.peer.send_if_modified(|peer| match peer {
            Some(_) => false,
            None => {
                *peer = Some(addr);
                true
            }
        })
    }

    /// The locked-in peer, if one has been learned.
    pub fn peer(&self) -> Option<SocketAddr> {
        *self.peer.borrow()
    }

    /// Wait until a peer is known and return it.
    pub async fn learned(&self) -> SocketAddr {
        let mut rx = self.peer.subscribe();
        loop {
            if let Some(addr) = *rx.borrow_and_update() {
                return addr;
            }
            // The sender is owned by `self`, so `changed` cannot fail here.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
