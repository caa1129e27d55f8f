//! UDP connection endpoints.
//!
//! A listening endpoint has no peer until the first datagram arrives; the
//! sender of that datagram is locked in through the shared [`Rendezvous`].
//! A dialing endpoint is connected to its peer from the start.
//!
//! Reads yield one datagram each, truncated to the caller's buffer.
//! Writes send one datagram each. Before a peer is known, writes are
//! dropped without error.

use crate::error::{RelayError, RelayResult};
use crate::rendezvous::Rendezvous;
use crate::transport::{closed_error, ByteSink, ByteSource, CloseHandle, IoFuture};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// A bound UDP socket paired with its (possibly not yet known) peer.
#[derive(Debug)]
pub struct UdpEndpoint {
    socket: Arc<UdpSocket>,
    rendezvous: Rendezvous,
    connected: bool,
}

impl UdpEndpoint {
    /// Bind `addr` and wait for a peer to speak first.
    pub async fn listen(addr: SocketAddr) -> RelayResult<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| RelayError::Bind { addr, source })?;
        info!(addr = %socket.local_addr()?, "udp socket bound, waiting for peer");
        Ok(Self {
            socket: Arc::new(socket),
            rendezvous: Rendezvous::pending(),
            connected: false,
        })
    }

    /// Bind a local socket (on `source_port` if given) and connect it to `peer`.
    pub async fn connect(peer: SocketAddr, source_port: Option<u16>) -> RelayResult<Self> {
        let port = source_port.unwrap_or(0);
        let local = if peer.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, port))
        };

        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| RelayError::Bind { addr: local, source })?;
        socket
            .connect(peer)
            .await
            .map_err(|source| RelayError::Connect {
                target: peer.to_string(),
                source,
            })?;
        info!(peer = %peer, "udp socket connected");

        Ok(Self {
            socket: Arc::new(socket),
            rendezvous: Rendezvous::fixed(peer),
            connected: true,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// The peer cell shared by both halves after [`split`](Self::split).
    pub fn rendezvous(&self) -> &Rendezvous {
        &self.rendezvous
    }

    /// Split into the read half, the write half, and their shared close handle.
    pub fn split(self) -> (UdpSource, UdpSink, CloseHandle) {
        let close = CloseHandle::new();
        (
            UdpSource {
                socket: Arc::clone(&self.socket),
                rendezvous: self.rendezvous.clone(),
                close: close.clone(),
            },
            UdpSink {
                socket: self.socket,
                rendezvous: self.rendezvous,
                connected: self.connected,
                close: close.clone(),
            },
            close,
        )
    }
}

/// Read half of a UDP endpoint.
#[derive(Debug)]
pub struct UdpSource {
    socket: Arc<UdpSocket>,
    rendezvous: Rendezvous,
    close: CloseHandle,
}

impl ByteSource for UdpSource {
    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> IoFuture<'a, usize> {
        Box::pin(async move {
            loop {
                let (n, from) = tokio::select! {
                    biased;
                    _ = self.close.closed() => return Err(closed_error()),
                    result = self.socket.recv_from(&mut *buf) => result?,
                };

                if self.rendezvous.offer(from) {
                    debug!(peer = %from, "peer address locked in");
                }
                // An empty datagram is not end-of-stream.
                if n > 0 {
                    return Ok(n);
                }
                debug!(from = %from, "empty datagram ignored");
            }
        })
    }
}

/// Write half of a UDP endpoint.
#[derive(Debug)]
pub struct UdpSink {
    socket: Arc<UdpSocket>,
    rendezvous: Rendezvous,
    connected: bool,
    close: CloseHandle,
}

impl ByteSink for UdpSink {
    fn write_all<'a>(&'a mut self, data: &'a [u8]) -> IoFuture<'a, ()> {
        Box::pin(async move {
            if self.close.is_closed() {
                return Err(closed_error());
            }
            let Some(peer) = self.rendezvous.peer() else {
                debug!(len = data.len(), "no peer yet, dropping outbound data");
                return Ok(());
            };

            debug!(peer = %peer, len = data.len(), "sending datagram");
            if self.connected {
                self.socket.send(data).await?;
            } else {
                self.socket.send_to(data, peer).await?;
            }
            Ok(())
        })
    }

    fn close(&mut self) -> IoFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}
