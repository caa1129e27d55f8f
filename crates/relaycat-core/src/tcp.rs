//! TCP connection endpoints: dial one peer or accept exactly one.
//!
//! The peer address is known as soon as the connection exists. Splitting an
//! endpoint yields independently owned read and write halves plus the
//! [`CloseHandle`] they share, so the two copy tasks never lock each other.

use crate::error::{RelayError, RelayResult};
use crate::transport::{closed_error, ByteSink, ByteSource, CloseHandle, IoFuture};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{debug, info, warn};

/// An established TCP connection.
#[derive(Debug)]
pub struct TcpEndpoint {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpEndpoint {
    /// Wrap an already-connected stream.
    pub fn from_stream(stream: TcpStream) -> RelayResult<Self> {
        let peer = stream.peer_addr()?;
        Ok(Self { stream, peer })
    }

    /// Dial the first reachable address in `addrs`.
    ///
    /// With `source_port`, the local side is bound to that port before
    /// connecting.
    pub async fn connect(addrs: &[SocketAddr], source_port: Option<u16>) -> RelayResult<Self> {
        let mut last_err = None;

        for &addr in addrs {
            let attempt = match source_port {
                Some(port) => connect_from(addr, port).await,
                None => TcpStream::connect(addr).await,
            };
            match attempt {
                Ok(stream) => {
                    info!(peer = %addr, "connected");
                    return Self::from_stream(stream);
                }
                Err(e) => {
                    debug!(addr = %addr, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        let target = addrs
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(RelayError::Connect {
            target,
            source: last_err
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no addresses to dial")),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Split into the read half, the write half, and their shared close handle.
    pub fn split(self) -> (TcpSource, TcpSink, CloseHandle) {
        let close = CloseHandle::new();
        let (read, write) = self.stream.into_split();
        (
            TcpSource {
                half: read,
                close: close.clone(),
            },
            TcpSink {
                half: write,
                peer: self.peer,
                shut_down: false,
                close: close.clone(),
            },
            close,
        )
    }
}

async fn connect_from(addr: SocketAddr, source_port: u16) -> io::Result<TcpStream> {
    let (socket, local) = if addr.is_ipv4() {
        (TcpSocket::new_v4()?, SocketAddr::from((Ipv4Addr::UNSPECIFIED, source_port)))
    } else {
        (TcpSocket::new_v6()?, SocketAddr::from((Ipv6Addr::UNSPECIFIED, source_port)))
    };
    socket.set_reuseaddr(true)?;
    socket.bind(local)?;
    socket.connect(addr).await
}

/// A bound TCP listener that hands out a single connection.
#[derive(Debug)]
pub struct TcpAcceptor {
    listener: TcpListener,
}

impl TcpAcceptor {
    pub async fn bind(addr: SocketAddr) -> RelayResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| RelayError::Bind { addr, source })?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Wait for the next inbound connection.
    pub async fn accept(&self) -> RelayResult<TcpEndpoint> {
        let (stream, peer) = self.listener.accept().await.map_err(RelayError::Accept)?;
        info!(peer = %peer, "connection accepted");
        Ok(TcpEndpoint { stream, peer })
    }
}

/// Read half of a TCP endpoint.
#[derive(Debug)]
pub struct TcpSource {
    half: OwnedReadHalf,
    close: CloseHandle,
}

impl ByteSource for TcpSource {
    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> IoFuture<'a, usize> {
        Box::pin(async move {
            tokio::select! {
                biased;
                _ = self.close.closed() => Err(closed_error()),
                result = self.half.read(buf) => result,
            }
        })
    }
}

/// Write half of a TCP endpoint.
#[derive(Debug)]
pub struct TcpSink {
    half: OwnedWriteHalf,
    peer: SocketAddr,
    shut_down: bool,
    close: CloseHandle,
}

impl ByteSink for TcpSink {
    fn write_all<'a>(&'a mut self, data: &'a [u8]) -> IoFuture<'a, ()> {
        Box::pin(async move {
            if self.shut_down || self.close.is_closed() {
                return Err(closed_error());
            }
            self.half.write_all(data).await
        })
    }

    /// Shut down the write direction so the peer sees end-of-stream.
    fn close(&mut self) -> IoFuture<'_, ()> {
        Box::pin(async move {
            if self.shut_down {
                return Ok(());
            }
            self.shut_down = true;
            match self.half.shutdown().await {
                Ok(()) => {}
                // The peer may already have torn the connection down.
                Err(e) if e.kind() == io::ErrorKind::NotConnected => {
                    debug!(peer = %self.peer, "shutdown on disconnected socket");
                }
                Err(e) => {
                    warn!(peer = %self.peer, error = %e, "shutdown failed");
                    return Err(e);
                }
            }
            info!(peer = %self.peer, "connection closed");
            Ok(())
        })
    }
}
