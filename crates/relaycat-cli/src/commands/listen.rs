//! `relaycat -l [-u] <port>` — wait for a single peer.

use super::relay_stdio;
use crate::args::Protocol;
use anyhow::{Context, Result};
use relaycat_core::{listen_addrs, RelayResult, SessionEnd, TcpAcceptor, UdpEndpoint};
use std::future::Future;
use std::net::SocketAddr;
use tracing::{debug, info};

/// Listen on `port`, take one peer, and relay stdin/stdout with it.
///
/// For UDP the peer is whoever sends the first datagram; input typed
/// before then is discarded.
pub async fn run(protocol: Protocol, port: u16, buffer_size: usize) -> Result<SessionEnd> {
    match protocol {
        Protocol::Tcp => {
            let acceptor = bind_first(port, TcpAcceptor::bind)
                .await
                .with_context(|| format!("cannot listen on tcp port {port}"))?;
            info!(addr = %acceptor.local_addr()?, "listening");

            let endpoint = acceptor.accept().await.context("accept failed")?;
            info!(peer = %endpoint.peer_addr(), "connection from peer");
            // One session only: stop accepting further connections.
            drop(acceptor);

            let (source, sink, close) = endpoint.split();
            relay_stdio(source, sink, close, buffer_size).await
        }
        Protocol::Udp => {
            let endpoint = bind_first(port, UdpEndpoint::listen)
                .await
                .with_context(|| format!("cannot listen on udp port {port}"))?;
            info!(addr = %endpoint.local_addr()?, "waiting for remote peer");

            let rendezvous = endpoint.rendezvous().clone();
            tokio::spawn(async move {
                let peer = rendezvous.learned().await;
                info!(peer = %peer, "connected from peer");
            });

            let (source, sink, close) = endpoint.split();
            relay_stdio(source, sink, close, buffer_size).await
        }
    }
}

/// Bind the first wildcard address that works, dual-stack first.
async fn bind_first<T, F, Fut>(port: u16, bind: F) -> RelayResult<T>
where
    F: Fn(SocketAddr) -> Fut,
    Fut: Future<Output = RelayResult<T>>,
{
    let [preferred, fallback] = listen_addrs(port);
    match bind(preferred).await {
        Ok(bound) => Ok(bound),
        Err(e) => {
            debug!(addr = %preferred, error = %e, "falling back to ipv4 wildcard");
            bind(fallback).await
        }
    }
}
