//! `relaycat [-u] [-p source_port] <hostname> <port>` — dial a peer.

use super::relay_stdio;
use crate::args::Protocol;
use anyhow::{Context, Result};
use relaycat_core::{resolve, SessionEnd, TcpEndpoint, UdpEndpoint};
use tracing::info;

/// Dial `host:port` and relay stdin/stdout over the connection.
pub async fn run(
    protocol: Protocol,
    host: &str,
    port: u16,
    source_port: Option<u16>,
    buffer_size: usize,
) -> Result<SessionEnd> {
    info!(%protocol, host = %host, port, ?source_port, "connecting");

    let addrs = resolve(host, port)
        .await
        .with_context(|| format!("cannot resolve {host}:{port}"))?;
    info!(addrs = ?addrs, "address resolved");

    match protocol {
        Protocol::Tcp => {
            let endpoint = TcpEndpoint::connect(&addrs, source_port)
                .await
                .with_context(|| format!("failed to connect to {host}:{port}"))?;
            info!(peer = %endpoint.peer_addr(), "connected to {host}:{port}");

            let (source, sink, close) = endpoint.split();
            relay_stdio(source, sink, close, buffer_size).await
        }
        Protocol::Udp => {
            // A connected UDP socket has a single peer. Prefer IPv4, which a
            // listener reaches whether it bound dual-stack or IPv4 only.
            let peer = addrs
                .iter()
                .find(|a| a.is_ipv4())
                .or_else(|| addrs.first())
                .copied()
                .with_context(|| format!("no address for {host}:{port}"))?;
            let endpoint = UdpEndpoint::connect(peer, source_port)
                .await
                .with_context(|| format!("failed to open udp socket to {peer}"))?;

            let (source, sink, close) = endpoint.split();
            relay_stdio(source, sink, close, buffer_size).await
        }
    }
}
