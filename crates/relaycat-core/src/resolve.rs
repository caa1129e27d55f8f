//! Address resolution via `tokio::net::lookup_host`.

use crate::error::{RelayError, RelayResult};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net;
use tracing::{debug, warn};

/// Resolve `host:port` to one or more socket addresses.
///
/// # Errors
///
/// Returns [`RelayError::Resolve`] if the lookup fails or yields nothing.
pub async fn resolve(host: &str, port: u16) -> RelayResult<Vec<SocketAddr>> {
    let target = format!("{host}:{port}");

    match net::lookup_host((host, port)).await {
        Ok(addrs) => {
            let addrs: Vec<SocketAddr> = addrs.collect();
            if addrs.is_empty() {
                warn!(target = %target, "no addresses found");
                return Err(RelayError::Resolve {
                    target,
                    reason: "no addresses found".to_string(),
                });
            }
            debug!(target = %target, count = addrs.len(), "resolved");
            Ok(addrs)
        }
        Err(e) => {
            warn!(target = %target, error = %e, "resolution failed");
            Err(RelayError::Resolve {
                target,
                reason: e.to_string(),
            })
        }
    }
}

/// Wildcard bind addresses for a listener on `port`, in order of preference.
///
/// `[::]` accepts both IPv4 and IPv6 peers on dual-stack hosts; `0.0.0.0`
/// is the fallback where IPv6 is unavailable.
pub fn listen_addrs(port: u16) -> [SocketAddr; 2] {
    [
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)),
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_localhost() {
        let addrs = resolve("localhost", 8080).await.unwrap();
        assert!(!addrs.is_empty());
        assert!(addrs.iter().all(|a| a.port() == 8080));
        assert!(addrs.iter().any(|a| a.ip().is_loopback()));
    }

    #[tokio::test]
    async fn resolves_ip_literal() {
        let addrs = resolve("127.0.0.1", 9).await.unwrap();
        assert_eq!(addrs, vec![SocketAddr::from(([127, 0, 0, 1], 9))]);
    }

    #[tokio::test]
    async fn unknown_host_fails() {
        let err = resolve("this.host.definitely.does.not.exist.invalid", 80)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Resolve { .. }));
    }

    #[test]
    fn listen_addrs_prefer_dual_stack() {
        let [first, fallback] = listen_addrs(4444);
        assert!(first.is_ipv6() && first.ip().is_unspecified());
        assert!(fallback.is_ipv4() && fallback.ip().is_unspecified());
        assert_eq!(first.port(), 4444);
        assert_eq!(fallback.port(), 4444);
    }
}
