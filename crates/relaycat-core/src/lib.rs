//! relaycat-core: the relay engine behind the `relaycat` CLI.
//!
//! Provides the full-duplex copy engine, the UDP rendezvous cell, TCP and UDP
//! connection endpoints, and address resolution.

pub mod error;
pub mod relay;
pub mod rendezvous;
pub mod resolve;
pub mod tcp;
pub mod transport;
pub mod udp;

// Re-export commonly used items at crate root.
pub use error::{RelayError, RelayResult};
pub use relay::{CopyOutcome, CopyReport, Direction, RelaySession, SessionEnd, DEFAULT_BUFFER_SIZE};
pub use rendezvous::Rendezvous;
pub use resolve::{listen_addrs, resolve};
pub use tcp::{TcpAcceptor, TcpEndpoint};
pub use transport::{ByteSink, ByteSource, CloseHandle, Local};
pub use udp::UdpEndpoint;
