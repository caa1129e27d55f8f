//! The two ways to establish a session: dial out or listen.

pub mod connect;
pub mod listen;

use anyhow::{Context, Result};
use relaycat_core::{ByteSink, ByteSource, CloseHandle, Local, RelaySession, SessionEnd};

/// Relay an established endpoint against the process stdin/stdout.
pub(crate) async fn relay_stdio<S, D>(
    source: S,
    sink: D,
    close: CloseHandle,
    buffer_size: usize,
) -> Result<SessionEnd>
where
    S: ByteSource + 'static,
    D: ByteSink + 'static,
{
    RelaySession::new(source, sink, close)
        .buffer_size(buffer_size)
        .run(Local::new(tokio::io::stdin()), Local::new(tokio::io::stdout()))
        .await
        .context("relay aborted")
}
