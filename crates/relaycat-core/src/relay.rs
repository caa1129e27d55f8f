//! Relay engine: two concurrent copy tasks, first closer wins.
//!
//! A session pairs one connection endpoint with the local input and output
//! streams. Each direction runs as its own spawned task and posts a single
//! [`CopyReport`] on a oneshot channel when it stops. The session ends with
//! whichever task closed the endpoint first; the other task is left to wind
//! down on its own once it observes the closed endpoint.
//!
//! Read errors end a task like a clean end-of-stream (logged at warn).
//! Write errors end the whole session with [`RelayError::Write`].

use crate::error::{RelayError, RelayResult};
use crate::transport::{ByteSink, ByteSource, CloseHandle};
use std::fmt;
use std::io;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Transfer buffer size per copy task. Also the largest UDP datagram that
/// is relayed without truncation.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Which way a copy task moves bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Connection endpoint to local output.
    Inbound,
    /// Local input to connection endpoint.
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => f.write_str("inbound"),
            Direction::Outbound => f.write_str("outbound"),
        }
    }
}

/// How a copy task stopped.
#[derive(Debug)]
pub enum CopyOutcome {
    /// The source reported end-of-stream.
    Finished,
    /// The source failed; treated as a normal end of the task.
    ReadFailed(io::Error),
    /// The destination failed; fatal for the session.
    WriteFailed(io::Error),
}

/// Posted exactly once by every copy task.
#[derive(Debug)]
pub struct CopyReport {
    pub direction: Direction,
    /// Bytes delivered to the destination.
    pub bytes: u64,
    pub outcome: CopyOutcome,
    /// Whether this task was the one that closed the endpoint.
    pub closed_endpoint: bool,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The inbound direction stopped first.
    RemoteClosed,
    /// The outbound direction stopped first.
    LocalTerminated,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::RemoteClosed => f.write_str("remote connection closed"),
            SessionEnd::LocalTerminated => f.write_str("local input terminated"),
        }
    }
}

/// Spawn one copy task moving bytes from `source` to `sink`.
///
/// The task also stops once the endpoint is closed by the other direction.
/// When it stops for any reason it closes the endpoint through `close`,
/// closes `sink`, and then posts its report.
pub fn spawn_copy<S, D>(
    direction: Direction,
    mut source: S,
    mut sink: D,
    buffer_size: usize,
    close: CloseHandle,
) -> oneshot::Receiver<CopyReport>
where
    S: ByteSource + 'static,
    D: ByteSink + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (bytes, outcome) = pump(direction, &mut source, &mut sink, buffer_size, &close).await;

        let closed_endpoint = close.close();
        if closed_endpoint {
            debug!(%direction, "connection endpoint closed");
        }
        if let Err(e) = sink.close().await {
            debug!(%direction, error = %e, "sink close failed");
        }

        debug!(%direction, bytes, "copy task finished");
        let _ = tx.send(CopyReport {
            direction,
            bytes,
            outcome,
            closed_endpoint,
        });
    });
    rx
}

async fn pump<S, D>(
    direction: Direction,
    source: &mut S,
    sink: &mut D,
    buffer_size: usize,
    close: &CloseHandle,
) -> (u64, CopyOutcome)
where
    S: ByteSource + ?Sized,
    D: ByteSink + ?Sized,
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;

    loop {
        // A closed endpoint stops this task even when its source is local
        // input, so its sink is released and the peer sees the shutdown.
        let read = tokio::select! {
            biased;
            _ = close.closed() => {
                debug!(%direction, "endpoint closed, stopping");
                return (total, CopyOutcome::Finished);
            }
            read = source.read(&mut buf) => read,
        };

        let n = match read {
            Ok(0) => {
                debug!(%direction, "end of stream");
                return (total, CopyOutcome::Finished);
            }
            Ok(n) => n,
            Err(e) => {
                warn!(%direction, error = %e, "read error");
                return (total, CopyOutcome::ReadFailed(e));
            }
        };

        if let Err(e) = sink.write_all(&buf[..n]).await {
            if close.is_closed() {
                debug!(%direction, error = %e, "write after endpoint closed");
            } else {
                error!(%direction, error = %e, "write error");
            }
            return (total, CopyOutcome::WriteFailed(e));
        }
        total += n as u64;
    }
}

/// A full-duplex relay between one connection endpoint and local streams.
pub struct RelaySession<S, D> {
    source: S,
    sink: D,
    close: CloseHandle,
    buffer_size: usize,
}

impl<S, D> RelaySession<S, D>
where
    S: ByteSource + 'static,
    D: ByteSink + 'static,
{
    /// Pair the endpoint halves `source`/`sink` sharing the close handle `close`.
    pub fn new(source: S, sink: D, close: CloseHandle) -> Self {
        Self {
            source,
            sink,
            close,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Set the per-task transfer buffer size (minimum 1).
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Relay until either direction stops.
    ///
    /// Returns which side ended the session, or [`RelayError::Write`] if
    /// that side stopped on a write failure.
    pub async fn run<I, O>(self, input: I, output: O) -> RelayResult<SessionEnd>
    where
        I: ByteSource + 'static,
        O: ByteSink + 'static,
    {
        let mut inbound = spawn_copy(
            Direction::Inbound,
            self.source,
            output,
            self.buffer_size,
            self.close.clone(),
        );
        let mut outbound = spawn_copy(
            Direction::Outbound,
            input,
            self.sink,
            self.buffer_size,
            self.close,
        );

        let first = tokio::select! {
            report = &mut inbound => report,
            report = &mut outbound => report,
        };
        let first = first.map_err(|_| RelayError::TaskLost)?;

        // A task knocked over by the other one closing the endpoint can post
        // before the closer does. The closer decides the outcome.
        let report = if first.closed_endpoint {
            first
        } else {
            let other = match first.direction {
                Direction::Inbound => outbound.await,
                Direction::Outbound => inbound.await,
            };
            other.map_err(|_| RelayError::TaskLost)?
        };

        let end = match report.outcome {
            CopyOutcome::WriteFailed(source) => {
                return Err(RelayError::Write {
                    direction: report.direction,
                    source,
                });
            }
            CopyOutcome::Finished | CopyOutcome::ReadFailed(_) => match report.direction {
                Direction::Inbound => SessionEnd::RemoteClosed,
                Direction::Outbound => SessionEnd::LocalTerminated,
            },
        };

        info!(bytes = report.bytes, "{end}");
        Ok(end)
    }
}
