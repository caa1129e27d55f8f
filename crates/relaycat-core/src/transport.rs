//! Byte-stream halves shared by the relay engine and the connection endpoints.
//!
//! The engine only ever sees a [`ByteSource`] and a [`ByteSink`]; TCP, UDP and
//! the process std streams all plug in behind these two traits.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

/// Boxed I/O future returned by the stream traits.
pub type IoFuture<'a, T> = Pin<Box<dyn Future<Output = io::Result<T>> + Send + 'a>>;

/// The readable half of a stream.
pub trait ByteSource: Send {
    /// Read up to `buf.len()` bytes. Returns number of bytes read, 0 = EOF.
    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> IoFuture<'a, usize>;
}

/// The writable half of a stream.
pub trait ByteSink: Send {
    /// Write all bytes.
    fn write_all<'a>(&'a mut self, data: &'a [u8]) -> IoFuture<'a, ()>;

    /// Release the sink. Must tolerate being called more than once.
    fn close(&mut self) -> IoFuture<'_, ()>;
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> IoFuture<'a, usize> {
        (**self).read(buf)
    }
}

impl<T: ByteSink + ?Sized> ByteSink for Box<T> {
    fn write_all<'a>(&'a mut self, data: &'a [u8]) -> IoFuture<'a, ()> {
        (**self).write_all(data)
    }

    fn close(&mut self) -> IoFuture<'_, ()> {
        (**self).close()
    }
}

/// Adapter for local tokio streams (process stdin/stdout, in-memory pipes).
///
/// Every chunk written is flushed immediately. Closing only flushes: the
/// process std streams are reclaimed on exit, never closed by the relay.
#[derive(Debug)]
pub struct Local<T> {
    inner: T,
}

impl<T> Local<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T: AsyncRead + Unpin + Send> ByteSource for Local<T> {
    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> IoFuture<'a, usize> {
        Box::pin(self.inner.read(buf))
    }
}

impl<T: AsyncWrite + Unpin + Send> ByteSink for Local<T> {
    fn write_all<'a>(&'a mut self, data: &'a [u8]) -> IoFuture<'a, ()> {
        Box::pin(async move {
            self.inner.write_all(data).await?;
            self.inner.flush().await
        })
    }

    fn close(&mut self) -> IoFuture<'_, ()> {
        Box::pin(self.inner.flush())
    }
}

/// Shared close flag for one connection endpoint.
///
/// Cloned into both copy tasks. Closing is idempotent: only the first call
/// flips the flag, every later call is a no-op.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    state: Arc<watch::Sender<bool>>,
}

impl Default for CloseHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CloseHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Mark the endpoint closed. Returns `true` only for the call that
    /// actually closed it.
    pub fn close(&self) -> bool {
        self.state.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        })
    }

    pub fn is_closed(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once the endpoint has been closed (immediately if it already is).
    pub async fn closed(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this only returns once closed.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

/// Error returned by endpoint halves used after their endpoint was closed.
pub(crate) fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "use of closed connection endpoint")
}
