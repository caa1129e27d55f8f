use crate::relay::Direction;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors produced while setting up or running a relay session.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to resolve {target}: {reason}")]
    Resolve { target: String, reason: String },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error("{direction} write error: {source}")]
    Write {
        direction: Direction,
        #[source]
        source: std::io::Error,
    },

    #[error("copy task ended without reporting")]
    TaskLost,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RelayResult<T> = Result<T, RelayError>;
