use std::net::SocketAddr;

use crate::state::StateError;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Host name resolution failed.
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        source: std::io::Error,
    },

    /// Host name resolved, but to no usable address.
    #[error("no usable address for {host}")]
    NoAddress { host: String },

    /// Failed to bind the local socket.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Sending a frame failed.
    #[error("failed to send {len} bytes to {addr}: {source}")]
    Send {
        addr: SocketAddr,
        len: usize,
        source: std::io::Error,
    },

    /// Receiving a frame failed.
    #[error("failed to receive frame: {0}")]
    Receive(std::io::Error),

    /// The frame does not fit in one datagram.
    #[error("frame too large for one datagram ({size} bytes, max {max})")]
    DatagramTooLarge { size: usize, max: usize },

    /// No socket is attached (the transport was detached or never attached).
    #[error("transport not attached to the network")]
    NotAttached,

    /// The peer side of an in-process transport went away.
    #[error("transport closed")]
    Closed,

    /// The association is not in a state that permits the operation.
    #[error(transparent)]
    State(#[from] StateError),

    /// An I/O error occurred on the transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
