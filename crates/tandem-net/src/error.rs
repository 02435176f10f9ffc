//! Connection and stream error types.

use std::net::SocketAddr;

/// Failure while establishing the peer connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The listening socket could not be created.
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Accepting the peer failed.
    #[error("failed to accept peer on {addr}: {source}")]
    Accept {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Connecting failed and the retry budget is spent.
    #[error("failed to connect to {addr} after {attempts} attempts: {source}")]
    Connect {
        addr: SocketAddr,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// A stop signal arrived before the connection was up.
    #[error("connection setup cancelled")]
    Cancelled,
}

/// Failure on an established stream. Always ends the session.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Read or write failed.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection, possibly mid-record.
    #[error("peer closed the connection")]
    Closed,

    /// The link's background tasks have exited.
    #[error("peer link is down")]
    LinkDown,
}

impl StreamError {
    /// Map an I/O error, treating a short read as a closed peer.
    pub(crate) fn from_read(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::Closed
        } else {
            Self::Io(e)
        }
    }
}
