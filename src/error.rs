use std::io;
use std::net::SocketAddr;

use crate::http::parser::ParseError;

/// Errors produced by the server and its connections.
///
/// None of these cross from one connection into another: a connection that
/// fails with `MalformedRequest` or `Transport` is torn down on its own.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The listening socket could not be bound (port in use, permission denied...).
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server is already listening on {0}")]
    AlreadyListening(SocketAddr),

    /// The peer sent bytes that are not a valid HTTP/1.x request.
    #[error("malformed request: {0}")]
    MalformedRequest(#[from] ParseError),

    /// I/O failure on the underlying byte stream.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

impl Error {
    /// Whether this error came from the peer's side of the byte stream
    /// (reset, EOF mid-request) rather than from bad input.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
