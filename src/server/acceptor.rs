use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Decorates freshly accepted TCP streams before the HTTP engine sees them.
///
/// This is where TLS (or any other transport layer) plugs in: the server
/// calls [`accept`](Acceptor::accept) for every new stream and serves HTTP
/// over whatever it returns. An error drops the stream without affecting
/// the listener.
pub trait Acceptor: Send + Sync + 'static {
    type Transport: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn accept(&self, stream: TcpStream, peer: SocketAddr) -> impl Future<Output = io::Result<Self::Transport>> + Send;
}

/// Serves HTTP directly over the TCP stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainAcceptor;

impl Acceptor for PlainAcceptor {
    type Transport = TcpStream;

    async fn accept(&self, stream: TcpStream, _peer: SocketAddr) -> io::Result<TcpStream> {
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}
