use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::Limits;
use crate::error::Error;
use crate::http::connection::Connection;
use crate::http::handler::{CloseOnUpgrade, Handler, UpgradeHandler};
use crate::server::acceptor::{Acceptor, PlainAcceptor};

/// Pause after a failed `accept` (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// An HTTP server: a listener plus the services every connection shares.
///
/// ```ignore
/// let server = Server::builder(MyHandler).upgrade(MyUpgrade).build();
/// if !server.listen(Ipv4Addr::UNSPECIFIED.into(), 0).await {
///     // port in use...
/// }
/// println!("listening on {}", server.server_port());
/// ```
pub struct Server<H, U = CloseOnUpgrade, A = PlainAcceptor> {
    shared: Arc<Shared<H, U, A>>,
    listening: Mutex<Option<Listening>>,
}

struct Shared<H, U, A> {
    handler: Arc<H>,
    upgrade: Arc<U>,
    acceptor: A,
    limits: Limits,
}

struct Listening {
    local_addr: SocketAddr,
    _shutdown: oneshot::Sender<()>,
}

/// Builder for constructing a [`Server`].
pub struct ServerBuilder<H, U = CloseOnUpgrade, A = PlainAcceptor> {
    handler: H,
    upgrade: U,
    acceptor: A,
    limits: Limits,
}

impl<H: Handler> Server<H> {
    /// Creates a server with the default upgrade handler and plain TCP.
    pub fn new(handler: H) -> Self {
        Self::builder(handler).build()
    }

    pub fn builder(handler: H) -> ServerBuilder<H> {
        ServerBuilder {
            handler,
            upgrade: CloseOnUpgrade,
            acceptor: PlainAcceptor,
            limits: Limits::default(),
        }
    }
}

impl<H, U, A> ServerBuilder<H, U, A> {
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Installs the handler for connections asking to switch protocols.
    pub fn upgrade<U2>(self, upgrade: U2) -> ServerBuilder<H, U2, A> {
        ServerBuilder {
            handler: self.handler,
            upgrade,
            acceptor: self.acceptor,
            limits: self.limits,
        }
    }

    /// Installs a transport decorator (TLS...) applied to every accepted stream.
    pub fn acceptor<A2>(self, acceptor: A2) -> ServerBuilder<H, U, A2> {
        ServerBuilder {
            handler: self.handler,
            upgrade: self.upgrade,
            acceptor,
            limits: self.limits,
        }
    }

    pub fn build(self) -> Server<H, U, A> {
        Server {
            shared: Arc::new(Shared {
                handler: Arc::new(self.handler),
                upgrade: Arc::new(self.upgrade),
                acceptor: self.acceptor,
                limits: self.limits,
            }),
            listening: Mutex::new(None),
        }
    }
}

impl<H, U, A> Server<H, U, A>
where
    H: Handler,
    A: Acceptor,
    U: UpgradeHandler<A::Transport>,
{
    /// Starts listening on `address:port`.
    ///
    /// An unspecified address (`0.0.0.0`, `::`) listens on all interfaces;
    /// port 0 picks a free port. Returns `false` if the socket could not be
    /// bound or the server is already listening.
    pub async fn listen(&self, address: IpAddr, port: u16) -> bool {
        match self.bind(SocketAddr::new(address, port)).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "listen failed");
                false
            }
        }
    }

    /// Like [`listen`](Self::listen), reporting why it failed. Returns the
    /// bound address.
    pub async fn bind(&self, addr: SocketAddr) -> Result<SocketAddr, Error> {
        if let Some(current) = self.lock().as_ref() {
            return Err(Error::AlreadyListening(current.local_addr));
        }

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| Error::Bind { addr, source })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        {
            let mut listening = self.lock();
            if let Some(current) = listening.as_ref() {
                // Lost a race with a concurrent bind.
                return Err(Error::AlreadyListening(current.local_addr));
            }
            *listening = Some(Listening {
                local_addr,
                _shutdown: shutdown_tx,
            });
        }

        info!("Listening on {}", local_addr);
        tokio::spawn(accept_loop(listener, Arc::clone(&self.shared), shutdown_rx));

        Ok(local_addr)
    }
}

impl<H, U, A> Server<H, U, A> {
    pub fn is_listening(&self) -> bool {
        self.lock().is_some()
    }

    /// The port the server listens on, or 0 if it is not listening.
    pub fn server_port(&self) -> u16 {
        self.local_addr().map_or(0, |addr| addr.port())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock().as_ref().map(|l| l.local_addr)
    }

    /// Stops accepting connections. Connections already open are served
    /// until they close on their own. Calling it twice is harmless.
    pub fn close(&self) {
        // Dropping the sender stops the accept loop.
        if let Some(listening) = self.lock().take() {
            info!("Closing listener on {}", listening.local_addr);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Listening>> {
        self.listening.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H, U, A> Drop for Server<H, U, A> {
    fn drop(&mut self) {
        self.close();
    }
}

async fn accept_loop<H, U, A>(
    listener: TcpListener,
    shared: Arc<Shared<H, U, A>>,
    mut shutdown: oneshot::Receiver<()>,
) where
    H: Handler,
    A: Acceptor,
    U: UpgradeHandler<A::Transport>,
{
    loop {
        tokio::select! {
            _ = &mut shutdown => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "Accepted connection");
                    let shared = Arc::clone(&shared);
                    tokio::spawn(async move {
                        shared.serve(stream, peer).await;
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
        }
    }

    debug!("Accept loop stopped");
}

impl<H, U, A> Shared<H, U, A>
where
    H: Handler,
    A: Acceptor,
    U: UpgradeHandler<A::Transport>,
{
    async fn serve(&self, stream: TcpStream, peer: SocketAddr) {
        let transport = match self.acceptor.accept(stream, peer).await {
            Ok(transport) => transport,
            Err(e) => {
                debug!(%peer, error = %e, "Acceptor rejected connection");
                return;
            }
        };

        let conn = Connection::new(
            transport,
            Arc::clone(&self.handler),
            Arc::clone(&self.upgrade),
            self.limits,
        )
        .with_peer(peer);

        match conn.run().await {
            Ok(()) => debug!(%peer, "Connection closed"),
            Err(e) if e.is_transport() => debug!(%peer, error = %e, "Connection dropped"),
            Err(e) => debug!(%peer, error = %e, "Connection closed with error"),
        }
    }
}
