use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc};
use wicket::{Acceptor, Error, Handler, Request, Response, Server};

struct Hello;

impl Handler for Hello {
    async fn handle(&self, request: &mut Request, mut response: Response) {
        let _ = response.end_with(format!("hello {}", request.path()));
    }
}

async fn get(addr: SocketAddr, path: &str) -> io::Result<String> {
    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(format!("GET {} HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n", path).as_bytes())
        .await?;
    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut out)).await??;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn localhost(port: u16) -> SocketAddr {
    SocketAddr::new(Ipv4Addr::LOCALHOST.into(), port)
}

#[tokio::test]
async fn test_listen_on_ephemeral_port() {
    let server = Server::new(Hello);
    assert_eq!(server.server_port(), 0);
    assert!(!server.is_listening());

    assert!(server.listen(Ipv4Addr::LOCALHOST.into(), 0).await);
    assert!(server.is_listening());
    let port = server.server_port();
    assert_ne!(port, 0);

    let out = get(localhost(port), "/there").await.unwrap();
    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.ends_with("hello /there"));
}

#[tokio::test]
async fn test_listen_fails_on_port_in_use() {
    let taken = std::net::TcpListener::bind(localhost(0)).unwrap();
    let port = taken.local_addr().unwrap().port();

    let server = Server::new(Hello);
    assert!(!server.listen(Ipv4Addr::LOCALHOST.into(), port).await);
    assert!(!server.is_listening());
    assert_eq!(server.server_port(), 0);

    assert!(matches!(
        server.bind(localhost(port)).await,
        Err(Error::Bind { .. })
    ));
}

#[tokio::test]
async fn test_listen_twice_fails() {
    let server = Server::new(Hello);
    let addr = server.bind(localhost(0)).await.unwrap();

    assert!(!server.listen(Ipv4Addr::LOCALHOST.into(), 0).await);
    assert!(matches!(
        server.bind(localhost(0)).await,
        Err(Error::AlreadyListening(current)) if current == addr
    ));
    assert_eq!(server.local_addr(), Some(addr));
}

#[tokio::test]
async fn test_close_stops_accepting() {
    let server = Server::new(Hello);
    let addr = server.bind(localhost(0)).await.unwrap();
    assert!(get(addr, "/").await.is_ok());

    server.close();
    server.close();
    assert!(!server.is_listening());
    assert_eq!(server.server_port(), 0);

    // The accept loop stops asynchronously.
    let mut refused = false;
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_err() {
            refused = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(refused);
}

#[tokio::test]
async fn test_listen_again_after_close() {
    let server = Server::new(Hello);
    server.bind(localhost(0)).await.unwrap();
    server.close();

    let addr = server.bind(localhost(0)).await.unwrap();
    assert!(get(addr, "/again").await.unwrap().ends_with("hello /again"));
}

/// Signals when a request arrives and answers once released.
struct Gate {
    started: mpsc::UnboundedSender<()>,
    release: Arc<Notify>,
}

impl Handler for Gate {
    async fn handle(&self, _request: &mut Request, mut response: Response) {
        let _ = self.started.send(());
        self.release.notified().await;
        let _ = response.end_with("finished");
    }
}

#[tokio::test]
async fn test_close_keeps_open_connections() {
    let (started_tx, mut started) = mpsc::unbounded_channel();
    let release = Arc::new(Notify::new());
    let server = Server::new(Gate {
        started: started_tx,
        release: Arc::clone(&release),
    });
    let addr = server.bind(localhost(0)).await.unwrap();

    let client = tokio::spawn(get(addr, "/"));
    started.recv().await.unwrap();

    server.close();
    release.notify_one();

    let out = client.await.unwrap().unwrap();
    assert!(out.ends_with("finished"));
}

/// Plain TCP, counting what it lets through.
#[derive(Clone, Default)]
struct Counting {
    accepted: Arc<AtomicUsize>,
}

impl Acceptor for Counting {
    type Transport = TcpStream;

    async fn accept(&self, stream: TcpStream, _peer: SocketAddr) -> io::Result<TcpStream> {
        self.accepted.fetch_add(1, Ordering::SeqCst);
        Ok(stream)
    }
}

#[tokio::test]
async fn test_custom_acceptor_sees_every_connection() {
    let acceptor = Counting::default();
    let server = Server::builder(Hello).acceptor(acceptor.clone()).build();
    let addr = server.bind(localhost(0)).await.unwrap();

    get(addr, "/1").await.unwrap();
    get(addr, "/2").await.unwrap();

    assert_eq!(acceptor.accepted.load(Ordering::SeqCst), 2);
}

struct Refusing;

impl Acceptor for Refusing {
    type Transport = TcpStream;

    async fn accept(&self, _stream: TcpStream, _peer: SocketAddr) -> io::Result<TcpStream> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "handshake failed"))
    }
}

#[tokio::test]
async fn test_rejecting_acceptor_drops_connection() {
    let server = Server::builder(Hello).acceptor(Refusing).build();
    let addr = server.bind(localhost(0)).await.unwrap();

    // Either a clean EOF or a reset; never a response.
    match get(addr, "/").await {
        Ok(out) => assert!(out.is_empty()),
        Err(e) => assert_ne!(e.kind(), io::ErrorKind::TimedOut),
    }
    assert!(server.is_listening());
}
