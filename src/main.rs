use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use wicket::config::Config;
use wicket::http::request::Method;
use wicket::{Handler, Request, Response, Server, StatusCode, UpgradeHandler};

/// Greets on GET and echoes request bodies on POST.
struct Greeter;

impl Handler for Greeter {
    async fn handle(&self, request: &mut Request, mut response: Response) {
        let result = match request.method {
            Method::GET | Method::HEAD => response
                .set_header("Content-Type", "text/plain")
                .and_then(|_| response.end_with("Hello from wicket\n")),
            Method::POST | Method::PUT => match request.body_mut().collect().await {
                Ok(body) => response
                    .set_header("Content-Type", "application/octet-stream")
                    .and_then(|_| response.end_with(body)),
                Err(e) => {
                    tracing::debug!(error = %e, "failed to read request body");
                    return;
                }
            },
            _ => response
                .write_head(StatusCode::MethodNotAllowed)
                .and_then(|_| response.end()),
        };

        if let Err(e) = result {
            tracing::debug!(error = %e, "failed to send response");
        }
    }
}

/// Switches `Upgrade: echo` connections to a raw echo protocol.
struct Echo;

impl UpgradeHandler<TcpStream> for Echo {
    async fn on_upgrade(&self, request: Request, head: Bytes, mut stream: TcpStream) {
        if !request.headers.has_token("Upgrade", "echo") {
            let _ = stream
                .write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await;
            return;
        }

        let handshake = b"HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: echo\r\n\r\n";
        if stream.write_all(handshake).await.is_err() || stream.write_all(&head).await.is_err() {
            return;
        }

        let mut buf = [0u8; 4096];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if stream.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let addr = cfg.socket_addr()?;

    let server = Server::builder(Greeter)
        .limits(cfg.limits)
        .upgrade(Echo)
        .build();
    server.bind(addr).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    server.close();

    Ok(())
}
