use std::future::Future;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::request::Request;
use crate::http::response::Response;

/// Application code answering requests.
///
/// Called once per request, in arrival order, never for two requests of
/// the same connection at once. The request is borrowed for the duration
/// of the call and is reused for the next request afterwards. The response
/// is owned and may outlive the call; the connection moves on once it is
/// ended.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: &mut Request, response: Response) -> impl Future<Output = ()> + Send;
}

/// Takes over a connection whose client asked to switch protocols.
///
/// `head` holds the bytes the server already read past the request head;
/// they belong to the new protocol and must be consumed before reading
/// from `transport`. From here on the implementation owns the transport
/// and is responsible for closing it.
pub trait UpgradeHandler<T>: Send + Sync + 'static {
    fn on_upgrade(&self, request: Request, head: Bytes, transport: T) -> impl Future<Output = ()> + Send;
}

/// Default upgrade handler: refuses by closing the connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloseOnUpgrade;

impl<T> UpgradeHandler<T> for CloseOnUpgrade
where
    T: AsyncWrite + Unpin + Send + 'static,
{
    async fn on_upgrade(&self, request: Request, _head: Bytes, mut transport: T) {
        tracing::debug!(
            peer = ?request.remote_addr(),
            upgrade = request.header("Upgrade"),
            "no upgrade handler installed; closing connection"
        );
        let _ = transport.shutdown().await;
    }
}
