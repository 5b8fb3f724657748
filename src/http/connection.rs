use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::config::Limits;
use crate::error::Error;
use crate::http::body::{Body, BodyError, BodySender};
use crate::http::handler::{Handler, UpgradeHandler};
use crate::http::parser::{ParseError, ParserEvent, RequestHead, RequestParser};
use crate::http::request::Request;
use crate::http::response::{Frame, Response, ResponseOptions, StatusCode};
use crate::http::writer::{ResponseWriter, error_response};

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Reading the next request head.
    AwaitingRequest,
    /// Dispatched; body bytes are still arriving.
    ReceivingBody,
    /// Request fully read; waiting for the application to end the response.
    AwaitingAppCompletion,
    /// Response ended on a persistent connection.
    KeepAlive,
    Closing,
    /// Handed off to an upgrade handler.
    Upgraded,
}

/// One HTTP/1.x connection over any byte stream.
///
/// Requests are answered strictly one at a time. Bytes of pipelined
/// requests are read and buffered while the application works on the
/// current one, but they are not parsed until its response has ended.
pub struct Connection<T, H, U> {
    reader: ReadHalf<T>,
    writer: WriteHalf<T>,
    buffer: BytesMut,
    out: BytesMut,
    parser: RequestParser,
    request: Request,
    state: ConnectionState,
    peer: Option<SocketAddr>,
    peer_closed: bool,
    limits: Limits,
    handler: Arc<H>,
    upgrade: Arc<U>,
}

impl<T, H, U> Connection<T, H, U>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    H: Handler,
    U: UpgradeHandler<T>,
{
    pub fn new(transport: T, handler: Arc<H>, upgrade: Arc<U>, limits: Limits) -> Self {
        let (reader, writer) = tokio::io::split(transport);
        Self {
            reader,
            writer,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            out: BytesMut::new(),
            parser: RequestParser::new(limits),
            request: Request::default(),
            state: ConnectionState::AwaitingRequest,
            peer: None,
            peer_closed: false,
            limits,
            handler,
            upgrade,
        }
    }

    /// Records the peer address, exposed as [`Request::remote_addr`].
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Serves requests until the connection closes or is upgraded.
    pub async fn run(mut self) -> Result<(), Error> {
        loop {
            self.set_state(ConnectionState::AwaitingRequest);

            let head = match self.read_head().await {
                Ok(Some(head)) => head,
                Ok(None) => break,
                Err(Error::MalformedRequest(e)) => {
                    self.reject(&e).await;
                    return Err(e.into());
                }
                Err(e) => {
                    self.set_state(ConnectionState::Closing);
                    return Err(e);
                }
            };

            self.request.reset();
            self.request.populate(head, Body::empty(), self.peer);

            if self.request.is_upgrade() {
                return self.hand_off().await;
            }

            let (body_tx, body) = Body::channel();
            *self.request.body_mut() = body;

            match self.exchange(body_tx).await {
                Ok(true) => {
                    self.set_state(ConnectionState::KeepAlive);
                    self.parser.reset();
                }
                Ok(false) => break,
                Err(e) => {
                    self.set_state(ConnectionState::Closing);
                    return Err(e);
                }
            }
        }

        self.set_state(ConnectionState::Closing);
        if let Err(e) = self.writer.shutdown().await {
            tracing::trace!(peer = ?self.peer, error = %e, "shutdown failed");
        }
        Ok(())
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            tracing::trace!(peer = ?self.peer, from = ?self.state, to = ?state, "connection state");
            self.state = state;
        }
    }

    async fn read_head(&mut self) -> Result<Option<RequestHead>, Error> {
        loop {
            // The parser only yields heads until the request is dispatched.
            if let Some(ParserEvent::HeadComplete(head)) = self.parser.next_event(&mut self.buffer)? {
                return Ok(Some(head));
            }

            if self.peer_closed {
                if !self.buffer.is_empty() {
                    tracing::debug!(
                        peer = ?self.peer,
                        bytes = self.buffer.len(),
                        "peer closed with an incomplete request buffered"
                    );
                }
                return Ok(None);
            }

            self.buffer.reserve(READ_CHUNK);
            let n = self.reader.read_buf(&mut self.buffer).await?;
            tracing::trace!(peer = ?self.peer, bytes = n, "read");
            if n == 0 {
                self.peer_closed = true;
            }
        }
    }

    /// Answers a request that could not be parsed, then closes.
    async fn reject(&mut self, error: &ParseError) {
        self.set_state(ConnectionState::Closing);
        tracing::debug!(peer = ?self.peer, error = %error, "rejecting malformed request");

        if let Err(e) = write_error(&mut self.writer, error.status()).await {
            tracing::trace!(peer = ?self.peer, error = %e, "failed to send error response");
        }
        let _ = self.writer.shutdown().await;
    }

    /// Runs one request/response exchange. Returns whether the connection
    /// stays open for the next request.
    async fn exchange(&mut self, body_tx: BodySender) -> Result<bool, Error> {
        let handler = Arc::clone(&self.handler);
        let Self {
            reader,
            writer,
            buffer,
            out,
            parser,
            request,
            state,
            peer,
            peer_closed,
            limits,
            ..
        } = self;

        tracing::debug!(
            peer = ?peer,
            method = %request.method,
            target = %request.target,
            "request ready"
        );

        let mut body_tx = Some(body_tx);
        *state = ConnectionState::ReceivingBody;

        if let Err(e) = drive_body(parser, buffer, &mut body_tx) {
            tracing::debug!(peer = ?peer, error = %e, "rejecting malformed request body");
            write_error(writer, e.status()).await?;
            return Err(e.into());
        }

        let mut response_writer = ResponseWriter::new(request);
        let options = ResponseOptions {
            keep_alive: request.keep_alive(),
            version: request.version,
        };
        let (response, mut frames) = Response::channel(options);

        let fut = handler.handle(request, response);
        tokio::pin!(fut);
        let mut handler_done = false;

        loop {
            if body_tx.is_none() && *state == ConnectionState::ReceivingBody {
                tracing::trace!(peer = ?peer, "request body complete");
                *state = ConnectionState::AwaitingAppCompletion;
            }
            let can_read = !*peer_closed
                && (body_tx.is_some() || buffer.len() < limits.pipeline_buffer);

            tokio::select! {
                biased;

                frame = frames.recv() => match frame {
                    Some(Frame::Head(head)) => {
                        response_writer.encode_head(head, out);
                        writer.write_all(&out[..]).await?;
                        out.clear();
                    }
                    Some(Frame::Data(data)) => {
                        response_writer.encode_data(&data, out);
                        writer.write_all(&out[..]).await?;
                        out.clear();
                    }
                    Some(Frame::End(options)) => {
                        let mut persist = response_writer.encode_end(options, out);
                        writer.write_all(&out[..]).await?;
                        writer.flush().await?;
                        out.clear();

                        if body_tx.take().is_some() {
                            // The rest of the body was never read, so the
                            // next request cannot be located.
                            persist = false;
                        }
                        if !handler_done {
                            fut.as_mut().await;
                        }
                        return Ok(persist);
                    }
                    None => {
                        if response_writer.head_sent() {
                            tracing::debug!(peer = ?peer, "response dropped mid-body; aborting connection");
                        } else {
                            tracing::debug!(peer = ?peer, "response dropped without being ended");
                            write_error(writer, StatusCode::InternalServerError).await?;
                        }
                        if !handler_done {
                            fut.as_mut().await;
                        }
                        return Ok(false);
                    }
                },

                () = &mut fut, if !handler_done => {
                    handler_done = true;
                }

                read = reader.read_buf(buffer), if can_read => {
                    let n = read?;
                    tracing::trace!(peer = ?peer, bytes = n, "read");

                    if n == 0 {
                        *peer_closed = true;
                        if let Some(tx) = body_tx.take() {
                            tx.fail(BodyError::Aborted);
                            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
                        }
                    } else if let Err(e) = drive_body(parser, buffer, &mut body_tx) {
                        if response_writer.head_sent() {
                            tracing::debug!(peer = ?peer, error = %e, "malformed request body; aborting connection");
                        } else {
                            tracing::debug!(peer = ?peer, error = %e, "rejecting malformed request body");
                            write_error(writer, e.status()).await?;
                        }
                        return Err(e.into());
                    }
                }
            }
        }
    }

    /// Gives the transport away to the upgrade handler, along with the
    /// bytes already read past the request head.
    async fn hand_off(mut self) -> Result<(), Error> {
        self.set_state(ConnectionState::Upgraded);

        let Self {
            reader,
            writer,
            mut buffer,
            request,
            peer,
            upgrade,
            ..
        } = self;

        let head = buffer.split().freeze();
        tracing::debug!(
            peer = ?peer,
            method = %request.method,
            target = %request.target,
            upgrade = request.header("Upgrade"),
            buffered = head.len(),
            "handing connection off to upgrade handler"
        );

        let transport = reader.unsplit(writer);
        upgrade.on_upgrade(request, head, transport).await;
        Ok(())
    }
}

/// Feeds buffered bytes of the current body to the application.
fn drive_body(
    parser: &mut RequestParser,
    buffer: &mut BytesMut,
    body_tx: &mut Option<BodySender>,
) -> Result<(), ParseError> {
    loop {
        let Some(tx) = body_tx.as_ref() else {
            return Ok(());
        };

        let event = match parser.next_event(buffer) {
            Ok(event) => event,
            Err(e) => {
                if let Some(tx) = body_tx.take() {
                    tx.fail(BodyError::Malformed);
                }
                return Err(e);
            }
        };

        match event {
            Some(ParserEvent::BodyChunk(chunk)) => tx.chunk(chunk),
            Some(ParserEvent::RequestComplete) => {
                if let Some(tx) = body_tx.take() {
                    tx.finish();
                }
            }
            Some(ParserEvent::HeadComplete(_)) | None => return Ok(()),
        }
    }
}

async fn write_error<W>(writer: &mut W, status: StatusCode) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&error_response(status)).await?;
    writer.flush().await
}
