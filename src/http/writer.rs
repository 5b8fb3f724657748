use bytes::{BufMut, BytesMut};

use crate::http::request::{Method, Request, Version};
use crate::http::response::{ResponseHead, ResponseOptions, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.1";

/// How the response body is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// No body may be sent (HEAD, 1xx, 204, 304).
    Empty,
    Length { remaining: u64 },
    Chunked,
    /// HTTP/1.0 without a length: the body ends when the connection does.
    UntilClose,
}

/// Serializes the frames of one response onto the wire and decides
/// whether the connection survives it.
#[derive(Debug)]
pub(crate) struct ResponseWriter {
    version: Version,
    client_keep_alive: bool,
    head_request: bool,
    framing: Framing,
    persist: bool,
    head_sent: bool,
    broken: bool,
}

impl ResponseWriter {
    pub(crate) fn new(request: &Request) -> Self {
        Self {
            version: request.version,
            client_keep_alive: request.keep_alive(),
            head_request: request.method == Method::HEAD,
            framing: Framing::Empty,
            persist: false,
            head_sent: false,
            broken: false,
        }
    }

    /// Whether any byte of this response has been produced.
    pub(crate) fn head_sent(&self) -> bool {
        self.head_sent
    }

    pub(crate) fn encode_head(&mut self, head: ResponseHead, buf: &mut BytesMut) {
        let ResponseHead {
            status,
            reason,
            mut headers,
            keep_alive,
        } = head;

        // HTTP/1.0 has no chunked coding.
        let chunked = headers.has_token("Transfer-Encoding", "chunked");
        if chunked && self.version == Version::Http10 {
            headers.remove("Transfer-Encoding");
        }

        self.framing = if status.is_bodyless() && status != StatusCode::NotModified {
            headers.remove("Content-Length");
            headers.remove("Transfer-Encoding");
            Framing::Empty
        } else if self.head_request || status == StatusCode::NotModified {
            Framing::Empty
        } else if chunked && self.version == Version::Http11 {
            // Content-Length must not accompany a transfer coding.
            headers.remove("Content-Length");
            Framing::Chunked
        } else if let Some(len) = headers.get("Content-Length").and_then(|v| v.trim().parse().ok()) {
            Framing::Length { remaining: len }
        } else if self.version == Version::Http11 {
            headers.set("Transfer-Encoding", "chunked");
            Framing::Chunked
        } else {
            Framing::UntilClose
        };

        self.persist = self.client_keep_alive
            && keep_alive
            && !headers.has_token("Connection", "close")
            && self.framing != Framing::UntilClose;

        if !self.persist {
            if !headers.has_token("Connection", "close") {
                headers.set("Connection", "close");
            }
        } else if self.version == Version::Http10 && !headers.has_token("Connection", "keep-alive") {
            headers.set("Connection", "keep-alive");
        }

        let reason = reason.as_deref().unwrap_or(status.reason_phrase());
        buf.put_slice(format!("{} {} {}\r\n", HTTP_VERSION, status.as_u16(), reason).as_bytes());

        for (k, v) in headers.iter() {
            buf.put_slice(k.as_bytes());
            buf.put_slice(b": ");
            buf.put_slice(v.as_bytes());
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"\r\n");

        self.head_sent = true;
    }

    pub(crate) fn encode_data(&mut self, data: &[u8], buf: &mut BytesMut) {
        match &mut self.framing {
            Framing::Empty => {}
            Framing::Length { remaining } => {
                let n = (*remaining).min(data.len() as u64) as usize;
                buf.put_slice(&data[..n]);
                *remaining -= n as u64;
                if n < data.len() {
                    tracing::warn!(
                        excess = data.len() - n,
                        "response body exceeds its Content-Length; truncating"
                    );
                    self.broken = true;
                }
            }
            Framing::Chunked => {
                if !data.is_empty() {
                    buf.put_slice(format!("{:x}\r\n", data.len()).as_bytes());
                    buf.put_slice(data);
                    buf.put_slice(b"\r\n");
                }
            }
            Framing::UntilClose => buf.put_slice(data),
        }
    }

    /// Terminates the body. Returns whether the connection may carry
    /// another request.
    pub(crate) fn encode_end(&mut self, options: ResponseOptions, buf: &mut BytesMut) -> bool {
        match self.framing {
            Framing::Chunked => buf.put_slice(b"0\r\n\r\n"),
            Framing::Length { remaining } if remaining > 0 => {
                tracing::warn!(missing = remaining, "response ended before its Content-Length");
                self.broken = true;
            }
            _ => {}
        }

        self.persist && options.keep_alive && !self.broken
    }
}

/// A complete response the connection sends on its own, before closing.
pub(crate) fn error_response(status: StatusCode) -> BytesMut {
    let body = format!("{} {}\n", status.as_u16(), status.reason_phrase());
    let mut buf = BytesMut::with_capacity(128 + body.len());

    buf.put_slice(
        format!(
            "{} {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            HTTP_VERSION,
            status.as_u16(),
            status.reason_phrase(),
            body.len()
        )
        .as_bytes(),
    );
    buf.put_slice(body.as_bytes());
    buf
}
