use bytes::Bytes;
use tokio::sync::mpsc;

use crate::http::headers::Headers;
use crate::http::request::Version;

macro_rules! status_codes {
    ($( $(#[$doc:meta])* $name:ident = ($code:literal, $reason:literal), )+) => {
        /// HTTP status codes.
        ///
        /// Well-known codes have their own variant; anything else in the
        /// `100..=999` range is carried by `Other`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode {
            $( $(#[$doc])* $name, )+
            /// Any other three digit code
            Other(u16),
        }

        impl StatusCode {
            /// Returns the numeric HTTP status code.
            ///
            /// # Example
            ///
            /// ```
            /// # use wicket::http::response::StatusCode;
            /// assert_eq!(StatusCode::Ok.as_u16(), 200);
            /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
            /// ```
            pub fn as_u16(&self) -> u16 {
                match self {
                    $( StatusCode::$name => $code, )+
                    StatusCode::Other(code) => *code,
                }
            }

            /// Returns the standard reason phrase, or an empty string for
            /// codes without one.
            ///
            /// # Example
            ///
            /// ```
            /// # use wicket::http::response::StatusCode;
            /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
            /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
            /// ```
            pub fn reason_phrase(&self) -> &'static str {
                match self {
                    $( StatusCode::$name => $reason, )+
                    StatusCode::Other(_) => "",
                }
            }

            /// Maps a numeric code to its variant. Returns `None` outside
            /// `100..=999`.
            pub fn from_u16(code: u16) -> Option<Self> {
                match code {
                    $( $code => Some(StatusCode::$name), )+
                    100..=999 => Some(StatusCode::Other(code)),
                    _ => None,
                }
            }
        }
    };
}

status_codes! {
    /// 100 Continue
    Continue = (100, "Continue"),
    /// 101 Switching Protocols
    SwitchingProtocols = (101, "Switching Protocols"),
    /// 200 OK
    Ok = (200, "OK"),
    /// 201 Created
    Created = (201, "Created"),
    /// 202 Accepted
    Accepted = (202, "Accepted"),
    /// 204 No Content
    NoContent = (204, "No Content"),
    /// 301 Moved Permanently
    MovedPermanently = (301, "Moved Permanently"),
    /// 302 Found
    Found = (302, "Found"),
    /// 304 Not Modified
    NotModified = (304, "Not Modified"),
    /// 400 Bad Request
    BadRequest = (400, "Bad Request"),
    /// 401 Unauthorized
    Unauthorized = (401, "Unauthorized"),
    /// 403 Forbidden
    Forbidden = (403, "Forbidden"),
    /// 404 Not Found
    NotFound = (404, "Not Found"),
    /// 405 Method Not Allowed
    MethodNotAllowed = (405, "Method Not Allowed"),
    /// 408 Request Timeout
    RequestTimeout = (408, "Request Timeout"),
    /// 411 Length Required
    LengthRequired = (411, "Length Required"),
    /// 413 Payload Too Large
    PayloadTooLarge = (413, "Payload Too Large"),
    /// 426 Upgrade Required
    UpgradeRequired = (426, "Upgrade Required"),
    /// 431 Request Header Fields Too Large
    RequestHeaderFieldsTooLarge = (431, "Request Header Fields Too Large"),
    /// 500 Internal Server Error
    InternalServerError = (500, "Internal Server Error"),
    /// 501 Not Implemented
    NotImplemented = (501, "Not Implemented"),
    /// 502 Bad Gateway
    BadGateway = (502, "Bad Gateway"),
    /// 503 Service Unavailable
    ServiceUnavailable = (503, "Service Unavailable"),
    /// 504 Gateway Timeout
    GatewayTimeout = (504, "Gateway Timeout"),
}

impl StatusCode {
    /// Whether a response with this status never carries a body.
    pub fn is_bodyless(&self) -> bool {
        matches!(self.as_u16(), 100..=199 | 204 | 304)
    }
}

/// Where a [`Response`] is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// Status and headers may still change.
    Initial,
    /// The head is on its way; only body bytes may follow.
    HeadersSent,
    /// Nothing more may be written.
    Ended,
}

/// How the connection should be treated once the response ends.
///
/// Fixed once the head is sent: [`Response::close_connection`] is only
/// accepted before that, so the head always announces the close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseOptions {
    /// Keep the connection open for another request.
    pub keep_alive: bool,
    /// Version of the request being answered.
    pub version: Version,
}

/// Misuse of a [`Response`].
///
/// Returned from the offending call; nothing reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    #[error("response headers were already sent")]
    HeadersSent,
    #[error("response was already ended")]
    Ended,
    #[error("connection is closed")]
    ConnectionClosed,
    #[error("reason phrase contains a line break")]
    InvalidReason,
    #[error("header {0:?} contains a line break or is not a valid name")]
    InvalidHeader(String),
    #[error("Content-Length {0:?} is not a decimal number")]
    InvalidContentLength(String),
}

#[derive(Debug)]
pub(crate) struct ResponseHead {
    pub(crate) status: StatusCode,
    pub(crate) reason: Option<String>,
    pub(crate) headers: Headers,
    pub(crate) keep_alive: bool,
}

/// What a response sends to its connection.
#[derive(Debug)]
pub(crate) enum Frame {
    Head(ResponseHead),
    Data(Bytes),
    End(ResponseOptions),
}

/// The response to one request.
///
/// Every request gets a fresh `Response`. It is `'static` and may be moved
/// into another task; the connection waits for [`end`](Self::end) before it
/// reads the next request. Dropping a response without ending it aborts the
/// exchange.
///
/// # Example
///
/// ```ignore
/// response.set_header("Content-Type", "text/plain")?;
/// response.write("Hello ")?;
/// response.end_with("World\n")?;
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    reason: Option<String>,
    headers: Headers,
    state: WriteState,
    options: ResponseOptions,
    frames: mpsc::UnboundedSender<Frame>,
}

impl Response {
    pub(crate) fn channel(options: ResponseOptions) -> (Response, mpsc::UnboundedReceiver<Frame>) {
        let (frames, rx) = mpsc::unbounded_channel();
        let response = Response {
            status: StatusCode::Ok,
            reason: None,
            headers: Headers::new(),
            state: WriteState::Initial,
            options,
            frames,
        };
        (response, rx)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> Result<(), ResponseError> {
        self.ensure_initial()?;
        self.status = status;
        Ok(())
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Adds or replaces a header.
    ///
    /// # Arguments
    ///
    /// * `key` - Header name (case-insensitive)
    /// * `value` - Header value
    ///
    /// # Errors
    ///
    /// `HeadersSent` once the head was written, `Ended` after `end()`.
    /// `InvalidHeader` for names or values that would break the head,
    /// `InvalidContentLength` for a `Content-Length` that is not a number.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), ResponseError> {
        self.ensure_initial()?;
        let (key, value) = checked_header(key.into(), value.into())?;
        self.headers.set(key, value);
        Ok(())
    }

    /// Adds a header value, keeping any previous values of the same name.
    pub fn append_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), ResponseError> {
        self.ensure_initial()?;
        let (key, value) = checked_header(key.into(), value.into())?;
        self.headers.append(key, value);
        Ok(())
    }

    pub fn remove_header(&mut self, key: &str) -> Result<bool, ResponseError> {
        self.ensure_initial()?;
        Ok(self.headers.remove(key))
    }

    pub fn state(&self) -> WriteState {
        self.state
    }

    pub fn options(&self) -> ResponseOptions {
        self.options
    }

    /// Asks the connection to close once this response ends. The head
    /// then carries `Connection: close`, so this must come before it is
    /// sent.
    pub fn close_connection(&mut self) -> Result<(), ResponseError> {
        self.ensure_initial()?;
        self.options.keep_alive = false;
        Ok(())
    }

    /// Whether the connection this response belongs to has gone away.
    pub fn is_connection_closed(&self) -> bool {
        self.frames.is_closed()
    }

    /// Sends the status line and headers.
    pub fn write_head(&mut self, status: StatusCode) -> Result<(), ResponseError> {
        self.ensure_initial()?;
        self.status = status;
        self.flush_head()
    }

    /// Sends the status line with a custom reason phrase, then the headers.
    pub fn write_head_with_reason(&mut self, status: StatusCode, reason: impl Into<String>) -> Result<(), ResponseError> {
        self.ensure_initial()?;
        let reason = reason.into();
        if has_line_break(&reason) {
            return Err(ResponseError::InvalidReason);
        }
        self.status = status;
        self.reason = Some(reason);
        self.flush_head()
    }

    /// Writes body bytes, sending the head first if needed.
    ///
    /// Without a `Content-Length` header the body is sent chunked to
    /// HTTP/1.1 clients and delimited by closing the connection otherwise.
    pub fn write(&mut self, data: impl Into<Bytes>) -> Result<(), ResponseError> {
        match self.state {
            WriteState::Ended => return Err(ResponseError::Ended),
            WriteState::Initial => self.flush_head()?,
            WriteState::HeadersSent => {}
        }

        let data = data.into();
        if data.is_empty() {
            return Ok(());
        }
        self.send(Frame::Data(data))
    }

    /// Finishes the response.
    pub fn end(&mut self) -> Result<(), ResponseError> {
        match self.state {
            WriteState::Ended => return Err(ResponseError::Ended),
            WriteState::Initial => {
                self.default_content_length(0);
                self.flush_head()?;
            }
            WriteState::HeadersSent => {}
        }

        self.state = WriteState::Ended;
        self.send(Frame::End(self.options))
    }

    /// Writes `data` and finishes the response. If the head was not sent
    /// yet, `Content-Length` is filled in from `data`.
    pub fn end_with(&mut self, data: impl Into<Bytes>) -> Result<(), ResponseError> {
        let data = data.into();
        if self.state == WriteState::Initial {
            self.default_content_length(data.len());
        }
        self.write(data)?;
        self.end()
    }

    fn ensure_initial(&self) -> Result<(), ResponseError> {
        match self.state {
            WriteState::Initial => Ok(()),
            WriteState::HeadersSent => Err(ResponseError::HeadersSent),
            WriteState::Ended => Err(ResponseError::Ended),
        }
    }

    fn default_content_length(&mut self, len: usize) {
        if self.status.is_bodyless()
            || self.headers.contains("Content-Length")
            || self.headers.contains("Transfer-Encoding")
        {
            return;
        }
        self.headers.set("Content-Length", len.to_string());
    }

    fn flush_head(&mut self) -> Result<(), ResponseError> {
        let head = ResponseHead {
            status: self.status,
            reason: self.reason.clone(),
            headers: self.headers.clone(),
            keep_alive: self.options.keep_alive,
        };
        self.send(Frame::Head(head))?;
        self.state = WriteState::HeadersSent;
        Ok(())
    }

    fn send(&self, frame: Frame) -> Result<(), ResponseError> {
        self.frames
            .send(frame)
            .map_err(|_| ResponseError::ConnectionClosed)
    }
}

fn has_line_break(s: &str) -> bool {
    s.bytes().any(|b| b == b'\r' || b == b'\n')
}

fn checked_header(key: String, value: String) -> Result<(String, String), ResponseError> {
    if key.is_empty() || key.bytes().any(|b| b == b':' || b.is_ascii_whitespace()) || has_line_break(&value) {
        return Err(ResponseError::InvalidHeader(key));
    }
    if key.eq_ignore_ascii_case("Content-Length") {
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) || trimmed.parse::<u64>().is_err() {
            return Err(ResponseError::InvalidContentLength(value));
        }
    }
    Ok((key, value))
}
