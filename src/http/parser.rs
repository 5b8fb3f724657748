use bytes::{Buf, Bytes, BytesMut};

use crate::config::Limits;
use crate::http::headers::Headers;
use crate::http::request::{Method, Version};
use crate::http::response::StatusCode;

/// Longest accepted chunk-size line, extensions included.
const MAX_CHUNK_LINE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid request line")]
    InvalidRequestLine,
    #[error("unknown request method")]
    InvalidMethod,
    #[error("unsupported HTTP version")]
    UnsupportedVersion,
    #[error("invalid header line")]
    InvalidHeader,
    #[error("request head exceeds {0} bytes")]
    HeaderTooLarge(usize),
    #[error("invalid Content-Length")]
    InvalidContentLength,
    #[error("invalid chunked encoding")]
    InvalidChunk,
    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(u64),
}

impl ParseError {
    /// The client-error status answered for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ParseError::HeaderTooLarge(_) => StatusCode::RequestHeaderFieldsTooLarge,
            ParseError::BodyTooLarge(_) => StatusCode::PayloadTooLarge,
            _ => StatusCode::BadRequest,
        }
    }
}

/// A parsed request line and header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    pub target: String,
    pub version: Version,
    pub headers: Headers,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParserEvent {
    HeadComplete(RequestHead),
    BodyChunk(Bytes),
    RequestComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Head,
    Body { remaining: u64 },
    ChunkSize,
    ChunkData { remaining: u64 },
    ChunkDataEnd,
    Trailers { read: usize },
    /// Body finished, `RequestComplete` not yet emitted.
    Complete,
    /// Waiting for `reset` before the next request.
    Done,
}

/// Incremental HTTP/1.x request parser.
///
/// Feed it the connection buffer through [`next_event`](Self::next_event);
/// it consumes what it recognizes and leaves the rest. After
/// `RequestComplete` it stops consuming until [`reset`](Self::reset), so
/// pipelined requests stay buffered until the connection is ready for them.
#[derive(Debug)]
pub struct RequestParser {
    state: State,
    max_header_size: usize,
    max_body_size: u64,
    body_read: u64,
}

struct LineTooLong;

impl RequestParser {
    pub fn new(limits: Limits) -> Self {
        Self {
            state: State::Head,
            max_header_size: limits.max_header_size,
            max_body_size: limits.max_body_size,
            body_read: 0,
        }
    }

    /// Prepares for the next request head.
    pub fn reset(&mut self) {
        self.state = State::Head;
        self.body_read = 0;
    }

    /// Whether the current request has been fully consumed.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Returns the next event available in `buf`, or `None` if more bytes
    /// are needed.
    pub fn next_event(&mut self, buf: &mut BytesMut) -> Result<Option<ParserEvent>, ParseError> {
        loop {
            match self.state {
                State::Head => return self.parse_head(buf),
                State::Body { remaining } => {
                    let Some((chunk, remaining)) = take_body(buf, remaining) else {
                        return Ok(None);
                    };
                    self.state = if remaining == 0 {
                        State::Complete
                    } else {
                        State::Body { remaining }
                    };
                    return Ok(Some(ParserEvent::BodyChunk(chunk)));
                }
                State::ChunkSize => {
                    let line = match take_line(buf, MAX_CHUNK_LINE) {
                        Ok(Some(line)) => line,
                        Ok(None) => return Ok(None),
                        Err(LineTooLong) => return Err(ParseError::InvalidChunk),
                    };
                    let size = parse_chunk_size(&line)?;
                    if size == 0 {
                        self.state = State::Trailers { read: 0 };
                    } else {
                        self.count_body(size)?;
                        self.state = State::ChunkData { remaining: size };
                    }
                }
                State::ChunkData { remaining } => {
                    let Some((chunk, remaining)) = take_body(buf, remaining) else {
                        return Ok(None);
                    };
                    self.state = if remaining == 0 {
                        State::ChunkDataEnd
                    } else {
                        State::ChunkData { remaining }
                    };
                    return Ok(Some(ParserEvent::BodyChunk(chunk)));
                }
                State::ChunkDataEnd => match take_line(buf, 2) {
                    Ok(Some(line)) if line.is_empty() => self.state = State::ChunkSize,
                    Ok(Some(_)) | Err(LineTooLong) => return Err(ParseError::InvalidChunk),
                    Ok(None) => return Ok(None),
                },
                State::Trailers { read } => {
                    let limit = self.max_header_size.saturating_sub(read);
                    let line = match take_line(buf, limit) {
                        Ok(Some(line)) => line,
                        Ok(None) => return Ok(None),
                        Err(LineTooLong) => return Err(ParseError::HeaderTooLarge(self.max_header_size)),
                    };
                    if line.is_empty() {
                        self.state = State::Complete;
                    } else if !line.contains(&b':') {
                        return Err(ParseError::InvalidChunk);
                    } else {
                        self.state = State::Trailers { read: read + line.len() };
                    }
                }
                State::Complete => {
                    self.state = State::Done;
                    return Ok(Some(ParserEvent::RequestComplete));
                }
                State::Done => return Ok(None),
            }
        }
    }

    fn parse_head(&mut self, buf: &mut BytesMut) -> Result<Option<ParserEvent>, ParseError> {
        // Some clients send stray CRLFs between requests.
        loop {
            if buf.starts_with(b"\r\n") {
                buf.advance(2);
            } else if buf.starts_with(b"\n") {
                buf.advance(1);
            } else {
                break;
            }
        }

        let Some(end) = find_head_end(buf) else {
            if buf.len() > self.max_header_size {
                return Err(ParseError::HeaderTooLarge(self.max_header_size));
            }
            return Ok(None);
        };
        if end > self.max_header_size {
            return Err(ParseError::HeaderTooLarge(self.max_header_size));
        }

        let raw = buf.split_to(end);
        let head = parse_head_block(&raw)?;
        self.state = body_state(&head.headers, self.max_body_size)?;
        self.body_read = 0;

        tracing::trace!(
            method = %head.method,
            target = %head.target,
            headers = head.headers.len(),
            "parsed request head"
        );

        Ok(Some(ParserEvent::HeadComplete(head)))
    }

    fn count_body(&mut self, len: u64) -> Result<(), ParseError> {
        self.body_read = self.body_read.saturating_add(len);
        if self.body_read > self.max_body_size {
            return Err(ParseError::BodyTooLarge(self.max_body_size));
        }
        Ok(())
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

/// Length of the head including its terminating empty line.
fn find_head_end(buf: &[u8]) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = buf[from..].iter().position(|&b| b == b'\n') {
        let nl = from + pos;
        match buf.get(nl + 1) {
            Some(b'\n') => return Some(nl + 2),
            Some(b'\r') if buf.get(nl + 2) == Some(&b'\n') => return Some(nl + 3),
            _ => {}
        }
        from = nl + 1;
    }
    None
}

fn parse_head_block(raw: &[u8]) -> Result<RequestHead, ParseError> {
    let mut lines = raw
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line));

    let request_line = lines.next().ok_or(ParseError::InvalidRequestLine)?;
    let request_line =
        std::str::from_utf8(request_line).map_err(|_| ParseError::InvalidRequestLine)?;

    let mut parts = request_line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::InvalidRequestLine);
    };
    if method.is_empty() || target.is_empty() || version.is_empty() {
        return Err(ParseError::InvalidRequestLine);
    }

    let method = Method::from_str(method).ok_or(ParseError::InvalidMethod)?;
    let version = match Version::from_str(version) {
        Some(version) => version,
        None if version.starts_with("HTTP/") => return Err(ParseError::UnsupportedVersion),
        None => return Err(ParseError::InvalidRequestLine),
    };

    let mut headers = Headers::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let (name, value) = parse_header_line(line)?;
        headers.append(name, value);
    }

    Ok(RequestHead {
        method,
        target: target.to_string(),
        version,
        headers,
    })
}

fn parse_header_line(line: &[u8]) -> Result<(&str, &str), ParseError> {
    // Obsolete line folding is not supported.
    if line.starts_with(b" ") || line.starts_with(b"\t") {
        return Err(ParseError::InvalidHeader);
    }

    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidHeader)?;
    let (name, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;

    if name.is_empty() || !name.bytes().all(is_token_char) {
        return Err(ParseError::InvalidHeader);
    }

    Ok((name, value.trim_matches(|c| c == ' ' || c == '\t')))
}

fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn body_state(headers: &Headers, max_body_size: u64) -> Result<State, ParseError> {
    if headers.contains("Transfer-Encoding") {
        if headers.contains("Content-Length") {
            return Err(ParseError::InvalidHeader);
        }

        let last = headers
            .get_all("Transfer-Encoding")
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|coding| !coding.is_empty())
            .last();

        return match last {
            Some(coding) if coding.eq_ignore_ascii_case("chunked") => Ok(State::ChunkSize),
            _ => Err(ParseError::InvalidHeader),
        };
    }

    let mut length = None;
    for value in headers.get_all("Content-Length").flat_map(|v| v.split(',')) {
        let value = value.trim();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidContentLength);
        }
        let parsed: u64 = value.parse().map_err(|_| ParseError::InvalidContentLength)?;
        match length {
            Some(previous) if previous != parsed => return Err(ParseError::InvalidContentLength),
            _ => length = Some(parsed),
        }
    }

    match length {
        None | Some(0) => Ok(State::Complete),
        Some(len) if len > max_body_size => Err(ParseError::BodyTooLarge(max_body_size)),
        Some(len) => Ok(State::Body { remaining: len }),
    }
}

fn parse_chunk_size(line: &[u8]) -> Result<u64, ParseError> {
    let size = match line.iter().position(|&b| b == b';') {
        Some(ext) => &line[..ext],
        None => line,
    };
    let size = size.trim_ascii();

    if size.is_empty() || size.len() > 16 || !size.iter().all(u8::is_ascii_hexdigit) {
        return Err(ParseError::InvalidChunk);
    }

    // hex digits are ASCII
    let digits = std::str::from_utf8(size).map_err(|_| ParseError::InvalidChunk)?;
    u64::from_str_radix(digits, 16).map_err(|_| ParseError::InvalidChunk)
}

/// Takes up to `remaining` body bytes from `buf`.
fn take_body(buf: &mut BytesMut, remaining: u64) -> Option<(Bytes, u64)> {
    if buf.is_empty() {
        return None;
    }
    let n = remaining.min(buf.len() as u64) as usize;
    let chunk = buf.split_to(n).freeze();
    Some((chunk, remaining - n as u64))
}

/// Takes one line (without its line ending) from `buf`.
fn take_line(buf: &mut BytesMut, max: usize) -> Result<Option<BytesMut>, LineTooLong> {
    let Some(nl) = buf.iter().position(|&b| b == b'\n') else {
        if buf.len() > max {
            return Err(LineTooLong);
        }
        return Ok(None);
    };
    if nl > max {
        return Err(LineTooLong);
    }

    let mut line = buf.split_to(nl + 1);
    line.truncate(nl);
    if line.last() == Some(&b'\r') {
        line.truncate(nl - 1);
    }
    Ok(Some(line))
}
