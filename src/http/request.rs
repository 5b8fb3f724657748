use std::fmt;
use std::net::SocketAddr;

use crate::http::body::Body;
use crate::http::headers::Headers;
use crate::http::parser::RequestHead;

/// HTTP request methods.
///
/// Requests with a method outside this set are rejected by the parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    #[default]
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// CONNECT - Establish a tunnel (handled as an upgrade)
    CONNECT,
    /// TRACE - Message loop-back test
    TRACE,
}

/// HTTP protocol versions understood by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Version {
    Http10,
    #[default]
    Http11,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of the method (case-sensitive, uppercase)
    ///
    /// # Returns
    ///
    /// `Some(Method)` if the string matches a known method, `None` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// # use wicket::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            "CONNECT" => Some(Method::CONNECT),
            "TRACE" => Some(Method::TRACE),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::CONNECT => "CONNECT",
            Method::TRACE => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Version {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "HTTP/1.0" => Some(Version::Http10),
            "HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request as seen by application code.
///
/// A connection owns a single `Request` and reuses it for every request it
/// carries: before each dispatch it is [`reset`](Request::reset) and filled
/// with the new head. Do not use the address or identity of a `Request` to
/// tell requests (or clients) apart.
#[derive(Debug, Default)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target as sent on the request line (e.g. "/index.html?x=1")
    pub target: String,
    /// HTTP version of the request line
    pub version: Version,
    /// Request headers, case-insensitive and multi-valued
    pub headers: Headers,
    body: Body,
    remote_addr: Option<SocketAddr>,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    target: Option<String>,
    version: Version,
    headers: Headers,
    body: Option<Vec<u8>>,
    remote_addr: Option<SocketAddr>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            target: None,
            version: Version::Http11,
            headers: Headers::new(),
            body: None,
            remote_addr: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Appends a header; repeated names are kept as separate values.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(key, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            target: self.target.ok_or("target missing")?,
            version: self.version,
            headers: self.headers,
            body: self.body.map(Body::from).unwrap_or_default(),
            remote_addr: self.remote_addr,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Clears every field so the slot can carry the next request.
    pub fn reset(&mut self) {
        self.method = Method::default();
        self.target.clear();
        self.version = Version::default();
        self.headers.clear();
        self.body = Body::empty();
        self.remote_addr = None;
    }

    /// Refills a reset slot from a freshly parsed head.
    pub(crate) fn populate(&mut self, head: RequestHead, body: Body, remote_addr: Option<SocketAddr>) {
        self.method = head.method;
        self.target = head.target;
        self.version = head.version;
        self.headers = head.headers;
        self.body = body;
        self.remote_addr = remote_addr;
    }

    /// Retrieves the first value of a header (case-insensitive).
    ///
    /// # Arguments
    ///
    /// * `key` - Header name to look up
    ///
    /// # Returns
    ///
    /// `Some(&str)` with the header value if present, `None` otherwise.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// Retrieves the Content-Length header value.
    ///
    /// Returns `None` if the header is missing or not a valid number.
    pub fn content_length(&self) -> Option<u64> {
        self.header("Content-Length")
            .and_then(|v| v.trim().parse().ok())
    }

    /// Determines whether the client wants the connection kept open.
    ///
    /// HTTP/1.1 is persistent unless `Connection: close` is present.
    /// HTTP/1.0 is persistent only with `Connection: keep-alive`.
    pub fn keep_alive(&self) -> bool {
        match self.version {
            Version::Http11 => !self.headers.has_token("Connection", "close"),
            Version::Http10 => self.headers.has_token("Connection", "keep-alive"),
        }
    }

    /// Whether the client asked to switch protocols on this connection.
    ///
    /// True for `CONNECT`, or when an `Upgrade` header comes with the
    /// `upgrade` token in `Connection`.
    pub fn is_upgrade(&self) -> bool {
        self.method == Method::CONNECT
            || (self.headers.contains("Upgrade") && self.headers.has_token("Connection", "upgrade"))
    }

    /// The path component of the target, without the query string.
    pub fn path(&self) -> &str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => &self.target,
        }
    }

    /// The query string of the target, if any.
    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, query)| query)
    }

    /// Resolves the target into an absolute URL.
    ///
    /// Absolute-form targets are parsed as is; origin-form targets are
    /// resolved against the `Host` header (or `localhost` without one).
    pub fn url(&self) -> Result<url::Url, url::ParseError> {
        if self.target.starts_with('/') || self.target == "*" {
            let host = self.header("Host").unwrap_or("localhost");
            url::Url::parse(&format!("http://{}", host))?.join(&self.target)
        } else {
            url::Url::parse(&self.target)
        }
    }

    /// Address of the peer on the connection that carried this request.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Moves the body out, leaving an empty one. Useful to keep reading
    /// the body from a task that outlives the handler call.
    pub fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }
}
