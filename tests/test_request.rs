use wicket::http::request::{Method, Request, RequestBuilder, Version};

fn request(version: Version, headers: &[(&str, &str)]) -> Request {
    headers
        .iter()
        .fold(
            RequestBuilder::new().method(Method::GET).target("/").version(version),
            |builder, (k, v)| builder.header(*k, *v),
        )
        .build()
        .unwrap()
}

#[test]
fn test_request_header_retrieval() {
    let req = request(
        Version::Http11,
        &[("Host", "example.com"), ("Content-Type", "application/json")],
    );

    assert_eq!(req.header("Host"), Some("example.com"));
    assert_eq!(req.header("content-type"), Some("application/json"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_content_length_parsing() {
    let req = request(Version::Http11, &[("Content-Length", "42")]);
    assert_eq!(req.content_length(), Some(42));
}

#[test]
fn test_request_content_length_missing_or_invalid() {
    assert_eq!(request(Version::Http11, &[]).content_length(), None);
    assert_eq!(
        request(Version::Http11, &[("Content-Length", "not-a-number")]).content_length(),
        None
    );
}

#[test]
fn test_request_keep_alive_http11_default() {
    assert!(request(Version::Http11, &[]).keep_alive());
}

#[test]
fn test_request_keep_alive_close() {
    assert!(!request(Version::Http11, &[("Connection", "close")]).keep_alive());
    assert!(!request(Version::Http11, &[("Connection", "TE, Close")]).keep_alive());
}

#[test]
fn test_request_keep_alive_http10() {
    assert!(!request(Version::Http10, &[]).keep_alive());
    assert!(request(Version::Http10, &[("Connection", "Keep-Alive")]).keep_alive());
}

#[test]
fn test_request_upgrade_detection() {
    assert!(request(Version::Http11, &[("Upgrade", "websocket"), ("Connection", "keep-alive, Upgrade")]).is_upgrade());
    assert!(!request(Version::Http11, &[("Upgrade", "websocket")]).is_upgrade());
    assert!(!request(Version::Http11, &[("Connection", "upgrade")]).is_upgrade());

    let connect = RequestBuilder::new()
        .method(Method::CONNECT)
        .target("example.com:443")
        .build()
        .unwrap();
    assert!(connect.is_upgrade());
}

#[test]
fn test_request_path_and_query() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .target("/search?q=rust&page=2")
        .build()
        .unwrap();

    assert_eq!(req.path(), "/search");
    assert_eq!(req.query(), Some("q=rust&page=2"));
}

#[test]
fn test_request_url_uses_host_header() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .target("/a/b?c=d")
        .header("Host", "example.com:8080")
        .build()
        .unwrap();

    let url = req.url().unwrap();
    assert_eq!(url.as_str(), "http://example.com:8080/a/b?c=d");
}

#[test]
fn test_request_url_absolute_form() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .target("http://other.org/x")
        .build()
        .unwrap();

    assert_eq!(req.url().unwrap().host_str(), Some("other.org"));
}

#[test]
fn test_request_reset_clears_everything() {
    let mut req = RequestBuilder::new()
        .method(Method::POST)
        .target("/first")
        .version(Version::Http10)
        .header("X-First", "1")
        .remote_addr("127.0.0.1:9000".parse().unwrap())
        .body("payload")
        .build()
        .unwrap();

    req.reset();

    assert_eq!(req.method, Method::GET);
    assert!(req.target.is_empty());
    assert_eq!(req.version, Version::Http11);
    assert!(req.headers.is_empty());
    assert_eq!(req.remote_addr(), None);
    assert!(req.body_mut().is_complete());
}

#[test]
fn test_builder_requires_method_and_target() {
    assert!(RequestBuilder::new().target("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());
}

#[tokio::test]
async fn test_request_body_collect() {
    let mut req = RequestBuilder::new()
        .method(Method::POST)
        .target("/")
        .body("hello")
        .build()
        .unwrap();

    assert_eq!(&req.body_mut().collect().await.unwrap()[..], b"hello");
    assert!(req.body_mut().chunk().await.is_none());
}

#[tokio::test]
async fn test_take_body_leaves_empty_body() {
    let mut req = RequestBuilder::new()
        .method(Method::POST)
        .target("/")
        .body("abc")
        .build()
        .unwrap();

    let mut body = req.take_body();
    assert!(req.body_mut().chunk().await.is_none());
    assert_eq!(body.chunk().await, Some(Ok("abc".into())));
    assert_eq!(body.chunk().await, None);
}

#[test]
fn test_method_parsing() {
    for (s, method) in [
        ("GET", Method::GET),
        ("POST", Method::POST),
        ("PUT", Method::PUT),
        ("DELETE", Method::DELETE),
        ("HEAD", Method::HEAD),
        ("OPTIONS", Method::OPTIONS),
        ("PATCH", Method::PATCH),
        ("CONNECT", Method::CONNECT),
        ("TRACE", Method::TRACE),
    ] {
        assert_eq!(Method::from_str(s), Some(method));
        assert_eq!(method.as_str(), s);
    }
    assert_eq!(Method::from_str("get"), None);
}
