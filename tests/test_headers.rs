use wicket::http::headers::Headers;

#[test]
fn test_lookup_is_case_insensitive() {
    let mut headers = Headers::new();
    headers.append("Content-Type", "text/plain");

    assert_eq!(headers.get("content-type"), Some("text/plain"));
    assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
    assert!(headers.contains("Content-type"));
}

#[test]
fn test_append_keeps_every_value_in_order() {
    let mut headers = Headers::new();
    headers.append("Set-Cookie", "a=1");
    headers.append("X-Other", "x");
    headers.append("set-cookie", "b=2");

    let values: Vec<&str> = headers.get_all("Set-Cookie").collect();
    assert_eq!(values, vec!["a=1", "b=2"]);
    assert_eq!(headers.get("set-cookie"), Some("a=1"));
}

#[test]
fn test_set_replaces_all_values() {
    let mut headers: Headers = [("Accept", "a"), ("accept", "b")].into_iter().collect();
    headers.set("ACCEPT", "c");

    assert_eq!(headers.get_all("accept").collect::<Vec<_>>(), vec!["c"]);
    assert_eq!(headers.len(), 1);
}

#[test]
fn test_remove() {
    let mut headers: Headers = [("A", "1"), ("B", "2"), ("a", "3")].into_iter().collect();

    assert!(headers.remove("a"));
    assert!(!headers.remove("a"));
    assert_eq!(headers.iter().collect::<Vec<_>>(), vec![("B", "2")]);
}

#[test]
fn test_has_token() {
    let headers: Headers = [("Connection", "keep-alive, Upgrade"), ("Connection", "TE")]
        .into_iter()
        .collect();

    assert!(headers.has_token("connection", "upgrade"));
    assert!(headers.has_token("connection", "te"));
    assert!(!headers.has_token("connection", "close"));
    assert!(!headers.has_token("upgrade", "upgrade"));
}

#[test]
fn test_clear() {
    let mut headers: Headers = [("A", "1")].into_iter().collect();
    headers.clear();
    assert!(headers.is_empty());
}
