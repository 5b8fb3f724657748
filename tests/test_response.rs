use wicket::http::response::StatusCode;

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::Created.as_u16(), 201);
    assert_eq!(StatusCode::NoContent.as_u16(), 204);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
    assert_eq!(StatusCode::Other(299).as_u16(), 299);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::NoContent.reason_phrase(), "No Content");
    assert_eq!(StatusCode::BadRequest.reason_phrase(), "Bad Request");
    assert_eq!(
        StatusCode::RequestHeaderFieldsTooLarge.reason_phrase(),
        "Request Header Fields Too Large"
    );
    assert_eq!(StatusCode::Other(299).reason_phrase(), "");
}

#[test]
fn test_status_code_from_u16() {
    assert_eq!(StatusCode::from_u16(200), Some(StatusCode::Ok));
    assert_eq!(StatusCode::from_u16(404), Some(StatusCode::NotFound));
    assert_eq!(StatusCode::from_u16(418), Some(StatusCode::Other(418)));
    assert_eq!(StatusCode::from_u16(99), None);
    assert_eq!(StatusCode::from_u16(1000), None);
}

#[test]
fn test_bodyless_statuses() {
    assert!(StatusCode::SwitchingProtocols.is_bodyless());
    assert!(StatusCode::NoContent.is_bodyless());
    assert!(StatusCode::NotModified.is_bodyless());
    assert!(!StatusCode::Ok.is_bodyless());
}
