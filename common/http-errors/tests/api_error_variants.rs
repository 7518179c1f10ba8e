use common_http_errors::ApiError;
use axum::response::IntoResponse;
use axum::http::StatusCode;

#[test]
fn bad_request_variant() {
    let err = ApiError::BadRequest { code: "invalid_something", message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "invalid_something");
}

#[test]
fn not_found_variant() {
    let err = ApiError::NotFound { code: "missing_resource", message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "missing_resource");
}

#[test]
fn conflict_variant_carries_message() {
    let err = ApiError::conflict("seats_unavailable", "Seats not available: A1, A2");
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "seats_unavailable");
}

#[test]
fn internal_variant() {
    let err = ApiError::internal("boom");
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "internal_error");
}
