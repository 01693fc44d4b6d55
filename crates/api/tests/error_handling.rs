//! `AppError` to HTTP response mapping.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use fundbridge_api::error::AppError;
use fundbridge_core::error::CoreError;
use http_body_util::BodyExt;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn not_found_names_entity() {
    let (status, json) = error_to_response(CoreError::not_found("campaign", 42).into()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "campaign with id 42 not found");
}

#[tokio::test]
async fn domain_errors_map_to_statuses() {
    let cases = [
        (CoreError::Validation("bad".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        (CoreError::Conflict("taken".into()), StatusCode::CONFLICT, "CONFLICT"),
        (CoreError::Forbidden("no".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
        (
            CoreError::InvalidState("not in review".into()),
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_STATE",
        ),
        (CoreError::Unauthorized("who".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
    ];
    for (err, expected_status, expected_code) in cases {
        let (status, json) = error_to_response(err.into()).await;
        assert_eq!(status, expected_status);
        assert_eq!(json["code"], expected_code);
    }
}

#[tokio::test]
async fn unavailable_store_is_503_without_detail() {
    let err = CoreError::ServiceUnavailable("store call timed out after 5000ms".into());
    let (status, json) = error_to_response(err.into()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "SERVICE_UNAVAILABLE");
    assert!(!json["error"].as_str().unwrap().contains("5000"));
}

#[tokio::test]
async fn internal_errors_are_sanitized() {
    let (status, json) =
        error_to_response(AppError::InternalError("connection string leaked".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");

    let (_, json) = error_to_response(CoreError::Internal("row decode".into()).into()).await;
    assert_eq!(json["code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn bad_request_keeps_message() {
    let (status, json) = error_to_response(AppError::BadRequest("invalid field".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "invalid field");
}
