// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{http::StatusCode, response::IntoResponse};
use fitforge::backend::BackendError;
use fitforge::error::{AppError, AuthError};
use serde_json::Value;

async fn error_body(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_auth_error_statuses() {
    let cases = [
        (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED, "invalid_credentials"),
        (AuthError::Unauthenticated, StatusCode::UNAUTHORIZED, "unauthenticated"),
        (
            AuthError::ExchangeFailed("refresh token revoked".to_string()),
            StatusCode::UNAUTHORIZED,
            "exchange_failed",
        ),
        (
            AuthError::BackendUnavailable("connect timeout".to_string()),
            StatusCode::BAD_GATEWAY,
            "backend_unavailable",
        ),
    ];

    for (err, status, code) in cases {
        let (actual_status, body) = error_body(err.into()).await;
        assert_eq!(actual_status, status);
        assert_eq!(body["error"], code);
    }
}

#[tokio::test]
async fn test_backend_detail_stays_out_of_responses() {
    let (status, body) = error_body(AppError::from(BackendError::rejected(
        500,
        "relation \"goals\" has secret column",
    )))
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());

    let (status, body) = error_body(AppError::from(AuthError::ExchangeFailed(
        "Invalid Refresh Token".to_string(),
    )))
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("details").is_none());
}

#[test]
fn test_backend_error_mapping() {
    assert!(matches!(
        AppError::from(BackendError::rejected(401, "JWT expired")),
        AppError::Unauthenticated
    ));
    assert!(matches!(
        AppError::from(BackendError::Unavailable("down".to_string())),
        AppError::BackendUnavailable(_)
    ));
    assert!(matches!(
        AppError::from(AuthError::Rejected("User already registered".to_string())),
        AppError::BadRequest(_)
    ));
}

#[tokio::test]
async fn test_not_found_has_details() {
    let (status, body) = error_body(AppError::NotFound("Goal".to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["details"], "Goal");
}
