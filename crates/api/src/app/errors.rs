use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use gitclub_auth::{AuthzError, TokenError};
use gitclub_core::{DomainError, StoreError};

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    match err {
        AuthzError::Unauthenticated => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "sign in first")
        }
        AuthzError::InvalidArgument(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_argument", msg)
        }
        AuthzError::RemoteUnavailable(e) => {
            json_error(StatusCode::BAD_GATEWAY, "policy_unavailable", e.to_string())
        }
        AuthzError::Store(e) => store_error_to_response(e),
        AuthzError::Token(e @ (TokenError::Encoding(_) | TokenError::PartialActor(_))) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", e.to_string())
        }
        AuthzError::Token(e) => json_error(StatusCode::UNAUTHORIZED, "invalid_token", e.to_string()),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Unsupported(msg) => json_error(StatusCode::NOT_IMPLEMENTED, "unsupported", msg),
        e => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            e.to_string(),
        ),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Forbidden => forbidden(),
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

pub fn forbidden() -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden")
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
