use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use digiwallet_auth::AccountGateError;
use digiwallet_core::DomainError;
use digiwallet_infra::GateFailure;

/// Handlers short-circuit with an already rendered error response.
pub type ApiResult = Result<axum::response::Response, axum::response::Response>;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match &err {
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
        DomainError::InvalidState(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_state", err.to_string())
        }
        DomainError::InsufficientFunds { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "insufficient_funds", err.to_string())
        }
        DomainError::InvalidInput(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
        }
        DomainError::InvalidId(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_id", err.to_string())
        }
        DomainError::Forbidden(_) => {
            json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
        }
        DomainError::Unauthorized => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", err.to_string())
        }
        DomainError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "internal storage error")
        }
    }
}

/// Unknown accounts are unauthenticated; known but moderated ones are forbidden.
pub fn gate_failure_to_response(failure: GateFailure) -> axum::response::Response {
    match failure {
        GateFailure::Refused(AccountGateError::UnknownAccount) => {
            let message = AccountGateError::UnknownAccount.to_string();
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
        }
        GateFailure::Refused(refusal) => {
            json_error(StatusCode::FORBIDDEN, "account_restricted", refusal.to_string())
        }
        GateFailure::Store(err) => domain_error_to_response(err),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
