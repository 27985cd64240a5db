//! API-side authorization guard.
//!
//! Every handler names the [`Action`] it performs and calls [`require`] before
//! touching services.

use axum::http::StatusCode;
use axum::response::Response;

use digiwallet_auth::{Action, authorize};

use crate::app::errors;
use crate::context::PrincipalContext;

pub fn require(principal: &PrincipalContext, action: Action) -> Result<(), Response> {
    authorize(principal.principal(), action)
        .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}
