use std::sync::Arc;

use axum::{Router, extract::Extension, http::StatusCode, routing::get};
use serde_json::Value;

use digiwallet_auth::Action;
use digiwallet_infra::ledger::TransactionView;

use crate::app::errors::{self, ApiResult};
use crate::app::{dto, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/my-history", get(my_history))
        .route("/commission-history", get(commission_history))
        .route("/all", get(all_transactions))
}

fn listing(message: &str, rows: Vec<TransactionView>) -> axum::response::Response {
    dto::envelope(
        StatusCode::OK,
        message,
        Value::Array(rows.into_iter().map(dto::transaction_to_json).collect()),
    )
}

pub async fn my_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    authz::require(&principal, Action::ViewOwnHistory)?;

    let rows = services
        .history
        .history_for(principal.user_id())
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(listing("Transaction history retrieved successfully", rows))
}

pub async fn commission_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    authz::require(&principal, Action::ViewCommissionHistory)?;

    let rows = services
        .history
        .commission_history_for(principal.user_id())
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(listing("Commission history retrieved successfully", rows))
}

pub async fn all_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    authz::require(&principal, Action::ViewAllTransactions)?;

    let rows = services
        .history
        .all_transactions()
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(listing("All transactions retrieved successfully", rows))
}
