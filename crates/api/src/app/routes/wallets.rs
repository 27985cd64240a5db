use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde_json::{Value, json};

use digiwallet_auth::Action;

use crate::app::errors::{self, ApiResult};
use crate::app::{dto, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/my-wallet", get(my_wallet))
        .route("/balance", get(my_balance))
        .route("/add-money", post(add_money))
        .route("/withdraw", post(withdraw))
        .route("/send-money", post(send_money))
        .route("/user/:user_id", get(user_wallet))
        .route("/user/:user_id/balance", get(user_balance))
        .route("/cash-in", post(cash_in))
        .route("/cash-out", post(cash_out))
        .route("/all", get(list_wallets))
        .route("/block/:user_id", patch(block_wallet))
        .route("/unblock/:user_id", patch(unblock_wallet))
        .route("/create", post(create_wallet))
}

pub async fn my_wallet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    authz::require(&principal, Action::ViewOwnWallet)?;

    let wallet = services
        .operations
        .engine()
        .get_wallet(principal.user_id())
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(StatusCode::OK, "Wallet retrieved successfully", dto::wallet_to_json(wallet)))
}

pub async fn my_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    authz::require(&principal, Action::ViewOwnBalance)?;

    let balance = services
        .operations
        .engine()
        .get_balance(principal.user_id())
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(
        StatusCode::OK,
        "Wallet balance retrieved successfully",
        json!({ "balance": balance }),
    ))
}

pub async fn add_money(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::AmountRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&principal, Action::AddMoney)?;
    let amount = dto::parse_amount(dto::parse_body(body)?.amount)?;

    let wallet = services
        .operations
        .add_money(principal.user_id(), amount)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(StatusCode::OK, "Money added successfully", dto::wallet_to_json(wallet)))
}

pub async fn withdraw(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::AmountRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&principal, Action::Withdraw)?;
    let amount = dto::parse_amount(dto::parse_body(body)?.amount)?;

    let wallet = services
        .operations
        .withdraw(principal.user_id(), amount)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(StatusCode::OK, "Money withdrawn successfully", dto::wallet_to_json(wallet)))
}

/// Responds with the receiver's updated wallet.
pub async fn send_money(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::SendMoneyRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&principal, Action::SendMoney)?;
    let body = dto::parse_body(body)?;
    let amount = dto::parse_amount(body.amount)?;
    let receiver_id = dto::parse_user_id(body.receiver_id.as_deref())?;

    let wallet = services
        .operations
        .send_money(principal.user_id(), receiver_id, amount)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(StatusCode::OK, "Money sent successfully", dto::wallet_to_json(wallet)))
}

pub async fn user_wallet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(user_id): Path<String>,
) -> ApiResult {
    authz::require(&principal, Action::ViewOtherWallet)?;
    let user_id = dto::parse_user_id(Some(&user_id))?;

    let wallet = services
        .operations
        .engine()
        .get_wallet(user_id)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(
        StatusCode::OK,
        "User wallet retrieved successfully",
        dto::wallet_to_json(wallet),
    ))
}

pub async fn user_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(user_id): Path<String>,
) -> ApiResult {
    authz::require(&principal, Action::ViewOtherWallet)?;
    let user_id = dto::parse_user_id(Some(&user_id))?;

    let balance = services
        .operations
        .engine()
        .get_balance(user_id)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(
        StatusCode::OK,
        "User wallet balance retrieved successfully",
        json!({ "balance": balance }),
    ))
}

pub async fn cash_in(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::AgentCashRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&principal, Action::CashIn)?;
    let body = dto::parse_body(body)?;
    let amount = dto::parse_amount(body.amount)?;
    let user_id = dto::parse_user_id(body.user_id.as_deref())?;

    let wallet = services
        .operations
        .cash_in(principal.user_id(), user_id, amount)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(StatusCode::OK, "Cash-in completed successfully", dto::wallet_to_json(wallet)))
}

pub async fn cash_out(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::AgentCashRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&principal, Action::CashOut)?;
    let body = dto::parse_body(body)?;
    let amount = dto::parse_amount(body.amount)?;
    let user_id = dto::parse_user_id(body.user_id.as_deref())?;

    let wallet = services
        .operations
        .cash_out(principal.user_id(), user_id, amount)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(
        StatusCode::OK,
        "Cash-out completed successfully",
        dto::wallet_to_json(wallet),
    ))
}

/// Every live wallet with its owner's name, email and role.
pub async fn list_wallets(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    authz::require(&principal, Action::ListWallets)?;

    let wallets = services
        .operations
        .engine()
        .list_wallets()
        .await
        .map_err(errors::domain_error_to_response)?;
    let owners: HashMap<_, _> = services
        .accounts
        .list_users()
        .await
        .map_err(errors::domain_error_to_response)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let data = wallets
        .into_iter()
        .map(|w| {
            let owner = owners.get(&w.user_id);
            dto::wallet_with_owner_to_json(w, owner)
        })
        .collect();

    Ok(dto::envelope(StatusCode::OK, "All wallets retrieved successfully", Value::Array(data)))
}

pub async fn block_wallet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(user_id): Path<String>,
) -> ApiResult {
    authz::require(&principal, Action::BlockWallet)?;
    let user_id = dto::parse_user_id(Some(&user_id))?;

    let wallet = services
        .operations
        .engine()
        .block_wallet(user_id)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(StatusCode::OK, "Wallet blocked successfully", dto::wallet_to_json(wallet)))
}

pub async fn unblock_wallet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(user_id): Path<String>,
) -> ApiResult {
    authz::require(&principal, Action::BlockWallet)?;
    let user_id = dto::parse_user_id(Some(&user_id))?;

    let wallet = services
        .operations
        .engine()
        .unblock_wallet(user_id)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(StatusCode::OK, "Wallet unblocked successfully", dto::wallet_to_json(wallet)))
}

pub async fn create_wallet(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateWalletRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&principal, Action::CreateWallet)?;
    let user_id = dto::parse_user_id(dto::parse_body(body)?.user_id.as_deref())?;

    let wallet = services
        .operations
        .engine()
        .create_wallet(user_id)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(
        StatusCode::CREATED,
        "Wallet created successfully",
        dto::wallet_to_json(wallet),
    ))
}
