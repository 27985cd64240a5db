use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use digiwallet_auth::{Activity, NewUser, Role, UserAccount, UserUpdate};
use digiwallet_core::{Amount, DomainError, UserId};
use digiwallet_infra::ledger::{PartyView, TransactionView};
use digiwallet_infra::{UserPage, UserQuery};
use digiwallet_wallet::Wallet;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
    pub commission_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<String>,
    pub is_verified: Option<bool>,
    pub is_deleted: Option<bool>,
    pub is_approved: Option<bool>,
    pub commission_rate: Option<Decimal>,
    /// Accepted so it can be refused explicitly.
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMoneyRequest {
    pub receiver_id: Option<String>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCashRequest {
    pub user_id: Option<String>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletRequest {
    pub user_id: Option<String>,
}

/// Query string of the admin user listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub role: Option<String>,
    pub search_term: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

// -------------------------
// Request parsing helpers
// -------------------------

pub fn parse_body<T>(
    body: Result<axum::Json<T>, JsonRejection>,
) -> Result<T, axum::response::Response> {
    body.map(|axum::Json(inner)| inner).map_err(|rejection| {
        errors::json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
    })
}

pub fn parse_query<T>(
    query: Result<axum::extract::Query<T>, QueryRejection>,
) -> Result<T, axum::response::Response> {
    query
        .map(|axum::extract::Query(inner)| inner)
        .map_err(|rejection| {
            errors::json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
        })
}

pub fn parse_amount(amount: Option<Decimal>) -> Result<Amount, axum::response::Response> {
    let value = amount.ok_or_else(|| {
        errors::domain_error_to_response(DomainError::invalid_input("amount is required"))
    })?;
    Amount::new(value).map_err(errors::domain_error_to_response)
}

pub fn parse_user_id(raw: Option<&str>) -> Result<UserId, axum::response::Response> {
    raw.unwrap_or_default()
        .parse()
        .map_err(errors::domain_error_to_response)
}

impl RegisterRequest {
    /// Self-registration is limited to users and agents.
    pub fn into_new_user(self) -> Result<NewUser, DomainError> {
        let role = match self.role.as_deref() {
            None => Role::User,
            Some(raw) => raw.parse()?,
        };
        if role == Role::Admin {
            return Err(DomainError::invalid_input("administrators cannot self-register"));
        }
        Ok(NewUser {
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            role,
            commission_rate: self.commission_rate,
        })
    }
}

impl ListUsersQuery {
    pub fn into_query(self) -> Result<UserQuery, DomainError> {
        let defaults = UserQuery::default();
        Ok(UserQuery {
            role: self.role.as_deref().map(str::parse::<Role>).transpose()?,
            search: self.search_term,
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        })
    }
}

impl UpdateUserRequest {
    pub fn into_update(self) -> Result<UserUpdate, DomainError> {
        if self.email.is_some() {
            return Err(DomainError::invalid_input("email cannot be changed"));
        }
        Ok(UserUpdate {
            name: self.name,
            phone: self.phone,
            address: self.address,
            role: self.role.as_deref().map(str::parse::<Role>).transpose()?,
            activity: self.is_active.as_deref().map(str::parse::<Activity>).transpose()?,
            is_verified: self.is_verified,
            is_deleted: self.is_deleted,
            is_approved: self.is_approved,
            commission_rate: self.commission_rate,
        })
    }
}

// -------------------------
// Response helpers
// -------------------------

/// Success envelope: `{"success": true, "message", "data"}`.
pub fn envelope(status: StatusCode, message: &str, data: Value) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": true,
            "message": message,
            "data": data,
        })),
    )
        .into_response()
}

/// Envelope for a paged listing: `data` is the page, `meta` the window.
pub fn paged_envelope(message: &str, page: UserPage) -> axum::response::Response {
    let meta = json!({
        "page": page.page,
        "limit": page.limit,
        "total": page.total,
        "totalPage": page.total_pages(),
    });
    let data: Vec<Value> = page.users.into_iter().map(user_to_json).collect();
    (
        StatusCode::OK,
        axum::Json(json!({
            "success": true,
            "message": message,
            "meta": meta,
            "data": data,
        })),
    )
        .into_response()
}

pub fn wallet_to_json(wallet: Wallet) -> Value {
    json!({
        "id": wallet.id.to_string(),
        "userId": wallet.user_id.to_string(),
        "balance": wallet.balance,
        "status": wallet.status.as_str(),
        "createdAt": wallet.created_at.to_rfc3339(),
        "updatedAt": wallet.updated_at.to_rfc3339(),
    })
}

/// Wallet with its owner populated (admin listing).
pub fn wallet_with_owner_to_json(wallet: Wallet, owner: Option<&UserAccount>) -> Value {
    let mut value = wallet_to_json(wallet);
    value["user"] = match owner {
        Some(u) => json!({
            "id": u.id.to_string(),
            "name": u.name,
            "email": u.email,
            "role": u.role.as_str(),
        }),
        None => Value::Null,
    };
    value
}

pub fn user_to_json(user: UserAccount) -> Value {
    json!({
        "id": user.id.to_string(),
        "name": user.name,
        "email": user.email,
        "phone": user.phone,
        "address": user.address,
        "role": user.role.as_str(),
        "isActive": user.activity.as_str(),
        "isVerified": user.is_verified,
        "isApproved": user.is_approved,
        "commissionRate": user.commission_rate,
        "createdAt": user.created_at.to_rfc3339(),
        "updatedAt": user.updated_at.to_rfc3339(),
    })
}

fn party_to_json(party: Option<PartyView>) -> Value {
    match party {
        None => Value::Null,
        Some(p) => {
            let mut value = json!({
                "id": p.id.to_string(),
                "name": p.name,
                "email": p.email,
            });
            if let Some(role) = p.role {
                value["role"] = json!(role.as_str());
            }
            value
        }
    }
}

pub fn transaction_to_json(tx: TransactionView) -> Value {
    json!({
        "id": tx.id.to_string(),
        "senderId": party_to_json(tx.sender),
        "receiverId": party_to_json(tx.receiver),
        "agentId": party_to_json(tx.agent),
        "amount": tx.amount.value(),
        "fee": tx.fee,
        "commission": tx.commission,
        "type": tx.kind.as_str(),
        "status": tx.status.as_str(),
        "description": tx.description,
        "createdAt": tx.created_at.to_rfc3339(),
        "updatedAt": tx.updated_at.to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amount_must_be_present_and_positive() {
        assert!(parse_amount(Some(dec!(0.5))).is_ok());
        assert_eq!(parse_amount(None).unwrap_err().status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_amount(Some(dec!(-3))).unwrap_err().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn user_ids_must_be_present_and_well_formed() {
        let id = UserId::new();
        assert_eq!(parse_user_id(Some(&id.to_string())).unwrap(), id);
        assert_eq!(parse_user_id(None).unwrap_err().status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_user_id(Some("nope")).unwrap_err().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn registration_cannot_claim_admin() {
        let req = RegisterRequest {
            name: "Mallory".into(),
            email: "m@example.com".into(),
            phone: None,
            address: None,
            role: Some("admin".into()),
            commission_rate: None,
        };
        assert!(matches!(req.into_new_user(), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn update_parses_activity_case_insensitively() {
        let req: UpdateUserRequest =
            serde_json::from_value(json!({"isActive": "BLOCKED"})).unwrap();
        assert_eq!(req.into_update().unwrap().activity, Some(Activity::Blocked));

        let req: UpdateUserRequest =
            serde_json::from_value(json!({"email": "new@example.com"})).unwrap();
        assert!(req.into_update().is_err());
    }
}
