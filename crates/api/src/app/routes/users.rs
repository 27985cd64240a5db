use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    routing::{get, patch},
};
use serde_json::Value;

use digiwallet_auth::Action;

use crate::app::errors::{self, ApiResult};
use crate::app::{dto, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

/// Authenticated `/users` routes. Registration is mounted publicly by `build_app`.
pub fn router() -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/all-users", get(list_users))
        .route("/agents/all", get(list_agents))
        .route("/agents/:id/approve", patch(approve_agent))
        .route("/agents/:id/suspend", patch(suspend_agent))
        .route("/:id", get(get_user).patch(update_user))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::RegisterRequest>, JsonRejection>,
) -> ApiResult {
    let new_user = dto::parse_body(body)?
        .into_new_user()
        .map_err(errors::domain_error_to_response)?;

    let account = services
        .accounts
        .register(new_user)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(
        StatusCode::CREATED,
        "User created successfully",
        dto::user_to_json(account),
    ))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    authz::require(&principal, Action::ViewSelf)?;

    let account = services
        .accounts
        .me(principal.user_id())
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(
        StatusCode::OK,
        "Your profile retrieved successfully",
        dto::user_to_json(account),
    ))
}

/// Filtered by `role` and `searchTerm`, paged by `page` and `limit`.
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<dto::ListUsersQuery>, QueryRejection>,
) -> ApiResult {
    authz::require(&principal, Action::ListUsers)?;
    let query = dto::parse_query(query)?
        .into_query()
        .map_err(errors::domain_error_to_response)?;

    let page = services
        .accounts
        .search_users(&query)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::paged_envelope("All users retrieved successfully", page))
}

pub async fn list_agents(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    authz::require(&principal, Action::ManageAgents)?;

    let agents = services
        .accounts
        .list_agents()
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(
        StatusCode::OK,
        "All agents retrieved successfully",
        Value::Array(agents.into_iter().map(dto::user_to_json).collect()),
    ))
}

pub async fn approve_agent(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require(&principal, Action::ManageAgents)?;
    let agent_id = dto::parse_user_id(Some(&id))?;

    let agent = services
        .accounts
        .approve_agent(agent_id)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(StatusCode::OK, "Agent approved successfully", dto::user_to_json(agent)))
}

pub async fn suspend_agent(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require(&principal, Action::ManageAgents)?;
    let agent_id = dto::parse_user_id(Some(&id))?;

    let agent = services
        .accounts
        .suspend_agent(agent_id)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(StatusCode::OK, "Agent suspended successfully", dto::user_to_json(agent)))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require(&principal, Action::ViewUser)?;
    let user_id = dto::parse_user_id(Some(&id))?;

    let account = services
        .accounts
        .get(user_id)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(StatusCode::OK, "User retrieved successfully", dto::user_to_json(account)))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateUserRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&principal, Action::UpdateUser)?;
    let target_id = dto::parse_user_id(Some(&id))?;
    let update = dto::parse_body(body)?
        .into_update()
        .map_err(errors::domain_error_to_response)?;

    let account = services
        .accounts
        .update(principal.principal(), target_id, update)
        .await
        .map_err(errors::domain_error_to_response)?;

    Ok(dto::envelope(StatusCode::OK, "User updated successfully", dto::user_to_json(account)))
}
