use axum::Router;

pub mod system;
pub mod transactions;
pub mod users;
pub mod wallets;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/users", users::router())
        .nest("/wallets", wallets::router())
        .nest("/transactions", transactions::router())
}
