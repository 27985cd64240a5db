//! `digiwallet-auth`: access policy layer (identity, account gate, role policy).
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod account;
pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod principal;
pub mod roles;

pub use account::{AccountGateError, Activity, NewUser, UserAccount, UserUpdate};
pub use authorize::{Action, AuthzError, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use principal::Principal;
pub use roles::Role;
