use digiwallet_core::UserId;
use serde::Serialize;

use crate::Role;

/// A fully resolved caller for authorization decisions.
///
/// Built from the stored account once the account gate has passed; downstream
/// code trusts it without re-verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
        }
    }
}
