use serde::{Deserialize, Serialize};

use digiwallet_core::DomainError;

/// Role of an account.
///
/// Closed set: every authorization decision matches on it exhaustively, so
/// adding a role is a compile error at each decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Agent,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::User, Role::Agent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Agent => "agent",
        }
    }

    /// Whether accounts with this role get a wallet at registration.
    pub fn holds_wallet(&self) -> bool {
        match self {
            Role::User | Role::Agent => true,
            Role::Admin => false,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            "agent" => Ok(Role::Agent),
            other => Err(DomainError::invalid_input(format!(
                "role must be one of: admin, user, agent (got '{other}')"
            ))),
        }
    }
}
