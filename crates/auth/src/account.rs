//! Account records and the moderation rules around them.
//!
//! Credentials are handled elsewhere; an account here is identity, role and
//! the moderation flags the access gate checks on every request.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use digiwallet_core::{DomainError, DomainResult, UserId};

use crate::{Principal, Role};

/// Account activity flag set by administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    #[default]
    Active,
    Inactive,
    Blocked,
}

impl Activity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Active => "active",
            Activity::Inactive => "inactive",
            Activity::Blocked => "blocked",
        }
    }
}

impl core::fmt::Display for Activity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Activity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Activity::Active),
            "inactive" => Ok(Activity::Inactive),
            "blocked" => Ok(Activity::Blocked),
            other => Err(DomainError::invalid_input(format!("unknown activity '{other}'"))),
        }
    }
}

/// Why an authenticated token is still refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountGateError {
    #[error("account does not exist")]
    UnknownAccount,

    #[error("account is not verified")]
    Unverified,

    #[error("account is {0}")]
    Inactive(Activity),

    #[error("account is deleted")]
    Deleted,

    #[error("agent is not approved")]
    AgentNotApproved,
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub activity: Activity,
    pub is_verified: bool,
    pub is_deleted: bool,
    /// Only meaningful for agents.
    pub is_approved: bool,
    /// Declared per agent; commission is computed from the global policy.
    pub commission_rate: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub commission_rate: Option<Decimal>,
}

impl NewUser {
    /// Validate and build the account record (unverified, active, unapproved).
    pub fn into_account(self, id: UserId, now: DateTime<Utc>) -> DomainResult<UserAccount> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::invalid_input("invalid email format"));
        }
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::invalid_input("name cannot be empty"));
        }
        if let Some(rate) = self.commission_rate {
            validate_commission_rate(rate)?;
        }

        Ok(UserAccount {
            id,
            name,
            email,
            phone: self.phone,
            address: self.address,
            role: self.role,
            activity: Activity::Active,
            is_verified: false,
            is_deleted: false,
            is_approved: false,
            commission_rate: self.commission_rate,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Largest number of decimal places a commission rate keeps.
const RATE_SCALE: u32 = 4;

/// A commission rate is a fraction in `[0, 1]` with at most four decimals.
fn validate_commission_rate(rate: Decimal) -> DomainResult<()> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(DomainError::invalid_input("commission rate must be within [0, 1]"));
    }
    if rate.normalize().scale() > RATE_SCALE {
        return Err(DomainError::invalid_input(format!(
            "commission rate must have at most {RATE_SCALE} decimal places"
        )));
    }
    Ok(())
}

/// Partial update of an account. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Option<Role>,
    pub activity: Option<Activity>,
    pub is_verified: Option<bool>,
    pub is_deleted: Option<bool>,
    pub is_approved: Option<bool>,
    pub commission_rate: Option<Decimal>,
}

impl UserUpdate {
    fn touches_moderation(&self) -> bool {
        self.activity.is_some()
            || self.is_verified.is_some()
            || self.is_deleted.is_some()
            || self.is_approved.is_some()
            || self.commission_rate.is_some()
    }
}

impl UserAccount {
    /// Checks applied to every authenticated request.
    pub fn ensure_can_authenticate(&self) -> Result<(), AccountGateError> {
        if !self.is_verified {
            return Err(AccountGateError::Unverified);
        }
        match self.activity {
            Activity::Active => {}
            inactive @ (Activity::Inactive | Activity::Blocked) => {
                return Err(AccountGateError::Inactive(inactive));
            }
        }
        if self.is_deleted {
            return Err(AccountGateError::Deleted);
        }
        match self.role {
            Role::Agent if !self.is_approved => Err(AccountGateError::AgentNotApproved),
            Role::Agent | Role::User | Role::Admin => Ok(()),
        }
    }

    fn ensure_agent(&self) -> DomainResult<()> {
        match self.role {
            Role::Agent => Ok(()),
            Role::User | Role::Admin => Err(DomainError::invalid_input("user is not an agent")),
        }
    }

    pub fn with_approval(&self, approved: bool, now: DateTime<Utc>) -> DomainResult<Self> {
        self.ensure_agent()?;
        Ok(Self {
            is_approved: approved,
            updated_at: now,
            ..self.clone()
        })
    }

    /// Apply `update` on behalf of `actor`.
    ///
    /// - users and agents may only update themselves
    /// - an admin may not update an admin account
    /// - role and moderation flags are admin-only
    pub fn apply_update(
        &self,
        actor: &Principal,
        update: UserUpdate,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        match actor.role {
            Role::User | Role::Agent => {
                if actor.user_id != self.id {
                    return Err(DomainError::forbidden("you may only update your own account"));
                }
                if update.role.is_some() || update.touches_moderation() {
                    return Err(DomainError::forbidden(
                        "only administrators may change role or moderation flags",
                    ));
                }
            }
            Role::Admin => {
                if self.role == Role::Admin {
                    return Err(DomainError::forbidden("administrator accounts cannot be modified"));
                }
            }
        }

        let mut next = self.clone();
        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::invalid_input("name cannot be empty"));
            }
            next.name = name;
        }
        if let Some(phone) = update.phone {
            next.phone = Some(phone);
        }
        if let Some(address) = update.address {
            next.address = Some(address);
        }
        if let Some(role) = update.role {
            next.role = role;
        }
        if let Some(activity) = update.activity {
            next.activity = activity;
        }
        if let Some(v) = update.is_verified {
            next.is_verified = v;
        }
        if let Some(v) = update.is_deleted {
            next.is_deleted = v;
        }
        if let Some(v) = update.is_approved {
            next.is_approved = v;
        }
        if let Some(rate) = update.commission_rate {
            validate_commission_rate(rate)?;
            next.commission_rate = Some(rate);
        }
        next.updated_at = now;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account(role: Role) -> UserAccount {
        NewUser {
            name: " Rahim ".to_string(),
            email: "Rahim@Example.com".to_string(),
            phone: None,
            address: None,
            role,
            commission_rate: None,
        }
        .into_account(UserId::new(), Utc::now())
        .unwrap()
    }

    fn verified(role: Role) -> UserAccount {
        UserAccount {
            is_verified: true,
            ..account(role)
        }
    }

    #[test]
    fn registration_normalizes_and_starts_unverified() {
        let a = account(Role::User);
        assert_eq!(a.name, "Rahim");
        assert_eq!(a.email, "rahim@example.com");
        assert!(!a.is_verified);
        assert!(!a.is_approved);
        assert_eq!(a.activity, Activity::Active);
    }

    #[test]
    fn registration_rejects_bad_email() {
        let err = NewUser {
            name: "x".to_string(),
            email: "nope".to_string(),
            phone: None,
            address: None,
            role: Role::User,
            commission_rate: None,
        }
        .into_account(UserId::new(), Utc::now())
        .unwrap_err();
        assert_eq!(err, DomainError::invalid_input("invalid email format"));
    }

    #[test]
    fn gate_requires_verification_activity_and_agent_approval() {
        assert_eq!(
            account(Role::User).ensure_can_authenticate(),
            Err(AccountGateError::Unverified)
        );
        assert_eq!(verified(Role::User).ensure_can_authenticate(), Ok(()));

        let blocked = UserAccount {
            activity: Activity::Blocked,
            ..verified(Role::User)
        };
        assert_eq!(
            blocked.ensure_can_authenticate(),
            Err(AccountGateError::Inactive(Activity::Blocked))
        );

        let deleted = UserAccount {
            is_deleted: true,
            ..verified(Role::Admin)
        };
        assert_eq!(deleted.ensure_can_authenticate(), Err(AccountGateError::Deleted));

        let agent = verified(Role::Agent);
        assert_eq!(agent.ensure_can_authenticate(), Err(AccountGateError::AgentNotApproved));
        let approved = agent.with_approval(true, Utc::now()).unwrap();
        assert_eq!(approved.ensure_can_authenticate(), Ok(()));
    }

    #[test]
    fn approval_only_applies_to_agents() {
        let err = verified(Role::User).with_approval(true, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::invalid_input("user is not an agent"));
    }

    #[test]
    fn users_update_only_themselves_and_not_moderation() {
        let me = verified(Role::User);
        let actor = Principal::new(me.id, me.email.clone(), Role::User);

        let rename = UserUpdate {
            name: Some("Karim".into()),
            ..Default::default()
        };
        let renamed = me.apply_update(&actor, rename, Utc::now()).unwrap();
        assert_eq!(renamed.name, "Karim");

        let unverify = UserUpdate {
            is_verified: Some(false),
            ..Default::default()
        };
        let err = me.apply_update(&actor, unverify, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let other = verified(Role::User);
        let err = other.apply_update(&actor, UserUpdate::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn admins_moderate_everyone_but_admins() {
        let admin = Principal::new(UserId::new(), "root@example.com", Role::Admin);
        let user = account(Role::User);
        let verify = UserUpdate {
            is_verified: Some(true),
            ..Default::default()
        };
        let verified_user = user.apply_update(&admin, verify, Utc::now()).unwrap();
        assert!(verified_user.is_verified);

        let err = verified(Role::Admin)
            .apply_update(&admin, UserUpdate::default(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn commission_rate_updates_are_validated_like_registration() {
        let admin = Principal::new(UserId::new(), "root@example.com", Role::Admin);
        let agent = verified(Role::Agent);
        let rate = |r: Decimal| UserUpdate { commission_rate: Some(r), ..Default::default() };

        for bad in [dec!(5), dec!(-0.01), dec!(0.00001)] {
            let err = agent.apply_update(&admin, rate(bad), Utc::now()).unwrap_err();
            assert!(matches!(err, DomainError::InvalidInput(_)), "{bad} was accepted");
        }

        let updated = agent.apply_update(&admin, rate(dec!(0.015)), Utc::now()).unwrap();
        assert_eq!(updated.commission_rate, Some(dec!(0.015)));
        let updated = agent.apply_update(&admin, rate(Decimal::ONE), Utc::now()).unwrap();
        assert_eq!(updated.commission_rate, Some(Decimal::ONE));
    }

    #[test]
    fn registration_rejects_out_of_range_commission_rate() {
        let err = NewUser {
            name: "Agent".to_string(),
            email: "agent@example.com".to_string(),
            phone: None,
            address: None,
            role: Role::Agent,
            commission_rate: Some(dec!(1.5)),
        }
        .into_account(UserId::new(), Utc::now())
        .unwrap_err();
        assert_eq!(err, DomainError::invalid_input("commission rate must be within [0, 1]"));
    }
}
