//! Account directory: registration, moderation and the per-request account gate.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use digiwallet_auth::{AccountGateError, NewUser, Principal, Role, UserAccount, UserUpdate};
use digiwallet_core::{DomainError, DomainResult, UserId};

use crate::ledger::AccountingEngine;
use crate::store::{StoreError, UserStore};

/// Filter and page window for the admin user listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub role: Option<Role>,
    /// Case-insensitive substring of the name or email.
    pub search: Option<String>,
    /// 1-based.
    pub page: u32,
    pub limit: u32,
}

impl UserQuery {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    fn matches(&self, account: &UserAccount) -> bool {
        if self.role.is_some_and(|role| role != account.role) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                account.name.to_lowercase().contains(&term) || account.email.contains(&term)
            }
            _ => true,
        }
    }
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            role: None,
            search: None,
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// One page of accounts plus the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPage {
    pub users: Vec<UserAccount>,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
}

impl UserPage {
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.limit as usize)
    }
}

#[derive(Clone)]
pub struct AccountDirectory {
    users: Arc<dyn UserStore>,
    engine: AccountingEngine,
}

impl AccountDirectory {
    pub fn new(users: Arc<dyn UserStore>, engine: AccountingEngine) -> Self {
        Self { users, engine }
    }

    /// Register an account. Users and agents get a wallet as well.
    ///
    /// Email addresses are unique (`Conflict`).
    pub async fn register(&self, new_user: NewUser) -> DomainResult<UserAccount> {
        let account = new_user.into_account(UserId::new(), Utc::now())?;

        if self.users.find_by_email(&account.email).await?.is_some() {
            return Err(DomainError::conflict("a user with this email already exists"));
        }
        let account = self.users.insert(account).await.map_err(|e| match e {
            StoreError::Duplicate(_) => {
                DomainError::conflict("a user with this email already exists")
            }
            other => other.into(),
        })?;

        if account.role.holds_wallet() {
            self.engine.create_wallet(account.id).await?;
        }

        info!(user_id = %account.id, role = %account.role, "account registered");
        Ok(account)
    }

    /// Seed a verified administrator unless the email is already taken.
    pub async fn bootstrap_admin(&self, name: &str, email: &str) -> DomainResult<UserAccount> {
        if let Some(existing) = self.users.find_by_email(&email.trim().to_lowercase()).await? {
            if existing.role != Role::Admin {
                warn!(
                    user_id = %existing.id,
                    "bootstrap admin email belongs to a non-admin account"
                );
            }
            return Ok(existing);
        }

        let admin = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            address: None,
            role: Role::Admin,
            commission_rate: None,
        }
        .into_account(UserId::new(), Utc::now())?;
        let admin = self
            .users
            .insert(UserAccount {
                is_verified: true,
                ..admin
            })
            .await?;

        info!(user_id = %admin.id, "bootstrap admin created");
        Ok(admin)
    }

    /// Resolve the caller's account and apply the account gate.
    pub async fn gate(&self, user_id: UserId) -> Result<UserAccount, GateFailure> {
        let account = self
            .users
            .get(user_id)
            .await
            .map_err(|e| GateFailure::Store(e.into()))?
            .ok_or(GateFailure::Refused(AccountGateError::UnknownAccount))?;
        account.ensure_can_authenticate().map_err(GateFailure::Refused)?;
        Ok(account)
    }

    /// A live account.
    pub async fn get(&self, user_id: UserId) -> DomainResult<UserAccount> {
        self.users
            .get(user_id)
            .await?
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| DomainError::not_found("user"))
    }

    /// The caller's own profile.
    pub async fn me(&self, user_id: UserId) -> DomainResult<UserAccount> {
        self.get(user_id).await
    }

    pub async fn list_users(&self) -> DomainResult<Vec<UserAccount>> {
        Ok(self.users.list().await?.into_iter().filter(|u| !u.is_deleted).collect())
    }

    /// Live accounts matching `query`, newest first, cut to the requested page.
    pub async fn search_users(&self, query: &UserQuery) -> DomainResult<UserPage> {
        if query.page == 0 {
            return Err(DomainError::invalid_input("page must be at least 1"));
        }
        if query.limit == 0 || query.limit > UserQuery::MAX_LIMIT {
            return Err(DomainError::invalid_input(format!(
                "limit must be between 1 and {}",
                UserQuery::MAX_LIMIT
            )));
        }

        let mut matching: Vec<_> = self
            .list_users()
            .await?
            .into_iter()
            .filter(|u| query.matches(u))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len();
        let skip = (query.page as usize - 1) * query.limit as usize;
        let users = matching.into_iter().skip(skip).take(query.limit as usize).collect();
        Ok(UserPage {
            users,
            page: query.page,
            limit: query.limit,
            total,
        })
    }

    pub async fn list_agents(&self) -> DomainResult<Vec<UserAccount>> {
        Ok(self
            .list_users()
            .await?
            .into_iter()
            .filter(|u| u.role == Role::Agent)
            .collect())
    }

    pub async fn approve_agent(&self, agent_id: UserId) -> DomainResult<UserAccount> {
        self.set_approval(agent_id, true).await
    }

    pub async fn suspend_agent(&self, agent_id: UserId) -> DomainResult<UserAccount> {
        self.set_approval(agent_id, false).await
    }

    async fn set_approval(&self, agent_id: UserId, approved: bool) -> DomainResult<UserAccount> {
        let agent = self.get(agent_id).await?;
        let updated = self.users.update(agent.with_approval(approved, Utc::now())?).await?;
        info!(user_id = %agent_id, approved, "agent approval changed");
        Ok(updated)
    }

    /// Apply a profile or moderation update on behalf of `actor`.
    pub async fn update(
        &self,
        actor: &Principal,
        target_id: UserId,
        update: UserUpdate,
    ) -> DomainResult<UserAccount> {
        let target = self.get(target_id).await?;
        let next = target.apply_update(actor, update, Utc::now())?;
        let saved = self.users.update(next).await?;
        info!(actor_id = %actor.user_id, user_id = %target_id, "account updated");
        Ok(saved)
    }
}

/// Why the account gate refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateFailure {
    Refused(AccountGateError),
    Store(DomainError),
}
