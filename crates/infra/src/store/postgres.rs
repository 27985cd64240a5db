//! Postgres-backed ledger stores.
//!
//! Schema lives in `migrations/0001_init.sql`. Every read filters soft-deleted
//! wallets and transactions in SQL; accounts are returned as stored.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (check constraint violation) | `23514` | `Backend` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / other | N/A | `Backend` |
//!
//! A conditional wallet update that matches no row is reported as `NotFound`
//! when the wallet is gone and `Conflict` when only the version differs.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{Span, instrument};
use uuid::Uuid;

use digiwallet_auth::{Activity, Role, UserAccount};
use digiwallet_core::{Amount, ExpectedVersion, TransactionId, UserId, WalletId};
use digiwallet_wallet::{Transaction, TransactionKind, TransactionStatus, Wallet, WalletStatus};

use super::{StoreError, TransactionStore, UserStore, WalletStore};

/// Open a connection pool.
pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn decode_error(what: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("failed to decode {what} row: {err}"))
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column).map_err(|e| decode_error(column, e))?;
    raw.parse().map_err(|e| decode_error(column, e))
}

fn version_to_db(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version)
        .map_err(|_| StoreError::Backend(format!("wallet version {version} out of range")))
}

// ---------------------------------------------------------------------------
// Wallets
// ---------------------------------------------------------------------------

const WALLET_COLUMNS: &str =
    "id, user_id, balance, status, is_deleted, version, created_at, updated_at";

fn wallet_from_row(row: &PgRow) -> Result<Wallet, StoreError> {
    let decode = |e: sqlx::Error| decode_error("wallet", e);
    let version: i64 = row.try_get("version").map_err(decode)?;
    Ok(Wallet {
        id: WalletId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode)?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id").map_err(decode)?),
        balance: row.try_get::<Decimal, _>("balance").map_err(decode)?,
        status: parse_column::<WalletStatus>(row, "status")?,
        is_deleted: row.try_get("is_deleted").map_err(decode)?,
        version: u64::try_from(version).map_err(|e| decode_error("wallet", e))?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(decode)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(decode)?,
    })
}

#[derive(Debug, Clone)]
pub struct PostgresWalletStore {
    pool: Arc<PgPool>,
}

impl PostgresWalletStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl WalletStore for PostgresWalletStore {
    #[instrument(skip(self, wallet), fields(user_id = %wallet.user_id), err)]
    async fn insert(&self, wallet: Wallet) -> Result<Wallet, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO wallets (
                id, user_id, balance, status, is_deleted, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {WALLET_COLUMNS}
            "#
        ))
        .bind(wallet.id.as_uuid())
        .bind(wallet.user_id.as_uuid())
        .bind(wallet.balance)
        .bind(wallet.status.as_str())
        .bind(wallet.is_deleted)
        .bind(version_to_db(wallet.version)?)
        .bind(wallet.created_at)
        .bind(wallet.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_wallet", e))?;

        wallet_from_row(&row)
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1 AND is_deleted = FALSE"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_wallet", e))?;

        row.as_ref().map(wallet_from_row).transpose()
    }

    #[instrument(
        skip(self, wallet),
        fields(user_id = %wallet.user_id, expected_version = ?expected),
        err
    )]
    async fn update(
        &self,
        wallet: Wallet,
        expected: ExpectedVersion,
    ) -> Result<Wallet, StoreError> {
        let expected_db = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(version_to_db(v)?),
        };

        let row = sqlx::query(&format!(
            r#"
            UPDATE wallets
            SET balance = $1, status = $2, is_deleted = $3, version = $4, updated_at = $5
            WHERE user_id = $6
              AND is_deleted = FALSE
              AND ($7::BIGINT IS NULL OR version = $7)
            RETURNING {WALLET_COLUMNS}
            "#
        ))
        .bind(wallet.balance)
        .bind(wallet.status.as_str())
        .bind(wallet.is_deleted)
        .bind(version_to_db(wallet.version)?)
        .bind(wallet.updated_at)
        .bind(wallet.user_id.as_uuid())
        .bind(expected_db)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_wallet", e))?;

        match row {
            Some(row) => wallet_from_row(&row),
            None => match self.find_by_user(wallet.user_id).await? {
                Some(current) => Err(StoreError::Conflict(format!(
                    "wallet {} expected {expected:?}, found {}",
                    current.id, current.version
                ))),
                None => Err(StoreError::NotFound("wallet".to_string())),
            },
        }
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Wallet>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE is_deleted = FALSE \
             ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_wallets", e))?;

        rows.iter().map(wallet_from_row).collect()
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

const TRANSACTION_COLUMNS: &str = "id, sender_id, receiver_id, agent_id, amount, fee, \
     commission, kind, status, description, is_deleted, created_at, updated_at";

fn transaction_from_row(row: &PgRow) -> Result<Transaction, StoreError> {
    let decode = |e: sqlx::Error| decode_error("transaction", e);
    let user = |column: &str| -> Result<Option<UserId>, StoreError> {
        Ok(row
            .try_get::<Option<Uuid>, _>(column)
            .map_err(decode)?
            .map(UserId::from_uuid))
    };
    let amount = row.try_get::<Decimal, _>("amount").map_err(decode)?;

    Ok(Transaction {
        id: TransactionId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode)?),
        sender_id: user("sender_id")?,
        receiver_id: user("receiver_id")?,
        agent_id: user("agent_id")?,
        amount: Amount::new(amount).map_err(|e| decode_error("transaction", e))?,
        fee: row.try_get("fee").map_err(decode)?,
        commission: row.try_get("commission").map_err(decode)?,
        kind: parse_column::<TransactionKind>(row, "kind")?,
        status: parse_column::<TransactionStatus>(row, "status")?,
        description: row.try_get("description").map_err(decode)?,
        is_deleted: row.try_get("is_deleted").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

#[derive(Debug, Clone)]
pub struct PostgresTransactionStore {
    pool: Arc<PgPool>,
}

impl PostgresTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    async fn select(
        &self,
        operation: &str,
        filter: &str,
        user: Option<UserId>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE is_deleted = FALSE {filter} \
             ORDER BY created_at DESC, id DESC"
        );
        let mut query = sqlx::query(&sql);
        if let Some(user) = user {
            query = query.bind(*user.as_uuid());
        }
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        Span::current().record("row_count", rows.len());
        rows.iter().map(transaction_from_row).collect()
    }
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    #[instrument(
        skip(self, transaction),
        fields(transaction_id = %transaction.id, kind = %transaction.kind),
        err
    )]
    async fn insert(&self, transaction: Transaction) -> Result<Transaction, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO transactions (
                id, sender_id, receiver_id, agent_id, amount, fee, commission,
                kind, status, description, is_deleted, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(transaction.id.as_uuid())
        .bind(transaction.sender_id.map(Uuid::from))
        .bind(transaction.receiver_id.map(Uuid::from))
        .bind(transaction.agent_id.map(Uuid::from))
        .bind(transaction.amount.value())
        .bind(transaction.fee)
        .bind(transaction.commission)
        .bind(transaction.kind.as_str())
        .bind(transaction.status.as_str())
        .bind(transaction.description.as_deref())
        .bind(transaction.is_deleted)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_transaction", e))?;

        transaction_from_row(&row)
    }

    #[instrument(skip(self), fields(user_id = %user_id, row_count = tracing::field::Empty), err)]
    async fn list_involving(&self, user_id: UserId) -> Result<Vec<Transaction>, StoreError> {
        self.select(
            "list_involving",
            "AND (sender_id = $1 OR receiver_id = $1 OR agent_id = $1)",
            Some(user_id),
        )
        .await
    }

    #[instrument(skip(self), fields(agent_id = %agent_id, row_count = tracing::field::Empty), err)]
    async fn list_commissions(&self, agent_id: UserId) -> Result<Vec<Transaction>, StoreError> {
        self.select(
            "list_commissions",
            "AND agent_id = $1 AND kind IN ('cash_in', 'cash_out')",
            Some(agent_id),
        )
        .await
    }

    #[instrument(skip(self), fields(row_count = tracing::field::Empty), err)]
    async fn list_all(&self) -> Result<Vec<Transaction>, StoreError> {
        self.select("list_all", "", None).await
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

const USER_COLUMNS: &str = "id, name, email, phone, address, role, activity, is_verified, \
     is_deleted, is_approved, commission_rate, created_at, updated_at";

fn user_from_row(row: &PgRow) -> Result<UserAccount, StoreError> {
    let decode = |e: sqlx::Error| decode_error("user", e);
    Ok(UserAccount {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        phone: row.try_get("phone").map_err(decode)?,
        address: row.try_get("address").map_err(decode)?,
        role: parse_column::<Role>(row, "role")?,
        activity: parse_column::<Activity>(row, "activity")?,
        is_verified: row.try_get("is_verified").map_err(decode)?,
        is_deleted: row.try_get("is_deleted").map_err(decode)?,
        is_approved: row.try_get("is_approved").map_err(decode)?,
        commission_rate: row.try_get("commission_rate").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: Arc<PgPool>,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip(self, user), fields(user_id = %user.id, role = %user.role), err)]
    async fn insert(&self, user: UserAccount) -> Result<UserAccount, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (
                id, name, email, phone, address, role, activity, is_verified,
                is_deleted, is_approved, commission_rate, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.phone.as_deref())
        .bind(user.address.as_deref())
        .bind(user.role.as_str())
        .bind(user.activity.as_str())
        .bind(user.is_verified)
        .bind(user.is_deleted)
        .bind(user.is_approved)
        .bind(user.commission_rate)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        user_from_row(&row)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update(&self, user: UserAccount) -> Result<UserAccount, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET name = $1, phone = $2, address = $3, role = $4, activity = $5, is_verified = $6,
                is_deleted = $7, is_approved = $8, commission_rate = $9, updated_at = $10
            WHERE id = $11
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.name)
        .bind(user.phone.as_deref())
        .bind(user.address.as_deref())
        .bind(user.role.as_str())
        .bind(user.activity.as_str())
        .bind(user.is_verified)
        .bind(user.is_deleted)
        .bind(user.is_approved)
        .bind(user.commission_rate)
        .bind(user.updated_at)
        .bind(user.id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        match row {
            Some(row) => user_from_row(&row),
            None => Err(StoreError::NotFound("user".to_string())),
        }
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<UserAccount>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        rows.iter().map(user_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_beyond_bigint_are_rejected() {
        assert_eq!(version_to_db(7), Ok(7));
        assert!(matches!(version_to_db(u64::MAX), Err(StoreError::Backend(_))));
    }

    #[test]
    fn non_database_errors_map_to_backend() {
        let err = map_sqlx_error("list_wallets", sqlx::Error::PoolClosed);
        assert_eq!(
            err,
            StoreError::Backend("connection pool closed in list_wallets".to_string())
        );
    }
}
