//! Store and service wiring shared by every handler.

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use digiwallet_infra::store::{
    self, InMemoryTransactionStore, InMemoryUserStore, InMemoryWalletStore,
    PostgresTransactionStore, PostgresUserStore, PostgresWalletStore, TransactionStore, UserStore,
    WalletStore,
};
use digiwallet_infra::{
    AccountDirectory, AccountingEngine, AppConfig, HistoryService, TransactionRecorder,
    WalletOperations,
};
use digiwallet_wallet::{CommissionPolicy, RecorderPolicy};

#[derive(Clone)]
pub struct AppServices {
    pub accounts: AccountDirectory,
    pub operations: WalletOperations,
    pub history: HistoryService,
}

impl AppServices {
    fn wire(
        wallets: Arc<dyn WalletStore>,
        transactions: Arc<dyn TransactionStore>,
        users: Arc<dyn UserStore>,
        commission: CommissionPolicy,
        recorder: RecorderPolicy,
    ) -> Self {
        let engine = AccountingEngine::new(wallets);
        let recorder = TransactionRecorder::new(transactions.clone(), commission, recorder);
        Self {
            accounts: AccountDirectory::new(users.clone(), engine.clone()),
            operations: WalletOperations::new(engine, recorder),
            history: HistoryService::new(transactions, users),
        }
    }

    /// Process-local stores; state is lost on restart.
    pub fn in_memory(commission: CommissionPolicy, recorder: RecorderPolicy) -> Self {
        Self::wire(
            Arc::new(InMemoryWalletStore::new()),
            Arc::new(InMemoryTransactionStore::new()),
            Arc::new(InMemoryUserStore::new()),
            commission,
            recorder,
        )
    }

    /// Postgres stores over a shared pool. The schema must already be applied.
    pub fn postgres(pool: PgPool, commission: CommissionPolicy, recorder: RecorderPolicy) -> Self {
        Self::wire(
            Arc::new(PostgresWalletStore::new(pool.clone())),
            Arc::new(PostgresTransactionStore::new(pool.clone())),
            Arc::new(PostgresUserStore::new(pool)),
            commission,
            recorder,
        )
    }

    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        match &config.database_url {
            Some(url) => {
                let pool = store::postgres::connect(url)
                    .await
                    .context("failed to connect to DATABASE_URL")?;
                tracing::info!("using postgres ledger stores");
                Ok(Self::postgres(pool, config.commission, config.recorder))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory ledger stores");
                Ok(Self::in_memory(config.commission, config.recorder))
            }
        }
    }
}
