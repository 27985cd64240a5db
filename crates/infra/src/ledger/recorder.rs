//! Transaction recorder.
//!
//! Writes the audit records of an operation after its balance effects have
//! landed. The writes are not atomic with the balance change: a failed record
//! is logged and dropped, and the balance change stands.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use digiwallet_core::TransactionId;
use digiwallet_wallet::{CommissionPolicy, MoneyOperation, RecorderPolicy, Transaction};

use crate::store::TransactionStore;

#[derive(Clone)]
pub struct TransactionRecorder {
    transactions: Arc<dyn TransactionStore>,
    commission: CommissionPolicy,
    policy: RecorderPolicy,
}

impl TransactionRecorder {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        commission: CommissionPolicy,
        policy: RecorderPolicy,
    ) -> Self {
        Self {
            transactions,
            commission,
            policy,
        }
    }

    /// Persist the records of a completed operation.
    ///
    /// Returns the records that were written; failures are logged, not
    /// returned.
    pub async fn record(&self, operation: &MoneyOperation) -> Vec<Transaction> {
        let mut written = Vec::new();
        for draft in operation.drafts(&self.commission, &self.policy) {
            let kind = draft.kind;
            let record = draft.into_record(TransactionId::new(), Utc::now());
            match self.transactions.insert(record).await {
                Ok(saved) => written.push(saved),
                Err(err) => {
                    warn!(
                        operation = operation.name(),
                        %kind,
                        amount = %operation.amount(),
                        error = %err,
                        "failed to record transaction; balance change stands"
                    );
                }
            }
        }
        written
    }
}
