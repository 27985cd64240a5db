//! Ledger services: balance mutation, audit recording and history.

pub mod engine;
pub mod history;
pub mod operations;
pub mod recorder;

pub use engine::AccountingEngine;
pub use history::{HistoryService, PartyView, TransactionView};
pub use operations::WalletOperations;
pub use recorder::TransactionRecorder;
