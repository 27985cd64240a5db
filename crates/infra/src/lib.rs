//! Infrastructure layer: ledger stores, accounting services, configuration.

pub mod accounts;
pub mod config;
pub mod ledger;
pub mod store;


pub use accounts::{AccountDirectory, GateFailure, UserPage, UserQuery};
pub use config::{AppConfig, BootstrapAdmin};
pub use ledger::{AccountingEngine, HistoryService, TransactionRecorder, WalletOperations};
