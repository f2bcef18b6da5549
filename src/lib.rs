//! Wallet Ledger
//!
//! Event-sourced wallet service: deposits, withdrawals and saga-orchestrated
//! transfers over an append-only event log, with independent projection and
//! fraud consumers reading the same event stream off a topic exchange.
//! Re-exports modules for integration testing and the standalone binaries.

pub mod aggregate;
pub mod api;
pub mod bus;
pub mod domain;
pub mod event_store;
pub mod fraud;
pub mod idempotency;
pub mod mediator;
pub mod projection;
pub mod repository;
pub mod saga;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use domain::{Amount, AmountError, Balance, DomainError, OperationContext, StoredEvent};
pub use domain::{TransferEvent, TransferFailureReason, WalletEvent};
