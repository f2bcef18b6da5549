//! Fraud Consumer module
//!
//! Consumes the wallet event stream on its own durable queue, independent of
//! the projection consumer, and maintains fraud tables nothing else writes
//! to.

mod consumer;
mod rules;
mod store;

pub use consumer::FraudConsumer;
pub use rules::{RiskLevel, Severity};
pub use store::{FraudStore, FraudStoreError, RecentEvent};
