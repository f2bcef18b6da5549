//! Projection module
//!
//! Updates read-model tables (projections) from events.
//! Projections are optimized for queries and derived from events.

mod service;
mod store;

pub use service::ProjectionConsumer;
pub use store::{ProjectionStore, ProjectionStoreError, TransactionRow, TransactionType, WalletProjection};
