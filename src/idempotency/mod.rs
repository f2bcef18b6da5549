//! Idempotency module
//!
//! Prevents duplicate request processing using client-supplied idempotency keys.

mod store;

pub use store::{IdempotencyError, IdempotencyStatus, IdempotencyStore, LockOutcome};
