//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

/// Errors raised by the wallet aggregate's pure logic.
///
/// These are independent of the web/infrastructure layer; the repository and
/// mediator layers translate them into `ConcurrencyConflict` / HTTP responses.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Withdrawal would take the balance below zero.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    /// Amount is zero, negative, or otherwise malformed.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Wallet has no events yet (used where a read requires an existing wallet).
    #[error("wallet not found: {0}")]
    WalletNotFound(String),

    /// Aggregate version conflict (optimistic concurrency).
    #[error("concurrency conflict: expected version {expected}, found {found}")]
    VersionConflict { expected: i64, found: i64 },
}

impl DomainError {
    pub fn insufficient_funds(
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    ) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    /// Client-fault errors that are never safe to retry unchanged.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. } | Self::InvalidAmount(_) | Self::WalletNotFound(_)
        )
    }

    /// Conflict errors: retryable once the caller reloads the aggregate.
    pub fn is_conflict_error(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_insufficient_funds_error() {
        let err = DomainError::insufficient_funds(Decimal::new(100, 0), Decimal::new(50, 0));

        assert!(err.is_client_error());
        assert!(!err.is_conflict_error());
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("50"));
    }

    #[test]
    fn test_version_conflict_error() {
        let err = DomainError::VersionConflict {
            expected: 1,
            found: 2,
        };

        assert!(!err.is_client_error());
        assert!(err.is_conflict_error());
    }
}
