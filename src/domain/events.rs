//! Domain Events
//!
//! Event definitions for Event Sourcing. Events are immutable facts that have
//! happened in the system; they are never updated or deleted once appended.
//!
//! An explicit tagged union (`#[serde(tag = "type")]`) with exhaustive
//! matching on the consumer side stands in for runtime type reflection over
//! event classes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events produced by the Wallet aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WalletEvent {
    /// Money was deposited into the wallet (balance increased).
    MoneyDeposited {
        wallet_id: Uuid,
        amount: Decimal,
        balance_after: Decimal,
        transaction_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Money was withdrawn from the wallet (balance decreased).
    MoneyWithdrawn {
        wallet_id: Uuid,
        amount: Decimal,
        balance_after: Decimal,
        transaction_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl WalletEvent {
    /// The event type tag as stored in the event log / published on the bus.
    pub fn event_type(&self) -> &'static str {
        match self {
            WalletEvent::MoneyDeposited { .. } => "MoneyDeposited",
            WalletEvent::MoneyWithdrawn { .. } => "MoneyWithdrawn",
        }
    }

    pub fn wallet_id(&self) -> Uuid {
        match self {
            WalletEvent::MoneyDeposited { wallet_id, .. } => *wallet_id,
            WalletEvent::MoneyWithdrawn { wallet_id, .. } => *wallet_id,
        }
    }

    pub fn transaction_id(&self) -> Uuid {
        match self {
            WalletEvent::MoneyDeposited { transaction_id, .. } => *transaction_id,
            WalletEvent::MoneyWithdrawn { transaction_id, .. } => *transaction_id,
        }
    }

    pub fn balance_after(&self) -> Decimal {
        match self {
            WalletEvent::MoneyDeposited { balance_after, .. } => *balance_after,
            WalletEvent::MoneyWithdrawn { balance_after, .. } => *balance_after,
        }
    }

    /// The routing key the publisher emits this event under.
    pub fn routing_key(&self) -> &'static str {
        match self {
            WalletEvent::MoneyDeposited { .. } => "wallet.money.deposited",
            WalletEvent::MoneyWithdrawn { .. } => "wallet.money.withdrawn",
        }
    }
}

/// Events published by the transfer saga orchestrator.
///
/// These are bus messages describing saga progress; `SourceWalletDebited` and
/// `DestinationWalletCredited` carry the same `transaction_id` as the
/// underlying `WalletEvent` so the projection consumer can correlate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransferEvent {
    TransferInitiated {
        saga_id: Uuid,
        from_wallet_id: Uuid,
        to_wallet_id: Uuid,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    },
    SourceWalletDebited {
        saga_id: Uuid,
        from_wallet_id: Uuid,
        to_wallet_id: Uuid,
        transaction_id: Uuid,
        amount: Decimal,
        balance_after: Decimal,
        timestamp: DateTime<Utc>,
    },
    DestinationWalletCredited {
        saga_id: Uuid,
        from_wallet_id: Uuid,
        to_wallet_id: Uuid,
        transaction_id: Uuid,
        amount: Decimal,
        balance_after: Decimal,
        timestamp: DateTime<Utc>,
    },
    /// Wallet-agnostic "money moved" notification, emitted alongside
    /// `DestinationWalletCredited` for consumers that only care about net
    /// balance motion, not saga lifecycle detail (see DESIGN.md).
    MoneyTransferred {
        saga_id: Uuid,
        from_wallet_id: Uuid,
        to_wallet_id: Uuid,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    },
    TransferCompleted {
        saga_id: Uuid,
        from_wallet_id: Uuid,
        to_wallet_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    CompensationInitiated {
        saga_id: Uuid,
        from_wallet_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    SourceWalletRefunded {
        saga_id: Uuid,
        from_wallet_id: Uuid,
        to_wallet_id: Uuid,
        transaction_id: Uuid,
        amount: Decimal,
        balance_after: Decimal,
        timestamp: DateTime<Utc>,
    },
    TransferFailed {
        saga_id: Uuid,
        from_wallet_id: Uuid,
        to_wallet_id: Uuid,
        reason: TransferFailureReason,
        timestamp: DateTime<Utc>,
    },
}

impl TransferEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            TransferEvent::TransferInitiated { .. } => "TransferInitiated",
            TransferEvent::SourceWalletDebited { .. } => "SourceWalletDebited",
            TransferEvent::DestinationWalletCredited { .. } => "DestinationWalletCredited",
            TransferEvent::MoneyTransferred { .. } => "MoneyTransferred",
            TransferEvent::TransferCompleted { .. } => "TransferCompleted",
            TransferEvent::CompensationInitiated { .. } => "CompensationInitiated",
            TransferEvent::SourceWalletRefunded { .. } => "SourceWalletRefunded",
            TransferEvent::TransferFailed { .. } => "TransferFailed",
        }
    }

    pub fn saga_id(&self) -> Uuid {
        match self {
            TransferEvent::TransferInitiated { saga_id, .. }
            | TransferEvent::SourceWalletDebited { saga_id, .. }
            | TransferEvent::DestinationWalletCredited { saga_id, .. }
            | TransferEvent::MoneyTransferred { saga_id, .. }
            | TransferEvent::TransferCompleted { saga_id, .. }
            | TransferEvent::CompensationInitiated { saga_id, .. }
            | TransferEvent::SourceWalletRefunded { saga_id, .. }
            | TransferEvent::TransferFailed { saga_id, .. } => *saga_id,
        }
    }

    /// The routing key the publisher emits this event under.
    pub fn routing_key(&self) -> &'static str {
        match self {
            TransferEvent::TransferInitiated { .. } => "wallet.transfer.initiated",
            TransferEvent::SourceWalletDebited { .. } => "wallet.transfer.source.debited",
            TransferEvent::DestinationWalletCredited { .. } => {
                "wallet.transfer.destination.credited"
            }
            TransferEvent::MoneyTransferred { .. } => "wallet.money.transferred",
            TransferEvent::TransferCompleted { .. } => "wallet.transfer.completed",
            TransferEvent::CompensationInitiated { .. } => {
                "wallet.transfer.compensation.initiated"
            }
            TransferEvent::SourceWalletRefunded { .. } => "wallet.transfer.source.refunded",
            TransferEvent::TransferFailed { .. } => "wallet.transfer.failed",
        }
    }
}

/// Reasons a transfer saga can fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferFailureReason {
    InsufficientFunds,
    WalletNotFound,
    ConcurrencyConflict,
    CriticalCompensationFailure,
    InternalError,
}

impl std::fmt::Display for TransferFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferFailureReason::InsufficientFunds => write!(f, "insufficient funds"),
            TransferFailureReason::WalletNotFound => write!(f, "wallet not found"),
            TransferFailureReason::ConcurrencyConflict => write!(f, "concurrency conflict"),
            TransferFailureReason::CriticalCompensationFailure => {
                write!(f, "compensation failed, wallet refunded manually required")
            }
            TransferFailureReason::InternalError => write!(f, "internal error"),
        }
    }
}

/// A stored/loaded event envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: i64,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub version: i64,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub transaction_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_event_serialization() {
        let event = WalletEvent::MoneyDeposited {
            wallet_id: Uuid::new_v4(),
            amount: Decimal::new(100, 0),
            balance_after: Decimal::new(100, 0),
            transaction_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("MoneyDeposited"));

        let deserialized: WalletEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event.event_type(), deserialized.event_type());
    }

    #[test]
    fn test_wallet_event_routing_keys() {
        let deposited = WalletEvent::MoneyDeposited {
            wallet_id: Uuid::new_v4(),
            amount: Decimal::new(1, 0),
            balance_after: Decimal::new(1, 0),
            transaction_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };
        assert_eq!(deposited.routing_key(), "wallet.money.deposited");
    }

    #[test]
    fn test_transfer_failure_reason_serde() {
        let reason = TransferFailureReason::InsufficientFunds;
        let json = serde_json::to_string(&reason).unwrap();
        assert_eq!(json, r#""insufficient_funds""#);

        let deserialized: TransferFailureReason = serde_json::from_str(&json).unwrap();
        assert_eq!(reason, deserialized);
    }

    #[test]
    fn test_transfer_event_routing_keys_cover_all_variants() {
        let saga_id = Uuid::new_v4();
        let wallet_id = Uuid::new_v4();
        let now = Utc::now();
        let events = vec![
            TransferEvent::TransferInitiated {
                saga_id,
                from_wallet_id: wallet_id,
                to_wallet_id: wallet_id,
                amount: Decimal::ONE,
                timestamp: now,
            },
            TransferEvent::TransferCompleted {
                saga_id,
                from_wallet_id: wallet_id,
                to_wallet_id: wallet_id,
                timestamp: now,
            },
        ];
        for event in events {
            assert!(event.routing_key().starts_with("wallet."));
        }
    }
}
