//! Wallet Aggregate
//!
//! Pure state machine: folds events into a balance and emits new events for
//! deposit/withdraw. No I/O happens here; the aggregate is never
//! persisted directly — its state is always recomputable from its event
//! prefix via `fold`.
//!
//! A wallet is considered to exist whenever it has at least one event. Loading
//! an id with no events yields `{balance: 0, version: 0}`, and a first deposit
//! on an unknown id implicitly creates the wallet — there is no separate
//! `WalletCreated` event.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{Amount, Balance, DomainError, WalletEvent};

use super::Aggregate;

/// The wallet aggregate's current, folded state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wallet {
    id: Uuid,
    balance: Balance,
    version: i64,
}

impl Wallet {
    /// An empty wallet ready to be folded, or used as the starting point for
    /// the very first operation on a brand-new id.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            balance: Balance::zero(),
            version: 0,
        }
    }

    /// Deterministic, order-sensitive fold over a wallet's event prefix.
    pub fn fold(id: Uuid, events: impl IntoIterator<Item = WalletEvent>) -> Self {
        let mut wallet = Self::new(id);
        for event in events {
            wallet = wallet.apply(event);
        }
        wallet
    }

    /// Generate a `MoneyDeposited` event. Rejects `amount <= 0` via `Amount`'s
    /// own construction — callers pass an already-validated `Amount`.
    pub fn deposit(&self, amount: Amount, transaction_id: Uuid) -> WalletEvent {
        let balance_after = self.balance.credit(&amount);
        WalletEvent::MoneyDeposited {
            wallet_id: self.id,
            amount: amount.value(),
            balance_after: balance_after.value(),
            transaction_id,
            timestamp: Utc::now(),
        }
    }

    /// Generate a `MoneyWithdrawn` event, or `InsufficientFunds` if the
    /// withdrawal would take the balance below zero.
    pub fn withdraw(
        &self,
        amount: Amount,
        transaction_id: Uuid,
    ) -> Result<WalletEvent, DomainError> {
        if !self.balance.is_sufficient_for(&amount) {
            return Err(DomainError::insufficient_funds(
                amount.value(),
                self.balance.value(),
            ));
        }

        let balance_after = self.balance.debit(&amount);
        Ok(WalletEvent::MoneyWithdrawn {
            wallet_id: self.id,
            amount: amount.value(),
            balance_after: balance_after.value(),
            transaction_id,
            timestamp: Utc::now(),
        })
    }

    pub fn balance(&self) -> &Balance {
        &self.balance
    }

    pub fn exists(&self) -> bool {
        self.version > 0
    }
}

impl Aggregate for Wallet {
    type Event = WalletEvent;

    fn aggregate_type() -> &'static str {
        "Wallet"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(mut self, event: Self::Event) -> Self {
        self.id = event.wallet_id();
        match &event {
            WalletEvent::MoneyDeposited { amount, .. } => {
                let amt = Amount::new(*amount).expect("invalid amount in stored event");
                self.balance = self.balance.credit(&amt);
            }
            WalletEvent::MoneyWithdrawn { amount, .. } => {
                let amt = Amount::new(*amount).expect("invalid amount in stored event");
                self.balance = self.balance.debit(&amt);
            }
        }
        self.version += 1;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_fold_empty_is_zero_balance_version_zero() {
        let id = Uuid::new_v4();
        let wallet = Wallet::fold(id, vec![]);
        assert_eq!(wallet.balance().value(), Decimal::ZERO);
        assert_eq!(wallet.version(), 0);
        assert!(!wallet.exists());
    }

    #[test]
    fn test_first_deposit_implicitly_creates_wallet() {
        let id = Uuid::new_v4();
        let wallet = Wallet::new(id);
        let amount = Amount::new(Decimal::new(100, 0)).unwrap();
        let event = wallet.deposit(amount, Uuid::new_v4());
        let wallet = wallet.apply(event);

        assert!(wallet.exists());
        assert_eq!(wallet.balance().value(), Decimal::new(10000, 2));
        assert_eq!(wallet.version(), 1);
    }

    #[test]
    fn test_deposit_then_withdraw() {
        let id = Uuid::new_v4();
        let wallet = Wallet::new(id);
        let deposit_amount = Amount::new(Decimal::new(100, 0)).unwrap();
        let wallet = wallet.apply(wallet.deposit(deposit_amount, Uuid::new_v4()));

        let withdraw_amount = Amount::new(Decimal::new(30, 0)).unwrap();
        let event = wallet.withdraw(withdraw_amount, Uuid::new_v4()).unwrap();
        let wallet = wallet.apply(event);

        assert_eq!(wallet.balance().value(), Decimal::new(7000, 2));
        assert_eq!(wallet.version(), 2);
    }

    #[test]
    fn test_withdraw_insufficient_funds() {
        let id = Uuid::new_v4();
        let wallet = Wallet::new(id);
        let amount = Amount::new(Decimal::new(100, 0)).unwrap();

        let result = wallet.withdraw(amount, Uuid::new_v4());
        assert!(matches!(
            result,
            Err(DomainError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn test_withdraw_exact_balance_leaves_zero() {
        let id = Uuid::new_v4();
        let wallet = Wallet::new(id);
        let amount = Amount::new(Decimal::new(100, 0)).unwrap();
        let wallet = wallet.apply(wallet.deposit(amount, Uuid::new_v4()));

        let event = wallet.withdraw(amount, Uuid::new_v4()).unwrap();
        let wallet = wallet.apply(event);

        assert_eq!(wallet.balance().value(), Decimal::ZERO);
    }

    #[test]
    fn test_replay_fidelity_balance_after_matches_fold() {
        let id = Uuid::new_v4();
        let wallet = Wallet::new(id);
        let d1 = wallet.deposit(Amount::new(Decimal::new(500, 0)).unwrap(), Uuid::new_v4());
        let wallet = wallet.apply(d1.clone());
        let w1 = wallet.withdraw(Amount::new(Decimal::new(200, 0)).unwrap(), Uuid::new_v4()).unwrap();
        let wallet = wallet.apply(w1.clone());

        let replayed = Wallet::fold(id, vec![d1, w1.clone()]);
        assert_eq!(replayed.balance().value(), wallet.balance().value());
        assert_eq!(w1.balance_after(), replayed.balance().value());
    }
}
