//! Projection consumer.
//!
//! Consumes the wallet event stream on its own durable queue and maintains
//! the wallet/transaction read models. Never touches the event log or the
//! fraud tables.

use rust_decimal::Decimal;
use uuid::Uuid;

use async_trait::async_trait;

use crate::bus::{EventHandler, IncomingMessage};

use super::store::{ProjectionStore, TransactionType};

/// Applies wallet and transfer events to the read models.
pub struct ProjectionConsumer {
    store: ProjectionStore,
}

impl ProjectionConsumer {
    pub fn new(store: ProjectionStore) -> Self {
        Self { store }
    }

    /// Apply a single-wallet event (deposit, withdrawal, refund): one wallet
    /// balance update and one transaction row, keyed by the event's own
    /// `transaction_id` so redelivery is a no-op.
    async fn apply_single_wallet_event(
        &self,
        wallet_id: Uuid,
        transaction_id: Uuid,
        transaction_type: TransactionType,
        amount: Decimal,
        balance_after: Decimal,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> anyhow::Result<()> {
        self.store
            .upsert_wallet_balance(wallet_id, balance_after, timestamp)
            .await?;
        self.store
            .insert_transaction_if_new(
                &transaction_id.to_string(),
                wallet_id,
                transaction_type,
                amount,
                balance_after,
                None,
                timestamp,
            )
            .await?;
        Ok(())
    }

    /// Apply one leg of a transfer (debit, credit, or refund leg). The row id
    /// is suffixed so the two legs of the same `transaction_id` don't collide
    /// (a transfer's debit and credit share a `transaction_id` on the wire).
    async fn apply_transfer_leg(
        &self,
        wallet_id: Uuid,
        related_wallet_id: Uuid,
        transaction_id: Uuid,
        suffix: &str,
        transaction_type: TransactionType,
        amount: Decimal,
        balance_after: Decimal,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> anyhow::Result<()> {
        self.store
            .upsert_wallet_balance(wallet_id, balance_after, timestamp)
            .await?;
        self.store
            .insert_transaction_if_new(
                &format!("{transaction_id}{suffix}"),
                wallet_id,
                transaction_type,
                amount,
                balance_after,
                Some(related_wallet_id),
                timestamp,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for ProjectionConsumer {
    async fn handle(&self, message: IncomingMessage) -> anyhow::Result<()> {
        match message.event_type.as_str() {
            "MoneyDeposited" => {
                let wallet_id = uuid_field(&message.data, "wallet_id")?;
                let transaction_id = uuid_field(&message.data, "transaction_id")?;
                let amount = decimal_field(&message.data, "amount")?;
                let balance_after = decimal_field(&message.data, "balance_after")?;
                let timestamp = timestamp_field(&message.data, "timestamp")?;
                self.apply_single_wallet_event(
                    wallet_id,
                    transaction_id,
                    TransactionType::Deposit,
                    amount,
                    balance_after,
                    timestamp,
                )
                .await
            }
            "MoneyWithdrawn" => {
                let wallet_id = uuid_field(&message.data, "wallet_id")?;
                let transaction_id = uuid_field(&message.data, "transaction_id")?;
                let amount = decimal_field(&message.data, "amount")?;
                let balance_after = decimal_field(&message.data, "balance_after")?;
                let timestamp = timestamp_field(&message.data, "timestamp")?;
                self.apply_single_wallet_event(
                    wallet_id,
                    transaction_id,
                    TransactionType::Withdrawal,
                    amount,
                    balance_after,
                    timestamp,
                )
                .await
            }
            "SourceWalletDebited" => {
                let from_wallet_id = uuid_field(&message.data, "from_wallet_id")?;
                let to_wallet_id = uuid_field(&message.data, "to_wallet_id")?;
                let transaction_id = uuid_field(&message.data, "transaction_id")?;
                let amount = decimal_field(&message.data, "amount")?;
                let balance_after = decimal_field(&message.data, "balance_after")?;
                let timestamp = timestamp_field(&message.data, "timestamp")?;
                self.apply_transfer_leg(
                    from_wallet_id,
                    to_wallet_id,
                    transaction_id,
                    "-out",
                    TransactionType::TransferOut,
                    amount,
                    balance_after,
                    timestamp,
                )
                .await
            }
            "DestinationWalletCredited" => {
                let from_wallet_id = uuid_field(&message.data, "from_wallet_id")?;
                let to_wallet_id = uuid_field(&message.data, "to_wallet_id")?;
                let transaction_id = uuid_field(&message.data, "transaction_id")?;
                let amount = decimal_field(&message.data, "amount")?;
                let balance_after = decimal_field(&message.data, "balance_after")?;
                let timestamp = timestamp_field(&message.data, "timestamp")?;
                self.apply_transfer_leg(
                    to_wallet_id,
                    from_wallet_id,
                    transaction_id,
                    "-in",
                    TransactionType::TransferIn,
                    amount,
                    balance_after,
                    timestamp,
                )
                .await
            }
            "SourceWalletRefunded" => {
                let from_wallet_id = uuid_field(&message.data, "from_wallet_id")?;
                let transaction_id = uuid_field(&message.data, "transaction_id")?;
                let amount = decimal_field(&message.data, "amount")?;
                let balance_after = decimal_field(&message.data, "balance_after")?;
                let timestamp = timestamp_field(&message.data, "timestamp")?;
                self.apply_single_wallet_event(
                    from_wallet_id,
                    transaction_id,
                    TransactionType::Refund,
                    amount,
                    balance_after,
                    timestamp,
                )
                .await
            }
            // TransferInitiated/MoneyTransferred/TransferCompleted/CompensationInitiated/
            // TransferFailed carry no new wallet-level fact; the legs above already cover
            // every balance change a transfer can produce.
            _ => Ok(()),
        }
    }
}

fn uuid_field(data: &serde_json::Value, field: &str) -> anyhow::Result<Uuid> {
    data.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing or non-string field `{field}`"))
        .and_then(|s| Ok(Uuid::parse_str(s)?))
}

fn decimal_field(data: &serde_json::Value, field: &str) -> anyhow::Result<Decimal> {
    let value = data
        .get(field)
        .ok_or_else(|| anyhow::anyhow!("missing field `{field}`"))?;
    if let Some(s) = value.as_str() {
        return Ok(s.parse()?);
    }
    value
        .as_f64()
        .map(Decimal::try_from)
        .transpose()?
        .ok_or_else(|| anyhow::anyhow!("field `{field}` is not a decimal"))
}

fn timestamp_field(
    data: &serde_json::Value,
    field: &str,
) -> anyhow::Result<chrono::DateTime<chrono::Utc>> {
    let s = data
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing or non-string field `{field}`"))?;
    Ok(chrono::DateTime::parse_from_rfc3339(s)?.with_timezone(&chrono::Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_field_rejects_missing() {
        let data = serde_json::json!({});
        assert!(uuid_field(&data, "wallet_id").is_err());
    }

    #[test]
    fn test_decimal_field_accepts_string_and_number() {
        let data = serde_json::json!({"amount": "12.50", "other": 5});
        assert_eq!(decimal_field(&data, "amount").unwrap(), Decimal::new(1250, 2));
        assert!(decimal_field(&data, "other").is_ok());
    }

    #[test]
    fn test_timestamp_field_parses_rfc3339() {
        let data = serde_json::json!({"timestamp": "2024-01-01T00:00:00Z"});
        assert!(timestamp_field(&data, "timestamp").is_ok());
    }
}
