//! Fraud Consumer.
//!
//! Maintains the sliding window, evaluates the three rules, and raises
//! deduplicated alerts with a monotonically increasing risk score. Runs as an
//! independent [`crate::bus::EventHandler`] bound to `wallet.#`, the same
//! catch-all pattern the projection consumer uses — the two consumers are
//! fully independent, each with its own queue and delivery progress.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::bus::{EventHandler, IncomingMessage};

use super::rules::{self, Candidate};
use super::store::FraudStore;

pub struct FraudConsumer {
    store: FraudStore,
}

impl FraudConsumer {
    pub fn new(store: FraudStore) -> Self {
        Self { store }
    }

    async fn process(&self, wallet_id: Uuid, event_type: &str, amount: Decimal, transaction_id: Uuid) -> anyhow::Result<()> {
        let window = rules::high_velocity_window();
        let recent = self.store.recent_events(wallet_id, window).await?;

        let candidate = Candidate {
            wallet_id,
            event_type,
            amount,
            transaction_id,
        };
        let hits = rules::evaluate(&candidate, &recent);

        // Record the event into the window only after rules have been
        // evaluated against the *prior* window: velocity counts events that
        // occurred before this one, not including it.
        self.store
            .record_event(wallet_id, event_type, amount, transaction_id, chrono::Utc::now())
            .await?;

        for hit in hits {
            let payload = serde_json::json!({
                "wallet_id": wallet_id,
                "event_type": event_type,
                "amount": amount,
            });
            let inserted = self
                .store
                .insert_alert_if_new(
                    wallet_id,
                    hit.rule_id,
                    hit.rule_name,
                    hit.severity,
                    transaction_id,
                    event_type,
                    payload,
                )
                .await?;

            if inserted {
                self.store.raise_risk_score(wallet_id, hit.severity.score_delta()).await?;
                tracing::warn!(
                    %wallet_id,
                    %transaction_id,
                    rule_id = hit.rule_id,
                    severity = hit.severity.as_str(),
                    "fraud alert raised"
                );
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for FraudConsumer {
    async fn handle(&self, message: IncomingMessage) -> anyhow::Result<()> {
        // Transfer legs are committed to the event log without a standalone
        // wallet.money.* publish (see AggregateRepository::execute_without_publish),
        // so they are normalized to the logical MoneyWithdrawn/MoneyDeposited
        // type here rather than observed twice.
        let (wallet_id, amount, transaction_id, logical_type) = match message.event_type.as_str() {
            "MoneyDeposited" | "MoneyWithdrawn" => {
                let wallet_id = uuid_field(&message.data, "wallet_id")?;
                let amount = decimal_field(&message.data, "amount")?;
                let transaction_id = uuid_field(&message.data, "transaction_id")?;
                (wallet_id, amount, transaction_id, message.event_type.clone())
            }
            "SourceWalletDebited" => {
                let wallet_id = uuid_field(&message.data, "from_wallet_id")?;
                let amount = decimal_field(&message.data, "amount")?;
                let transaction_id = uuid_field(&message.data, "transaction_id")?;
                (wallet_id, amount, transaction_id, "MoneyWithdrawn".to_string())
            }
            "DestinationWalletCredited" => {
                let wallet_id = uuid_field(&message.data, "to_wallet_id")?;
                let amount = decimal_field(&message.data, "amount")?;
                let transaction_id = uuid_field(&message.data, "transaction_id")?;
                (wallet_id, amount, transaction_id, "MoneyDeposited".to_string())
            }
            "SourceWalletRefunded" => {
                let wallet_id = uuid_field(&message.data, "from_wallet_id")?;
                let amount = decimal_field(&message.data, "amount")?;
                let transaction_id = uuid_field(&message.data, "transaction_id")?;
                (wallet_id, amount, transaction_id, "MoneyDeposited".to_string())
            }
            // Saga lifecycle events (TransferInitiated/MoneyTransferred/TransferCompleted/
            // CompensationInitiated/TransferFailed) carry no single wallet amount in the
            // shape the rules need; the legs above already cover every balance change.
            _ => return Ok(()),
        };

        self.process(wallet_id, &logical_type, amount, transaction_id).await
    }
}

fn uuid_field(data: &serde_json::Value, field: &str) -> anyhow::Result<Uuid> {
    data.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing field {field}"))?
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid {field}: {e}"))
}

fn decimal_field(data: &serde_json::Value, field: &str) -> anyhow::Result<Decimal> {
    let raw = data
        .get(field)
        .ok_or_else(|| anyhow::anyhow!("missing field {field}"))?;
    serde_json::from_value(raw.clone()).map_err(|e| anyhow::anyhow!("invalid {field}: {e}"))
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
    fn test_decimal_field_parses_numeric_string() {
        let data = serde_json::json!({"amount": "123.45"});
        let value = decimal_field(&data, "amount").unwrap();
        assert_eq!(value, Decimal::new(12345, 2));
    }
}
