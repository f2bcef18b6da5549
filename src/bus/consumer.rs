//! Event Bus Consumer
//!
//! Long-running consumer loop: durable named queue, at-least-once delivery,
//! manual ack, prefetch 1. A handler that errors causes the
//! message to be rejected without requeue, so it flows to the queue's
//! dead-letter queue instead of being redelivered forever. Handlers MUST be
//! idempotent because redelivery can occur after a crash between work and ack.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions};
use lapin::types::FieldTable;
use lapin::Channel;
use serde::Deserialize;

use super::topology::declare_consumer_queue;
use super::BusError;

/// Inbound wire shape, mirroring `BusMessage`'s `{eventType, data, publishedAt}`.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[serde(rename = "eventType")]
    pub event_type: String,
    pub data: serde_json::Value,
    #[serde(rename = "publishedAt")]
    #[allow(dead_code)]
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// Implemented by each independent consumer (projection, fraud). `handle` is
/// called once per delivery; any `Err` nacks the message without requeue.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, message: IncomingMessage) -> anyhow::Result<()>;
}

/// Run a consumer loop against `queue_name`, bound to `binding_patterns` on
/// the wallet topic exchange, until the channel closes or the process exits.
pub async fn run_consumer<H: EventHandler + 'static>(
    channel: Channel,
    queue_name: &str,
    binding_patterns: &[&str],
    handler: H,
) -> Result<(), BusError> {
    declare_consumer_queue(&channel, queue_name, binding_patterns).await?;

    // Prefetch 1: natural backpressure, one in-flight message per consumer.
    channel
        .basic_qos(1, BasicQosOptions::default())
        .await?;

    let mut consumer = channel
        .basic_consume(
            queue_name,
            queue_name, // consumer tag, unique enough per-process
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    tracing::info!(queue = queue_name, "consumer loop started");

    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(queue = queue_name, error = %e, "failed to receive delivery");
                continue;
            }
        };

        let outcome: anyhow::Result<()> = match serde_json::from_slice::<IncomingMessage>(&delivery.data) {
            Ok(message) => handler.handle(message).await,
            Err(e) => Err(anyhow::anyhow!("malformed message payload: {e}")),
        };

        match outcome {
            Ok(()) => {
                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    tracing::error!(queue = queue_name, error = %e, "failed to ack delivery");
                }
            }
            Err(e) => {
                tracing::warn!(queue = queue_name, error = %e, "handler failed, dead-lettering");
                if let Err(e) = delivery
                    .nack(BasicNackOptions {
                        requeue: false,
                        ..Default::default()
                    })
                    .await
                {
                    tracing::error!(queue = queue_name, error = %e, "failed to nack delivery");
                }
            }
        }
    }

    Ok(())
}
