//! Event Bus Topology
//!
//! Declares the topic exchange, per-consumer durable queues, and their
//! dead-letter queues. `wallet.#` is the catch-all binding used
//! by consumers that want every wallet event; individual consumers may bind
//! a narrower pattern.

use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Channel, ExchangeKind};

use super::BusError;

/// Name of the durable topic exchange every wallet event is published to.
pub const WALLET_EXCHANGE: &str = "wallet.events";

/// Declare the topic exchange. Idempotent — safe to call from every process
/// that touches the bus (publisher and every consumer).
pub async fn declare_exchange(channel: &Channel) -> Result<(), BusError> {
    channel
        .exchange_declare(
            WALLET_EXCHANGE,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok(())
}

/// Declare a named durable consumer queue bound to `WALLET_EXCHANGE` with the
/// given routing patterns, plus its dead-letter queue. Messages the consumer
/// rejects without requeue land in `<queue_name>.dlq` and are never
/// automatically redelivered.
pub async fn declare_consumer_queue(
    channel: &Channel,
    queue_name: &str,
    binding_patterns: &[&str],
) -> Result<(), BusError> {
    declare_exchange(channel).await?;

    let dlq_name = format!("{queue_name}.dlq");

    // Dead-letter queue: plain durable queue, nothing redelivers into it.
    channel
        .queue_declare(
            &dlq_name,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    // Main queue, dead-lettering rejected (non-requeued) messages to the DLQ.
    let mut args = FieldTable::default();
    args.insert("x-dead-letter-exchange".into(), AMQPValue::LongString("".into()));
    args.insert(
        "x-dead-letter-routing-key".into(),
        AMQPValue::LongString(dlq_name.clone().into()),
    );

    channel
        .queue_declare(
            queue_name,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            args,
        )
        .await?;

    for pattern in binding_patterns {
        channel
            .queue_bind(
                queue_name,
                WALLET_EXCHANGE,
                pattern,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
    }

    Ok(())
}
