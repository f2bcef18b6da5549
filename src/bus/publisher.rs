//! Event Bus Publisher
//!
//! Publishes committed events to the durable topic exchange.
//! Messages are persistent (delivery mode 2) so a broker restart does not
//! lose them.

use chrono::{DateTime, Utc};
use lapin::options::BasicPublishOptions;
use lapin::{BasicProperties, Channel};
use serde::Serialize;

use super::topology::{declare_exchange, WALLET_EXCHANGE};
use super::BusError;

/// Wire schema for a published event: `{eventType, data, publishedAt}`.
#[derive(Debug, Serialize)]
pub struct BusMessage<'a, T: Serialize> {
    #[serde(rename = "eventType")]
    pub event_type: &'a str,
    pub data: &'a T,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
}

/// Publisher side of the event bus. Cheap to clone (wraps a lapin `Channel`,
/// which is itself a cheap handle).
#[derive(Clone)]
pub struct EventBusPublisher {
    channel: Channel,
}

impl EventBusPublisher {
    pub async fn new(channel: Channel) -> Result<Self, BusError> {
        declare_exchange(&channel).await?;
        Ok(Self { channel })
    }

    /// Publish `data` under `event_type` on `routing_key`. Best-effort: the
    /// repository calls this after the event log commit has already
    /// succeeded, so a publish failure here is logged and swallowed rather
    /// than rolling back the committed event.
    pub async fn publish<T: Serialize>(
        &self,
        routing_key: &str,
        event_type: &str,
        data: &T,
    ) -> Result<(), BusError> {
        let message = BusMessage {
            event_type,
            data,
            published_at: Utc::now(),
        };
        let payload = serde_json::to_vec(&message)?;

        self.channel
            .basic_publish(
                WALLET_EXCHANGE,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await?
            .await?;

        Ok(())
    }
}
