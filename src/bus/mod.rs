//! Event Bus module
//!
//! Durable, topic-routed publish/subscribe over RabbitMQ via `lapin`.
//! Producers publish to a single topic exchange; each consumer binds its own
//! durable queue and dead-letter queue and acknowledges manually.

mod consumer;
mod error;
mod publisher;
mod topology;

pub use consumer::{run_consumer, EventHandler, IncomingMessage};
pub use error::BusError;
pub use publisher::{BusMessage, EventBusPublisher};
pub use topology::{declare_consumer_queue, declare_exchange, WALLET_EXCHANGE};
