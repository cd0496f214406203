//! # murmur-events
//!
//! Event bus library for murmur.
//!
//! Provides the broker abstraction, adapters and typed dispatcher used to
//! keep the local user shadow store in sync with the identity authority.
//!
//! ## Features
//!
//! - **Broker abstraction**: publish/subscribe/close over byte payloads
//!   addressed by routing key ([`EventBus`])
//! - **Kafka adapter**: one durable consumer group per subscription with
//!   manual offset commits ([`KafkaEventBus`], `kafka` feature)
//! - **In-memory adapter**: the same contract over process-local queues,
//!   for tests and broker-free development ([`InMemoryEventBus`])
//! - **Typed dispatcher**: Created/Updated/Deleted user events with fixed
//!   routing keys and JSON envelopes ([`UserEventDispatcher`])
//!
//! ## Cargo features
//!
//! - `kafka`: enable the Kafka adapter (requires librdkafka)
//! - `kafka-static`: build librdkafka from source (requires cmake)
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use murmur_events::{InMemoryEventBus, UserEventDispatcher, UserEvent, UserSnapshot};
//!
//! let bus = Arc::new(InMemoryEventBus::with_defaults());
//! let dispatcher = UserEventDispatcher::new(bus);
//! dispatcher.setup_subscriptions(handler).await?;
//! dispatcher.publish_created(&event).await?;
//! ```

pub mod bus;
pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod kind;
pub mod memory;

#[cfg(feature = "kafka")]
pub mod kafka;

pub use bus::{DeliveryError, DeliveryHandler, EventBus, RetryPolicy};
pub use config::{BrokerConfig, BrokerConfigBuilder};
pub use dispatcher::{UserEventDispatcher, UserEventHandler};
pub use envelope::{UserEvent, UserSnapshot};
pub use error::EventError;
pub use kind::EventKind;
pub use memory::InMemoryEventBus;

#[cfg(feature = "kafka")]
pub use kafka::KafkaEventBus;
