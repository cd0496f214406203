//! Broker abstraction: publish/subscribe/close over byte payloads.
//!
//! Every subscription owns its own durable queue and is processed by an
//! independent worker task, strictly serially. Acknowledgment is manual and
//! follows the delivery policy in [`RetryPolicy`]: transient handler
//! failures are retried in-process with exponential backoff, permanent
//! failures are dropped immediately, and the message is acknowledged after
//! the final attempt either way so a poison message can never wedge the
//! subscription.

use crate::error::EventError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Failure verdict a [`DeliveryHandler`] reports for one delivery attempt.
///
/// The variant decides what the subscription worker does next: transient
/// failures are retried within the attempt budget, permanent failures are
/// dropped without retry.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Downstream outage; retrying within the attempt budget may succeed.
    #[error("transient delivery failure: {reason}")]
    Transient { reason: String },

    /// Input that can never succeed; retrying is pointless.
    #[error("permanent delivery failure: {reason}")]
    Permanent { reason: String },
}

impl DeliveryError {
    /// Build a transient failure.
    pub fn transient(reason: impl Into<String>) -> Self {
        DeliveryError::Transient {
            reason: reason.into(),
        }
    }

    /// Build a permanent failure.
    pub fn permanent(reason: impl Into<String>) -> Self {
        DeliveryError::Permanent {
            reason: reason.into(),
        }
    }

    /// Returns true if the failure is worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, DeliveryError::Transient { .. })
    }
}

/// Handler invoked once per delivered message on a subscription's worker task.
#[async_trait]
pub trait DeliveryHandler: Send + Sync + 'static {
    async fn handle(&self, payload: &[u8]) -> Result<(), DeliveryError>;
}

/// Capability interface for a message broker.
///
/// Implementations: [`crate::kafka::KafkaEventBus`] (feature `kafka`) and
/// [`crate::memory::InMemoryEventBus`].
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish `payload` under `routing_key` with durable delivery.
    ///
    /// Fails if the send itself fails; does not wait for any consumer to
    /// acknowledge the message.
    async fn publish(&self, routing_key: &str, payload: Vec<u8>) -> Result<(), EventError>;

    /// Declare this subscriber's own durable queue bound to `routing_key`
    /// and start its consumption pipeline.
    ///
    /// Each subscription gets an independent queue (fan-out: every
    /// subscriber receives its own copy) and its own worker task that
    /// invokes `handler` strictly serially.
    async fn subscribe(
        &self,
        routing_key: &str,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Result<(), EventError>;

    /// Stop feeding subscriptions, drain buffered deliveries within a
    /// bounded grace period, and flush any pending publishes.
    ///
    /// Call at most once, at shutdown.
    async fn close(&self) -> Result<(), EventError>;
}

/// Attempt budget and backoff schedule for transient delivery failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per delivery, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per attempt thereafter.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_millis(500),
        }
    }
}

/// Ceiling for the exponential backoff schedule.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

impl RetryPolicy {
    /// Backoff to sleep after the given failed attempt (1-based).
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_backoff
            .saturating_mul(factor)
            .min(MAX_BACKOFF)
    }
}

/// Run one delivery through the handler under the retry policy.
///
/// Returns true if the handler eventually succeeded, false if the message
/// was dropped. Either way the caller must acknowledge the message.
pub(crate) async fn run_delivery(
    routing_key: &str,
    handler: &dyn DeliveryHandler,
    payload: &[u8],
    policy: &RetryPolicy,
) -> bool {
    let mut attempt = 1u32;
    loop {
        match handler.handle(payload).await {
            Ok(()) => return true,
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                warn!(
                    routing_key = %routing_key,
                    attempt,
                    error = %e,
                    "delivery failed, retrying"
                );
                tokio::time::sleep(policy.backoff_for(attempt)).await;
                attempt += 1;
            }
            Err(e) => {
                error!(
                    routing_key = %routing_key,
                    attempts = attempt,
                    error = %e,
                    "delivery dropped"
                );
                return false;
            }
        }
    }
}

/// Join subscription workers, aborting any that exceed the grace period.
pub(crate) async fn drain_workers(handles: Vec<JoinHandle<()>>, grace: Duration) {
    for mut handle in handles {
        if tokio::time::timeout(grace, &mut handle).await.is_err() {
            warn!("subscription worker did not drain within grace period, aborting");
            handle.abort();
        }
    }
}
