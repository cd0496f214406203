//! In-memory event bus for tests and broker-free development.

use crate::bus::{drain_workers, run_delivery, DeliveryHandler, EventBus, RetryPolicy};
use crate::error::EventError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Grace period for workers to drain buffered deliveries on close.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// An [`EventBus`] over process-local queues.
///
/// Mirrors the broker contract: each subscription owns its own bounded
/// queue (fan-out) drained by a dedicated worker task, strictly serially,
/// under the same delivery policy as the Kafka adapter. Publishing with no
/// subscribers drops the message, like an exchange with no bound queues.
pub struct InMemoryEventBus {
    capacity: usize,
    retry: RetryPolicy,
    subscriptions: Mutex<HashMap<String, Vec<mpsc::Sender<Vec<u8>>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl InMemoryEventBus {
    /// Create a bus with the given per-subscription queue capacity and
    /// delivery policy.
    #[must_use]
    pub fn new(capacity: usize, retry: RetryPolicy) -> Self {
        Self {
            capacity,
            retry,
            subscriptions: Mutex::new(HashMap::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Create a bus with default capacity and policy.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(64, RetryPolicy::default())
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, routing_key: &str, payload: Vec<u8>) -> Result<(), EventError> {
        let senders: Vec<mpsc::Sender<Vec<u8>>> = {
            let subscriptions = self.subscriptions.lock().expect("subscription map poisoned");
            subscriptions
                .get(routing_key)
                .map(|senders| senders.to_vec())
                .unwrap_or_default()
        };

        if senders.is_empty() {
            debug!(routing_key = %routing_key, "no subscribers, message dropped");
            return Ok(());
        }

        for sender in senders {
            // A closed receiver means the subscription was torn down; the
            // message simply no longer has that recipient.
            let _ = sender.send(payload.clone()).await;
        }

        Ok(())
    }

    async fn subscribe(
        &self,
        routing_key: &str,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Result<(), EventError> {
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(self.capacity);

        self.subscriptions
            .lock()
            .expect("subscription map poisoned")
            .entry(routing_key.to_string())
            .or_default()
            .push(tx);

        let key = routing_key.to_string();
        let retry = self.retry.clone();
        let worker = tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                run_delivery(&key, handler.as_ref(), &payload, &retry).await;
            }
        });

        self.workers
            .lock()
            .expect("worker list poisoned")
            .push(worker);

        debug!(routing_key = %routing_key, "in-memory subscription registered");
        Ok(())
    }

    async fn close(&self) -> Result<(), EventError> {
        // Dropping the senders lets each worker drain its buffered
        // deliveries and exit.
        self.subscriptions
            .lock()
            .expect("subscription map poisoned")
            .clear();

        let workers = std::mem::take(&mut *self.workers.lock().expect("worker list poisoned"));
        drain_workers(workers, DRAIN_GRACE).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::DeliveryError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Notify;

    struct CountingHandler {
        calls: AtomicU32,
        notify: Notify,
    }

    impl CountingHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                notify: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl DeliveryHandler for CountingHandler {
        async fn handle(&self, _payload: &[u8]) -> Result<(), DeliveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.notify.notify_one();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_each_subscription_gets_its_own_copy() {
        let bus = InMemoryEventBus::with_defaults();
        let first = CountingHandler::new();
        let second = CountingHandler::new();

        bus.subscribe("identity.user.created", first.clone())
            .await
            .unwrap();
        bus.subscribe("identity.user.created", second.clone())
            .await
            .unwrap();

        bus.publish("identity.user.created", b"{}".to_vec())
            .await
            .unwrap();

        first.notify.notified().await;
        second.notify.notified().await;
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_routing_keys_are_isolated() {
        let bus = InMemoryEventBus::with_defaults();
        let created = CountingHandler::new();

        bus.subscribe("identity.user.created", created.clone())
            .await
            .unwrap();

        bus.publish("identity.user.deleted", b"{}".to_vec())
            .await
            .unwrap();
        bus.publish("identity.user.created", b"{}".to_vec())
            .await
            .unwrap();

        created.notify.notified().await;
        assert_eq!(created.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let bus = InMemoryEventBus::with_defaults();
        bus.publish("identity.user.created", b"{}".to_vec())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_close_drains_buffered_deliveries() {
        let bus = InMemoryEventBus::with_defaults();
        let handler = CountingHandler::new();

        bus.subscribe("identity.user.created", handler.clone())
            .await
            .unwrap();
        for _ in 0..5 {
            bus.publish("identity.user.created", b"{}".to_vec())
                .await
                .unwrap();
        }

        bus.close().await.unwrap();
        assert_eq!(handler.calls.load(Ordering::SeqCst), 5);
    }
}
