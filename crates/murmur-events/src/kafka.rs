//! Kafka adapter for the broker abstraction.
//!
//! Publishing goes through one shared producer. Each subscription gets a
//! dedicated consumer group derived from the configured prefix and the
//! routing key, so every subscriber owns an independent durable queue
//! (fan-out rather than competing consumers). Offsets are committed
//! manually after a delivery attempt concludes under the retry policy.

use crate::bus::{drain_workers, run_delivery, DeliveryHandler, EventBus};
use crate::config::BrokerConfig;
use crate::error::EventError;

use async_trait::async_trait;
use futures_util::StreamExt;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::{Offset, TopicPartitionList};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A delivery pulled off the broker stream, detached from its borrow so it
/// can cross the feeder/worker channel.
struct InboundMessage {
    payload: Vec<u8>,
    topic: String,
    partition: i32,
    offset: i64,
}

/// Kafka-backed [`EventBus`].
pub struct KafkaEventBus {
    producer: FutureProducer,
    config: BrokerConfig,
    shutdown: broadcast::Sender<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl KafkaEventBus {
    /// Create a new bus. The broker connection itself is lazy; this fails
    /// only on invalid client configuration.
    pub fn new(config: BrokerConfig) -> Result<Self, EventError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("client.id", &config.client_id)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .create()
            .map_err(|e| EventError::ConnectionFailed {
                broker: config.bootstrap_servers.clone(),
                cause: e.to_string(),
            })?;

        let (shutdown, _) = broadcast::channel(1);

        info!(
            bootstrap_servers = %config.bootstrap_servers,
            client_id = %config.client_id,
            "Kafka event bus created"
        );

        Ok(Self {
            producer,
            config,
            shutdown,
            tasks: Mutex::new(Vec::new()),
        })
    }

    fn consumer_for(&self, routing_key: &str) -> Result<StreamConsumer, EventError> {
        let group_id = format!("{}.{}", self.config.group_prefix, routing_key);

        ClientConfig::new()
            .set("bootstrap.servers", &self.config.bootstrap_servers)
            .set("client.id", &self.config.client_id)
            .set("group.id", &group_id)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "false")
            .set("session.timeout.ms", "30000")
            .create()
            .map_err(|e| EventError::ConnectionFailed {
                broker: self.config.bootstrap_servers.clone(),
                cause: e.to_string(),
            })
    }
}

#[async_trait]
impl EventBus for KafkaEventBus {
    async fn publish(&self, routing_key: &str, payload: Vec<u8>) -> Result<(), EventError> {
        let record = FutureRecord::<(), _>::to(routing_key).payload(&payload);

        let (partition, offset) = self
            .producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(err, _)| EventError::PublishFailed {
                routing_key: routing_key.to_string(),
                cause: err.to_string(),
            })?;

        debug!(
            routing_key = %routing_key,
            partition,
            offset,
            payload_size = payload.len(),
            "event published"
        );

        Ok(())
    }

    async fn subscribe(
        &self,
        routing_key: &str,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Result<(), EventError> {
        let consumer = Arc::new(self.consumer_for(routing_key)?);

        consumer
            .subscribe(&[routing_key])
            .map_err(|e| EventError::SubscribeFailed {
                routing_key: routing_key.to_string(),
                cause: e.to_string(),
            })?;

        let (tx, mut rx) = mpsc::channel::<InboundMessage>(self.config.channel_capacity);

        // Feeder: reads the broker stream into the bounded channel until
        // shutdown. Dropping `tx` lets the worker drain and exit.
        let feeder_consumer = consumer.clone();
        let mut feeder_shutdown = self.shutdown.subscribe();
        let feeder_key = routing_key.to_string();
        let feeder = tokio::spawn(async move {
            let mut stream = feeder_consumer.stream();
            loop {
                tokio::select! {
                    _ = feeder_shutdown.recv() => break,
                    next = stream.next() => match next {
                        Some(Ok(message)) => {
                            let Some(payload) = message.payload() else {
                                warn!(routing_key = %feeder_key, "discarding delivery with empty payload");
                                continue;
                            };
                            let inbound = InboundMessage {
                                payload: payload.to_vec(),
                                topic: message.topic().to_string(),
                                partition: message.partition(),
                                offset: message.offset(),
                            };
                            if tx.send(inbound).await.is_err() {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            error!(routing_key = %feeder_key, error = %e, "error receiving message");
                        }
                        None => break,
                    },
                }
            }
            debug!(routing_key = %feeder_key, "feeder stopped");
        });

        // Worker: strictly serial delivery, then manual offset commit. No
        // shutdown branch here so buffered deliveries drain on close.
        let worker_consumer = consumer;
        let retry = self.config.retry.clone();
        let worker_key = routing_key.to_string();
        let worker = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                run_delivery(&worker_key, handler.as_ref(), &message.payload, &retry).await;
                commit_delivery(&worker_consumer, &message);
            }
            debug!(routing_key = %worker_key, "worker drained");
        });

        let mut tasks = self.tasks.lock().expect("task list poisoned");
        tasks.push(feeder);
        tasks.push(worker);

        info!(routing_key = %routing_key, "subscription registered");
        Ok(())
    }

    async fn close(&self) -> Result<(), EventError> {
        let _ = self.shutdown.send(());

        let tasks = std::mem::take(&mut *self.tasks.lock().expect("task list poisoned"));
        drain_workers(tasks, self.config.drain_grace).await;

        if let Err(e) = self.producer.flush(Duration::from_secs(5)) {
            warn!(error = %e, "producer flush failed during close");
        }

        info!("Kafka event bus closed");
        Ok(())
    }
}

/// Commit the offset one past the handled message.
fn commit_delivery(consumer: &StreamConsumer, message: &InboundMessage) {
    let mut tpl = TopicPartitionList::new();
    if let Err(e) = tpl.add_partition_offset(
        &message.topic,
        message.partition,
        Offset::Offset(message.offset + 1),
    ) {
        error!(topic = %message.topic, error = %e, "failed to build offset list");
        return;
    }

    if let Err(e) = consumer.commit(&tpl, CommitMode::Async) {
        error!(
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            error = %e,
            "failed to commit offset"
        );
    }
}
