//! Broker configuration management.

use crate::bus::RetryPolicy;
use crate::error::EventError;
use std::env;
use std::time::Duration;

/// Connection and delivery settings for the broker adapters.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Comma-separated list of broker addresses.
    pub bootstrap_servers: String,
    /// Client identifier reported to the broker.
    pub client_id: String,
    /// Prefix for per-subscription consumer group names; the full group is
    /// `<prefix>.<routing-key>`, giving every subscription its own durable
    /// queue.
    pub group_prefix: String,
    /// Capacity of the bounded channel between a subscription's feeder and
    /// its worker.
    pub channel_capacity: usize,
    /// Delivery retry policy for transient handler failures.
    pub retry: RetryPolicy,
    /// Grace period for draining in-flight deliveries on close.
    pub drain_grace: Duration,
}

impl BrokerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `KAFKA_BOOTSTRAP_SERVERS`: comma-separated broker list
    ///
    /// Optional:
    /// - `KAFKA_CLIENT_ID`: client identifier (default: "murmur-events")
    /// - `KAFKA_GROUP_PREFIX`: consumer group prefix (default: "murmur")
    /// - `EVENT_CHANNEL_CAPACITY`: feeder/worker channel size (default: 64)
    /// - `EVENT_MAX_ATTEMPTS`: delivery attempts per message (default: 5)
    /// - `EVENT_RETRY_BACKOFF_MS`: base retry backoff (default: 500)
    /// - `SHUTDOWN_GRACE_SECS`: drain grace on close (default: 15)
    pub fn from_env() -> Result<Self, EventError> {
        let bootstrap_servers =
            env::var("KAFKA_BOOTSTRAP_SERVERS").map_err(|_| EventError::ConfigMissing {
                var: "KAFKA_BOOTSTRAP_SERVERS".to_string(),
            })?;

        let client_id =
            env::var("KAFKA_CLIENT_ID").unwrap_or_else(|_| "murmur-events".to_string());
        let group_prefix = env::var("KAFKA_GROUP_PREFIX").unwrap_or_else(|_| "murmur".to_string());

        let channel_capacity = parse_var("EVENT_CHANNEL_CAPACITY", 64usize)?;
        let max_attempts = parse_var("EVENT_MAX_ATTEMPTS", 5u32)?;
        let backoff_ms = parse_var("EVENT_RETRY_BACKOFF_MS", 500u64)?;
        let grace_secs = parse_var("SHUTDOWN_GRACE_SECS", 15u64)?;

        Ok(Self {
            bootstrap_servers,
            client_id,
            group_prefix,
            channel_capacity,
            retry: RetryPolicy {
                max_attempts,
                base_backoff: Duration::from_millis(backoff_ms),
            },
            drain_grace: Duration::from_secs(grace_secs),
        })
    }

    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> BrokerConfigBuilder {
        BrokerConfigBuilder::default()
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, default: T) -> Result<T, EventError> {
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| EventError::ConfigInvalid {
            var: var.to_string(),
            reason: format!("cannot parse `{raw}`"),
        }),
        Err(_) => Ok(default),
    }
}

/// Builder for [`BrokerConfig`].
#[derive(Debug, Default)]
pub struct BrokerConfigBuilder {
    bootstrap_servers: Option<String>,
    client_id: Option<String>,
    group_prefix: Option<String>,
    channel_capacity: Option<usize>,
    retry: Option<RetryPolicy>,
    drain_grace: Option<Duration>,
}

impl BrokerConfigBuilder {
    /// Set bootstrap servers.
    pub fn bootstrap_servers(mut self, servers: impl Into<String>) -> Self {
        self.bootstrap_servers = Some(servers.into());
        self
    }

    /// Set the client ID.
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Set the consumer group prefix.
    pub fn group_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.group_prefix = Some(prefix.into());
        self
    }

    /// Set the feeder/worker channel capacity.
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = Some(capacity);
        self
    }

    /// Set the delivery retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Set the drain grace period.
    #[must_use]
    pub fn drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = Some(grace);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<BrokerConfig, EventError> {
        let bootstrap_servers = self.bootstrap_servers.ok_or(EventError::ConfigMissing {
            var: "bootstrap_servers".to_string(),
        })?;

        Ok(BrokerConfig {
            bootstrap_servers,
            client_id: self
                .client_id
                .unwrap_or_else(|| "murmur-events".to_string()),
            group_prefix: self.group_prefix.unwrap_or_else(|| "murmur".to_string()),
            channel_capacity: self.channel_capacity.unwrap_or(64),
            retry: self.retry.unwrap_or_default(),
            drain_grace: self.drain_grace.unwrap_or(Duration::from_secs(15)),
        })
    }
}
