//! Error types for the murmur-events crate.

use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Debug, Error)]
pub enum EventError {
    // Configuration errors (permanent, no retry)
    /// Required configuration variable is missing.
    #[error("Configuration missing: {var}")]
    ConfigMissing { var: String },

    /// Configuration value is invalid.
    #[error("Configuration invalid for {var}: {reason}")]
    ConfigInvalid { var: String, reason: String },

    // Connection errors (transient)
    /// Failed to connect to the broker.
    #[error("Connection to broker {broker} failed: {cause}")]
    ConnectionFailed { broker: String, cause: String },

    // Publishing errors
    /// Failed to publish under a routing key.
    #[error("Failed to publish on {routing_key}: {cause}")]
    PublishFailed { routing_key: String, cause: String },

    /// Failed to serialize an event envelope.
    #[error("Failed to serialize event envelope: {cause}")]
    SerializationFailed { cause: String },

    // Subscription errors
    /// Failed to register a subscription.
    #[error("Failed to subscribe on {routing_key}: {cause}")]
    SubscribeFailed { routing_key: String, cause: String },

    /// Failed to deserialize an event envelope.
    #[error("Failed to deserialize event envelope: {cause}")]
    DeserializationFailed { cause: String },
}

impl EventError {
    /// Returns true if this error is transient and the operation can be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EventError::ConnectionFailed { .. }
                | EventError::PublishFailed { .. }
                | EventError::SubscribeFailed { .. }
        )
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            EventError::ConfigMissing { .. } | EventError::ConfigInvalid { .. }
        )
    }
}
