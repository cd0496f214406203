//! Event envelope carrying a user snapshot plus transit metadata.

use crate::error::EventError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The user record as published by the identity authority.
///
/// `id` is the identity key: externally assigned, immutable, and reused as
/// the shadow store's primary key. It is parsed as a UUID at this boundary,
/// so a malformed key fails deserialization and never reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub username: Option<String>,
    pub phone: Option<String>,
}

impl UserSnapshot {
    /// The username this snapshot resolves to: `username`, or `name` when absent.
    #[must_use]
    pub fn resolved_username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.name)
    }
}

/// Envelope for user events on the wire.
///
/// Transient: exists only for the duration of message transit and handling,
/// and is never persisted verbatim. `meta` may be absent on input and
/// defaults to empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEvent {
    /// The user payload.
    pub user: UserSnapshot,

    /// Free-form transit metadata.
    #[serde(rename = "meta", default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl UserEvent {
    /// Create an envelope with empty metadata.
    #[must_use]
    pub fn new(user: UserSnapshot) -> Self {
        Self {
            user,
            metadata: serde_json::Map::new(),
        }
    }

    /// Serialize the envelope to canonical JSON bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(|e| EventError::SerializationFailed {
            cause: e.to_string(),
        })
    }

    /// Deserialize an envelope from JSON bytes.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(bytes).map_err(|e| EventError::DeserializationFailed {
            cause: e.to_string(),
        })
    }
}
