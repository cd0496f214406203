//! Typed dispatcher for user domain events.
//!
//! Presents three typed operations per event kind instead of the raw byte
//! channel: publishing serializes the envelope onto the kind's fixed
//! routing key; subscribing deserializes incoming payloads and routes them
//! to the handler. An undecodable payload is logged and dropped without
//! invoking the handler; the delivery is still acknowledged and never
//! retried.

use crate::bus::{DeliveryError, DeliveryHandler, EventBus};
use crate::envelope::UserEvent;
use crate::error::EventError;
use crate::kind::EventKind;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Typed handler contract for the three user event kinds.
#[async_trait]
pub trait UserEventHandler: Send + Sync + 'static {
    async fn on_user_created(&self, event: UserEvent) -> Result<(), DeliveryError>;
    async fn on_user_updated(&self, event: UserEvent) -> Result<(), DeliveryError>;
    async fn on_user_deleted(&self, event: UserEvent) -> Result<(), DeliveryError>;
}

/// Typed publish/subscribe API over an [`EventBus`].
pub struct UserEventDispatcher {
    bus: Arc<dyn EventBus>,
}

impl UserEventDispatcher {
    #[must_use]
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// Publish a user-created event.
    pub async fn publish_created(&self, event: &UserEvent) -> Result<(), EventError> {
        self.publish(EventKind::Created, event).await
    }

    /// Publish a user-updated event.
    pub async fn publish_updated(&self, event: &UserEvent) -> Result<(), EventError> {
        self.publish(EventKind::Updated, event).await
    }

    /// Publish a user-deleted event.
    pub async fn publish_deleted(&self, event: &UserEvent) -> Result<(), EventError> {
        self.publish(EventKind::Deleted, event).await
    }

    async fn publish(&self, kind: EventKind, event: &UserEvent) -> Result<(), EventError> {
        let payload = event.to_json_bytes()?;
        debug!(
            routing_key = %kind.routing_key(),
            user_id = %event.user.id,
            "publishing user event"
        );
        self.bus.publish(kind.routing_key(), payload).await
    }

    /// Subscribe to user-created events.
    pub async fn subscribe_created<H: UserEventHandler>(
        &self,
        handler: Arc<H>,
    ) -> Result<(), EventError> {
        self.subscribe(EventKind::Created, handler).await
    }

    /// Subscribe to user-updated events.
    pub async fn subscribe_updated<H: UserEventHandler>(
        &self,
        handler: Arc<H>,
    ) -> Result<(), EventError> {
        self.subscribe(EventKind::Updated, handler).await
    }

    /// Subscribe to user-deleted events.
    pub async fn subscribe_deleted<H: UserEventHandler>(
        &self,
        handler: Arc<H>,
    ) -> Result<(), EventError> {
        self.subscribe(EventKind::Deleted, handler).await
    }

    async fn subscribe<H: UserEventHandler>(
        &self,
        kind: EventKind,
        handler: Arc<H>,
    ) -> Result<(), EventError> {
        let delivery = Arc::new(TypedDelivery { kind, handler });
        self.bus.subscribe(kind.routing_key(), delivery).await
    }

    /// Register all three subscriptions as one startup step.
    ///
    /// The first failure aborts the remaining registrations; the returned
    /// error names the routing key that failed.
    pub async fn setup_subscriptions<H: UserEventHandler>(
        &self,
        handler: Arc<H>,
    ) -> Result<(), EventError> {
        self.subscribe_created(handler.clone()).await?;
        self.subscribe_updated(handler.clone()).await?;
        self.subscribe_deleted(handler).await?;

        info!("user event subscriptions registered");
        Ok(())
    }
}

/// Adapts a typed handler to the byte-level delivery contract for one kind.
struct TypedDelivery<H> {
    kind: EventKind,
    handler: Arc<H>,
}

#[async_trait]
impl<H: UserEventHandler> DeliveryHandler for TypedDelivery<H> {
    async fn handle(&self, payload: &[u8]) -> Result<(), DeliveryError> {
        let event = match UserEvent::from_json_bytes(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    routing_key = %self.kind.routing_key(),
                    error = %e,
                    "discarding undecodable event payload"
                );
                return Ok(());
            }
        };

        match self.kind {
            EventKind::Created => self.handler.on_user_created(event).await,
            EventKind::Updated => self.handler.on_user_updated(event).await,
            EventKind::Deleted => self.handler.on_user_deleted(event).await,
        }
    }
}
