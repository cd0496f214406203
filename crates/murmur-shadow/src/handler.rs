//! Transactional application of user events to the shadow store.
//!
//! Each event runs through one transaction: begin, apply, commit. Every
//! exit path that does not reach the commit rolls the transaction back
//! (sqlx rolls back on drop), so a failed apply can never leak an open
//! transaction or a partial write.

use crate::error::SyncError;
use async_trait::async_trait;
use murmur_db::models::{NewUser, User, UserReplacement};
use murmur_events::{DeliveryError, UserEvent, UserEventHandler, UserSnapshot};
use sqlx::PgPool;
use tracing::{error, info};

/// Applies user events from the identity authority to the local store.
pub struct ShadowSyncHandler {
    pool: PgPool,
}

impl ShadowSyncHandler {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn apply_created(&self, event: &UserEvent) -> Result<(), SyncError> {
        let params = insert_params(&event.user);

        let mut tx = self.pool.begin().await?;
        let created = User::insert(&mut tx, &params).await?;
        tx.commit().await?;

        info!(
            user_id = %created.id,
            username = %params.username,
            "user created from identity event"
        );
        Ok(())
    }

    async fn apply_updated(&self, event: &UserEvent) -> Result<(), SyncError> {
        let params = replace_params(&event.user)?;

        let mut tx = self.pool.begin().await?;
        let updated = User::replace(&mut tx, &params).await?;
        tx.commit().await?;

        info!(
            user_id = %updated.id,
            username = %params.username,
            "user updated from identity event"
        );
        Ok(())
    }

    async fn apply_deleted(&self, event: &UserEvent) -> Result<(), SyncError> {
        let id = event.user.id;

        let mut tx = self.pool.begin().await?;
        let rows = User::delete(&mut tx, id).await?;
        tx.commit().await?;

        if rows == 0 {
            info!(user_id = %id, "delete event for absent user, nothing to remove");
        } else {
            info!(
                user_id = %id,
                username = %event.user.resolved_username(),
                "user deleted from identity event"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl UserEventHandler for ShadowSyncHandler {
    async fn on_user_created(&self, event: UserEvent) -> Result<(), DeliveryError> {
        self.apply_created(&event).await.map_err(|e| {
            error!(user_id = %event.user.id, error = %e, "failed to apply created event");
            DeliveryError::from(e)
        })
    }

    async fn on_user_updated(&self, event: UserEvent) -> Result<(), DeliveryError> {
        self.apply_updated(&event).await.map_err(|e| {
            error!(user_id = %event.user.id, error = %e, "failed to apply updated event");
            DeliveryError::from(e)
        })
    }

    async fn on_user_deleted(&self, event: UserEvent) -> Result<(), DeliveryError> {
        self.apply_deleted(&event).await.map_err(|e| {
            error!(user_id = %event.user.id, error = %e, "failed to apply deleted event");
            DeliveryError::from(e)
        })
    }
}

/// Insert parameters for a created event: `username` defaults to `name`,
/// the other fields are copied verbatim.
fn insert_params(user: &UserSnapshot) -> NewUser {
    NewUser {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        username: user.resolved_username().to_owned(),
        phone: user.phone.clone(),
    }
}

/// Replace parameters for an updated event.
///
/// The full-row replace requires `username` and `phone`; an envelope
/// without them is rejected before any database work.
fn replace_params(user: &UserSnapshot) -> Result<UserReplacement, SyncError> {
    let username = user.username.clone().ok_or(SyncError::MissingField {
        id: user.id,
        field: "username",
    })?;
    let phone = user.phone.clone().ok_or(SyncError::MissingField {
        id: user.id,
        field: "phone",
    })?;

    Ok(UserReplacement {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        username,
        phone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn snapshot() -> UserSnapshot {
        UserSnapshot {
            id: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            name: "Jane".to_string(),
            username: Some("jane".to_string()),
            phone: Some("555-0100".to_string()),
        }
    }

    #[test]
    fn test_insert_params_copy_fields_verbatim() {
        let user = snapshot();
        let params = insert_params(&user);

        assert_eq!(params.id, user.id);
        assert_eq!(params.email, "jane@example.com");
        assert_eq!(params.username, "jane");
        assert_eq!(params.phone.as_deref(), Some("555-0100"));
    }

    #[test]
    fn test_insert_params_default_username_to_name() {
        let mut user = snapshot();
        user.username = None;

        let params = insert_params(&user);
        assert_eq!(params.username, "Jane");
    }

    #[test]
    fn test_replace_params_with_all_fields() {
        let params = replace_params(&snapshot()).unwrap();
        assert_eq!(params.username, "jane");
        assert_eq!(params.phone, "555-0100");
    }

    // A null username or phone on an update must surface as a typed
    // rejection, never a crash.
    #[test]
    fn test_replace_params_reject_missing_username() {
        let mut user = snapshot();
        user.username = None;

        let err = replace_params(&user).unwrap_err();
        assert!(
            matches!(err, SyncError::MissingField { field: "username", id } if id == user.id)
        );
    }

    #[test]
    fn test_replace_params_reject_missing_phone() {
        let mut user = snapshot();
        user.phone = None;

        let err = replace_params(&user).unwrap_err();
        assert!(matches!(err, SyncError::MissingField { field: "phone", .. }));
    }
}
