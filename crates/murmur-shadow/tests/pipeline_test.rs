//! End-to-end synchronization pipeline tests over the in-memory bus.
//!
//! These tests require a running PostgreSQL instance.
//! Run with: `DATABASE_URL=postgres://... cargo test -p murmur-shadow -- --ignored`

use std::sync::Arc;
use std::time::Duration;

use murmur_db::models::User;
use murmur_db::{connect, run_migrations, PoolSettings};
use murmur_events::{
    InMemoryEventBus, RetryPolicy, UserEvent, UserEventDispatcher, UserSnapshot,
};
use murmur_shadow::ShadowSyncHandler;
use sqlx::PgPool;
use tokio::time::timeout;
use uuid::Uuid;

async fn test_pool() -> PgPool {
    let _ = dotenvy::dotenv();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = connect(&PoolSettings::new(url))
        .await
        .expect("failed to connect");
    run_migrations(&pool).await.expect("migrations failed");
    pool
}

async fn pipeline(pool: &PgPool) -> UserEventDispatcher {
    let bus = Arc::new(InMemoryEventBus::new(
        16,
        RetryPolicy {
            max_attempts: 2,
            base_backoff: Duration::from_millis(10),
        },
    ));
    let dispatcher = UserEventDispatcher::new(bus);
    dispatcher
        .setup_subscriptions(Arc::new(ShadowSyncHandler::new(pool.clone())))
        .await
        .expect("failed to register subscriptions");
    dispatcher
}

fn event(id: Uuid, email: &str, name: &str, username: Option<&str>, phone: Option<&str>) -> UserEvent {
    UserEvent::new(UserSnapshot {
        id,
        email: email.to_string(),
        name: name.to_string(),
        username: username.map(str::to_string),
        phone: phone.map(str::to_string),
    })
}

/// Poll the store until `condition` holds for the user row (or absence).
async fn wait_for_row(pool: &PgPool, id: Uuid, condition: impl Fn(Option<&User>) -> bool) {
    timeout(Duration::from_secs(5), async {
        loop {
            let row = User::find_by_id(pool, id).await.expect("query failed");
            if condition(row.as_ref()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("store never reached the expected state");
}

#[tokio::test]
#[ignore = "Requires database - run locally with DATABASE_URL"]
async fn test_created_updated_deleted_end_to_end() {
    let pool = test_pool().await;
    let dispatcher = pipeline(&pool).await;
    let id = Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap();

    // Make the fixed-id scenario rerunnable against a dirty database.
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    dispatcher
        .publish_created(&event(id, "a@x.com", "A", Some("a"), Some("123")))
        .await
        .unwrap();
    wait_for_row(&pool, id, |row| row.is_some()).await;

    let row = User::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(row.email, "a@x.com");
    assert_eq!(row.name, "A");
    assert_eq!(row.username.as_deref(), Some("a"));
    assert_eq!(row.phone.as_deref(), Some("123"));

    dispatcher
        .publish_updated(&event(id, "a@x.com", "A2", Some("a"), Some("123")))
        .await
        .unwrap();
    wait_for_row(&pool, id, |row| row.is_some_and(|u| u.name == "A2")).await;

    let row = User::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(row.email, "a@x.com");
    assert_eq!(row.username.as_deref(), Some("a"));
    assert_eq!(row.phone.as_deref(), Some("123"));

    dispatcher.publish_deleted(&event(id, "a@x.com", "A2", Some("a"), Some("123")))
        .await
        .unwrap();
    wait_for_row(&pool, id, |row| row.is_none()).await;
}

#[tokio::test]
#[ignore = "Requires database - run locally with DATABASE_URL"]
async fn test_created_without_username_defaults_to_name() {
    let pool = test_pool().await;
    let dispatcher = pipeline(&pool).await;
    let id = Uuid::new_v4();

    dispatcher
        .publish_created(&event(id, "b@x.com", "Bea", None, None))
        .await
        .unwrap();
    wait_for_row(&pool, id, |row| row.is_some()).await;

    let row = User::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(row.username.as_deref(), Some("Bea"));
    assert_eq!(row.phone, None);
}

#[tokio::test]
#[ignore = "Requires database - run locally with DATABASE_URL"]
async fn test_deleted_twice_reaches_the_same_end_state() {
    let pool = test_pool().await;
    let dispatcher = pipeline(&pool).await;
    let id = Uuid::new_v4();

    dispatcher
        .publish_created(&event(id, "c@x.com", "Cam", Some("cam"), None))
        .await
        .unwrap();
    wait_for_row(&pool, id, |row| row.is_some()).await;

    let deleted = event(id, "c@x.com", "Cam", Some("cam"), None);
    dispatcher.publish_deleted(&deleted).await.unwrap();
    dispatcher.publish_deleted(&deleted).await.unwrap();
    wait_for_row(&pool, id, |row| row.is_none()).await;

    // The second delete found nothing to remove and still succeeded.
    assert!(User::find_by_id(&pool, id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "Requires database - run locally with DATABASE_URL"]
async fn test_update_with_null_fields_is_dropped_without_crashing() {
    let pool = test_pool().await;
    let dispatcher = pipeline(&pool).await;
    let id = Uuid::new_v4();

    dispatcher
        .publish_created(&event(id, "d@x.com", "Dee", Some("dee"), Some("555")))
        .await
        .unwrap();
    wait_for_row(&pool, id, |row| row.is_some()).await;

    // Invalid update: null username and phone. Rejected, not applied.
    dispatcher
        .publish_updated(&event(id, "d@x.com", "Dee2", None, None))
        .await
        .unwrap();

    // The pipeline keeps processing: a subsequent valid update lands.
    dispatcher
        .publish_updated(&event(id, "d@x.com", "Dee3", Some("dee"), Some("555")))
        .await
        .unwrap();
    wait_for_row(&pool, id, |row| row.is_some_and(|u| u.name == "Dee3")).await;

    let row = User::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_ne!(row.name, "Dee2");
}
