//! PostgreSQL integration tests for the activity log.
//!
//! These need a Docker daemon, so they are ignored by default. Run with:
//!
//! ```bash
//! cargo test -p activity --test postgres_integration -- --ignored
//! ```

use std::time::Duration;

use activity::{ActionKind, ActivityEvent, ActivityLog, Actor, PostgresActivityLog};
use chrono::Utc;
use common::UserId;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

async fn connected_log() -> (
    testcontainers::ContainerAsync<Postgres>,
    PostgresActivityLog,
) {
    let container = Postgres::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

    let log = PostgresActivityLog::connect(&url, 3, Duration::from_millis(200)).await;
    assert!(log.is_enabled());
    (container, log)
}

#[tokio::test]
#[ignore = "requires a local Docker daemon"]
async fn record_and_query_round_trip() {
    let (_container, log) = connected_log().await;
    let user_id = UserId::new();

    log.record(ActivityEvent::new(
        Actor::User(user_id),
        ActionKind::CreateUser,
        "Created user alice",
    ))
    .await;
    log.record(ActivityEvent::new(
        Actor::Admin,
        ActionKind::DeleteProduct,
        "Deleted product widget",
    ))
    .await;

    let events = log.query(10, None, None).await.unwrap();
    assert_eq!(events.len(), 2);
    // Newest first.
    assert_eq!(events[0].action, ActionKind::DeleteProduct);
    assert_eq!(events[0].actor, Actor::Admin);
    assert_eq!(events[1].action, ActionKind::CreateUser);
    assert_eq!(events[1].actor, Actor::User(user_id));
    assert_eq!(events[1].detail, "Created user alice");

    assert_eq!(log.count().await.unwrap(), 2);
}

#[tokio::test]
#[ignore = "requires a local Docker daemon"]
async fn query_respects_limit_and_time_range() {
    let (_container, log) = connected_log().await;

    let before = Utc::now();
    for n in 0..5 {
        log.record(ActivityEvent::new(
            Actor::Admin,
            ActionKind::UpdateProduct,
            format!("Updated product {n}"),
        ))
        .await;
    }
    let after = Utc::now() + chrono::Duration::milliseconds(1);

    let limited = log.query(3, None, None).await.unwrap();
    assert_eq!(limited.len(), 3);

    let in_range = log.query(10, Some(before), Some(after)).await.unwrap();
    assert_eq!(in_range.len(), 5);

    let out_of_range = log.query(10, Some(after), None).await.unwrap();
    assert!(out_of_range.is_empty());
}
