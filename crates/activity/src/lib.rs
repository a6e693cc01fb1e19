//! Best-effort activity log for audit/history queries.
//!
//! Events are mirrored into a store kept separate from the relational
//! data. Recording is fire-and-forget: a failed or unavailable sink
//! degrades to a no-op with a local diagnostic and never affects the
//! business transaction that emitted the event.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use error::{ActivityError, Result};
pub use event::{ActionKind, ActivityEvent, Actor};
pub use memory::InMemoryActivityLog;
pub use postgres::PostgresActivityLog;

/// Sink for domain activity events.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Records an event, best-effort. Failures are logged locally and
    /// swallowed; callers never observe them.
    async fn record(&self, event: ActivityEvent);

    /// Returns up to `limit` events within the optional time range,
    /// newest first. A disabled sink returns an empty list.
    async fn query(
        &self,
        limit: usize,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityEvent>>;

    /// Total number of recorded events.
    async fn count(&self) -> Result<u64>;
}
