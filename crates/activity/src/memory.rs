//! In-memory activity log implementation for testing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::event::ActivityEvent;
use crate::ActivityLog;

/// In-memory event sink with the same interface as the persistent one.
#[derive(Clone, Default)]
pub struct InMemoryActivityLog {
    events: Arc<RwLock<Vec<ActivityEvent>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryActivityLog {
    /// Creates a new empty in-memory activity log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the backing store being unreachable: records are
    /// dropped and queries come back empty.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored events.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl ActivityLog for InMemoryActivityLog {
    async fn record(&self, event: ActivityEvent) {
        if self.unavailable.load(Ordering::SeqCst) {
            tracing::warn!(action = %event.action, "activity log unavailable, dropping event");
            return;
        }
        self.events.write().await.push(event);
    }

    async fn query(
        &self,
        limit: usize,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityEvent>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        let events = self.events.read().await;
        let mut matching: Vec<ActivityEvent> = events
            .iter()
            .filter(|e| start.is_none_or(|s| e.timestamp >= s))
            .filter(|e| end.is_none_or(|t| e.timestamp <= t))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn count(&self) -> Result<u64> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Ok(0);
        }
        Ok(self.events.read().await.len() as u64)
    }
}
