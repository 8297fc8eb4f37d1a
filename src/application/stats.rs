// Stats Surface - running counters and point-in-time snapshots

use crate::domain::{WorkItem, WorkItemId, WorkItemType};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Running counters, owned by the queue state behind its lock
#[derive(Debug, Default)]
pub struct StatsRecorder {
    total_processed: u64,
    total_failed: u64,
    total_retries: u64,
    average_wait_ms: f64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful completion and fold its queue wait into the
    /// running mean. This is a true cumulative average over completions,
    /// replacing the source system's `(avg + sample) / 2` recurrence.
    pub fn record_success(&mut self, wait_ms: i64) {
        self.total_processed += 1;
        let n = self.total_processed as f64;
        self.average_wait_ms += (wait_ms as f64 - self.average_wait_ms) / n;
    }

    /// Record a permanent failure (retry budget exhausted)
    pub fn record_failure(&mut self) {
        self.total_failed += 1;
    }

    /// Record one retry attempt being scheduled
    pub fn record_retry(&mut self) {
        self.total_retries += 1;
    }

    pub fn snapshot(&self, processing: usize, queued: usize, running: bool) -> QueueStats {
        QueueStats {
            total_processed: self.total_processed,
            total_failed: self.total_failed,
            total_retries: self.total_retries,
            average_wait_ms: self.average_wait_ms,
            processing,
            queued,
            running,
        }
    }
}

/// Point-in-time counter snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_processed: u64,
    pub total_failed: u64,
    pub total_retries: u64,
    pub average_wait_ms: f64,
    /// Items currently in flight
    pub processing: usize,
    /// Items pending in the store
    pub queued: usize,
    /// Whether the dispatch loop is running
    pub running: bool,
}

/// Public view of one queued item, as exposed by `WorkQueue::status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedItemStatus {
    pub id: WorkItemId,
    pub item_type: WorkItemType,
    pub game_type: Option<String>,
    pub streaming_id: Option<String>,
    pub priority: i32,
    pub retry_count: u32,
    pub max_retries: u32,
    /// RFC 3339 rendering of the item's earliest dispatch time
    pub scheduled_for: String,
    /// Milliseconds the item has waited since enqueue
    pub wait_ms: i64,
}

impl QueuedItemStatus {
    pub fn from_item(item: &WorkItem, now_millis: i64) -> Self {
        Self {
            id: item.id.clone(),
            item_type: item.item_type,
            game_type: item.game_type.clone(),
            streaming_id: item.streaming_id.clone(),
            priority: item.priority,
            retry_count: item.retry_count,
            max_retries: item.max_retries,
            scheduled_for: format_epoch_ms(item.scheduled_for),
            wait_ms: item.wait_ms(now_millis),
        }
    }
}

/// Full queue status: stats plus per-item detail and in-flight ids
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    pub stats: QueueStats,
    pub items: Vec<QueuedItemStatus>,
    pub in_flight: Vec<WorkItemId>,
}

fn format_epoch_ms(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(ts) => ts.to_rfc3339(),
        None => millis.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WorkPayload;

    #[test]
    fn test_cumulative_average() {
        let mut stats = StatsRecorder::new();
        stats.record_success(100);
        stats.record_success(300);
        stats.record_success(200);

        let snap = stats.snapshot(0, 0, true);
        assert_eq!(snap.total_processed, 3);
        assert!((snap.average_wait_ms - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_counters_are_independent() {
        let mut stats = StatsRecorder::new();
        stats.record_retry();
        stats.record_retry();
        stats.record_failure();

        let snap = stats.snapshot(2, 5, false);
        assert_eq!(snap.total_processed, 0);
        assert_eq!(snap.total_failed, 1);
        assert_eq!(snap.total_retries, 2);
        assert_eq!(snap.processing, 2);
        assert_eq!(snap.queued, 5);
        assert!(!snap.running);
    }

    #[test]
    fn test_item_status_view() {
        let item = WorkItem {
            id: "notification_1000_x".to_string(),
            item_type: WorkItemType::Notification,
            game_type: Some("football".to_string()),
            streaming_id: None,
            priority: 2,
            retry_count: 1,
            max_retries: 3,
            created_at: 1_700_000_000_000,
            scheduled_for: 1_700_000_005_000,
            data: WorkPayload::new(serde_json::json!({})),
        };

        let view = QueuedItemStatus::from_item(&item, 1_700_000_002_000);
        assert_eq!(view.wait_ms, 2000);
        assert!(view.scheduled_for.starts_with("2023-11-14T22:13:25"));
        assert_eq!(view.retry_count, 1);
    }
}
