// Work Item Domain Model

use serde::{Deserialize, Serialize};

/// Work item ID (`<type>_<epoch-ms>_<random-suffix>`)
pub type WorkItemId = String;

/// Default retry ceiling when the producer does not supply one
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Closed set of work categories the engine dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkItemType {
    StreamStart,
    StreamStop,
    ScoreUpdate,
    Notification,
}

impl WorkItemType {
    /// Token used as the item-id prefix and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemType::StreamStart => "stream_start",
            WorkItemType::StreamStop => "stream_stop",
            WorkItemType::ScoreUpdate => "score_update",
            WorkItemType::Notification => "notification",
        }
    }
}

impl std::fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opaque payload, interpreted only by the matching processor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkPayload(serde_json::Value);

impl WorkPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// A unit of work plus its retry and timing metadata
///
/// `priority` follows the producer convention 1 = most urgent, 5 = least.
/// Values outside that range are accepted and simply sort at the extreme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub item_type: WorkItemType,

    // Descriptive tags, opaque to the engine (logging/status only)
    pub game_type: Option<String>,
    pub streaming_id: Option<String>,

    pub priority: i32,

    pub retry_count: u32,
    pub max_retries: u32,

    pub created_at: i64,    // epoch ms
    pub scheduled_for: i64, // epoch ms; >= created_at

    pub data: WorkPayload,
}

impl WorkItem {
    /// True once `scheduled_for` has been reached
    pub fn is_ready(&self, now_millis: i64) -> bool {
        self.scheduled_for <= now_millis
    }

    /// True when another failure may not be retried
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Record a failed attempt and push `scheduled_for` out by `delay_ms`
    pub fn reschedule(&mut self, now_millis: i64, delay_ms: i64) {
        self.retry_count += 1;
        self.scheduled_for = now_millis + delay_ms;
    }

    /// Milliseconds spent since enqueue
    pub fn wait_ms(&self, now_millis: i64) -> i64 {
        now_millis - self.created_at
    }
}

/// Producer-facing enqueue request: a work item without engine-assigned
/// identity or timing fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub item_type: WorkItemType,

    #[serde(default)]
    pub game_type: Option<String>,
    #[serde(default)]
    pub streaming_id: Option<String>,

    /// Falls back to `QueueConfig::default_priority` when absent
    #[serde(default)]
    pub priority: Option<i32>,

    /// Falls back to `DEFAULT_MAX_RETRIES` when absent
    #[serde(default)]
    pub max_retries: Option<u32>,

    pub data: serde_json::Value,
}

impl EnqueueRequest {
    pub fn new(item_type: WorkItemType, data: serde_json::Value) -> Self {
        Self {
            item_type,
            game_type: None,
            streaming_id: None,
            priority: None,
            max_retries: None,
            data,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_game_type(mut self, game_type: impl Into<String>) -> Self {
        self.game_type = Some(game_type.into());
        self
    }

    pub fn with_streaming_id(mut self, streaming_id: impl Into<String>) -> Self {
        self.streaming_id = Some(streaming_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(now: i64) -> WorkItem {
        WorkItem {
            id: "notification_1000_abc123".to_string(),
            item_type: WorkItemType::Notification,
            game_type: None,
            streaming_id: None,
            priority: 3,
            retry_count: 0,
            max_retries: 2,
            created_at: now,
            scheduled_for: now,
            data: WorkPayload::new(serde_json::json!({})),
        }
    }

    #[test]
    fn test_readiness_tracks_scheduled_for() {
        let mut it = item(1000);
        assert!(it.is_ready(1000));
        assert!(it.is_ready(5000));

        it.reschedule(1000, 500);
        assert_eq!(it.retry_count, 1);
        assert_eq!(it.scheduled_for, 1500);
        assert!(!it.is_ready(1499));
        assert!(it.is_ready(1500));
    }

    #[test]
    fn test_retries_exhausted_at_ceiling() {
        let mut it = item(1000);
        assert!(!it.retries_exhausted());
        it.reschedule(1000, 100);
        assert!(!it.retries_exhausted());
        it.reschedule(1200, 100);
        assert!(it.retries_exhausted());
    }

    #[test]
    fn test_type_token_is_id_prefix_friendly() {
        assert_eq!(WorkItemType::ScoreUpdate.as_str(), "score_update");
        assert_eq!(WorkItemType::StreamStart.to_string(), "stream_start");
    }
}
