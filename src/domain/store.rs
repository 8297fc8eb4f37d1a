// Priority Store - ordered collection of pending work items

use crate::domain::WorkItem;
use crate::error::{QueueError, Result};

/// Pending items ordered by ascending priority number (1 = most urgent),
/// with stable tie-breaking by insertion order.
///
/// Insertion is a stable positional insert, not a re-sort, so a retried item
/// competes for position with its original priority rather than going to the
/// back of its band.
#[derive(Debug)]
pub struct PriorityStore {
    items: Vec<WorkItem>,
    capacity: usize,
}

impl PriorityStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    /// Insert before the first item whose priority is strictly greater.
    ///
    /// Fails with `QueueFull` when the store already holds `capacity` items.
    pub fn insert(&mut self, item: WorkItem) -> Result<()> {
        if self.items.len() >= self.capacity {
            return Err(QueueError::QueueFull {
                capacity: self.capacity,
            });
        }

        let pos = self
            .items
            .iter()
            .position(|existing| existing.priority > item.priority)
            .unwrap_or(self.items.len());
        self.items.insert(pos, item);
        Ok(())
    }

    /// Pop the front item if it is ready.
    ///
    /// Only the front is inspected: an unready front item blocks everything
    /// behind it, even items that are themselves ready. That head-of-line
    /// behavior keeps highest-urgency-first ordering strict at the cost of
    /// possible starvation behind a far-future high-priority item.
    pub fn pop_ready(&mut self, now_millis: i64) -> Option<WorkItem> {
        let front_ready = self
            .items
            .first()
            .is_some_and(|front| front.is_ready(now_millis));
        if front_ready {
            Some(self.items.remove(0))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterate pending items front-to-back (status snapshots)
    pub fn iter(&self) -> impl Iterator<Item = &WorkItem> {
        self.items.iter()
    }

    #[cfg(test)]
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{WorkItemType, WorkPayload};

    fn item(id: &str, priority: i32, scheduled_for: i64) -> WorkItem {
        WorkItem {
            id: id.to_string(),
            item_type: WorkItemType::Notification,
            game_type: None,
            streaming_id: None,
            priority,
            retry_count: 0,
            max_retries: 3,
            created_at: 0,
            scheduled_for,
            data: WorkPayload::new(serde_json::json!({})),
        }
    }

    #[test]
    fn test_insert_orders_by_ascending_priority() {
        let mut store = PriorityStore::new(10);
        store.insert(item("a", 2, 0)).unwrap();
        store.insert(item("b", 1, 0)).unwrap();
        store.insert(item("c", 3, 0)).unwrap();

        assert_eq!(store.ids(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_equal_priority_preserves_insertion_order() {
        let mut store = PriorityStore::new(10);
        store.insert(item("first", 2, 0)).unwrap();
        store.insert(item("second", 2, 0)).unwrap();
        store.insert(item("third", 2, 0)).unwrap();

        assert_eq!(store.ids(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_out_of_range_priority_sorts_at_extreme() {
        let mut store = PriorityStore::new(10);
        store.insert(item("mid", 3, 0)).unwrap();
        store.insert(item("wild_low", 42, 0)).unwrap();
        store.insert(item("wild_high", -7, 0)).unwrap();

        assert_eq!(store.ids(), vec!["wild_high", "mid", "wild_low"]);
    }

    #[test]
    fn test_insert_fails_at_capacity() {
        let mut store = PriorityStore::new(2);
        store.insert(item("a", 1, 0)).unwrap();
        store.insert(item("b", 1, 0)).unwrap();

        let err = store.insert(item("c", 1, 0)).unwrap_err();
        assert!(matches!(err, QueueError::QueueFull { capacity: 2 }));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_pop_ready_respects_scheduled_for() {
        let mut store = PriorityStore::new(10);
        store.insert(item("later", 1, 5000)).unwrap();
        store.insert(item("now", 2, 0)).unwrap();

        // Front ("later", higher urgency) is not ready; "now" must wait
        // behind it even though it is ready itself.
        assert!(store.pop_ready(1000).is_none());
        assert_eq!(store.len(), 2);

        let popped = store.pop_ready(5000).unwrap();
        assert_eq!(popped.id, "later");
        let popped = store.pop_ready(5000).unwrap();
        assert_eq!(popped.id, "now");
        assert!(store.is_empty());
    }

    #[test]
    fn test_retried_item_competes_with_original_priority() {
        let mut store = PriorityStore::new(10);
        store.insert(item("p3_a", 3, 0)).unwrap();
        store.insert(item("p3_b", 3, 0)).unwrap();

        // A retried priority-1 item goes ahead of the whole p3 band.
        let mut retried = item("urgent_retry", 1, 9000);
        retried.retry_count = 1;
        store.insert(retried).unwrap();

        assert_eq!(store.ids(), vec!["urgent_retry", "p3_a", "p3_b"]);
    }
}
