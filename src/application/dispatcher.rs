// Dispatch Loop - slot-bounded dispatch with channel-based completions

use crate::application::registry::ProcessorRegistry;
use crate::application::retry::{RetryDecision, RetryPolicy};
use crate::application::stats::{QueueStats, QueueStatus, QueuedItemStatus, StatsRecorder};
use crate::domain::{
    EnqueueRequest, PriorityStore, QueueConfig, WorkItem, WorkItemId, WorkItemType, WorkPayload,
    DEFAULT_MAX_RETRIES,
};
use crate::error::{QueueError, Result};
use crate::port::{
    IdProvider, JitterSource, Processor, RandomIdProvider, SystemTimeProvider, ThreadRngJitter,
    TimeProvider,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Fallback poll tick when no enqueue/completion wakes the loop (100ms)
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cooldown after a loop-internal fault before resuming (1s)
const FAULT_COOLDOWN: Duration = Duration::from_millis(1000);

/// Outcome of one dispatch attempt, reported back to the loop
struct Completion {
    item: WorkItem,
    outcome: Result<()>,
}

/// Shared mutable queue state.
///
/// One lock guards the store, the in-flight set, and the counters so that
/// every state transition is atomic: an active item is always in exactly one
/// of {store, in-flight set}. Critical sections are short and the guard is
/// never held across an await.
struct QueueState {
    store: PriorityStore,
    in_flight: HashSet<WorkItemId>,
    stats: StatsRecorder,
}

struct Inner {
    config: QueueConfig,
    state: Mutex<QueueState>,
    registry: ProcessorRegistry,
    retry_policy: RetryPolicy,
    time: Arc<dyn TimeProvider>,
    ids: Arc<dyn IdProvider>,
    /// Event-driven wakeup on enqueue; the poll tick is only a fallback
    wake: Notify,
    shutdown_tx: watch::Sender<bool>,
    running: AtomicBool,
}

/// In-process, bounded-concurrency priority work queue.
///
/// Accepts typed work items tagged with a priority (1 = most urgent),
/// dispatches them to registered [`Processor`]s while capping simultaneous
/// in-flight handlers at `max_concurrent`, and retries failures with
/// exponential backoff and jitter until the per-item retry budget runs out.
///
/// The handle is cheap to clone; all clones drive the same queue. The
/// dispatch loop starts lazily on the first enqueue and must run inside a
/// Tokio runtime.
///
/// ```no_run
/// use burstq::{EnqueueRequest, WorkItemType, WorkQueue, QueueConfig};
///
/// # async fn demo(processor: std::sync::Arc<dyn burstq::port::Processor>) -> burstq::Result<()> {
/// let queue = WorkQueue::new(QueueConfig::default());
/// queue.register_processor(WorkItemType::Notification, processor);
///
/// let id = queue.enqueue(
///     EnqueueRequest::new(WorkItemType::Notification, serde_json::json!({"user": 7}))
///         .with_priority(1),
/// )?;
/// # let _ = id;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct WorkQueue {
    inner: Arc<Inner>,
}

impl WorkQueue {
    /// Create a queue with production providers (system clock, random ids,
    /// thread-rng jitter)
    pub fn new(config: QueueConfig) -> Self {
        Self::with_providers(
            config,
            Arc::new(SystemTimeProvider),
            Arc::new(RandomIdProvider),
            Arc::new(ThreadRngJitter),
        )
    }

    /// Create a queue with injected providers (deterministic tests)
    pub fn with_providers(
        config: QueueConfig,
        time: Arc<dyn TimeProvider>,
        ids: Arc<dyn IdProvider>,
        jitter: Arc<dyn JitterSource>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let retry_policy = RetryPolicy::new(&config, jitter);
        let state = QueueState {
            store: PriorityStore::new(config.max_queue_size),
            in_flight: HashSet::new(),
            stats: StatsRecorder::new(),
        };

        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(state),
                registry: ProcessorRegistry::new(),
                retry_policy,
                time,
                ids,
                wake: Notify::new(),
                shutdown_tx,
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Register (or replace) the processor for a work item type.
    ///
    /// Registration may happen before or after items of that type are
    /// enqueued; resolution is lazy at dispatch time.
    pub fn register_processor(&self, item_type: WorkItemType, processor: Arc<dyn Processor>) {
        self.inner.registry.register(item_type, processor);
    }

    /// Enqueue a work item, returning its assigned id.
    ///
    /// Back-pressure is immediate: when the store already holds
    /// `max_queue_size` items this fails with [`QueueError::QueueFull`]
    /// without blocking. Starts the dispatch loop if it is not running, so
    /// the call must be made inside a Tokio runtime.
    pub fn enqueue(&self, request: EnqueueRequest) -> Result<WorkItemId> {
        let now = self.inner.time.now_millis();
        let id = self.inner.ids.generate(request.item_type, now);
        let item = WorkItem {
            id: id.clone(),
            item_type: request.item_type,
            game_type: request.game_type,
            streaming_id: request.streaming_id,
            priority: request.priority.unwrap_or(self.inner.config.default_priority),
            retry_count: 0,
            max_retries: request.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            created_at: now,
            scheduled_for: now,
            data: WorkPayload::new(request.data),
        };

        {
            let mut state = self.inner.lock_state()?;
            state.store.insert(item)?;
        }

        info!(
            item_id = %id,
            item_type = %request.item_type,
            "Item enqueued"
        );

        self.ensure_running();
        self.inner.wake.notify_one();
        Ok(id)
    }

    /// Stop the dispatch loop.
    ///
    /// The loop exits after its current iteration; already in-flight
    /// handlers are never cancelled and their completions are still
    /// accounted. A later enqueue starts a fresh loop.
    pub fn stop(&self) {
        info!("Queue stop requested");
        let _ = self.inner.shutdown_tx.send(true);
        self.inner.wake.notify_one();
    }

    /// Whether the dispatch loop is currently running
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Empty the store and the in-flight set.
    ///
    /// Handlers already executing keep running, but their completions are
    /// dropped: the items' lifecycles were administratively ended here.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.inner.lock_state()?;
        let dropped = state.store.len() + state.in_flight.len();
        state.store.clear();
        state.in_flight.clear();
        warn!(dropped = dropped, "Queue cleared");
        Ok(())
    }

    /// Counter snapshot plus live queue depth and in-flight count
    pub fn stats(&self) -> Result<QueueStats> {
        let state = self.inner.lock_state()?;
        Ok(state
            .stats
            .snapshot(state.in_flight.len(), state.store.len(), self.is_running()))
    }

    /// Full status: stats, per-item detail for every queued item, and the
    /// in-flight id list
    pub fn status(&self) -> Result<QueueStatus> {
        let now = self.inner.time.now_millis();
        let state = self.inner.lock_state()?;
        let items = state
            .store
            .iter()
            .map(|item| QueuedItemStatus::from_item(item, now))
            .collect();
        let mut in_flight: Vec<WorkItemId> = state.in_flight.iter().cloned().collect();
        in_flight.sort();

        Ok(QueueStatus {
            stats: state
                .stats
                .snapshot(state.in_flight.len(), state.store.len(), self.is_running()),
            items,
            in_flight,
        })
    }

    /// Spawn the dispatch loop if it is not already running
    fn ensure_running(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return;
        }
        // Re-arm after a previous stop()
        let _ = self.inner.shutdown_tx.send(false);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_loop().await;
        });
    }
}

impl Inner {
    fn lock_state(&self) -> Result<MutexGuard<'_, QueueState>> {
        self.state
            .lock()
            .map_err(|_| QueueError::Internal("queue state lock poisoned".to_string()))
    }

    /// Dispatch loop.
    ///
    /// Each iteration fills the free concurrency slots from the store, then
    /// waits for a completion, an enqueue wakeup, the poll tick, or
    /// shutdown. Loop-internal faults are logged and followed by a cooldown;
    /// the loop never dies on them.
    async fn run_loop(self: Arc<Self>) {
        info!("Dispatch loop started");
        let (completion_tx, mut completion_rx) = mpsc::unbounded_channel();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            if let Err(e) = self.dispatch_ready(&completion_tx) {
                error!(error = %e, "Dispatch loop fault, cooling down");
                sleep(FAULT_COOLDOWN).await;
                continue;
            }

            tokio::select! {
                maybe = completion_rx.recv() => {
                    // The loop holds a sender, so the channel cannot close here
                    if let Some(completion) = maybe {
                        if let Err(e) = self.finish(completion) {
                            error!(error = %e, "Completion handling fault, cooling down");
                            sleep(FAULT_COOLDOWN).await;
                        }
                    }
                }
                _ = self.wake.notified() => {}
                _ = sleep(POLL_INTERVAL) => {}
                _ = shutdown_rx.changed() => {}
            }
        }

        // Dispatch has stopped; in-flight handlers keep running and their
        // completions are still folded into stats and retries. Dropping our
        // sender lets recv() end once the last handler reports in.
        self.running.store(false, Ordering::SeqCst);
        info!("Dispatch loop stopped, draining in-flight completions");
        drop(completion_tx);
        while let Some(completion) = completion_rx.recv().await {
            if let Err(e) = self.finish(completion) {
                error!(error = %e, "Completion handling fault during drain");
            }
        }
    }

    /// Pop ready items into free slots and hand each to its processor.
    ///
    /// Only the store front is considered (see `PriorityStore::pop_ready`):
    /// an unready front item ends the fill for this iteration.
    fn dispatch_ready(&self, completion_tx: &mpsc::UnboundedSender<Completion>) -> Result<()> {
        let now = self.time.now_millis();
        let mut state = self.lock_state()?;

        while state.in_flight.len() < self.config.max_concurrent {
            let item = match state.store.pop_ready(now) {
                Some(item) => item,
                None => break,
            };

            match self.registry.resolve(item.item_type) {
                Some(processor) => {
                    state.in_flight.insert(item.id.clone());
                    info!(
                        item_id = %item.id,
                        item_type = %item.item_type,
                        attempt = item.retry_count + 1,
                        "Dispatching item"
                    );
                    self.spawn_handler(processor, item, completion_tx.clone());
                }
                None => {
                    // Lazy resolution: misregistration surfaces here, as a
                    // normal failed attempt subject to the retry budget.
                    warn!(
                        item_id = %item.id,
                        item_type = %item.item_type,
                        "No processor registered at dispatch time"
                    );
                    let err = QueueError::UnregisteredProcessor(item.item_type);
                    self.apply_failure(&mut state, item, err, now);
                }
            }
        }
        Ok(())
    }

    /// Launch one fire-and-forget handler task.
    ///
    /// The handler runs on its own spawned task so a panic is isolated by
    /// the join handle instead of poisoning the loop, and reports back over
    /// the completion channel.
    fn spawn_handler(
        &self,
        processor: Arc<dyn Processor>,
        item: WorkItem,
        completion_tx: mpsc::UnboundedSender<Completion>,
    ) {
        tokio::spawn(async move {
            let item = Arc::new(item);
            let exec_item = Arc::clone(&item);
            let handle = tokio::spawn(async move { processor.process(&exec_item).await });

            let outcome = match handle.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(QueueError::HandlerFailed(e.to_string())),
                Err(join_err) if join_err.is_panic() => {
                    Err(QueueError::HandlerFailed(format!("handler panicked: {join_err}")))
                }
                Err(join_err) => {
                    Err(QueueError::HandlerFailed(format!("handler cancelled: {join_err}")))
                }
            };

            let item = Arc::try_unwrap(item).unwrap_or_else(|arc| (*arc).clone());
            let _ = completion_tx.send(Completion { item, outcome });
        });
    }

    /// Fold one completion back into the queue state
    fn finish(&self, completion: Completion) -> Result<()> {
        let now = self.time.now_millis();
        let mut state = self.lock_state()?;

        if !state.in_flight.remove(&completion.item.id) {
            // The item was removed by clear() while its handler ran
            debug!(
                item_id = %completion.item.id,
                "Completion for item no longer tracked, dropping"
            );
            return Ok(());
        }

        match completion.outcome {
            Ok(()) => {
                let wait_ms = completion.item.wait_ms(now);
                info!(
                    item_id = %completion.item.id,
                    wait_ms = wait_ms,
                    "Item processed"
                );
                state.stats.record_success(wait_ms);
            }
            Err(err) => self.apply_failure(&mut state, completion.item, err, now),
        }
        Ok(())
    }

    /// Apply the retry policy to a failed attempt: reschedule and reinsert,
    /// or finalize as permanently failed. Exactly one of the two happens.
    fn apply_failure(&self, state: &mut QueueState, mut item: WorkItem, err: QueueError, now: i64) {
        match self.retry_policy.decide(&item) {
            RetryDecision::Retry { delay_ms } => {
                item.reschedule(now, delay_ms);
                state.stats.record_retry();
                warn!(
                    item_id = %item.id,
                    error = %err,
                    attempt = %item.retry_count,
                    scheduled_for = %item.scheduled_for,
                    "Attempt failed, retry scheduled"
                );
                if let Err(insert_err) = state.store.insert(item) {
                    // Reinserting would breach capacity; the capacity
                    // invariant wins and the item fails permanently.
                    error!(error = %insert_err, "Retry reinsert rejected, item dropped");
                    state.stats.record_failure();
                }
            }
            RetryDecision::Exhausted => {
                error!(
                    item_id = %item.id,
                    error = %err,
                    retry_count = %item.retry_count,
                    "Item failed permanently"
                );
                state.stats.record_failure();
            }
        }
    }
}
