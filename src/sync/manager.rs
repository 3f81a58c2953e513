//! Synchronizer<T> — fetch-then-subscribe orchestration for one scope.
//!
//! One synchronizer exclusively owns one [`CollectionStore`]; the store is
//! never shared or mutated from outside. Lifecycle is generation-counted:
//! `start` captures the current generation and every deferred completion
//! (initial fetch, listener callback, resync attempt) re-checks it, so work
//! from a stopped generation is discarded without observable side effects.
//!
//! # Locking
//!
//! All mutable state sits behind one `parking_lot::Mutex`. The critical
//! rule: the lock is never held while observers, sinks, or status callbacks
//! run.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::aggregate::DerivedAggregator;
use crate::error::{FeedError, Result};
use crate::feed::event::{parse_event, ChangeEvent};
use crate::feed::types::{ChangeFeedClient, FeedListener, FeedSignal, SubscriptionHandle};
use crate::notify::observers::{ObserverId, SnapshotObservers};
use crate::notify::sink::{notify_applied, NotificationSink};
use crate::store::CollectionStore;
use crate::types::{Entity, SubscriptionScope, SyncStatus};

use super::resync::{self, ResyncBackoff};

// ============================================================================
// Options
// ============================================================================

/// Callback type for connection/health status changes.
pub type StatusCallback = dyn Fn(SyncStatus) + Send + Sync;

/// Configuration for [`Synchronizer`].
pub struct SynchronizerOptions<T> {
    pub client: Arc<dyn ChangeFeedClient>,
    pub scope: SubscriptionScope,
    /// Informed of each applied delta and of resync failures.
    pub sink: Option<Arc<dyn NotificationSink<T>>>,
    /// Informed of Live / Disconnected / Resyncing / Degraded transitions.
    pub on_status: Option<Arc<StatusCallback>>,
    /// Retry schedule for failed resync fetches.
    pub backoff: ResyncBackoff,
}

// ============================================================================
// Synchronizer
// ============================================================================

pub struct Synchronizer<T> {
    shared: Arc<SyncShared<T>>,
}

/// State shared with listener closures and the resync task.
pub(crate) struct SyncShared<T> {
    pub(crate) client: Arc<dyn ChangeFeedClient>,
    pub(crate) scope: SubscriptionScope,
    pub(crate) state: Mutex<SyncState<T>>,
    pub(crate) sink: Option<Arc<dyn NotificationSink<T>>>,
    pub(crate) on_status: Option<Arc<StatusCallback>>,
    pub(crate) observers: SnapshotObservers<T>,
    pub(crate) backoff: ResyncBackoff,
    /// Bumped by `start` and `stop`; completions from older generations
    /// are discarded.
    pub(crate) generation: AtomicU64,
    ready: AtomicBool,
    handle: Mutex<Option<SubscriptionHandle>>,
}

pub(crate) struct SyncState<T> {
    pub(crate) store: CollectionStore<T>,
    /// Sequence of the delete that removed each id. The store drops
    /// deleted entries entirely, so without this a late duplicate of an
    /// older insert would resurrect the row.
    pub(crate) tombstones: HashMap<String, i64>,
}

impl<T: Entity + DeserializeOwned> Synchronizer<T> {
    pub fn new(options: SynchronizerOptions<T>) -> Self {
        Self {
            shared: Arc::new(SyncShared {
                client: options.client,
                scope: options.scope,
                state: Mutex::new(SyncState {
                    store: CollectionStore::new(),
                    tombstones: HashMap::new(),
                }),
                sink: options.sink,
                on_status: options.on_status,
                observers: SnapshotObservers::new(),
                backoff: options.backoff,
                generation: AtomicU64::new(0),
                ready: AtomicBool::new(false),
                handle: Mutex::new(None),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Bulk-fetch the scope's current rows, populate the store, then open
    /// the change-feed subscription.
    ///
    /// A fetch or subscribe failure is terminal for this attempt — the
    /// caller may retry by calling `start` again. If `stop` runs while the
    /// fetch is in flight, the result is discarded and `Stopped` returned.
    pub async fn start(&self) -> Result<()> {
        let shared = &self.shared;
        let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // A restart replaces any live subscription; reclaim the old one
        // before its handle is overwritten.
        if let Some(stale) = shared.handle.lock().take() {
            shared.ready.store(false, Ordering::SeqCst);
            shared.client.unsubscribe(stale);
        }

        let rows = shared
            .client
            .fetch(&shared.scope)
            .await
            .map_err(|e| FeedError::Fetch {
                scope: shared.scope.to_string(),
                message: e.message,
                kind: e.kind,
            })?;

        if shared.generation.load(Ordering::SeqCst) != generation {
            return Err(FeedError::Stopped);
        }

        let records = parse_rows::<T>(&shared.scope, rows);
        let snapshot = {
            let mut state = shared.state.lock();
            state.store.replace_all(records);
            state.tombstones.clear();
            state.store.snapshot()
        };

        let listener = make_listener(Arc::downgrade(shared), generation);
        let handle =
            shared
                .client
                .subscribe(&shared.scope, listener)
                .map_err(|e| FeedError::Subscribe {
                    scope: shared.scope.to_string(),
                    message: e.message,
                })?;
        *shared.handle.lock() = Some(handle);
        shared.ready.store(true, Ordering::SeqCst);

        shared.observers.emit(&snapshot);
        shared.report_status(SyncStatus::Live);
        tracing::debug!(scope = %shared.scope, records = snapshot.len(), "synchronizer started");
        Ok(())
    }

    /// Unsubscribe and discard the store. Any in-flight fetch or queued
    /// listener callback from before the stop becomes a no-op.
    pub fn stop(&self) {
        let shared = &self.shared;
        shared.generation.fetch_add(1, Ordering::SeqCst);
        shared.ready.store(false, Ordering::SeqCst);

        if let Some(handle) = shared.handle.lock().take() {
            shared.client.unsubscribe(handle);
        }

        let mut state = shared.state.lock();
        state.store.clear();
        state.tombstones.clear();
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Current store contents in insertion order.
    pub fn snapshot(&self) -> Vec<T> {
        self.shared.state.lock().store.snapshot()
    }

    /// Whether the initial fetch completed and the subscription is active.
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::SeqCst)
    }

    pub fn scope(&self) -> &SubscriptionScope {
        &self.shared.scope
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Register a snapshot observer, called after every applied delta and
    /// after each successful resync (and once on start).
    pub fn observe(&self, callback: impl Fn(&[T]) + Send + Sync + 'static) -> ObserverId {
        self.shared.observers.observe(callback)
    }

    pub fn unobserve(&self, id: ObserverId) {
        self.shared.observers.remove(id);
    }

    /// Recompute `aggregator` over every emitted snapshot and hand the
    /// result to `callback`. The full-recompute discipline is what keeps
    /// aggregates from drifting.
    pub fn observe_aggregate<A: 'static>(
        &self,
        aggregator: DerivedAggregator<T, A>,
        callback: impl Fn(A) + Send + Sync + 'static,
    ) -> ObserverId {
        self.observe(move |snapshot| callback(aggregator.compute(snapshot)))
    }
}

// ============================================================================
// Listener / event application
// ============================================================================

fn make_listener<T: Entity + DeserializeOwned>(
    shared: std::sync::Weak<SyncShared<T>>,
    generation: u64,
) -> FeedListener {
    Arc::new(move |signal| {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        if shared.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        handle_signal(&shared, generation, signal);
    })
}

fn handle_signal<T: Entity + DeserializeOwned>(
    shared: &Arc<SyncShared<T>>,
    generation: u64,
    signal: FeedSignal,
) {
    match signal {
        FeedSignal::Event(raw) => match parse_event::<T>(&raw) {
            Ok(event) => apply_event(shared, event),
            Err(error) => {
                tracing::warn!(scope = %shared.scope, %error, "dropping malformed change event");
            }
        },
        FeedSignal::Disconnected => {
            tracing::info!(scope = %shared.scope, "change feed disconnected");
            shared.report_status(SyncStatus::Disconnected);
        }
        FeedSignal::ResyncNeeded => {
            tracing::info!(scope = %shared.scope, "change feed reconnected; resyncing");
            shared.report_status(SyncStatus::Resyncing);
            resync::spawn(Arc::clone(shared), generation);
        }
    }
}

fn apply_event<T: Entity + DeserializeOwned>(shared: &Arc<SyncShared<T>>, event: ChangeEvent<T>) {
    let kind = event.kind();
    let applied: Option<(T, Vec<T>)> = {
        let mut state = shared.state.lock();

        let cached = state
            .store
            .last_sequence(event.id())
            .or_else(|| state.tombstones.get(event.id()).copied());
        if let Some(cached) = cached {
            if event.sequence() <= cached {
                tracing::debug!(
                    scope = %shared.scope,
                    id = event.id(),
                    sequence = event.sequence(),
                    cached,
                    "dropping stale change event"
                );
                return;
            }
        }

        match event {
            ChangeEvent::Inserted(record) => {
                state.tombstones.remove(record.id());
                state.store.apply_insert(record.clone());
                Some((record, state.store.snapshot()))
            }
            ChangeEvent::Updated { new, .. } => {
                // Unknown ids self-heal into inserts inside the store.
                state.tombstones.remove(new.id());
                state.store.apply_upsert(new.clone());
                Some((new, state.store.snapshot()))
            }
            ChangeEvent::Deleted { id, sequence } => {
                match state.store.apply_delete(&id) {
                    Some(removed) => {
                        remember_delete(&mut state.tombstones, id, sequence);
                        Some((removed, state.store.snapshot()))
                    }
                    // Unknown id: remember the sequence, notify nobody.
                    None => {
                        remember_delete(&mut state.tombstones, id, sequence);
                        None
                    }
                }
            }
        }
    };

    // Lock released — safe to run callbacks.
    if let Some((record, snapshot)) = applied {
        shared.observers.emit(&snapshot);
        notify_applied(&shared.sink, kind, &record);
    }
}

/// Upper bound on retained tombstones. Once full, the entry with the
/// oldest delete sequence is evicted. Resync clears the map entirely.
const MAX_TOMBSTONES: usize = 1024;

fn remember_delete(tombstones: &mut HashMap<String, i64>, id: String, sequence: i64) {
    tombstones.insert(id, sequence);
    if tombstones.len() > MAX_TOMBSTONES {
        let oldest = tombstones
            .iter()
            .min_by_key(|(_, seq)| **seq)
            .map(|(id, _)| id.clone());
        if let Some(oldest) = oldest {
            tombstones.remove(&oldest);
        }
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

impl<T> SyncShared<T> {
    pub(crate) fn report_status(&self, status: SyncStatus) {
        if let Some(ref on_status) = self.on_status {
            let _ = catch_unwind(AssertUnwindSafe(|| on_status(status)));
        }
    }
}

/// Parse bulk-fetch rows, skipping (and logging) anything unparseable.
/// Consistent with the malformed-event policy: one bad row does not take
/// the whole scope down.
pub(crate) fn parse_rows<T: DeserializeOwned>(
    scope: &SubscriptionScope,
    rows: Vec<Value>,
) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(%scope, %error, "skipping unparseable row in bulk fetch");
                None
            }
        })
        .collect()
}
