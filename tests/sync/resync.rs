//! Resync behavior: wholesale convergence, backoff retry, teardown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use feedsync::feed::{FeedSignal, FeedTransportError};
use feedsync::sync::ResyncBackoff;
use feedsync::types::SyncStatus;

use super::mock::*;

// ============================================================================
// Backoff schedule
// ============================================================================

#[test]
fn backoff_doubles_and_caps() {
    let backoff = ResyncBackoff {
        base: Duration::from_millis(100),
        cap: Duration::from_secs(1),
    };
    assert_eq!(backoff.delay(0), Duration::from_millis(100));
    assert_eq!(backoff.delay(1), Duration::from_millis(200));
    assert_eq!(backoff.delay(2), Duration::from_millis(400));
    assert_eq!(backoff.delay(4), Duration::from_secs(1));
    // Large attempt counts must not overflow.
    assert_eq!(backoff.delay(63), Duration::from_secs(1));
}

// ============================================================================
// Convergence
// ============================================================================

#[tokio::test]
async fn resync_replaces_store_with_fetched_set() {
    let client = MockFeedClient::new();
    client.fetch_rows(vec![review_row("r1", 5.0, 1)]);
    let statuses = StatusLog::new();
    let sync = make_sync(client.clone(), None, Some(statuses.clone()));
    sync.start().await.unwrap();

    // The backend's state moved on while we were disconnected.
    client.fetch_rows(vec![review_row("r2", 4.0, 7), review_row("r3", 2.0, 8)]);
    client.emit(FeedSignal::Disconnected);
    client.emit(FeedSignal::ResyncNeeded);

    {
        let sync_ref = &sync;
        wait_until(move || sync_ref.snapshot().len() == 2).await;
    }

    let snapshot = sync.snapshot();
    assert_eq!(snapshot[0].id, "r2");
    assert_eq!(snapshot[1].id, "r3");
    assert!(snapshot.iter().all(|r| r.id != "r1"));

    let seen = statuses.all();
    assert_eq!(seen[0], SyncStatus::Live);
    assert!(seen.contains(&SyncStatus::Disconnected));
    assert!(seen.contains(&SyncStatus::Resyncing));
    assert_eq!(*seen.last().unwrap(), SyncStatus::Live);
}

#[tokio::test]
async fn resync_overrides_local_tombstones() {
    let client = MockFeedClient::new();
    client.fetch_rows(vec![review_row("r1", 5.0, 1)]);
    let sync = make_sync(client.clone(), None, None);
    sync.start().await.unwrap();

    client.emit(delete_signal("r1", 9));
    assert!(sync.snapshot().is_empty());

    // The resync fetch is authoritative, even at a lower sequence.
    client.fetch_rows(vec![review_row("r1", 5.0, 2)]);
    client.emit(FeedSignal::ResyncNeeded);

    {
        let sync_ref = &sync;
        wait_until(move || sync_ref.snapshot().len() == 1).await;
    }
    assert_eq!(sync.snapshot()[0].id, "r1");
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn resync_failure_keeps_last_good_state_and_retries() {
    let client = MockFeedClient::new();
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        client.on_fetch(move |_| match calls.fetch_add(1, Ordering::SeqCst) {
            // Initial load.
            0 => Ok(vec![review_row("r1", 5.0, 1)]),
            // First two resync attempts fail.
            1 | 2 => Err(FeedTransportError::transient("backend unavailable")),
            // Then the backend comes back with new state.
            _ => Ok(vec![review_row("r2", 3.0, 4)]),
        });
    }

    let sink = RecordingSink::new();
    let statuses = StatusLog::new();
    let sync = make_sync(client.clone(), Some(sink.clone()), Some(statuses.clone()));

    // Record every emitted snapshot: the UI must never see a blank store
    // because of a transient resync failure.
    let emissions: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let emissions = Arc::clone(&emissions);
        sync.observe(move |snapshot| emissions.lock().push(snapshot.len()));
    }

    sync.start().await.unwrap();
    client.emit(FeedSignal::ResyncNeeded);

    {
        let sync_ref = &sync;
        wait_until(move || {
            let snapshot = sync_ref.snapshot();
            snapshot.len() == 1 && snapshot[0].id == "r2"
        })
        .await;
    }

    assert!(sink.error_count() >= 2, "resync failures surfaced to sink");
    assert!(sink
        .errors
        .lock()
        .iter()
        .all(|e| e.contains("backend unavailable")));

    let seen = statuses.all();
    assert!(seen.contains(&SyncStatus::Resyncing));
    assert!(seen.contains(&SyncStatus::Degraded));
    assert_eq!(*seen.last().unwrap(), SyncStatus::Live);

    // [r1] on start, then [r2] after the successful resync — never empty.
    assert!(emissions.lock().iter().all(|len| *len > 0));
}

#[tokio::test]
async fn stop_aborts_resync_retry_loop() {
    let client = MockFeedClient::new();
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        client.on_fetch(move |_| match calls.fetch_add(1, Ordering::SeqCst) {
            0 => Ok(vec![review_row("r1", 5.0, 1)]),
            _ => Err(FeedTransportError::transient("still down")),
        });
    }
    let sink = RecordingSink::new();
    let sync = make_sync(client.clone(), Some(sink.clone()), None);
    sync.start().await.unwrap();

    client.emit(FeedSignal::ResyncNeeded);
    {
        let sink = sink.clone();
        wait_until(move || sink.error_count() >= 1).await;
    }

    sync.stop();

    // Let any in-flight attempt drain, then confirm the loop is dead.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let settled = client.fetch_call_count();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(client.fetch_call_count(), settled);
}
