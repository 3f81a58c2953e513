//! Resync — full store replacement after a feed gap, with backoff retry.
//!
//! A disconnect is never treated as "no events happened". The transport
//! reports `ResyncNeeded` and this task refetches the scope, replacing the
//! store wholesale so it converges to exactly the backend's current set.
//! While attempts fail, the store keeps serving its last-known-good
//! snapshot — a transient backend error must not blank the UI.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::FeedError;
use crate::notify::sink::notify_failure;
use crate::types::{Entity, SyncStatus};

use super::manager::{parse_rows, SyncShared};

// ============================================================================
// Backoff
// ============================================================================

/// Exponential retry schedule for failed resync fetches.
#[derive(Debug, Clone, Copy)]
pub struct ResyncBackoff {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound on the delay.
    pub cap: Duration,
}

impl ResyncBackoff {
    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`,
    /// capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

impl Default for ResyncBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            cap: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// Resync task
// ============================================================================

/// Spawn the retry loop for `generation`. The loop exits as soon as the
/// synchronizer moves to a newer generation (stop or restart) or a fetch
/// succeeds.
pub(crate) fn spawn<T>(shared: Arc<SyncShared<T>>, generation: u64)
where
    T: Entity + DeserializeOwned,
{
    tokio::spawn(async move {
        let mut attempt: u32 = 0;
        loop {
            if shared.generation.load(Ordering::SeqCst) != generation {
                return;
            }

            match shared.client.fetch(&shared.scope).await {
                Ok(rows) => {
                    if shared.generation.load(Ordering::SeqCst) != generation {
                        return;
                    }
                    let records = parse_rows::<T>(&shared.scope, rows);
                    let snapshot = {
                        let mut state = shared.state.lock();
                        state.store.replace_all(records);
                        state.tombstones.clear();
                        state.store.snapshot()
                    };
                    shared.observers.emit(&snapshot);
                    shared.report_status(SyncStatus::Live);
                    tracing::info!(
                        scope = %shared.scope,
                        records = snapshot.len(),
                        attempt,
                        "resync complete"
                    );
                    return;
                }
                Err(e) => {
                    let error = FeedError::Fetch {
                        scope: shared.scope.to_string(),
                        message: e.message.clone(),
                        kind: e.kind,
                    };
                    tracing::warn!(scope = %shared.scope, attempt, %error, "resync fetch failed");
                    notify_failure(&shared.sink, &error);
                    shared.report_status(SyncStatus::Degraded);

                    tokio::time::sleep(shared.backoff.delay(attempt)).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    });
}
