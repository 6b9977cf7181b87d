//! Registry of currently-running trackers.
//!
//! A single mutex domain covers the whole collection: lookups, insertions,
//! and removals never observe a torn state, and `add_if_absent` runs the
//! construction closure inside the critical section so two concurrent start
//! commands for the same code can never both insert.

use std::collections::HashMap;
use std::sync::Arc;

use pricewatch_core::Result;

use crate::tracker::Tracker;

/// Concurrency-safe map of running trackers, keyed by tracker code.
#[derive(Default)]
pub struct TrackerRegistry {
    trackers: tokio::sync::Mutex<HashMap<String, Arc<Tracker>>>,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the running tracker for a code, if any.
    pub async fn lookup(&self, code: &str) -> Option<Arc<Tracker>> {
        self.trackers.lock().await.get(code).cloned()
    }

    /// Atomically insert a tracker built by `make` unless one is already
    /// registered for `code`. Returns the freshly inserted tracker, or
    /// `None` when the code was already present. Construction failures
    /// propagate and leave the registry untouched.
    pub async fn add_if_absent<F>(&self, code: &str, make: F) -> Result<Option<Arc<Tracker>>>
    where
        F: FnOnce() -> Result<Arc<Tracker>>,
    {
        let mut trackers = self.trackers.lock().await;
        if trackers.contains_key(code) {
            return Ok(None);
        }
        let tracker = make()?;
        trackers.insert(code.to_string(), Arc::clone(&tracker));
        Ok(Some(tracker))
    }

    /// Remove a tracker by code. No-op if absent. The caller is responsible
    /// for stopping the returned tracker.
    pub async fn remove(&self, code: &str) -> Option<Arc<Tracker>> {
        self.trackers.lock().await.remove(code)
    }

    /// Stop every registered tracker and clear the registry under one
    /// critical section.
    pub async fn stop_all(&self) {
        let mut trackers = self.trackers.lock().await;
        for (code, tracker) in trackers.drain() {
            tracing::info!(code, "stopping tracker on shutdown");
            tracker.stop().await;
        }
    }

    /// Codes of all currently registered trackers.
    pub async fn running_codes(&self) -> Vec<String> {
        self.trackers.lock().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.trackers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.trackers.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::tests::{make_tracker, CountingStrategy, RecordingMessenger};
    use std::time::Duration;

    fn build(code: &str) -> Arc<Tracker> {
        make_tracker(
            code,
            Duration::from_secs(60),
            Arc::new(CountingStrategy::new()),
            Arc::new(RecordingMessenger::default()),
            3,
        )
    }

    #[tokio::test]
    async fn test_add_if_absent_inserts_once() {
        let registry = TrackerRegistry::new();

        let first = registry.add_if_absent("btc", || Ok(build("btc"))).await.unwrap();
        assert!(first.is_some());

        let second = registry.add_if_absent("btc", || Ok(build("btc"))).await.unwrap();
        assert!(second.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_starts_yield_one_tracker() {
        let registry = Arc::new(TrackerRegistry::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry
                    .add_if_absent("btc", || Ok(build("btc")))
                    .await
                    .unwrap()
                    .is_some()
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_is_noop_when_absent() {
        let registry = TrackerRegistry::new();
        assert!(registry.remove("nope").await.is_none());

        registry.add_if_absent("btc", || Ok(build("btc"))).await.unwrap();
        assert!(registry.remove("btc").await.is_some());
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_all_stops_and_clears() {
        let registry = TrackerRegistry::new();

        for code in ["a", "b", "c"] {
            let tracker = registry
                .add_if_absent(code, || Ok(build(code)))
                .await
                .unwrap()
                .expect("inserted");
            tracker.start().await;
        }
        assert_eq!(registry.len().await, 3);

        let running = registry.lookup("a").await.unwrap();
        registry.stop_all().await;
        assert!(registry.is_empty().await);
        assert!(!running.is_running().await);
    }

    #[tokio::test]
    async fn test_failed_construction_leaves_registry_untouched() {
        let registry = TrackerRegistry::new();
        let result = registry
            .add_if_absent("bad", || {
                Err(pricewatch_core::PricewatchError::UnknownTracker("bad".into()))
            })
            .await;
        assert!(result.is_err());
        assert!(registry.is_empty().await);
    }
}
