use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key async locks: holders of the same key run one at a time, so a
/// follower can find the leader's result in the cache
pub struct RequestCoalescer {
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RequestCoalescer {
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(
                inflight
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Drop locks nobody holds or waits on
    pub async fn prune(&self) {
        self.inflight
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub async fn tracked_keys(&self) -> usize {
        self.inflight.lock().await.len()
    }
}

impl Default for RequestCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_serialized() {
        let coalescer = Arc::new(RequestCoalescer::new());
        let guard = coalescer.acquire("k").await;

        let waiter = {
            let coalescer = Arc::clone(&coalescer);
            tokio::spawn(async move {
                let _guard = coalescer.acquire("k").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_other_keys_independent() {
        let coalescer = RequestCoalescer::new();
        let _a = coalescer.acquire("a").await;
        let _b = coalescer.acquire("b").await;
        assert_eq!(coalescer.tracked_keys().await, 2);
    }

    #[tokio::test]
    async fn test_prune_releases_idle_keys() {
        let coalescer = RequestCoalescer::new();
        let held = coalescer.acquire("held").await;
        drop(coalescer.acquire("idle").await);
        coalescer.prune().await;
        assert_eq!(coalescer.tracked_keys().await, 1);
        drop(held);
    }
}
