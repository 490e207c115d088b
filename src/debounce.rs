//! Per-key request coalescing.
//!
//! Rapid requests for the same document collapse into one producer call after a
//! quiet period. A newer request supersedes a pending one: the older waiter
//! resolves to `None` immediately and its timer is cancelled. A producer that has
//! already started is never interrupted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ahash::AHashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

struct Pending<T> {
    generation: u64,
    waiter: oneshot::Sender<Option<T>>,
    timer: JoinHandle<()>,
}

pub struct Debouncer<T> {
    pending: Arc<Mutex<AHashMap<String, Pending<T>>>>,
    next_generation: AtomicU64,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(AHashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Run `producer` on the blocking pool once `delay` passes without another
    /// call for `key`. Resolves to `None` when superseded or when the producer
    /// fails or panics.
    pub async fn schedule<F>(&self, key: impl Into<String>, producer: F, delay: Duration) -> Option<T>
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        let key = key.into();
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let (waiter, result_rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            let timer = tokio::spawn(fire_after(self.pending.clone(), key.clone(), generation, producer, delay));

            let superseded = pending.insert(
                key,
                Pending {
                    generation,
                    waiter,
                    timer,
                },
            );
            if let Some(previous) = superseded {
                previous.timer.abort();
                let _ = previous.waiter.send(None);
            }
        }

        result_rx.await.unwrap_or(None)
    }

    /// Number of keys with a timer still waiting.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<T: Send + 'static> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new()
    }
}

async fn fire_after<T, F>(
    pending: Arc<Mutex<AHashMap<String, Pending<T>>>>,
    key: String,
    generation: u64,
    producer: F,
    delay: Duration,
) where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::time::sleep(delay).await;

    let waiter = {
        let mut pending = pending.lock().unwrap_or_else(|e| e.into_inner());
        let is_current = pending.get(&key).is_some_and(|entry| entry.generation == generation);
        if is_current {
            pending.remove(&key).map(|entry| entry.waiter)
        } else {
            None
        }
    };
    let Some(waiter) = waiter else {
        return;
    };

    let result = match tokio::task::spawn_blocking(producer).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            log::debug!("Debounced task for {key} failed: {e:#}");
            None
        }
        Err(e) => {
            log::warn!("Debounced task for {key} panicked: {e}");
            None
        }
    };

    let _ = waiter.send(result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn rapid_calls_collapse_into_one() {
        let debouncer = Arc::new(Debouncer::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for i in 0..5 {
            let debouncer = debouncer.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                debouncer
                    .schedule(
                        "file:///App.tsx",
                        move || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(i)
                        },
                        DEFAULT_DELAY,
                    )
                    .await
            }));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(results, vec![None, None, None, None, Some(4)]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(debouncer.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn different_keys_do_not_supersede_each_other() {
        let debouncer = Arc::new(Debouncer::new());

        let a = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move { debouncer.schedule("a", || Ok("a"), DEFAULT_DELAY).await })
        };
        let b = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move { debouncer.schedule("b", || Ok("b"), DEFAULT_DELAY).await })
        };

        assert_eq!(a.await.unwrap(), Some("a"));
        assert_eq!(b.await.unwrap(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_producer_resolves_to_none() {
        let debouncer: Debouncer<u32> = Debouncer::new();
        let result = debouncer
            .schedule("doc", || Err(anyhow::anyhow!("compiler exploded")), DEFAULT_DELAY)
            .await;
        assert_eq!(result, None);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_producer_resolves_to_none() {
        let debouncer: Debouncer<u32> = Debouncer::new();
        let result = debouncer
            .schedule("doc", || panic!("compiler panicked"), Duration::from_millis(10))
            .await;
        assert_eq!(result, None);
    }

    #[tokio::test(start_paused = true)]
    async fn calls_after_the_quiet_period_each_run() {
        let debouncer = Debouncer::new();
        let first = debouncer.schedule("doc", || Ok(1), DEFAULT_DELAY).await;
        let second = debouncer.schedule("doc", || Ok(2), DEFAULT_DELAY).await;
        assert_eq!((first, second), (Some(1), Some(2)));
    }
}
