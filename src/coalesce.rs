//! Request Coalescing
//!
//! Collapses concurrent loads of the same key into a single execution whose
//! outcome is shared by every caller that arrived while it was in flight.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use crate::error::{CacheError, Result};

type Outcome<T> = Option<Result<T>>;
type CallTable<T> = Arc<Mutex<HashMap<String, watch::Receiver<Outcome<T>>>>>;

// == Coalescer ==
/// Table of in-flight calls keyed by request key.
///
/// The table lock is only held to look up, insert or remove a call, never
/// while the work runs, so distinct keys proceed in parallel. The work
/// itself runs on its own task: a caller that stops waiting (for example
/// under an external timeout) does not cancel it, and the remaining
/// waiters still get the outcome.
pub struct Coalescer<T> {
    calls: CallTable<T>,
}

/// Removes the call from the table once the work is over, even if it panicked.
struct CallGuard<T> {
    calls: CallTable<T>,
    key: String,
}

impl<T> Drop for CallGuard<T> {
    fn drop(&mut self) {
        lock(&self.calls).remove(&self.key);
    }
}

fn lock<T>(calls: &CallTable<T>) -> MutexGuard<'_, HashMap<String, watch::Receiver<Outcome<T>>>> {
    calls.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    // == Run ==
    /// Runs `work` for `key` unless a call for `key` is already in flight,
    /// in which case this waits for that call and returns its outcome.
    ///
    /// Every caller sharing a call observes the same value or the same error.
    /// No result is kept once the call completes.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (mut rx, leader) = {
            let mut calls = lock(&self.calls);
            match calls.get(key) {
                Some(rx) => (rx.clone(), None),
                None => {
                    let (tx, rx) = watch::channel(None);
                    calls.insert(key.to_string(), rx.clone());
                    (rx, Some(tx))
                }
            }
        };

        match leader {
            Some(tx) => {
                let guard = CallGuard {
                    calls: self.calls.clone(),
                    key: key.to_string(),
                };
                let fut = work();
                tokio::spawn(async move {
                    let outcome = fut.await;
                    // Unlist the call before waking anyone: a caller that
                    // returns and asks again must start a fresh load.
                    drop(guard);
                    let _ = tx.send(Some(outcome));
                });
            }
            None => debug!(key, "Joining in-flight load"),
        }

        let outcome = rx.wait_for(Option::is_some).await;
        match outcome {
            Ok(shared) => (*shared).clone().unwrap_or_else(|| {
                Err(CacheError::Internal(format!("load for {} finished empty", key)))
            }),
            Err(_) => Err(CacheError::Internal(format!(
                "load for {} was aborted before completing",
                key
            ))),
        }
    }

    /// Number of keys with a call currently in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.calls).len()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_share_one_execution() {
        let coalescer = Arc::new(Coalescer::<String>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let coalescer = coalescer.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    coalescer
                        .run("Tom", move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(200)).await;
                            Ok("630".to_string())
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok("630".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waiters_observe_identical_error() {
        let coalescer = Arc::new(Coalescer::<String>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coalescer = coalescer.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    coalescer
                        .run("broken", move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(200)).await;
                            Err(CacheError::SourceUnavailable("db down".to_string()))
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(
                handle.await.unwrap(),
                Err(CacheError::SourceUnavailable("db down".to_string()))
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_completed_call_is_not_cached() {
        let coalescer = Coalescer::<usize>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for expected in 1..=3 {
            let calls = calls.clone();
            let got = coalescer
                .run("key", move || async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) })
                .await;
            assert_eq!(got, Ok(expected));
        }
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sequential_calls_each_run_the_work() {
        let coalescer = Coalescer::<usize>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..500 {
            let calls = calls.clone();
            coalescer
                .run("k", move || async move { Ok(calls.fetch_add(1, Ordering::SeqCst)) })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 500);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_retry_after_error_runs_again() {
        let coalescer = Coalescer::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for attempt in 0..50 {
            let calls = calls.clone();
            let got = coalescer
                .run("flaky", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(CacheError::SourceUnavailable(format!("attempt {}", attempt)))
                })
                .await;
            assert_eq!(
                got,
                Err(CacheError::SourceUnavailable(format!("attempt {}", attempt)))
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_distinct_keys_do_not_block() {
        let coalescer = Arc::new(Coalescer::<&'static str>::new());
        let (release, gate) = oneshot::channel::<()>();

        let slow = {
            let coalescer = coalescer.clone();
            tokio::spawn(async move {
                coalescer
                    .run("slow", move || async move {
                        let _ = gate.await;
                        Ok("slow")
                    })
                    .await
            })
        };

        let fast = tokio::time::timeout(
            Duration::from_secs(1),
            coalescer.run("fast", || async { Ok("fast") }),
        )
        .await;
        assert_eq!(fast.unwrap(), Ok("fast"));

        release.send(()).unwrap();
        assert_eq!(slow.await.unwrap(), Ok("slow"));
    }

    #[tokio::test]
    async fn test_abandoned_call_still_completes() {
        let coalescer = Coalescer::<String>::new();
        let finished = Arc::new(AtomicUsize::new(0));

        let flag = finished.clone();
        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            coalescer.run("slow", move || async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                flag.fetch_add(1, Ordering::SeqCst);
                Ok("done".to_string())
            }),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_panicking_work_reports_internal_error() {
        let coalescer = Coalescer::<String>::new();

        let got = coalescer
            .run("boom", || async {
                let fail = true;
                if fail {
                    panic!("loader exploded");
                }
                Ok(String::new())
            })
            .await;

        assert!(matches!(got, Err(CacheError::Internal(_))));
        assert_eq!(coalescer.in_flight(), 0);
    }
}
