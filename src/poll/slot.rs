use crate::errors::FetchError;
use crate::poll::state::{PollKey, PollState, PollSubscription};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Monotonic counter guarding one polled slot.
///
/// Advancing it supersedes whichever loop currently holds the slot: the old
/// loop stops at its next checkpoint and an in-flight response it was
/// waiting on is discarded instead of published. This is what keeps a
/// just-switched wallet or detail view from being overwritten by a slow
/// response for the previous key.
#[derive(Clone, Debug, Default)]
pub(crate) struct Generation(Arc<AtomicU64>);

impl Generation {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Supersede the current holder and lease the slot anew.
    pub(crate) fn advance(&self) -> Lease {
        let value = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        Lease { value, counter: self.clone() }
    }

    /// A lease on a private counter nothing else will ever advance. Used
    /// for subscriptions without supersession semantics.
    pub(crate) fn detached() -> Lease {
        Self::new().advance()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Lease {
    value: u64,
    counter: Generation,
}

impl Lease {
    pub(crate) fn is_current(&self) -> bool {
        self.counter.0.load(Ordering::SeqCst) == self.value
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct PollOptions {
    pub interval: Duration,
    pub max_backoff: Duration,
}

/// Delay before the next attempt after `failures` consecutive failures.
/// Doubles per failure from the base interval, capped.
fn backoff_delay(interval: Duration, failures: u32, cap: Duration) -> Duration {
    let factor = 1u32 << failures.min(10);
    interval.saturating_mul(factor).min(cap)
}

/// Spawn the polling loop for one key and hand back its subscription.
///
/// The first fetch starts immediately; afterwards the loop refetches on the
/// configured cadence. At most one fetch is ever in flight: ticks that
/// elapse while a fetch is outstanding are skipped, not queued. The loop
/// stops when every subscription clone is dropped or when its lease is
/// superseded.
pub(crate) fn spawn_poll<T, F, Fut>(
    key: PollKey,
    lease: Lease,
    options: PollOptions,
    mut producer: F,
) -> PollSubscription<T>
where
    T: Send + Sync + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send,
{
    let (tx, rx) = watch::channel(PollState::initial());
    let subscription = PollSubscription::new(key.clone(), rx);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut failures: u32 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tx.closed() => {
                    debug!(key = %key, "no subscribers left, stopping poll");
                    break;
                }
            }
            if !lease.is_current() {
                debug!(key = %key, "slot superseded, stopping poll");
                break;
            }

            let outcome = producer().await;

            // The slot may have been handed to a newer key while this fetch
            // was in flight; its answer must not be published.
            if !lease.is_current() {
                debug!(key = %key, "slot superseded, discarding in-flight result");
                break;
            }

            match outcome {
                Ok(value) => {
                    failures = 0;
                    tx.send_modify(|state| state.apply_success(value));
                }
                Err(error) => {
                    failures = failures.saturating_add(1);
                    warn!(key = %key, error = %error, failures, "poll fetch failed");
                    let delay = backoff_delay(options.interval, failures, options.max_backoff);
                    ticker.reset_after(delay);
                    tx.send_modify(|state| state.apply_failure(error));
                }
            }
        }
    });

    subscription
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Notify;

    fn options(interval_ms: u64) -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(interval_ms),
            max_backoff: Duration::from_secs(120),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let base = Duration::from_secs(10);
        let cap = Duration::from_secs(120);
        assert_eq!(backoff_delay(base, 1, cap), Duration::from_secs(20));
        assert_eq!(backoff_delay(base, 2, cap), Duration::from_secs(40));
        assert_eq!(backoff_delay(base, 3, cap), Duration::from_secs(80));
        assert_eq!(backoff_delay(base, 4, cap), Duration::from_secs(120));
        assert_eq!(backoff_delay(base, 30, cap), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_clears_on_first_settle_even_on_failure() {
        let entered = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());
        let calls = Arc::new(AtomicU64::new(0));

        let producer_entered = entered.clone();
        let producer_gate = gate.clone();
        let producer_calls = calls.clone();
        let mut sub: PollSubscription<u64> = spawn_poll(
            PollKey::Overview,
            Generation::detached(),
            options(5_000),
            move || {
                let entered = producer_entered.clone();
                let gate = producer_gate.clone();
                let calls = producer_calls.clone();
                async move {
                    entered.notify_one();
                    gate.notified().await;
                    match calls.fetch_add(1, Ordering::SeqCst) {
                        0 => Err(FetchError::transport("test-source", "boom")),
                        n => Ok(n),
                    }
                }
            },
        );

        entered.notified().await;
        let state = sub.state();
        assert!(state.loading);
        assert!(state.value.is_none());
        assert!(state.error.is_none());

        gate.notify_one();
        let state = sub.next_settled().await.unwrap();
        assert!(!state.loading);
        assert!(state.value.is_none());
        assert!(state.error.is_some());
        assert_eq!(state.version, 1);

        // A later success clears the error and never re-enters loading.
        gate.notify_one();
        let state = sub.next_settled().await.unwrap();
        assert!(!state.loading);
        assert_eq!(state.value.as_deref(), Some(&1));
        assert!(state.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_last_good_value() {
        let calls = Arc::new(AtomicU64::new(0));
        let producer_calls = calls.clone();
        let mut sub = spawn_poll(
            PollKey::Stats("ethereum".into()),
            Generation::detached(),
            options(5_000),
            move || {
                let calls = producer_calls.clone();
                async move {
                    match calls.fetch_add(1, Ordering::SeqCst) {
                        0 => Ok(10u64),
                        1 => Err(FetchError::upstream("test-source", Some(502), "bad gateway")),
                        _ => Ok(11),
                    }
                }
            },
        );

        let first = sub.next_settled().await.unwrap();
        assert_eq!(first.value.as_deref(), Some(&10));
        assert!(first.error.is_none());

        let second = sub.next_settled().await.unwrap();
        assert_eq!(second.value.as_deref(), Some(&10), "stale value retained");
        assert!(second.error.is_some());
        assert!(!second.loading);

        let third = sub.next_settled().await.unwrap();
        assert_eq!(third.value.as_deref(), Some(&11));
        assert!(third.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_successes_publish_fresh_values() {
        let calls = Arc::new(AtomicU64::new(0));
        let producer_calls = calls.clone();
        let mut sub = spawn_poll(
            PollKey::Overview,
            Generation::detached(),
            options(1_000),
            move || {
                let calls = producer_calls.clone();
                async move { Ok(calls.fetch_add(1, Ordering::SeqCst)) }
            },
        );

        let first = sub.next_settled().await.unwrap();
        let second = sub.next_settled().await.unwrap();
        assert_eq!(first.value.as_deref(), Some(&0));
        assert_eq!(second.value.as_deref(), Some(&1));
        assert_eq!(second.version, first.version + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetches_never_overlap() {
        let in_flight = Arc::new(AtomicU64::new(0));
        let peak = Arc::new(AtomicU64::new(0));
        let producer_in_flight = in_flight.clone();
        let producer_peak = peak.clone();
        let mut sub = spawn_poll(
            PollKey::Transactions("sui".into()),
            Generation::detached(),
            options(10),
            move || {
                let in_flight = producer_in_flight.clone();
                let peak = producer_peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    // Slower than several tick periods; those ticks must be
                    // skipped rather than queued.
                    tokio::time::sleep(Duration::from_millis(35)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(now)
                }
            },
        );

        for _ in 0..3 {
            sub.next_settled().await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_loop_discards_in_flight_result() {
        let generation = Generation::new();
        let entered = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());

        let producer_entered = entered.clone();
        let producer_gate = gate.clone();
        let mut sub: PollSubscription<u64> = spawn_poll(
            PollKey::Wallet("ethereum".into(), "0xabc".to_owned()),
            generation.advance(),
            options(5_000),
            move || {
                let entered = producer_entered.clone();
                let gate = producer_gate.clone();
                async move {
                    entered.notify_one();
                    gate.notified().await;
                    Ok(99u64)
                }
            },
        );

        entered.notified().await;
        // Key switched while the response is still in flight.
        let _superseding = generation.advance();
        gate.notify_one();

        // The loop must stop without ever publishing the late response.
        assert!(sub.changed().await.is_err());
        let state = sub.state();
        assert!(state.value.is_none());
        assert_eq!(state.version, 0);
    }
}
