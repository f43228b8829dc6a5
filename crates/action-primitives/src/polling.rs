//! Bounded "eventually" polling

use std::fmt::{Debug, Display};
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::errors::ActionError;

const MIN_TIMING: Duration = Duration::from_millis(1);

/// Outcome of a poll. Timing out is a value, not an error.
#[derive(Clone, Debug, PartialEq)]
pub enum PollResult<T> {
    Satisfied {
        value: T,
        elapsed: Duration,
        polls: u32,
    },
    TimedOut {
        /// Last value the probe produced, if any
        last: Option<T>,
        /// Last error a fallible probe returned
        last_error: Option<String>,
        elapsed: Duration,
        polls: u32,
    },
}

impl<T> PollResult<T> {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, PollResult::Satisfied { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            PollResult::Satisfied { elapsed, .. } | PollResult::TimedOut { elapsed, .. } => *elapsed,
        }
    }

    pub fn polls(&self) -> u32 {
        match self {
            PollResult::Satisfied { polls, .. } | PollResult::TimedOut { polls, .. } => *polls,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            PollResult::Satisfied { value, .. } => Some(value),
            PollResult::TimedOut { .. } => None,
        }
    }

}

impl<T: Debug> PollResult<T> {
    /// Treat a timeout as fatal, keeping the last observation for diagnostics.
    pub fn into_result(self, description: impl Into<String>) -> Result<T, ActionError> {
        match self {
            PollResult::Satisfied { value, .. } => Ok(value),
            PollResult::TimedOut {
                last,
                last_error,
                elapsed,
                polls,
            } => Err(ActionError::PollTimeout {
                description: description.into(),
                elapsed,
                polls,
                last_value: last.map(|value| format!("{:?}", value)),
                last_error,
            }),
        }
    }
}

/// Evaluates a condition immediately, then every `interval` until it holds
/// or `timeout` elapses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollingAssertion {
    timeout: Duration,
    interval: Duration,
}

impl PollingAssertion {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout: timeout.max(MIN_TIMING),
            interval: interval.max(MIN_TIMING),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.max(MIN_TIMING);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_TIMING);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn until<F, Fut>(&self, predicate: F) -> PollResult<bool>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        self.until_value(predicate, |holds: &bool| *holds).await
    }

    /// Poll `probe` until `accept` approves its value.
    pub async fn until_value<T, F, Fut, A>(&self, mut probe: F, mut accept: A) -> PollResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
        A: FnMut(&T) -> bool,
    {
        self.run(
            || {
                let fut = probe();
                async move { Ok::<T, String>(fut.await) }
            },
            &mut accept,
        )
        .await
    }

    /// Poll a fallible probe; errors count as "not yet" and the last one is kept.
    pub async fn until_ok<T, E, F, Fut>(&self, mut probe: F) -> PollResult<T>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(
            || {
                let fut = probe();
                async move { fut.await.map_err(|err| err.to_string()) }
            },
            &mut |_: &T| true,
        )
        .await
    }

    async fn run<T, F, Fut, A>(&self, mut probe: F, accept: &mut A) -> PollResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, String>>,
        A: FnMut(&T) -> bool,
    {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut polls = 0u32;
        let mut last = None;
        let mut last_error = None;

        loop {
            polls += 1;
            match probe().await {
                Ok(value) => {
                    if accept(&value) {
                        let elapsed = started.elapsed();
                        debug!(polls, elapsed_ms = elapsed.as_millis() as u64, "poll satisfied");
                        return PollResult::Satisfied {
                            value,
                            elapsed,
                            polls,
                        };
                    }
                    last = Some(value);
                }
                Err(err) => {
                    debug!(polls, error = %err, "poll probe failed");
                    last_error = Some(err);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                let elapsed = now.duration_since(started);
                debug!(polls, elapsed_ms = elapsed.as_millis() as u64, "poll timed out");
                return PollResult::TimedOut {
                    last,
                    last_error,
                    elapsed,
                    polls,
                };
            }
            sleep(self.interval.min(deadline - now)).await;
        }
    }
}

impl Default for PollingAssertion {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_millis(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn predicate_flipping_before_deadline_is_satisfied() {
        let origin = Instant::now();
        let poll = PollingAssertion::new(Duration::from_secs(2), Duration::from_millis(100));

        let result = poll
            .until(move || async move { origin.elapsed() >= Duration::from_millis(450) })
            .await;

        assert!(result.is_satisfied());
        assert_eq!(result.elapsed(), Duration::from_millis(500));
        assert_eq!(result.polls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn predicate_never_flipping_times_out_at_deadline() {
        let poll = PollingAssertion::new(Duration::from_millis(1000), Duration::from_millis(300));

        let result = poll.until(|| async { false }).await;

        match result {
            PollResult::TimedOut {
                last,
                elapsed,
                polls,
                ..
            } => {
                assert_eq!(last, Some(false));
                assert_eq!(elapsed, Duration::from_millis(1000));
                // t = 0, 300, 600, 900, 1000
                assert_eq!(polls, 5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_timeout_keeps_last_rejected_value() {
        let poll = PollingAssertion::new(Duration::from_millis(500), Duration::from_millis(100));

        let err = poll
            .until_value(|| async { 2usize }, |count| *count == 0)
            .await
            .into_result("list is empty")
            .unwrap_err();

        match &err {
            ActionError::PollTimeout {
                last_value,
                last_error,
                ..
            } => {
                assert_eq!(last_value.as_deref(), Some("2"));
                assert_eq!(*last_error, None);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().ends_with("; last value: 2"), "{err}");
    }

    #[tokio::test(start_paused = true)]
    async fn until_ok_keeps_last_error() {
        let calls = AtomicU32::new(0);
        let poll = PollingAssertion::new(Duration::from_millis(250), Duration::from_millis(100));

        let result = poll
            .until_ok(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err::<u32, String>(format!("probe {} failed", n)) }
            })
            .await;

        match &result {
            PollResult::TimedOut { last_error, .. } => {
                assert_eq!(last_error.as_deref(), Some("probe 3 failed"))
            }
            other => panic!("unexpected {other:?}"),
        }
        let err = result.into_result("probe succeeds").unwrap_err();
        assert!(matches!(err, ActionError::PollTimeout { polls: 4, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn until_value_returns_accepted_value() {
        let calls = AtomicU32::new(0);
        let poll = PollingAssertion::default();

        let value = poll
            .until_value(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move { n * 10 }
                },
                |v| *v >= 30,
            )
            .await
            .into_result("value reaches 30")
            .unwrap();

        assert_eq!(value, 30);
    }

    #[test]
    fn timings_are_clamped() {
        let poll = PollingAssertion::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(poll.timeout(), Duration::from_millis(1));
        assert_eq!(poll.interval(), Duration::from_millis(1));
    }
}
