//! Deadline-bounded waits on element state

use std::fmt;
use std::time::Duration;

use action_locator::{render_attempts, FallbackResolver, LocatorError, Resolution, StrategyAttempt};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use twizz_core_types::{ElementSnapshot, InteractionTarget, ProviderError, TargetState};

use crate::errors::ActionError;

const MIN_TIMING: Duration = Duration::from_millis(1);

/// Target state plus deadline and poll cadence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaitSpec {
    pub state: TargetState,
    timeout: Duration,
    poll_interval: Duration,
}

impl WaitSpec {
    /// Timeout is clamped to at least 1 ms.
    pub fn new(state: TargetState, timeout: Duration) -> Self {
        Self {
            state,
            timeout: timeout.max(MIN_TIMING),
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn visible(timeout: Duration) -> Self {
        Self::new(TargetState::Visible, timeout)
    }

    pub fn attached(timeout: Duration) -> Self {
        Self::new(TargetState::Attached, timeout)
    }

    pub fn detached(timeout: Duration) -> Self {
        Self::new(TargetState::Detached, timeout)
    }

    pub fn enabled(timeout: Duration) -> Self {
        Self::new(TargetState::Enabled, timeout)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_TIMING);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for WaitSpec {
    fn default() -> Self {
        Self::new(TargetState::Visible, Duration::from_secs(10))
    }
}

/// What the last tick of a failed wait saw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Observation {
    /// No strategy matched
    NotFound { attempts: Vec<StrategyAttempt> },

    /// An element was found but its state did not satisfy the wait
    WrongState {
        strategy_index: usize,
        snapshot: ElementSnapshot,
    },

    /// The provider failed during resolution
    ProviderError(ProviderError),
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::NotFound { attempts } => {
                write!(f, "not found ({})", render_attempts(attempts))
            }
            Observation::WrongState {
                strategy_index,
                snapshot,
            } => write!(f, "found via strategy #{} but {}", strategy_index, snapshot),
            Observation::ProviderError(err) => write!(f, "provider error: {}", err),
        }
    }
}

/// Successful wait.
#[derive(Clone, Debug)]
pub struct WaitReport {
    pub state: TargetState,
    pub elapsed: Duration,
    pub polls: u32,

    /// Resolution that satisfied the wait; `None` for detached waits
    pub resolution: Option<Resolution>,
}

impl WaitReport {
    pub fn strategy_index(&self) -> Option<usize> {
        self.resolution.as_ref().map(|r| r.strategy_index)
    }
}

/// Polls a target until it reaches a [`TargetState`] or the deadline passes.
#[derive(Clone)]
pub struct VisibilityWaiter {
    resolver: FallbackResolver,
}

impl VisibilityWaiter {
    pub fn new(resolver: FallbackResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &FallbackResolver {
        &self.resolver
    }

    /// Re-resolve `target` every tick until `spec.state` holds.
    ///
    /// The sleep before each tick is `min(poll_interval, remaining)` so the
    /// last check lands on the deadline.
    pub async fn wait(
        &self,
        target: &InteractionTarget,
        spec: &WaitSpec,
    ) -> Result<WaitReport, ActionError> {
        let started = Instant::now();
        let deadline = started + spec.timeout();
        let mut polls = 0u32;

        loop {
            polls += 1;
            let last = match self.resolver.resolve(target).await {
                Ok(resolution) => {
                    if spec.state.accepts(&resolution.snapshot) {
                        return Ok(self.satisfied(target, spec, started, polls, Some(resolution)));
                    }
                    Observation::WrongState {
                        strategy_index: resolution.strategy_index,
                        snapshot: resolution.snapshot,
                    }
                }
                Err(LocatorError::ElementNotFound { attempts, .. }) => {
                    if spec.state == TargetState::Detached {
                        return Ok(self.satisfied(target, spec, started, polls, None));
                    }
                    Observation::NotFound { attempts }
                }
                Err(LocatorError::Provider(err)) => {
                    warn!(target = %target.label(), error = %err, "provider error while waiting");
                    Observation::ProviderError(err)
                }
            };
            debug!(target = %target.label(), state = %spec.state, polls, observation = %last, "wait tick");

            let now = Instant::now();
            if now >= deadline {
                let elapsed = now.duration_since(started);
                warn!(
                    target = %target.label(),
                    state = %spec.state,
                    elapsed_ms = elapsed.as_millis() as u64,
                    polls,
                    "wait timed out"
                );
                return Err(ActionError::WaitTimeout {
                    target: target.label(),
                    state: spec.state,
                    elapsed,
                    last,
                });
            }
            sleep(spec.poll_interval().min(deadline - now)).await;
        }
    }

    fn satisfied(
        &self,
        target: &InteractionTarget,
        spec: &WaitSpec,
        started: Instant,
        polls: u32,
        resolution: Option<Resolution>,
    ) -> WaitReport {
        let elapsed = started.elapsed();
        info!(
            target = %target.label(),
            state = %spec.state,
            elapsed_ms = elapsed.as_millis() as u64,
            polls,
            "wait satisfied"
        );
        WaitReport {
            state: spec.state,
            elapsed,
            polls,
            resolution,
        }
    }
}
