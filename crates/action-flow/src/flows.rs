//! Multi-step flows built on the Interactor

use std::future::Future;
use std::time::Duration;

use action_primitives::{DrainConfig, PollResult, PollingAssertion};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, field, info, instrument, warn, Span};
use twizz_core_types::InteractionTarget;

use crate::errors::FlowError;
use crate::interactor::Interactor;
use crate::types::StepScope;

/// Bounds for [`Interactor::drain_until_empty`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrainLimits {
    pub max_iterations: u32,

    /// Consecutive removals that may fail to lower the count
    pub max_stalls: u32,

    /// How long a removal may take to show up in the count
    pub settle_timeout: Duration,

    /// Marker that shows once the list is empty, such as a placeholder row
    pub empty_state: Option<InteractionTarget>,
}

impl DrainLimits {
    pub fn with_empty_state(mut self, target: InteractionTarget) -> Self {
        self.empty_state = Some(target);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_max_stalls(mut self, max_stalls: u32) -> Self {
        self.max_stalls = max_stalls;
        self
    }

    pub fn with_settle_timeout(mut self, settle_timeout: Duration) -> Self {
        self.settle_timeout = settle_timeout;
        self
    }
}

impl From<&DrainConfig> for DrainLimits {
    fn from(config: &DrainConfig) -> Self {
        Self {
            max_iterations: config.max_iterations.max(1),
            max_stalls: config.max_stalls,
            settle_timeout: Duration::from_millis(config.settle_timeout_ms),
            empty_state: None,
        }
    }
}

impl Default for DrainLimits {
    fn default() -> Self {
        Self::from(&DrainConfig::default())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainStop {
    /// The item count reached zero
    Empty,

    /// The empty-state marker became visible
    EmptyState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub initial: usize,
    pub removed: usize,
    pub iterations: u32,
    pub stalls: u32,
    pub elapsed_ms: u64,
    pub stopped: DrainStop,
}

impl Interactor {
    /// Remove items one at a time until none are left.
    ///
    /// Each iteration counts `items`, calls `remove_one` with the 1-based
    /// iteration number, then polls until the count drops. A removal that
    /// errors or does not lower the count within `settle_timeout` is a
    /// stall; more than `max_stalls` stalls in a row abort the drain.
    #[instrument(skip_all, fields(items = %items.label(), action_id = field::Empty))]
    pub async fn drain_until_empty<F, Fut>(
        &self,
        items: &InteractionTarget,
        mut remove_one: F,
        limits: &DrainLimits,
    ) -> Result<DrainReport, FlowError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(), FlowError>>,
    {
        let scope = StepScope::begin("drain_until_empty", Some(items.label()));
        Span::current().record("action_id", field::display(scope.action_id()));
        let result = self.drain(items, &mut remove_one, limits).await;
        self.finish(scope, result).await
    }

    async fn drain<F, Fut>(
        &self,
        items: &InteractionTarget,
        remove_one: &mut F,
        limits: &DrainLimits,
    ) -> Result<DrainReport, FlowError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(), FlowError>>,
    {
        let started = Instant::now();
        let initial = self.count(items).await?;
        let mut remaining = initial;
        let mut iterations = 0u32;
        let mut stalls = 0u32;
        let mut total_stalls = 0u32;
        let settle = PollingAssertion::new(limits.settle_timeout, self.poll_interval());

        loop {
            let stopped = if remaining == 0 {
                Some(DrainStop::Empty)
            } else {
                match &limits.empty_state {
                    Some(marker) if self.is_showing(marker).await => Some(DrainStop::EmptyState),
                    _ => None,
                }
            };
            if let Some(stopped) = stopped {
                let report = DrainReport {
                    initial,
                    removed: initial.saturating_sub(remaining),
                    iterations,
                    stalls: total_stalls,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    stopped,
                };
                info!(
                    removed = report.removed,
                    iterations,
                    stalls = total_stalls,
                    stopped = ?stopped,
                    "drain finished"
                );
                return Ok(report);
            }

            if iterations >= limits.max_iterations {
                warn!(iterations, remaining, "drain iteration bound reached");
                return Err(FlowError::DrainExhausted {
                    target: items.label(),
                    iterations,
                    remaining,
                });
            }
            iterations += 1;

            let before = remaining;
            let progressed = match remove_one(iterations).await {
                Ok(()) => {
                    let resolver = self.resolver();
                    let settled = settle
                        .until_value(
                            move || async move { resolver.count(items).await },
                            |count| matches!(count, Ok(n) if *n < before),
                        )
                        .await;
                    debug!(
                        iteration = iterations,
                        polls = settled.polls(),
                        elapsed_ms = settled.elapsed().as_millis() as u64,
                        "removal settle poll finished"
                    );
                    match settled {
                        PollResult::Satisfied {
                            value: Ok(count), ..
                        } => {
                            remaining = count;
                            true
                        }
                        PollResult::TimedOut {
                            last: Some(Ok(count)),
                            ..
                        } => {
                            remaining = count;
                            false
                        }
                        _ => false,
                    }
                }
                Err(err) => {
                    warn!(iteration = iterations, error = %err, "removal failed");
                    remaining = self.count(items).await?;
                    remaining < before
                }
            };

            if progressed {
                stalls = 0;
            } else {
                stalls += 1;
                total_stalls += 1;
                warn!(
                    iteration = iterations,
                    stalls,
                    max_stalls = limits.max_stalls,
                    remaining,
                    "removal did not lower the count"
                );
                if stalls > limits.max_stalls {
                    return Err(FlowError::DrainStalled {
                        target: items.label(),
                        stalls,
                        remaining,
                    });
                }
            }
        }
    }
}
