//! Retrying actuation with an escalation ladder
//!
//! Attempt `n` (1-based) uses ladder rung `min((n - 1) / escalate_after,
//! ladder.len() - 1)`. When the action does not support that rung's method
//! the closest lower supported rung is used instead. Attempts are separated
//! by a fixed delay and each one is bounded by its own sub-timeout.

use std::sync::Arc;
use std::time::Duration;

use action_locator::FallbackResolver;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};
use twizz_core_types::{
    Action, ActionValue, ActuationMethod, BrowserPort, ElementLocator, InteractionTarget,
    ProviderError, ProviderErrorKind,
};

use crate::errors::ActionError;

const MIN_TIMING: Duration = Duration::from_millis(1);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    ladder: Vec<ActuationMethod>,
    escalate_after: u32,
    attempt_timeout: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Duration::from_millis(200),
            ladder: ActuationMethod::ladder(),
            escalate_after: 2,
            attempt_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// An empty ladder falls back to the default one.
    pub fn with_ladder(mut self, ladder: Vec<ActuationMethod>) -> Self {
        self.ladder = if ladder.is_empty() {
            ActuationMethod::ladder()
        } else {
            ladder
        };
        self
    }

    pub fn with_escalate_after(mut self, failures: u32) -> Self {
        self.escalate_after = failures.max(1);
        self
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout.max(MIN_TIMING);
        self
    }

    /// Never escalate past the standard method.
    pub fn standard_only(self) -> Self {
        self.with_ladder(vec![ActuationMethod::Standard])
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    pub fn ladder(&self) -> &[ActuationMethod] {
        &self.ladder
    }

    /// Method used for 1-based attempt `attempt` of `action`.
    pub fn method_for(&self, attempt: u32, action: &Action) -> ActuationMethod {
        let rung = ((attempt.saturating_sub(1) / self.escalate_after) as usize)
            .min(self.ladder.len().saturating_sub(1));
        self.ladder[..=rung]
            .iter()
            .rev()
            .copied()
            .find(|method| action.supports(*method))
            .unwrap_or(ActuationMethod::Standard)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// One failed attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub attempt: u32,
    pub method: ActuationMethod,
    pub error: ProviderError,
}

pub fn render_failures(failures: &[AttemptFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("#{} {}: {}", f.attempt, f.method, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Successful actuation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionSuccess {
    pub attempts: u32,
    pub method: ActuationMethod,
    pub value: ActionValue,
    pub elapsed: Duration,

    /// Failures of the attempts before the successful one
    pub failures: Vec<AttemptFailure>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded(ActionSuccess),
    Failed {
        /// One record per attempt
        attempts: Vec<AttemptFailure>,
        elapsed: Duration,
    },
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Succeeded(_))
    }

    pub fn attempts(&self) -> u32 {
        match self {
            ActionOutcome::Succeeded(success) => success.attempts,
            ActionOutcome::Failed { attempts, .. } => attempts.len() as u32,
        }
    }

    pub fn into_result(
        self,
        target: impl Into<String>,
        action: &Action,
    ) -> Result<ActionSuccess, ActionError> {
        match self {
            ActionOutcome::Succeeded(success) => Ok(success),
            ActionOutcome::Failed { attempts, elapsed } => Err(ActionError::ActuationFailed {
                target: target.into(),
                action: action.to_string(),
                failures: attempts,
                elapsed,
            }),
        }
    }
}

/// Performs actions through a [`BrowserPort`] under a [`RetryPolicy`].
#[derive(Clone)]
pub struct RetryingActuator {
    port: Arc<dyn BrowserPort>,
    policy: RetryPolicy,
}

impl RetryingActuator {
    pub fn new(port: Arc<dyn BrowserPort>, policy: RetryPolicy) -> Self {
        Self { port, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self {
            port: self.port.clone(),
            policy,
        }
    }

    /// Run every attempt against a fixed locator.
    pub async fn attempt(&self, locator: &ElementLocator, action: &Action) -> ActionOutcome {
        let label = locator.to_string();
        self.run(&label, action, |_| {
            let locator = locator.clone();
            async move { Ok(locator) }
        })
        .await
    }

    /// Like [`attempt`](Self::attempt) but converts exhaustion into
    /// [`ActionError::ActuationFailed`].
    pub async fn perform(
        &self,
        locator: &ElementLocator,
        action: &Action,
    ) -> Result<ActionSuccess, ActionError> {
        self.attempt(locator, action)
            .await
            .into_result(locator.to_string(), action)
    }

    /// Re-resolve `target` before every attempt, so a re-rendered element
    /// is picked up by the next try. A failed resolution counts as a failed
    /// attempt.
    pub async fn attempt_target(
        &self,
        resolver: &FallbackResolver,
        target: &InteractionTarget,
        action: &Action,
    ) -> ActionOutcome {
        let label = target.label();
        self.run(&label, action, move |attempt| async move {
            resolver
                .resolve(target)
                .await
                .map(|resolution| {
                    debug!(attempt, strategy_index = resolution.strategy_index, "re-resolved target");
                    resolution.locator
                })
                .map_err(|err| ProviderError::target_not_found(err.to_string()))
        })
        .await
    }

    pub async fn perform_target(
        &self,
        resolver: &FallbackResolver,
        target: &InteractionTarget,
        action: &Action,
    ) -> Result<ActionSuccess, ActionError> {
        self.attempt_target(resolver, target, action)
            .await
            .into_result(target.label(), action)
    }

    async fn run<L, Fut>(&self, label: &str, action: &Action, mut locate: L) -> ActionOutcome
    where
        L: FnMut(u32) -> Fut,
        Fut: std::future::Future<Output = Result<ElementLocator, ProviderError>>,
    {
        let started = Instant::now();
        let mut failures = Vec::new();

        for attempt in 1..=self.policy.max_attempts {
            let method = self.policy.method_for(attempt, action);
            let result = match locate(attempt).await {
                Ok(locator) => self.actuate_once(&locator, action, method).await,
                Err(err) => Err(err),
            };

            match result {
                Ok(value) => {
                    let elapsed = started.elapsed();
                    info!(
                        target = %label,
                        action = %action,
                        attempt,
                        method = %method,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "actuation succeeded"
                    );
                    return ActionOutcome::Succeeded(ActionSuccess {
                        attempts: attempt,
                        method,
                        value,
                        elapsed,
                        failures,
                    });
                }
                Err(error) => {
                    warn!(
                        target = %label,
                        action = %action,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        method = %method,
                        error = %error,
                        "actuation attempt failed"
                    );
                    failures.push(AttemptFailure {
                        attempt,
                        method,
                        error,
                    });
                }
            }

            if attempt < self.policy.max_attempts {
                sleep(self.policy.delay).await;
            }
        }

        ActionOutcome::Failed {
            attempts: failures,
            elapsed: started.elapsed(),
        }
    }

    async fn actuate_once(
        &self,
        locator: &ElementLocator,
        action: &Action,
        method: ActuationMethod,
    ) -> Result<ActionValue, ProviderError> {
        match timeout(
            self.policy.attempt_timeout,
            self.port.actuate(locator, action, method),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::new(ProviderErrorKind::Timeout).with_hint(format!(
                "attempt exceeded {}ms",
                self.policy.attempt_timeout.as_millis()
            ))),
        }
    }
}
