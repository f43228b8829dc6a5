//! Error types for action primitives

use std::time::Duration;

use action_locator::{render_attempts, LocatorError, StrategyAttempt};
use thiserror::Error;
use twizz_core_types::{ProviderError, ProviderErrorKind, TargetState};

use crate::actuator::{render_failures, AttemptFailure};
use crate::waiting::Observation;

/// Error taxonomy shared by the resolver, waiter, actuator and poller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    /// No strategy of the target matched an attached element
    #[error("element not found: {target}; tried {}", render_attempts(.attempts))]
    ElementNotFound {
        target: String,
        attempts: Vec<StrategyAttempt>,
    },

    /// A wait reached its deadline without the state holding
    #[error(
        "timed out after {}ms waiting for {target} to be {state}; last observation: {last}",
        .elapsed.as_millis()
    )]
    WaitTimeout {
        target: String,
        state: TargetState,
        elapsed: Duration,
        last: Observation,
    },

    /// Every actuation attempt failed
    #[error(
        "{action} on {target} failed after {} attempts: {}",
        .failures.len(),
        render_failures(.failures)
    )]
    ActuationFailed {
        target: String,
        action: String,
        failures: Vec<AttemptFailure>,
        elapsed: Duration,
    },

    /// A polled condition never held and the caller treated that as fatal
    #[error(
        "condition '{description}' not met within {}ms ({polls} polls){}{}",
        .elapsed.as_millis(),
        last_value_suffix(.last_value),
        last_error_suffix(.last_error)
    )]
    PollTimeout {
        description: String,
        elapsed: Duration,
        polls: u32,
        /// Debug rendering of the last value the condition rejected
        last_value: Option<String>,
        last_error: Option<String>,
    },

    /// Provider failure outside of the retry and poll loops
    #[error("provider error: {0}")]
    Provider(ProviderError),

    /// Configuration rejected by validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn last_value_suffix(last_value: &Option<String>) -> String {
    match last_value {
        Some(value) => format!("; last value: {}", value),
        None => String::new(),
    }
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(err) => format!("; last error: {}", err),
        None => String::new(),
    }
}

impl ActionError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ActionError::ElementNotFound { .. } | ActionError::WaitTimeout { .. } => true,
            ActionError::Provider(err) => matches!(
                err.kind,
                ProviderErrorKind::NotActionable | ProviderErrorKind::Io | ProviderErrorKind::Timeout
            ),
            _ => false,
        }
    }

    /// Short category name for step records.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionError::ElementNotFound { .. } => "element_not_found",
            ActionError::WaitTimeout { .. } => "wait_timeout",
            ActionError::ActuationFailed { .. } => "actuation_failed",
            ActionError::PollTimeout { .. } => "poll_timeout",
            ActionError::Provider(_) => "provider",
            ActionError::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl From<LocatorError> for ActionError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::ElementNotFound { target, attempts } => {
                ActionError::ElementNotFound { target, attempts }
            }
            LocatorError::Provider(err) => ActionError::Provider(err),
        }
    }
}

impl From<ProviderError> for ActionError {
    fn from(err: ProviderError) -> Self {
        ActionError::Provider(err)
    }
}
