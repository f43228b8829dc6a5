//! Error types for the resolver

use thiserror::Error;
use twizz_core_types::{ProviderError, ProviderErrorKind};

use crate::types::{render_attempts, StrategyAttempt};

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// No strategy located an attached element
    #[error("element not found: {target}; tried {}", render_attempts(.attempts))]
    ElementNotFound {
        target: String,
        attempts: Vec<StrategyAttempt>,
    },

    /// Provider failure outside of per-strategy probing
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl LocatorError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            LocatorError::ElementNotFound { .. } => true,
            LocatorError::Provider(err) => matches!(
                err.kind,
                ProviderErrorKind::Io | ProviderErrorKind::Timeout | ProviderErrorKind::TargetNotFound
            ),
        }
    }

    /// Strategies attempted, empty for provider failures.
    pub fn attempts(&self) -> &[StrategyAttempt] {
        match self {
            LocatorError::ElementNotFound { attempts, .. } => attempts,
            LocatorError::Provider(_) => &[],
        }
    }
}
