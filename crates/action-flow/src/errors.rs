//! Flow-level error types

use action_locator::LocatorError;
use action_primitives::ActionError;
use thiserror::Error;
use twizz_core_types::ProviderError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlowError {
    /// Failure raised by a waiting, retrying or polling primitive
    #[error(transparent)]
    Action(#[from] ActionError),

    /// `with_profile` was given a name the configuration does not define
    #[error("unknown wait profile: {0}")]
    UnknownProfile(String),

    /// A drain removal did not lower the item count often enough
    #[error("draining {target} stalled {stalls} times with {remaining} items left")]
    DrainStalled {
        target: String,
        stalls: u32,
        remaining: usize,
    },

    /// A drain hit its iteration bound before the list emptied
    #[error("draining {target} stopped after {iterations} iterations with {remaining} items left")]
    DrainExhausted {
        target: String,
        iterations: u32,
        remaining: usize,
    },

    /// No target in a best-effort chain could be actuated
    #[error("none of the candidates was actionable: {}", .tried.join(", "))]
    NoneAvailable { tried: Vec<String> },
}

impl FlowError {
    /// Short category name for step records.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::Action(err) => err.kind(),
            FlowError::UnknownProfile(_) => "unknown_profile",
            FlowError::DrainStalled { .. } => "drain_stalled",
            FlowError::DrainExhausted { .. } => "drain_exhausted",
            FlowError::NoneAvailable { .. } => "none_available",
        }
    }

    pub fn as_action(&self) -> Option<&ActionError> {
        match self {
            FlowError::Action(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LocatorError> for FlowError {
    fn from(err: LocatorError) -> Self {
        FlowError::Action(err.into())
    }
}

impl From<ProviderError> for FlowError {
    fn from(err: ProviderError) -> Self {
        FlowError::Action(err.into())
    }
}
