//! Core types for the resolver

use std::fmt;

use serde::{Deserialize, Serialize};
use twizz_core_types::{ElementIndex, ElementLocator, ElementSnapshot, ProviderError, SelectorStrategy};

/// What happened when one strategy of a target was probed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StrategyOutcome {
    /// The strategy matched nothing
    NoMatch,

    /// The strategy matched, but not at the preferred index
    IndexOutOfRange { matches: usize, index: ElementIndex },

    /// The chosen element exists but is not visible
    Hidden { matches: usize },

    /// The chosen element was visible; resolution stopped here
    Visible { matches: usize },

    /// The provider failed to evaluate the strategy
    ProviderError { error: ProviderError },
}

impl StrategyOutcome {
    /// Whether the strategy located an attached element.
    pub fn is_match(&self) -> bool {
        matches!(
            self,
            StrategyOutcome::Hidden { .. } | StrategyOutcome::Visible { .. }
        )
    }
}

impl fmt::Display for StrategyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyOutcome::NoMatch => f.write_str("no match"),
            StrategyOutcome::IndexOutOfRange { matches, index } => {
                write!(f, "{} matches, {} out of range", matches, index)
            }
            StrategyOutcome::Hidden { matches } => write!(f, "{} matches, hidden", matches),
            StrategyOutcome::Visible { matches } => write!(f, "{} matches, visible", matches),
            StrategyOutcome::ProviderError { error } => write!(f, "provider error: {}", error),
        }
    }
}

/// One probed strategy with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy_index: usize,
    pub strategy: SelectorStrategy,
    pub outcome: StrategyOutcome,
}

impl fmt::Display for StrategyAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}: {}", self.strategy_index, self.strategy, self.outcome)
    }
}

/// Render attempts as a single diagnostic line.
pub fn render_attempts(attempts: &[StrategyAttempt]) -> String {
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Successful resolution of an interaction target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Lazy handle to the chosen element
    pub locator: ElementLocator,

    /// Position of the winning strategy in the target's list
    pub strategy_index: usize,

    /// State of the chosen element at resolution time
    pub snapshot: ElementSnapshot,

    /// Total matches of the winning strategy
    pub matches: usize,

    /// Every strategy probed before resolution stopped
    pub attempts: Vec<StrategyAttempt>,
}

impl Resolution {
    pub fn visible(&self) -> bool {
        self.snapshot.visible
    }

    pub fn enabled(&self) -> bool {
        self.snapshot.enabled
    }
}
