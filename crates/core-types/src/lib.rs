//! Shared primitives for the Twizz UI interaction layer.
//!
//! Everything in here is a plain value: selector strategies, interaction
//! targets, lazy element locators, action descriptors and the
//! [`BrowserPort`] trait that browser providers implement.

use std::fmt;

use uuid::Uuid;

pub mod action;
pub mod errors;
pub mod port;
pub mod selector;
pub mod state;

pub use action::{Action, ActionKind, ActionValue, ActuationMethod};
pub use errors::{ProviderError, ProviderErrorKind, TargetError};
pub use port::BrowserPort;
pub use selector::{
    matches_text, normalize_whitespace, ElementIndex, ElementLocator, InteractionTarget,
    SelectorStrategy,
};
pub use state::{ElementSnapshot, TargetState};

/// Correlation id attached to one logical interaction (resolve, wait, act).
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
