//! Waiting, retrying and polling primitives.
//!
//! - [`VisibilityWaiter`]: deadline-bounded waits on element state
//! - [`RetryingActuator`]: retries with a fixed delay and an escalation ladder
//! - [`PollingAssertion`]: "eventually" conditions as a bounded poll
//!
//! All timings come from an injected [`InteractionConfig`].

pub mod actuator;
pub mod config;
pub mod errors;
pub mod polling;
pub mod waiting;

pub use actuator::{
    render_failures, ActionOutcome, ActionSuccess, AttemptFailure, RetryPolicy, RetryingActuator,
};
pub use config::{
    default_profiles, DrainConfig, InteractionConfig, PollConfig, RetryConfig, WaitConfig,
    WaitProfile,
};
pub use errors::ActionError;
pub use polling::{PollResult, PollingAssertion};
pub use waiting::{Observation, VisibilityWaiter, WaitReport, WaitSpec};
