//! Multi-strategy element resolution with ordered fallback.
//!
//! An [`InteractionTarget`](twizz_core_types::InteractionTarget) lists
//! strategies for one logical element; [`FallbackResolver`] scans them once
//! per call and reports every strategy it tried when nothing matches.

pub mod errors;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::LocatorError;
pub use resolver::FallbackResolver;
pub use strategies::{probe, Probe};
pub use types::{render_attempts, Resolution, StrategyAttempt, StrategyOutcome};
