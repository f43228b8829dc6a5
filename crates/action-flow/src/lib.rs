//! Interaction pipeline for page objects.
//!
//! [`Interactor`] composes resolution, waiting and retrying actuation into
//! the operations page objects call, records one [`StepRecord`] per
//! operation, and hosts multi-step flows such as
//! [`Interactor::drain_until_empty`].

pub mod errors;
pub mod events;
pub mod flows;
pub mod interactor;
pub mod types;

pub use errors::FlowError;
pub use events::{InteractionEvents, NullEvents, RecordingEvents, TracingEvents};
pub use flows::{DrainLimits, DrainReport, DrainStop};
pub use interactor::Interactor;
pub use types::{StepError, StepRecord};
