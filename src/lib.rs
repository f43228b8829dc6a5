//! Twizz UI interaction layer.
//!
//! Resilient element interaction for browser-driven acceptance tests:
//! fallback selector chains, deadline-bounded waits, retrying actuation with
//! an escalation ladder and bounded polling, all timed by one injected
//! [`InteractionConfig`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use twizz_ui::prelude::*;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let loaded = twizz_ui::config::load_config(None)?;
//! let page = Arc::new(InMemoryPage::new());
//! let ui = twizz_ui::config::interactor(page, &loaded);
//! let save = InteractionTarget::new(SelectorStrategy::role("button", "Save"))
//!     .or(SelectorStrategy::text("Save"));
//! ui.click(&save).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod telemetry;

pub use action_flow as flow;
pub use action_locator as locator;
pub use action_primitives as primitives;
pub use cdp_adapter as adapter;
pub use twizz_core_types as types;
pub use twizz_policy_center as policy;

pub use action_flow::{
    DrainLimits, DrainReport, DrainStop, FlowError, InteractionEvents, Interactor, NullEvents,
    RecordingEvents, StepRecord, TracingEvents,
};
pub use action_primitives::{ActionError, InteractionConfig, PollResult, WaitSpec};

pub mod prelude {
    pub use action_flow::{DrainLimits, FlowError, Interactor, RecordingEvents};
    pub use action_primitives::{ActionError, InteractionConfig, WaitSpec};
    pub use cdp_adapter::{FakeElement, InMemoryPage};
    pub use twizz_core_types::{
        Action, BrowserPort, InteractionTarget, SelectorStrategy, TargetState,
    };
}
