//! Step records emitted by the interaction pipeline

use std::time::Duration;

use action_primitives::{ActionSuccess, WaitReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use twizz_core_types::{ActionId, ActuationMethod};

use crate::errors::FlowError;

/// Error summary carried by a failed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    pub kind: String,
    pub message: String,
}

impl From<&FlowError> for StepError {
    fn from(err: &FlowError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// One completed Interactor operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub action_id: ActionId,

    /// Operation name, e.g. `click` or `wait_for_url`
    pub step: String,

    /// Target label, absent for page-level steps
    pub target: Option<String>,
    pub started_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub ok: bool,

    /// Strategy that located the element
    pub strategy_index: Option<usize>,

    /// Actuation attempts, for steps that actuate
    pub attempts: Option<u32>,
    pub method: Option<ActuationMethod>,
    pub error: Option<StepError>,
}

impl StepRecord {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Open step; finished into a [`StepRecord`].
#[derive(Debug)]
pub(crate) struct StepScope {
    action_id: ActionId,
    step: &'static str,
    target: Option<String>,
    started_at: DateTime<Utc>,
    clock: Instant,
    strategy_index: Option<usize>,
    attempts: Option<u32>,
    method: Option<ActuationMethod>,
}

impl StepScope {
    pub(crate) fn begin(step: &'static str, target: Option<String>) -> Self {
        Self {
            action_id: ActionId::new(),
            step,
            target,
            started_at: Utc::now(),
            clock: Instant::now(),
            strategy_index: None,
            attempts: None,
            method: None,
        }
    }

    pub(crate) fn action_id(&self) -> &ActionId {
        &self.action_id
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    pub(crate) fn note_wait(&mut self, report: &WaitReport) {
        if let Some(index) = report.strategy_index() {
            self.strategy_index = Some(index);
        }
    }

    pub(crate) fn note_strategy(&mut self, strategy_index: usize) {
        self.strategy_index = Some(strategy_index);
    }

    pub(crate) fn note_actuation(&mut self, success: &ActionSuccess) {
        self.attempts = Some(success.attempts);
        self.method = Some(success.method);
    }

    pub(crate) fn finish(self, error: Option<&FlowError>) -> StepRecord {
        let attempts = match error.and_then(FlowError::as_action) {
            Some(action_primitives::ActionError::ActuationFailed { failures, .. }) => {
                Some(failures.len() as u32)
            }
            _ => self.attempts,
        };
        StepRecord {
            latency_ms: self.clock.elapsed().as_millis() as u64,
            action_id: self.action_id,
            step: self.step.to_string(),
            target: self.target,
            started_at: self.started_at,
            ok: error.is_none(),
            strategy_index: self.strategy_index,
            attempts,
            method: self.method,
            error: error.map(StepError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_with_snake_case_method() {
        let mut scope = StepScope::begin("click", Some("role=button[name=\"Save\"]".into()));
        scope.note_strategy(1);
        scope.attempts = Some(3);
        scope.method = Some(ActuationMethod::Force);
        let record = scope.finish(None);

        let json = record.to_json();
        assert_eq!(json["step"], "click");
        assert_eq!(json["ok"], true);
        assert_eq!(json["strategy_index"], 1);
        assert_eq!(json["method"], "force");
        assert!(json["error"].is_null());
    }

    #[test]
    fn failed_record_carries_error_kind() {
        let scope = StepScope::begin("with_profile", None);
        let record = scope.finish(Some(&FlowError::UnknownProfile("glacial".into())));
        assert!(!record.ok);
        let error = record.error.expect("error");
        assert_eq!(error.kind, "unknown_profile");
        assert!(error.message.contains("glacial"));
    }
}
