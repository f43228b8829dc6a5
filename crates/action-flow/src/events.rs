//! Observers for completed steps

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::types::StepRecord;

#[async_trait]
pub trait InteractionEvents: Send + Sync {
    async fn on_step(&self, record: &StepRecord);
}

/// Discards every record.
#[derive(Clone, Debug, Default)]
pub struct NullEvents;

#[async_trait]
impl InteractionEvents for NullEvents {
    async fn on_step(&self, _record: &StepRecord) {}
}

/// Logs each record as a structured event.
#[derive(Clone, Debug, Default)]
pub struct TracingEvents;

#[async_trait]
impl InteractionEvents for TracingEvents {
    async fn on_step(&self, record: &StepRecord) {
        let target = record.target.as_deref().unwrap_or("-");
        match &record.error {
            None => info!(
                action_id = %record.action_id,
                step = %record.step,
                target,
                latency_ms = record.latency_ms,
                strategy_index = ?record.strategy_index,
                attempts = ?record.attempts,
                method = ?record.method,
                "step completed"
            ),
            Some(error) => warn!(
                action_id = %record.action_id,
                step = %record.step,
                target,
                latency_ms = record.latency_ms,
                kind = %error.kind,
                error = %error.message,
                "step failed"
            ),
        }
    }
}

/// Keeps records in memory for report attachments and assertions.
#[derive(Clone, Debug, Default)]
pub struct RecordingEvents {
    records: Arc<Mutex<Vec<StepRecord>>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<StepRecord> {
        self.records.lock().clone()
    }

    pub fn steps(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.step.clone()).collect()
    }

    pub fn failures(&self) -> Vec<StepRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| !r.ok)
            .cloned()
            .collect()
    }

    /// All records as a JSON array.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.records.lock().iter().map(StepRecord::to_json).collect())
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

#[async_trait]
impl InteractionEvents for RecordingEvents {
    async fn on_step(&self, record: &StepRecord) {
        self.records.lock().push(record.clone());
    }
}
