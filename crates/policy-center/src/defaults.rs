use action_primitives::InteractionConfig;

use crate::model::PolicySnapshot;

/// Built-in snapshot: 10 s waits polled every 100 ms, three attempts 200 ms
/// apart escalating every two failures, and the quick/standard/slow/upload
/// call-site profiles.
pub fn default_snapshot() -> PolicySnapshot {
    PolicySnapshot {
        rev: 1,
        interaction: InteractionConfig::default(),
        provenance: Default::default(),
    }
}
