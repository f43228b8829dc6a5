use std::collections::BTreeMap;

use action_primitives::InteractionConfig;
use serde::{Deserialize, Serialize};

/// Loaded interaction configuration plus where each value came from.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PolicySnapshot {
    pub rev: u64,
    pub interaction: InteractionConfig,
    pub provenance: BTreeMap<String, PolicyProvenance>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyProvenance {
    pub path: String,
    pub source: PolicySource,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicySource {
    Builtin,
    File,
    Env,
}

impl PolicySnapshot {
    pub fn set_provenance(&mut self, path: &str, source: PolicySource) {
        self.provenance.insert(
            path.to_string(),
            PolicyProvenance {
                path: path.to_string(),
                source,
            },
        );
    }

    pub fn source_of(&self, path: &str) -> Option<PolicySource> {
        self.provenance.get(path).map(|p| p.source)
    }

    /// Names of the configured wait profiles.
    pub fn profile_names(&self) -> Vec<&str> {
        self.interaction.profiles.keys().map(String::as_str).collect()
    }
}
