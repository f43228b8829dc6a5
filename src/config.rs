//! Interaction configuration bootstrap

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use action_flow::{Interactor, TracingEvents};
use action_primitives::InteractionConfig;
use anyhow::{Context, Result};
use tracing::info;
use twizz_core_types::BrowserPort;
use twizz_policy_center::{load_snapshot, PolicySnapshot, PolicySource};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "TWIZZ_UI_CONFIG";

const LOCAL_CONFIG: &str = "config/interaction.yaml";

pub struct LoadedConfig {
    pub snapshot: PolicySnapshot,

    /// File that was read, if any
    pub path: Option<PathBuf>,
}

impl LoadedConfig {
    pub fn interaction(&self) -> &InteractionConfig {
        &self.snapshot.interaction
    }

    /// Dotted paths set by the file or the environment.
    pub fn overridden(&self) -> Vec<(&str, PolicySource)> {
        self.snapshot
            .provenance
            .iter()
            .filter(|(_, p)| p.source != PolicySource::Builtin)
            .map(|(path, p)| (path.as_str(), p.source))
            .collect()
    }
}

/// Load the interaction configuration.
///
/// Priority for the file: `config_path` > `$TWIZZ_UI_CONFIG` >
/// `./config/interaction.yaml`. A missing default file means built-in
/// values; a missing explicit file is an error.
pub fn load_config(config_path: Option<&Path>) -> Result<LoadedConfig> {
    let explicit = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from),
    };

    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("configuration file {} does not exist", path.display());
            }
            Some(path)
        }
        None => {
            let local = PathBuf::from(LOCAL_CONFIG);
            local.exists().then_some(local)
        }
    };

    let snapshot = load_snapshot(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("Failed to load interaction config from {}", path.display()),
        None => "Failed to load interaction config".to_string(),
    })?;

    let loaded = LoadedConfig { snapshot, path };
    info!(
        path = ?loaded.path,
        rev = loaded.snapshot.rev,
        overrides = loaded.overridden().len(),
        "interaction config loaded"
    );
    Ok(loaded)
}

/// Interactor over `port` with the loaded timing and tracing step events.
pub fn interactor(port: Arc<dyn BrowserPort>, loaded: &LoadedConfig) -> Interactor {
    Interactor::new(port, loaded.interaction().clone()).with_events(Arc::new(TracingEvents))
}
