use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use action_primitives::InteractionConfig;
use serde_json::{Map, Value};
use tracing::debug;

use crate::defaults::default_snapshot;
use crate::errors::PolicyError;
use crate::model::{PolicySnapshot, PolicySource};

const ENV_PREFIX: &str = "TWIZZ_UI__";
const ENV_JSON: &str = "TWIZZ_UI_OVERRIDE_JSON";

#[derive(Debug, Default)]
pub struct LoadOptions {
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
}

impl LoadOptions {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
            include_env: true,
        }
    }
}

/// Defaults, then the optional YAML file, then per-field env vars, then the
/// JSON override document.
pub fn load_snapshot(path: Option<&Path>) -> Result<PolicySnapshot, PolicyError> {
    let mut options = LoadOptions::default();
    if let Some(p) = path {
        options.paths.push(p.to_path_buf());
    }
    options.include_env = true;
    load_snapshot_with_options(&options)
}

pub fn load_snapshot_with_options(options: &LoadOptions) -> Result<PolicySnapshot, PolicyError> {
    let mut snapshot = default_snapshot();
    bootstrap_builtin_provenance(&mut snapshot)?;

    for path in &options.paths {
        if path.exists() {
            let overlay = overlays_from_file(path)?;
            apply_overlays(&mut snapshot, overlay)?;
        } else {
            debug!(path = %path.display(), "policy file not found; skipping");
        }
    }

    if options.include_env {
        apply_overlays(&mut snapshot, overlays_from_env())?;
        apply_overlays(&mut snapshot, overlays_from_env_json()?)?;
    }

    snapshot.interaction.validate()?;
    Ok(snapshot)
}

/// Load and validate just the interaction config.
pub fn load_config(path: Option<&Path>) -> Result<InteractionConfig, PolicyError> {
    Ok(load_snapshot(path)?.interaction)
}

struct PolicyOverlay {
    path: String,
    value: Value,
    source: PolicySource,
}

fn apply_overlays(
    snapshot: &mut PolicySnapshot,
    overlays: Vec<PolicyOverlay>,
) -> Result<(), PolicyError> {
    if overlays.is_empty() {
        return Ok(());
    }
    let mut tree = to_tree(snapshot)?;
    for overlay in &overlays {
        set_path(&mut tree, &overlay.path, overlay.value.clone())?;
    }
    snapshot.interaction = serde_json::from_value(tree)
        .map_err(|err| PolicyError::InvalidValue(format!("{}", err)))?;
    for overlay in &overlays {
        debug!(path = %overlay.path, source = ?overlay.source, "policy value overridden");
        snapshot.set_provenance(&overlay.path, overlay.source);
    }
    snapshot.rev = snapshot.rev.saturating_add(1);
    Ok(())
}

/// Set one dotted path of the interaction config.
///
/// The path must already exist, except below `profiles.` where new profile
/// names may be introduced. Scalars must keep their JSON kind.
pub fn apply_override_to_snapshot(
    snapshot: &mut PolicySnapshot,
    path: &str,
    value: Value,
    source: PolicySource,
) -> Result<(), PolicyError> {
    let mut tree = to_tree(snapshot)?;
    set_path(&mut tree, path, value)?;
    snapshot.interaction = serde_json::from_value(tree)
        .map_err(|err| PolicyError::InvalidValue(format!("{}: {}", path, err)))?;
    snapshot.set_provenance(path, source);
    Ok(())
}

fn to_tree(snapshot: &PolicySnapshot) -> Result<Value, PolicyError> {
    serde_json::to_value(&snapshot.interaction).map_err(|err| PolicyError::Invalid(format!("{}", err)))
}

fn set_path(tree: &mut Value, path: &str, value: Value) -> Result<(), PolicyError> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(PolicyError::UnsupportedPath(path.to_string()));
    }
    let allow_new = segments[0] == "profiles" && segments.len() == 3;

    let slot = lookup_mut(tree, &segments, allow_new)
        .ok_or_else(|| PolicyError::UnsupportedPath(path.to_string()))?;
    if !same_kind(slot, &value) {
        return Err(PolicyError::InvalidValue(format!(
            "{}: expected {}, got {}",
            path,
            kind_name(slot),
            value
        )));
    }
    *slot = value;
    Ok(())
}

fn lookup_mut<'a>(root: &'a mut Value, segments: &[&str], allow_new: bool) -> Option<&'a mut Value> {
    let mut cursor = root;
    for segment in segments {
        let map: &mut Map<String, Value> = cursor.as_object_mut()?;
        if !map.contains_key(*segment) {
            if !allow_new {
                return None;
            }
            map.insert(segment.to_string(), Value::Object(Map::new()));
        }
        cursor = map.get_mut(*segment)?;
    }
    Some(cursor)
}

fn same_kind(existing: &Value, candidate: &Value) -> bool {
    match (existing, candidate) {
        (Value::Object(map), _) if map.is_empty() => true,
        (Value::Null, _) | (_, Value::Null) => true,
        (Value::Number(_), Value::Number(n)) => n.as_u64().is_some(),
        (Value::Bool(_), Value::Bool(_)) => true,
        (Value::String(_), Value::String(_)) => true,
        (Value::Array(_), Value::Array(_)) => true,
        _ => false,
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "non-negative integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn overlays_from_file(path: &Path) -> Result<Vec<PolicyOverlay>, PolicyError> {
    let content = fs::read_to_string(path).map_err(|err| PolicyError::Io(format!("{}", err)))?;
    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
    let json_value =
        serde_json::to_value(yaml_value).map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
    Ok(flatten_value(json_value, None, PolicySource::File))
}

fn overlays_from_env() -> Vec<PolicyOverlay> {
    let mut overlays = Vec::new();
    let mut vars: Vec<(String, String)> = env::vars()
        .filter(|(key, _)| key.starts_with(ENV_PREFIX))
        .collect();
    vars.sort();
    for (key, raw) in vars {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let path = stripped
                .split("__")
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(".");
            if path.is_empty() {
                continue;
            }
            let value = parse_env_value(&raw);
            overlays.push(PolicyOverlay {
                path,
                value,
                source: PolicySource::Env,
            });
        }
    }
    overlays
}

/// The `TWIZZ_UI_OVERRIDE_JSON` document, applied after the per-field vars.
fn overlays_from_env_json() -> Result<Vec<PolicyOverlay>, PolicyError> {
    match env::var(ENV_JSON) {
        Ok(raw_json) if !raw_json.trim().is_empty() => {
            let json_value: Value = serde_json::from_str(&raw_json)
                .map_err(|err| PolicyError::Invalid(format!("{}: {}", ENV_JSON, err)))?;
            Ok(flatten_value(json_value, None, PolicySource::Env))
        }
        _ => Ok(Vec::new()),
    }
}

fn parse_env_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return parsed;
    }
    if let Ok(boolean) = raw.parse::<bool>() {
        return Value::Bool(boolean);
    }
    if let Ok(int_val) = raw.parse::<i64>() {
        return Value::Number(int_val.into());
    }
    Value::String(raw.to_string())
}

fn flatten_value(value: Value, prefix: Option<String>, source: PolicySource) -> Vec<PolicyOverlay> {
    match value {
        Value::Object(map) => {
            let mut result = Vec::new();
            for (key, value) in map {
                let key_segment = key.trim().to_ascii_lowercase();
                let next_prefix = match &prefix {
                    Some(prefix) if !prefix.is_empty() => format!("{}.{}", prefix, key_segment),
                    _ => key_segment,
                };
                result.extend(flatten_value(value, Some(next_prefix), source));
            }
            result
        }
        other => match prefix {
            Some(prefix) => vec![PolicyOverlay {
                path: prefix,
                value: other,
                source,
            }],
            None => Vec::new(),
        },
    }
}

fn bootstrap_builtin_provenance(snapshot: &mut PolicySnapshot) -> Result<(), PolicyError> {
    let tree = to_tree(snapshot)?;
    for overlay in flatten_value(tree, None, PolicySource::Builtin) {
        snapshot.set_provenance(&overlay.path, overlay.source);
    }
    Ok(())
}
