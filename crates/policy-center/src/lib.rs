//! Interaction configuration loading.
//!
//! Built-in defaults are overlaid by an optional YAML file and then by
//! `TWIZZ_UI__SECTION__FIELD` variables or a `TWIZZ_UI_OVERRIDE_JSON`
//! document. The snapshot records which layer set every value.

pub mod defaults;
pub mod errors;
pub mod loader;
pub mod model;

pub use defaults::default_snapshot;
pub use errors::PolicyError;
pub use loader::{
    apply_override_to_snapshot, load_config, load_snapshot, load_snapshot_with_options,
    LoadOptions,
};
pub use model::{PolicyProvenance, PolicySnapshot, PolicySource};
