//! Action descriptors and actuation methods

use std::fmt;
use std::path::PathBuf;

/// Increasingly forceful ways of performing an action.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActuationMethod {
    /// Real input after actionability checks (visible, enabled, not covered)
    Standard,

    /// Real input without actionability checks
    Force,

    /// In-page script dispatch (`element.click()`, value setter + events)
    Script,
}

impl ActuationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ActuationMethod::Standard => "standard",
            ActuationMethod::Force => "force",
            ActuationMethod::Script => "script",
        }
    }

    /// Default escalation ladder.
    pub fn ladder() -> Vec<ActuationMethod> {
        vec![
            ActuationMethod::Standard,
            ActuationMethod::Force,
            ActuationMethod::Script,
        ]
    }
}

impl fmt::Display for ActuationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One logical operation against an element.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Click,
    Fill(String),
    SetFiles(Vec<PathBuf>),
    ReadAttribute(String),
}

/// Payload-free discriminant of [`Action`].
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Click,
    Fill,
    SetFiles,
    ReadAttribute,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Click => ActionKind::Click,
            Action::Fill(_) => ActionKind::Fill,
            Action::SetFiles(_) => ActionKind::SetFiles,
            Action::ReadAttribute(_) => ActionKind::ReadAttribute,
        }
    }

    /// Whether a provider can perform this action with `method`.
    pub fn supports(&self, method: ActuationMethod) -> bool {
        match self.kind() {
            ActionKind::Click | ActionKind::Fill => true,
            ActionKind::SetFiles => method != ActuationMethod::Script,
            ActionKind::ReadAttribute => method == ActuationMethod::Standard,
        }
    }
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Fill => "fill",
            ActionKind::SetFiles => "set_files",
            ActionKind::ReadAttribute => "read_attribute",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Click => f.write_str("click"),
            // Filled text may be a credential; only its length is logged.
            Action::Fill(text) => write!(f, "fill({} chars)", text.chars().count()),
            Action::SetFiles(paths) => write!(f, "set_files({} files)", paths.len()),
            Action::ReadAttribute(name) => write!(f, "read_attribute({})", name),
        }
    }
}

/// Value produced by a successful actuation.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ActionValue {
    #[default]
    None,
    Attribute(Option<String>),
}

impl ActionValue {
    pub fn into_attribute(self) -> Option<String> {
        match self {
            ActionValue::Attribute(value) => value,
            ActionValue::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_support_matrix() {
        assert!(Action::Click.supports(ActuationMethod::Script));
        assert!(Action::Fill("x".into()).supports(ActuationMethod::Force));
        assert!(!Action::SetFiles(vec![]).supports(ActuationMethod::Script));
        assert!(Action::SetFiles(vec![]).supports(ActuationMethod::Force));
        assert!(!Action::ReadAttribute("href".into()).supports(ActuationMethod::Force));
    }

    #[test]
    fn fill_display_hides_payload() {
        let action = Action::Fill("hunter2".into());
        assert_eq!(action.to_string(), "fill(7 chars)");
    }
}
