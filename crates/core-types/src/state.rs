use std::fmt;

/// State a waiter can require of a target.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetState {
    Visible,
    Attached,
    Detached,
    Enabled,
}

impl TargetState {
    pub fn name(&self) -> &'static str {
        match self {
            TargetState::Visible => "visible",
            TargetState::Attached => "attached",
            TargetState::Detached => "detached",
            TargetState::Enabled => "enabled",
        }
    }

    /// Whether an attached element in `snapshot` satisfies this state.
    pub fn accepts(&self, snapshot: &ElementSnapshot) -> bool {
        match self {
            TargetState::Visible => snapshot.visible,
            TargetState::Attached => true,
            TargetState::Detached => false,
            TargetState::Enabled => snapshot.enabled,
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Point-in-time view of an attached element.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ElementSnapshot {
    pub visible: bool,
    pub enabled: bool,
}

impl ElementSnapshot {
    pub fn new(visible: bool, enabled: bool) -> Self {
        Self { visible, enabled }
    }
}

impl fmt::Display for ElementSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}",
            if self.visible { "visible" } else { "hidden" },
            if self.enabled { "enabled" } else { "disabled" }
        )
    }
}
