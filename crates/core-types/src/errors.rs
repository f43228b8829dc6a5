use std::fmt;

use thiserror::Error;

/// Error categories a browser provider reports.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ProviderErrorKind {
    #[error("target element not found")]
    TargetNotFound,
    #[error("element not actionable")]
    NotActionable,
    #[error("invalid selector")]
    InvalidSelector,
    #[error("unsupported operation")]
    Unsupported,
    #[error("navigation failed")]
    Navigation,
    #[error("operation timed out")]
    Timeout,
    #[error("browser i/o failure")]
    Io,
    #[error("internal error")]
    Internal,
}

/// Error returned by [`crate::BrowserPort`] implementations.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub hint: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind) -> Self {
        Self { kind, hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn not_actionable(hint: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::NotActionable).with_hint(hint)
    }

    pub fn target_not_found(hint: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::TargetNotFound).with_hint(hint)
    }

    pub fn io(hint: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Io).with_hint(hint)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {}

/// Invalid interaction target construction.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("interaction target needs at least one selector strategy")]
    Empty,
}
