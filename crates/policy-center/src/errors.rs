use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid policy: {0}")]
    Invalid(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("unsupported policy path: {0}")]
    UnsupportedPath(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl From<action_primitives::ActionError> for PolicyError {
    fn from(value: action_primitives::ActionError) -> Self {
        PolicyError::Invalid(value.to_string())
    }
}
