//! Error types for govbridge

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovError {
    /// Arguments do not match the contract's ABI schema.
    #[error("pack error in {method}: {reason}")]
    Pack { method: String, reason: String },
    /// The synthetic call reverted or failed inside the execution engine.
    #[error("execution error in {method}: {reason}")]
    Execution { method: String, reason: String },
    /// The returned tuple does not have the expected shape.
    #[error("unpack error in {method}: {reason}")]
    Unpack { method: String, reason: String },
    #[error("account error: {0}")]
    Account(String),
    #[error("invalid proposal id: {0}")]
    Identifier(String),
    #[error("signing error: {0}")]
    Signing(String),
    #[error("submission error: {0}")]
    Submission(String),
    #[error("invalid transaction arguments: {0}")]
    InvalidArgs(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("abi schema error: {0}")]
    Schema(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl GovError {
    pub fn pack(method: &str, reason: impl ToString) -> Self {
        GovError::Pack {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn execution(method: &str, reason: impl ToString) -> Self {
        GovError::Execution {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn unpack(method: &str, reason: impl ToString) -> Self {
        GovError::Unpack {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for failures raised by the execution engine. Consensus callers
    /// use this to decide whether the failure is fatal for the block.
    pub fn is_execution(&self) -> bool {
        matches!(self, GovError::Execution { .. })
    }

    /// Contract method the error originated from, if any.
    pub fn method(&self) -> Option<&str> {
        match self {
            GovError::Pack { method, .. }
            | GovError::Execution { method, .. }
            | GovError::Unpack { method, .. } => Some(method),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GovError {
    fn from(err: std::io::Error) -> Self {
        GovError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for GovError {
    fn from(err: toml::de::Error) -> Self {
        GovError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, GovError>;
