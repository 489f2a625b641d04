//! Error taxonomy shared by the resource services.
//!
//! Realization has two failure tiers: a terminal [`RealizeError::State`]
//! means NSX reported a real failure and retrying the same intent will not
//! help, while [`RealizeError::RetryExhausted`] means the poll budget ran
//! out and the caller should requeue at its own pace.

use thiserror::Error;

use crate::client::ClientError;
use crate::store::StoreError;
use nsx_types::PathError;

/// Result type alias for service operations.
pub type NsxResult<T> = Result<T, NsxError>;

/// Outcome of a realization poll that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealizeError {
    /// NSX reported the intent as failed.
    #[error("{path} realized with errors: [{}]", .messages.join(" "))]
    State { path: String, messages: Vec<String> },

    /// The step budget ran out before a verdict.
    #[error("realization retry exhausted")]
    RetryExhausted,
}

impl RealizeError {
    pub fn state(path: impl Into<String>, messages: Vec<String>) -> Self {
        Self::State {
            path: path.into(),
            messages,
        }
    }
}

/// Errors surfaced by resource services.
#[derive(Debug, Error)]
pub enum NsxError {
    #[error(transparent)]
    Realize(#[from] RealizeError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Path(#[from] PathError),

    /// The caller passed a resource without an id.
    #[error("{kind} has no id")]
    MissingId { kind: &'static str },

    /// The caller passed a resource without a required field.
    #[error("{kind} is missing required field '{field}'")]
    MissingField { kind: &'static str, field: &'static str },

    /// Several independent operations failed.
    #[error("{}", .0.join("\n"))]
    Multiple(Vec<String>),

    /// Unexpected internal failure, such as a panicked task.
    #[error("internal error: {0}")]
    Internal(String),
}

impl NsxError {
    pub fn missing_id(kind: &'static str) -> Self {
        Self::MissingId { kind }
    }

    pub fn missing_field(kind: &'static str, field: &'static str) -> Self {
        Self::MissingField { kind, field }
    }

    /// Returns true if requeueing the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            NsxError::Realize(RealizeError::RetryExhausted) => true,
            NsxError::Client(ClientError::Transport(_)) => true,
            NsxError::Client(ClientError::Api { code, .. }) => *code >= 500,
            NsxError::Multiple(_) => true,
            _ => false,
        }
    }

    /// Returns true if NSX reported the intent as failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NsxError::Realize(RealizeError::State { .. }))
    }
}
