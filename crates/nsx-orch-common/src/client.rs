//! Remote NSX API seams the core depends on.
//!
//! The REST transport is out of scope; services only see these traits and
//! the operator supplies the implementations.

use async_trait::async_trait;
use nsx_types::RealizedResourceList;
use thiserror::Error;

/// Result type alias for remote client calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Failures reported by a remote NSX client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The object does not exist on NSX.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: String, id: String },

    /// NSX rejected the request.
    #[error("NSX API error {code}: {message}")]
    Api { code: i64, message: String },

    /// The request never reached NSX or the response was unreadable.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn api(code: i64, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

/// Realization-status query against the realized-state API.
#[async_trait]
pub trait RealizedEntitiesClient: Send + Sync {
    /// Lists the realized entities behind one intent path.
    async fn list(&self, intent_path: &str) -> ClientResult<RealizedResourceList>;
}

/// One page of a cursor-based listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub results: Vec<T>,
    /// Cursor of the next page, `None` on the last page.
    pub cursor: Option<String>,
}

impl<T> ListPage<T> {
    pub fn last(results: Vec<T>) -> Self {
        Self {
            results,
            cursor: None,
        }
    }
}

/// Full listing of one resource kind, used to rebuild a store at startup.
#[async_trait]
pub trait ResourceLister<T>: Send + Sync {
    async fn list_page(&self, cursor: Option<String>) -> ClientResult<ListPage<T>>;
}
