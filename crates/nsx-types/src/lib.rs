//! Common NSX policy types shared by the operator crates.
//!
//! This crate provides type-safe representations of the pieces of the NSX
//! policy API model that the store and realization layers need:
//!
//! - [`Tag`]: `(scope, value)` pairs attached to every NSX object
//! - [`RealizedResource`]: one entity of a realization-status listing
//! - [`ExpectedEntity`]: `(id, entity type)` filter for realization checks
//! - [`path`]: helpers for NSX policy paths (`/orgs/.../projects/...`)

pub mod path;
mod realization;
mod tag;

pub use realization::{
    Alarm, ApiErrorDetails, ExpectedEntity, RealizedResource, RealizedResourceList,
    RealizedState, PROVIDER_NOT_READY_ERROR_CODE,
};
pub use tag::{scope, tag_value, tag_values, Tag};

/// Errors produced while parsing NSX policy paths.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("invalid NSX project path: {0:?}")]
    InvalidProjectPath(String),

    #[error("invalid NSX policy path: {0:?}")]
    InvalidPath(String),
}
