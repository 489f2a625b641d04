//! NSX tags and the tag scopes written by the operator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag scopes written on NSX objects owned by the operator.
pub mod scope {
    /// Kubernetes cluster the object belongs to.
    pub const CLUSTER: &str = "nsx-op/cluster";
    /// Operator version that created the object.
    pub const VERSION: &str = "nsx-op/version";
    /// Namespace of the owning Kubernetes object.
    pub const NAMESPACE: &str = "nsx-op/namespace";

    pub const SERVICE_NAME: &str = "nsx-op/service_name";
    pub const SERVICE_UID: &str = "nsx-op/service_uid";
    pub const LBVS_TYPE: &str = "nsx-op/lbvs_type";
    pub const CREATED_FOR: &str = "nsx-op/created_for";
    pub const IP_POOL_ID: &str = "nsx-op/ip_pool_id";

    pub const POD_NAME: &str = "nsx-op/pod_name";
    pub const POD_UID: &str = "nsx-op/pod_uid";
}

/// A `(scope, value)` pair attached to an NSX object.
///
/// NSX allows either half to be absent on the wire; both default to the
/// empty string here so index derivation never has to unwrap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub tag: String,
}

impl Tag {
    /// Creates a new tag.
    pub fn new(scope: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            tag: tag.into(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.scope, self.tag)
    }
}

/// Returns every value carried under `scope`, in tag order.
pub fn tag_values(tags: &[Tag], scope: &str) -> Vec<String> {
    tags.iter()
        .filter(|t| t.scope == scope)
        .map(|t| t.tag.clone())
        .collect()
}

/// Returns the first value carried under `scope`.
pub fn tag_value<'a>(tags: &'a [Tag], scope: &str) -> Option<&'a str> {
    tags.iter()
        .find(|t| t.scope == scope)
        .map(|t| t.tag.as_str())
}
