//! VPC subnet port type.

use nsx_types::{path, scope, tag_value, Tag};
use serde::{Deserialize, Serialize};

/// An NSX VPC subnet port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetPort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Policy path of the subnet the port belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub marked_for_delete: bool,
}

impl SubnetPort {
    pub const RESOURCE_TYPE: &'static str = "VpcSubnetPort";

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_parent_path(mut self, parent: impl Into<String>) -> Self {
        self.parent_path = Some(parent.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    /// Subnet path, from `parent_path` or else derived from `path`.
    pub fn subnet_path(&self) -> Option<&str> {
        self.parent_path
            .as_deref()
            .or_else(|| self.path.as_deref().and_then(|p| path::parent_path(p).ok()))
    }

    pub fn pod_uid(&self) -> Option<&str> {
        tag_value(&self.tags, scope::POD_UID)
    }

    /// `namespace/name` of the owning Pod, if the port is tagged with both.
    pub fn pod_key(&self) -> Option<String> {
        let namespace = tag_value(&self.tags, scope::NAMESPACE)?;
        let name = tag_value(&self.tags, scope::POD_NAME)?;
        Some(pod_key(namespace, name))
    }
}

pub fn pod_key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

/// Id of the subnet port owned by the Pod `name` with `uid`.
pub fn build_subnet_port_id(name: &str, uid: &str) -> String {
    format!("{}_{}", name, uid)
}

/// Policy path of port `id` under `subnet_path`.
pub fn subnet_port_path(subnet_path: &str, id: &str) -> String {
    format!("{}/ports/{}", subnet_path.trim_end_matches('/'), id)
}
