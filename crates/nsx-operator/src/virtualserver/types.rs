//! Virtual server and VIP group types.

use std::collections::{BTreeMap, BTreeSet};

use nsx_types::{path, scope, tag_value, Tag};
use serde::{Deserialize, Serialize};

/// `lbvs_type` tag value of layer-4 virtual servers.
pub const LBVS_TYPE_LAYER4: &str = "layer_4";
/// `lbvs_type` tag value of layer-7 virtual servers.
pub const LBVS_TYPE_LAYER7: &str = "layer_7";

/// An NSX load-balancer virtual server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbVirtualServer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub ports: Vec<String>,
    /// Policy path of the LB service this virtual server is attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lb_service_path: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub marked_for_delete: bool,
}

impl LbVirtualServer {
    pub const RESOURCE_TYPE: &'static str = "LBVirtualServer";

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_ports<I, S>(mut self, ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ports = ports.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_lb_service_path(mut self, path: impl Into<String>) -> Self {
        self.lb_service_path = Some(path.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    /// Policy path, falling back to the path derived from the id.
    pub fn policy_path(&self) -> Option<String> {
        self.path
            .clone()
            .or_else(|| self.id.as_deref().map(path::virtual_server_path))
    }

    /// UID of the Kubernetes service owning this virtual server.
    pub fn service_uid(&self) -> Option<&str> {
        tag_value(&self.tags, scope::SERVICE_UID)
    }

    /// Id of the LB service, the last segment of `lb_service_path`.
    pub fn lb_service_id(&self) -> Option<&str> {
        self.lb_service_path.as_deref().and_then(path::last_segment)
    }
}

/// The parts of a Kubernetes Service that virtual-server tags are built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceRef {
    pub namespace: String,
    pub name: String,
    pub uid: String,
    pub annotations: BTreeMap<String, String>,
}

impl ServiceRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            uid: uid.into(),
            annotations: BTreeMap::new(),
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}

/// Set of virtual IPs, ordered for stable logs and payloads.
pub type VipSet = BTreeSet<String>;

/// One criterion of an NSX group membership expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resource_type")]
pub enum GroupExpression {
    #[serde(rename = "IPAddressExpression")]
    IpAddress {
        #[serde(default)]
        ip_addresses: Vec<String>,
    },
    /// Condition, path and other expressions the operator never writes.
    #[serde(other)]
    Unsupported,
}

/// An NSX security group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub expression: Vec<GroupExpression>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Group {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// IPs of the first IP-address expression, empty if there is none.
    pub fn ip_addresses(&self) -> VipSet {
        self.expression
            .iter()
            .find_map(|e| match e {
                GroupExpression::IpAddress { ip_addresses } => Some(ip_addresses.iter().cloned().collect()),
                GroupExpression::Unsupported => None,
            })
            .unwrap_or_default()
    }

    /// Replaces the IP expression with `(current - old) | new`, keeping IPs
    /// other writers added. Returns the resulting set.
    pub fn update_ip_expression(&mut self, old: &VipSet, new: &VipSet) -> VipSet {
        let updated: VipSet = self
            .ip_addresses()
            .difference(old)
            .cloned()
            .chain(new.iter().cloned())
            .collect();
        self.expression = vec![GroupExpression::IpAddress {
            ip_addresses: updated.iter().cloned().collect(),
        }];
        updated
    }
}
