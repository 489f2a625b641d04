//! Subnet port store indexes.

use nsx_orch_common::{Indexed, ResourceStore};
use nsx_types::{scope, tag_values};

use super::types::SubnetPort;

pub mod index {
    use nsx_types::scope;

    /// Pod UID tag value.
    pub const POD_UID: &str = scope::POD_UID;
    /// `namespace/pod-name` of the owning Pod.
    pub const POD_NAMESPACED_NAME: &str = "nsx-op/pod_namespaced_name";
    /// Policy path of the parent subnet.
    pub const SUBNET_PATH: &str = "nsx-op/subnet_path";

    pub const ALL: [&str; 3] = [POD_UID, POD_NAMESPACED_NAME, SUBNET_PATH];
}

pub type SubnetPortStore = ResourceStore<SubnetPort>;

pub fn new_store() -> SubnetPortStore {
    ResourceStore::new(&index::ALL)
}

impl Indexed for SubnetPort {
    const KIND: &'static str = SubnetPort::RESOURCE_TYPE;

    fn primary_key(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn index_keys(&self, index: &str) -> Vec<String> {
        match index {
            index::POD_UID => tag_values(&self.tags, scope::POD_UID),
            index::POD_NAMESPACED_NAME => self.pod_key().into_iter().collect(),
            index::SUBNET_PATH => self.subnet_path().map(str::to_string).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn is_tombstone(&self) -> bool {
        self.marked_for_delete
    }
}
